use crate::inference::ParsedInference;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;

/// One decoded poll on its way to the stream consumer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamEvent {
    pub image: Option<String>,
    pub inference: ParsedInference,
    /// Normalised numeric timestamp
    pub timestamp: String,
    pub device_id: String,
}

/// FIFO shared by every collector (writers) and the stream consumer (reader).
///
/// Each device's events keep their poll order; across devices the order is
/// arrival order.
#[derive(Clone)]
pub struct EventQueue {
    sender: mpsc::UnboundedSender<StreamEvent>,
    receiver: Arc<Mutex<mpsc::UnboundedReceiver<StreamEvent>>>,
}

impl EventQueue {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: Arc::new(Mutex::new(receiver)),
        }
    }

    pub fn push(&self, event: StreamEvent) {
        // The receiver lives as long as any clone of the queue, so this cannot fail
        let _ = self.sender.send(event);
    }

    /// Pop the oldest pending event without waiting
    pub fn pop(&self) -> Option<StreamEvent> {
        self.receiver.lock().try_recv().ok()
    }

    /// Drop every pending event, returning how many were discarded
    pub fn clear(&self) -> usize {
        let mut receiver = self.receiver.lock();
        let mut discarded = 0;
        while receiver.try_recv().is_ok() {
            discarded += 1;
        }
        discarded
    }

    pub fn len(&self) -> usize {
        self.receiver.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.lock().is_empty()
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}
