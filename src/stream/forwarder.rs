use super::sink::StreamSink;
use crate::pipeline::PipelineOrchestrator;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Drains the pipeline's event queue into a sink while any collector is active
pub struct StreamForwarder {
    pipeline: Arc<PipelineOrchestrator>,
    sink: Arc<dyn StreamSink>,
    poll_interval: Duration,
    forwarded: AtomicU64,
}

impl StreamForwarder {
    /// Create a new forwarder polling the queue every `poll_interval`
    pub fn new(
        pipeline: Arc<PipelineOrchestrator>,
        sink: Arc<dyn StreamSink>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            pipeline,
            sink,
            poll_interval,
            forwarded: AtomicU64::new(0),
        }
    }

    /// Messages handed to the sink so far
    pub fn forwarded(&self) -> u64 {
        self.forwarded.load(Ordering::Relaxed)
    }

    pub fn spawn(self: Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(cancel).await })
    }

    /// Forward until cancelled.
    ///
    /// Idles until some collector becomes active, then drains at most one
    /// event per poll interval; goes back to idling once none is active.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(
            "Stream forwarder started ({} sink, every {:?})",
            self.sink.sink_name(),
            self.poll_interval
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = self.pipeline.wait_for_activity() => {}
            }

            info!("Collectors active, stream forwarding resumed");
            if !self.drain_while_active(&cancel).await {
                break;
            }
            info!("No active collectors, stream forwarding paused");
        }

        debug!("Stream forwarder stopped after {} messages", self.forwarded());
    }

    /// Returns `false` when cancelled
    async fn drain_while_active(&self, cancel: &CancellationToken) -> bool {
        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return false,
                _ = ticker.tick() => {}
            }

            if !self.pipeline.is_active(None) {
                return true;
            }

            if let Some(event) = self.pipeline.dequeue() {
                match self.sink.send(event.into()).await {
                    Ok(()) => {
                        self.forwarded.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(e) => error!("Failed to forward stream event: {}", e),
                }
            }
        }
    }
}
