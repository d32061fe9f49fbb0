use super::queue::{EventQueue, StreamEvent};
use crate::client::{BoundClient, RawFrame};
use crate::error::{ClientError, StoreError};
use crate::inference::{InferenceDecoder, InferenceFormat, ParsedInference};
use crate::store::{TelemetryRecord, TelemetryStore};
use crate::timestamp;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};
use uuid::Uuid;

/// Lifecycle of a device collector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorState {
    Idle,
    Active,
    Stopping,
}

/// State shared between a collector and its polling task
#[derive(Debug)]
struct CollectorShared {
    state: Mutex<CollectorState>,
    /// Raw timestamp of the last accepted frame; survives restarts
    last_seen: Mutex<Option<String>>,
    last_error: Mutex<Option<String>>,
}

struct RunningLoop {
    run_id: Uuid,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct LoopSlot {
    running: Option<RunningLoop>,
    ever_started: bool,
}

/// Polls one device, deduplicates frames by timestamp, decodes them and
/// fans the result out to the event queue and the telemetry store.
pub struct DeviceCollector {
    device_id: String,
    client: BoundClient,
    decoder: InferenceDecoder,
    store: Arc<dyn TelemetryStore>,
    queue: EventQueue,
    shared: Arc<CollectorShared>,
    slot: tokio::sync::Mutex<LoopSlot>,
}

impl DeviceCollector {
    /// Create a new collector bound to `client`; its inference format is
    /// fixed from here on.
    pub fn new(
        device_id: impl Into<String>,
        client: BoundClient,
        store: Arc<dyn TelemetryStore>,
        queue: EventQueue,
    ) -> Self {
        let device_id = device_id.into();
        debug!(
            "Collector created for device {} ({} via {})",
            device_id,
            client.format,
            client.client.client_name()
        );

        Self {
            device_id,
            decoder: InferenceDecoder::new(client.format),
            client,
            store,
            queue,
            shared: Arc::new(CollectorShared {
                state: Mutex::new(CollectorState::Idle),
                last_seen: Mutex::new(None),
                last_error: Mutex::new(None),
            }),
            slot: tokio::sync::Mutex::new(LoopSlot::default()),
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn format(&self) -> InferenceFormat {
        self.decoder.format()
    }

    pub fn state(&self) -> CollectorState {
        *self.shared.state.lock()
    }

    pub fn is_active(&self) -> bool {
        self.state() == CollectorState::Active
    }

    pub fn last_seen(&self) -> Option<String> {
        self.shared.last_seen.lock().clone()
    }

    /// Error that ended the most recent polling loop, if any
    pub fn last_error(&self) -> Option<String> {
        self.shared.last_error.lock().clone()
    }

    /// Start polling. Starting an active collector is a no-op.
    pub async fn start(&self, want_image: bool) {
        let mut slot = self.slot.lock().await;

        {
            let mut state = self.shared.state.lock();
            if *state == CollectorState::Active {
                debug!("Collector for device {} already active", self.device_id);
                return;
            }
            *state = CollectorState::Active;
        }
        *self.shared.last_error.lock() = None;

        let run_id = Uuid::new_v4();
        let cancel = CancellationToken::new();
        let poll_loop = PollLoop {
            run_id,
            device_id: self.device_id.clone(),
            client: self.client.clone(),
            decoder: self.decoder,
            store: Arc::clone(&self.store),
            queue: self.queue.clone(),
            shared: Arc::clone(&self.shared),
        };

        info!(
            "Starting data collection for device {} (run {})",
            self.device_id, run_id
        );
        let handle = tokio::spawn(poll_loop.run(cancel.clone(), want_image));

        slot.running = Some(RunningLoop {
            run_id,
            cancel,
            handle,
        });
        slot.ever_started = true;
    }

    /// Stop polling and wait for the loop to exit.
    ///
    /// Once a loop has ever run, stopping discards every pending event in the
    /// shared queue, including other devices' events.
    pub async fn stop(&self) {
        info!("Stopping data collection for device {}", self.device_id);
        let mut slot = self.slot.lock().await;

        {
            let mut state = self.shared.state.lock();
            if *state == CollectorState::Active {
                *state = CollectorState::Stopping;
            }
        }

        if let Some(running) = slot.running.take() {
            running.cancel.cancel();
            if let Err(e) = running.handle.await {
                error!(
                    "Collector run {} for device {} ended abnormally: {}",
                    running.run_id, self.device_id, e
                );
            }
        }

        if slot.ever_started {
            let discarded = self.queue.clear();
            debug!(
                "Cleared {} queued events after stopping device {}",
                discarded, self.device_id
            );
        }

        *self.shared.state.lock() = CollectorState::Idle;
    }
}

/// Everything the spawned polling task owns
struct PollLoop {
    run_id: Uuid,
    device_id: String,
    client: BoundClient,
    decoder: InferenceDecoder,
    store: Arc<dyn TelemetryStore>,
    queue: EventQueue,
    shared: Arc<CollectorShared>,
}

impl PollLoop {
    async fn run(self, cancel: CancellationToken, want_image: bool) {
        match self.poll(&cancel, want_image).await {
            Ok(()) => debug!(
                "Collector run {} for device {} stopped",
                self.run_id, self.device_id
            ),
            Err(e) => {
                error!(
                    "Data collection for device {} failed (run {}): {}",
                    self.device_id, self.run_id, e
                );
                *self.shared.last_error.lock() = Some(e.to_string());

                // Go inert; a concurrent stop() owns the Stopping -> Idle move
                let mut state = self.shared.state.lock();
                if *state == CollectorState::Active {
                    *state = CollectorState::Idle;
                }
            }
        }
    }

    /// Poll until cancelled; a client failure ends the loop
    async fn poll(&self, cancel: &CancellationToken, want_image: bool) -> Result<(), ClientError> {
        loop {
            let (image, frame) = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(()),
                fetched = self.client.client.get_latest_data(&self.device_id, want_image) => fetched?,
            };

            if !self.is_new(&frame.timestamp) {
                trace!(
                    "Skipping frame '{}' for device {}",
                    frame.timestamp,
                    self.device_id
                );
                tokio::task::yield_now().await;
                continue;
            }

            self.accept(image, frame).await;
        }
    }

    fn is_new(&self, raw_timestamp: &str) -> bool {
        !raw_timestamp.is_empty()
            && self.shared.last_seen.lock().as_deref() != Some(raw_timestamp)
    }

    async fn accept(&self, image: Option<String>, frame: RawFrame) {
        let numeric_timestamp = timestamp::to_numeric(&frame.timestamp);
        debug!(
            "New data received for device {} at {}",
            self.device_id, numeric_timestamp
        );

        let inference = self.decoder.decode_lenient(&frame.content);

        self.queue.push(StreamEvent {
            image: image.clone(),
            inference: inference.clone(),
            timestamp: numeric_timestamp.clone(),
            device_id: self.device_id.clone(),
        });

        if let Err(e) = self
            .save(&numeric_timestamp, image.as_deref(), &inference)
            .await
        {
            error!(
                "Error saving telemetry data for device {}: {}",
                self.device_id, e
            );
        }

        *self.shared.last_seen.lock() = Some(frame.timestamp);
    }

    async fn save(
        &self,
        numeric_timestamp: &str,
        image: Option<&str>,
        inference: &ParsedInference,
    ) -> Result<(), StoreError> {
        let record =
            TelemetryRecord::from_inference(&self.device_id, numeric_timestamp, image, inference)?;
        let store = Arc::clone(&self.store);

        tokio::task::spawn_blocking(move || store.insert(&record))
            .await
            .map_err(|e| StoreError::Task {
                details: e.to_string(),
            })??;

        trace!(
            "Telemetry saved for device {} at {}",
            self.device_id,
            numeric_timestamp
        );
        Ok(())
    }
}
