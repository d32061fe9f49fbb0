use crate::client::{BoundClient, ClientFactory};
use crate::collector::{DeviceCollector, EventQueue, StreamEvent};
use crate::error::ClientError;
use crate::inference::InferenceFormat;
use crate::store::TelemetryStore;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{debug, error, info};

/// Supervises the per-device collectors and owns the shared event queue
pub struct PipelineOrchestrator {
    factory: Arc<dyn ClientFactory>,
    store: Arc<dyn TelemetryStore>,
    queue: EventQueue,
    collectors: Mutex<HashMap<String, Arc<DeviceCollector>>>,
    client: Mutex<Option<BoundClient>>,
    activity: Notify,
}

impl PipelineOrchestrator {
    /// Create a new orchestrator; the device client is built on first use
    pub fn new(factory: Arc<dyn ClientFactory>, store: Arc<dyn TelemetryStore>) -> Self {
        debug!("Pipeline orchestrator initialized");
        Self {
            factory,
            store,
            queue: EventQueue::new(),
            collectors: Mutex::new(HashMap::new()),
            client: Mutex::new(None),
            activity: Notify::new(),
        }
    }

    pub fn queue(&self) -> &EventQueue {
        &self.queue
    }

    /// Active client, created on demand
    fn client(&self) -> Result<BoundClient, ClientError> {
        let mut client = self.client.lock();
        if let Some(bound) = client.as_ref() {
            return Ok(bound.clone());
        }

        debug!("Initializing device client");
        let bound = self.factory.create().map_err(|e| {
            error!("Failed to initialize device client: {}", e);
            e
        })?;
        *client = Some(bound.clone());
        Ok(bound)
    }

    /// Registered collector for a device, creating one bound to the active client
    fn collector(&self, device_id: &str) -> Result<Arc<DeviceCollector>, ClientError> {
        if let Some(collector) = self.collectors.lock().get(device_id) {
            return Ok(Arc::clone(collector));
        }

        let client = self.client()?;
        let mut collectors = self.collectors.lock();
        let collector = collectors
            .entry(device_id.to_string())
            .or_insert_with(|| {
                debug!("Creating new collector for device {}", device_id);
                Arc::new(DeviceCollector::new(
                    device_id,
                    client,
                    Arc::clone(&self.store),
                    self.queue.clone(),
                ))
            });
        Ok(Arc::clone(collector))
    }

    /// Start collecting from a device
    pub async fn start_collection(
        &self,
        device_id: &str,
        want_image: bool,
    ) -> Result<(), ClientError> {
        info!("Starting data collection for device {}", device_id);
        let collector = self.collector(device_id)?;
        collector.start(want_image).await;
        self.activity.notify_waiters();
        Ok(())
    }

    /// Stop collecting from a device, waiting for its loop to exit.
    ///
    /// Clears the whole event queue once the device has ever collected.
    pub async fn stop_collection(&self, device_id: &str) {
        info!("Stopping data collection for device {}", device_id);
        let collector = self.collectors.lock().get(device_id).cloned();
        match collector {
            Some(collector) => collector.stop().await,
            None => debug!("No collector registered for device {}", device_id),
        }
    }

    /// Stop and discard every collector and drop the client, so the next
    /// collector is bound to a freshly created one.
    pub async fn reset(&self) {
        info!("Resetting the device client");

        let collectors: Vec<_> = self.collectors.lock().drain().collect();
        info!("Resetting {} collector(s)", collectors.len());
        for (_, collector) in collectors {
            collector.stop().await;
        }

        *self.client.lock() = None;
    }

    /// With a device, whether its collector is active; without, whether any is
    pub fn is_active(&self, device_id: Option<&str>) -> bool {
        let collectors = self.collectors.lock();
        match device_id {
            Some(device_id) => collectors
                .get(device_id)
                .map(|collector| collector.is_active())
                .unwrap_or(false),
            None => collectors.values().any(|collector| collector.is_active()),
        }
    }

    /// Pop the oldest pending event, if any
    pub fn dequeue(&self) -> Option<StreamEvent> {
        let event = self.queue.pop();
        if event.is_some() {
            debug!("Retrieving data from event queue");
        }
        event
    }

    /// Wait until at least one collector is active
    pub async fn wait_for_activity(&self) {
        loop {
            let notified = self.activity.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.is_active(None) {
                return;
            }
            notified.await;
        }
    }

    /// Inference format pinned by a device's collector
    pub fn collector_format(&self, device_id: &str) -> Option<InferenceFormat> {
        self.collectors
            .lock()
            .get(device_id)
            .map(|collector| collector.format())
    }

    /// Devices with an active collector, sorted
    pub fn active_devices(&self) -> Vec<String> {
        let mut devices: Vec<String> = self
            .collectors
            .lock()
            .iter()
            .filter(|(_, collector)| collector.is_active())
            .map(|(device_id, _)| device_id.clone())
            .collect();
        devices.sort();
        devices
    }
}
