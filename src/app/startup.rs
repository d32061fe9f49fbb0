use super::types::component;
use super::{ComponentState, ZonewatchService};
use crate::error::{Result, ZonewatchError};
use std::sync::Arc;
use tracing::{error, info};

impl ZonewatchService {
    /// Register every component as stopped
    pub async fn initialize(&mut self) -> Result<()> {
        info!("Initializing Zonewatch components");

        let mut states = self.component_states.lock().await;
        for name in [component::RETENTION, component::STREAM, component::COLLECTORS] {
            states.insert(name.to_string(), ComponentState::Stopped);
        }
        drop(states);

        info!("All components initialized successfully");
        Ok(())
    }

    /// Start the retention sweep, the stream forwarder and the boot devices
    pub async fn start(&mut self) -> Result<()> {
        info!("Starting Zonewatch");

        self.set_component_state(component::RETENTION, ComponentState::Starting).await;
        let retention = self.retention_task();
        self.retention_handle = Some(retention.spawn(self.cancellation_token.child_token()));
        self.set_component_state(component::RETENTION, ComponentState::Running).await;

        self.set_component_state(component::STREAM, ComponentState::Starting).await;
        let forwarder = Arc::clone(&self.forwarder);
        self.forwarder_handle = Some(forwarder.spawn(self.cancellation_token.child_token()));
        self.set_component_state(component::STREAM, ComponentState::Running).await;

        self.set_component_state(component::COLLECTORS, ComponentState::Starting).await;
        let want_image = self.config.client.want_image;
        for device_id in &self.config.devices {
            if let Err(e) = self.pipeline.start_collection(device_id, want_image).await {
                error!("Failed to start collector for {}: {}", device_id, e);
                self.set_component_state(component::COLLECTORS, ComponentState::Failed).await;
                return Err(ZonewatchError::component(
                    component::COLLECTORS,
                    format!("device {}: {}", device_id, e),
                ));
            }
        }
        self.set_component_state(component::COLLECTORS, ComponentState::Running).await;

        info!(
            "Zonewatch started with {} collector(s)",
            self.config.devices.len()
        );
        Ok(())
    }
}
