use super::types::component;
use super::{ComponentState, ZonewatchService};
use crate::error::{Result, ZonewatchError};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{error, info};

const STOP_TIMEOUT: Duration = Duration::from_secs(10);

impl ZonewatchService {
    /// Stop collectors, then the background tasks. Returns the process exit code.
    pub async fn shutdown(&mut self) -> Result<i32> {
        info!("Beginning graceful shutdown");

        let mut exit_code = 0;

        // Collectors first, so nothing new reaches the queue or the store
        if let Err(e) = self.stop_component(component::COLLECTORS).await {
            error!("Error stopping collectors: {}", e);
            exit_code = 1;
        }

        self.cancellation_token.cancel();

        for name in [component::STREAM, component::RETENTION] {
            if let Err(e) = self.stop_component(name).await {
                error!("Error stopping {}: {}", name, e);
                exit_code = 1;
            }
        }

        info!("Graceful shutdown completed with exit code: {}", exit_code);
        Ok(exit_code)
    }

    async fn stop_component(&mut self, name: &str) -> Result<()> {
        info!("Stopping {} component", name);
        self.set_component_state(name, ComponentState::Stopping).await;

        let outcome = match name {
            component::COLLECTORS => {
                let pipeline = Arc::clone(&self.pipeline);
                timeout(STOP_TIMEOUT, async move {
                    pipeline.reset().await;
                    Ok::<(), ZonewatchError>(())
                })
                .await
            }
            component::STREAM => join_task(name, self.forwarder_handle.take()).await,
            component::RETENTION => join_task(name, self.retention_handle.take()).await,
            _ => Ok(Err(ZonewatchError::component(name, "unknown component"))),
        };

        match outcome {
            Ok(Ok(())) => {
                self.set_component_state(name, ComponentState::Stopped).await;
                info!("{} component stopped", name);
                Ok(())
            }
            Ok(Err(e)) => {
                self.set_component_state(name, ComponentState::Failed).await;
                error!("Error stopping {} component: {}", name, e);
                Err(e)
            }
            Err(_) => {
                self.set_component_state(name, ComponentState::Failed).await;
                error!("{} component stop timeout", name);
                Err(ZonewatchError::component(name, "stop timeout"))
            }
        }
    }
}

async fn join_task(
    name: &str,
    handle: Option<JoinHandle<()>>,
) -> std::result::Result<Result<()>, tokio::time::error::Elapsed> {
    match handle {
        Some(handle) => timeout(STOP_TIMEOUT, handle)
            .await
            .map(|joined| joined.map_err(|e| ZonewatchError::component(name, e.to_string()))),
        None => Ok(Ok(())),
    }
}
