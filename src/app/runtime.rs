use super::{ShutdownReason, ZonewatchService};
use crate::error::{Result, ZonewatchError};
use std::sync::Arc;
use tokio::signal;
use tokio::sync::{oneshot, Mutex};
use tracing::{error, info};

/// Cloneable handle that ends [`ZonewatchService::run`]
#[derive(Clone)]
pub struct ShutdownRequester {
    sender: Arc<Mutex<Option<oneshot::Sender<ShutdownReason>>>>,
}

impl ShutdownRequester {
    /// Returns `false` if a shutdown was already requested
    pub async fn request(&self, reason: ShutdownReason) -> bool {
        match self.sender.lock().await.take() {
            Some(sender) => sender.send(reason).is_ok(),
            None => false,
        }
    }
}

impl ZonewatchService {
    pub fn shutdown_requester(&self) -> ShutdownRequester {
        ShutdownRequester {
            sender: Arc::clone(&self.shutdown_sender),
        }
    }

    /// Run until a signal or a shutdown request arrives, then shut down
    pub async fn run(&mut self) -> Result<i32> {
        info!("Zonewatch is running");

        let shutdown_receiver = self
            .shutdown_receiver
            .take()
            .ok_or_else(|| ZonewatchError::system("Shutdown receiver already taken"))?;

        self.setup_signal_handlers();

        let shutdown_reason = shutdown_receiver
            .await
            .map_err(|_| ZonewatchError::system("Shutdown channel closed unexpectedly"))?;

        info!("Shutdown initiated: {:?}", shutdown_reason);

        let exit_code = self.shutdown().await?;

        info!("Zonewatch shutdown complete");
        Ok(exit_code)
    }

    fn setup_signal_handlers(&self) {
        // SIGTERM (service manager stop) - Unix only
        #[cfg(unix)]
        {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    let requester = self.shutdown_requester();
                    tokio::spawn(async move {
                        if sigterm.recv().await.is_some() {
                            info!("Received SIGTERM signal");
                            requester
                                .request(ShutdownReason::Signal("SIGTERM".to_string()))
                                .await;
                        }
                    });
                }
                Err(e) => error!("Failed to register SIGTERM handler: {}", e),
            }
        }

        // SIGINT (Ctrl+C)
        let requester = self.shutdown_requester();
        tokio::spawn(async move {
            if let Ok(()) = signal::ctrl_c().await {
                info!("Received SIGINT signal (Ctrl+C)");
                requester
                    .request(ShutdownReason::Signal("SIGINT".to_string()))
                    .await;
            }
        });
    }
}
