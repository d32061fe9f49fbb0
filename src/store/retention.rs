use super::TelemetryStore;
use crate::config::RetentionConfig;
use crate::error::StoreError;
use chrono::Utc;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Periodically deletes records older than the retention horizon
#[derive(Clone)]
pub struct RetentionTask {
    store: Arc<dyn TelemetryStore>,
    config: RetentionConfig,
}

impl RetentionTask {
    /// Create a new retention task over the given store
    pub fn new(store: Arc<dyn TelemetryStore>, config: RetentionConfig) -> Self {
        Self { store, config }
    }

    /// Run one sweep off the async runtime
    pub async fn sweep_once(&self) -> Result<usize, StoreError> {
        let horizon =
            chrono::Duration::from_std(self.config.horizon()).map_err(|e| StoreError::Task {
                details: format!("Retention horizon out of range: {}", e),
            })?;
        let cutoff = Utc::now() - horizon;
        let store = Arc::clone(&self.store);

        tokio::task::spawn_blocking(move || store.delete_created_before(cutoff))
            .await
            .map_err(|e| StoreError::Task {
                details: e.to_string(),
            })?
    }

    /// Start the sweep loop; it runs until `cancel` fires.
    ///
    /// A failed sweep is logged and the next one runs on schedule.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        info!(
            "Starting retention sweep every {:?} (horizon {:?})",
            self.config.sweep_interval(),
            self.config.horizon()
        );

        tokio::spawn(async move {
            let mut ticker = interval(self.config.sweep_interval());
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await; // Skip first immediate tick

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("Retention sweep cancelled");
                        break;
                    }
                    _ = ticker.tick() => {
                        match self.sweep_once().await {
                            Ok(deleted) => debug!("Retention sweep deleted {} records", deleted),
                            Err(e) => error!("Retention sweep failed: {}", e),
                        }
                    }
                }
            }
        })
    }
}
