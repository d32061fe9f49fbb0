use super::{DeviceClient, ReplayClient};
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::inference::InferenceFormat;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Flavour of device-management API a client speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClientKind {
    OnlineV1,
    OnlineV2,
}

impl ClientKind {
    /// Inference wire format produced by devices behind this API
    pub fn inference_format(&self) -> InferenceFormat {
        match self {
            ClientKind::OnlineV1 => InferenceFormat::ZoneDetection,
            ClientKind::OnlineV2 => InferenceFormat::ObjectDetectionExpanded,
        }
    }
}

impl fmt::Display for ClientKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientKind::OnlineV1 => f.write_str("online-v1"),
            ClientKind::OnlineV2 => f.write_str("online-v2"),
        }
    }
}

/// A device client together with the inference format its devices emit
#[derive(Clone)]
pub struct BoundClient {
    pub client: Arc<dyn DeviceClient>,
    pub format: InferenceFormat,
}

impl BoundClient {
    pub fn new(client: Arc<dyn DeviceClient>, format: InferenceFormat) -> Self {
        Self { client, format }
    }
}

impl fmt::Debug for BoundClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundClient")
            .field("client", &self.client.client_name())
            .field("format", &self.format)
            .finish()
    }
}

/// Builds the active device client on demand
pub trait ClientFactory: Send + Sync {
    fn create(&self) -> Result<BoundClient, ClientError>;
}

/// Factory driven by the `[client]` configuration section
#[derive(Debug, Clone)]
pub struct ConfiguredClientFactory {
    config: ClientConfig,
}

impl ConfiguredClientFactory {
    /// Create a new factory for the given client configuration
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }
}

impl ClientFactory for ConfiguredClientFactory {
    fn create(&self) -> Result<BoundClient, ClientError> {
        let format = self.config.kind.inference_format();
        info!(
            "Creating {} replay client from {} ({})",
            self.config.kind, self.config.replay_dir, format
        );

        let client = ReplayClient::new(
            &self.config.replay_dir,
            Duration::from_millis(self.config.latency_ms),
        )?;

        Ok(BoundClient::new(Arc::new(client), format))
    }
}
