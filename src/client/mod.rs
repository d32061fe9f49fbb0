mod kind;
mod replay;

#[cfg(test)]
mod tests;

pub use kind::{BoundClient, ClientFactory, ClientKind, ConfiguredClientFactory};
pub use replay::ReplayClient;

use crate::error::ClientError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Latest inference frame as handed over by a device-management client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFrame {
    /// Client-native timestamp; empty when the device has nothing to report
    pub timestamp: String,
    /// Base64 encoded inference payload
    pub content: String,
}

/// Interface to a device-management API
#[async_trait]
pub trait DeviceClient: Send + Sync {
    /// Fetch the latest image (when requested) and inference frame of a device.
    ///
    /// May block on network I/O; transport failures are returned as
    /// [`ClientError::Transport`].
    async fn get_latest_data(
        &self,
        device_id: &str,
        want_image: bool,
    ) -> Result<(Option<String>, RawFrame), ClientError>;

    /// Client name for logging
    fn client_name(&self) -> &str;
}
