use super::{DeviceClient, RawFrame};
use crate::error::ClientError;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// One line of a `<device_id>.jsonl` capture
#[derive(Debug, Clone, Deserialize)]
struct ReplayFrame {
    timestamp: String,
    content: String,
    #[serde(default)]
    image: Option<String>,
}

#[derive(Debug)]
struct ReplayCursor {
    frames: Vec<ReplayFrame>,
    next: usize,
}

impl ReplayCursor {
    /// Frames are served in order, then the last one is repeated
    fn advance(&mut self) -> ReplayFrame {
        let index = self.next.min(self.frames.len() - 1);
        self.next = self.next.saturating_add(1);
        self.frames[index].clone()
    }
}

/// Device client serving recorded frames from disk.
///
/// Stands in for a device-management API: every call waits the configured
/// latency, like a network round trip would.
pub struct ReplayClient {
    dir: PathBuf,
    latency: Duration,
    cursors: Mutex<HashMap<String, ReplayCursor>>,
}

impl ReplayClient {
    /// Create a new replay client reading captures from `dir`
    pub fn new<P: AsRef<Path>>(dir: P, latency: Duration) -> Result<Self, ClientError> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.is_dir() {
            return Err(ClientError::Initialization {
                details: format!("Replay directory {} does not exist", dir.display()),
            });
        }

        info!("Replay client reading captures from {}", dir.display());

        Ok(Self {
            dir,
            latency,
            cursors: Mutex::new(HashMap::new()),
        })
    }

    fn capture_path(&self, device_id: &str) -> PathBuf {
        self.dir.join(format!("{}.jsonl", device_id))
    }

    async fn load_capture(&self, device_id: &str) -> Result<ReplayCursor, ClientError> {
        let path = self.capture_path(device_id);
        let contents = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| ClientError::Transport {
                device_id: device_id.to_string(),
                details: format!("Failed to read {}: {}", path.display(), e),
            })?;

        let frames = contents
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(number, line)| {
                serde_json::from_str::<ReplayFrame>(line).map_err(|e| {
                    ClientError::MalformedFrame {
                        device_id: device_id.to_string(),
                        details: format!("{} line {}: {}", path.display(), number + 1, e),
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if frames.is_empty() {
            return Err(ClientError::Transport {
                device_id: device_id.to_string(),
                details: format!("{} holds no frames", path.display()),
            });
        }

        debug!(
            "Loaded {} frames for device {} from {}",
            frames.len(),
            device_id,
            path.display()
        );
        Ok(ReplayCursor { frames, next: 0 })
    }
}

#[async_trait]
impl DeviceClient for ReplayClient {
    async fn get_latest_data(
        &self,
        device_id: &str,
        want_image: bool,
    ) -> Result<(Option<String>, RawFrame), ClientError> {
        tokio::time::sleep(self.latency).await;

        let loaded = self.cursors.lock().contains_key(device_id);
        if !loaded {
            let cursor = self.load_capture(device_id).await?;
            self.cursors
                .lock()
                .entry(device_id.to_string())
                .or_insert(cursor);
        }

        let frame = self
            .cursors
            .lock()
            .get_mut(device_id)
            .map(ReplayCursor::advance)
            .ok_or_else(|| ClientError::Transport {
                device_id: device_id.to_string(),
                details: "Capture was unloaded".to_string(),
            })?;

        let image = if want_image { frame.image } else { None };
        Ok((
            image,
            RawFrame {
                timestamp: frame.timestamp,
                content: frame.content,
            },
        ))
    }

    fn client_name(&self) -> &str {
        "replay"
    }
}
