use crate::client::ClientKind;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ZonewatchConfig {
    /// Devices whose collectors are started at boot
    #[serde(default)]
    pub devices: Vec<String>,

    pub client: ClientConfig,
    pub store: StoreConfig,
    pub retention: RetentionConfig,
    pub stream: StreamConfig,
    pub aggregation: AggregationConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ClientConfig {
    /// Device-management client flavour; selects the inference wire format
    #[serde(default = "default_client_kind")]
    pub kind: ClientKind,

    /// Directory holding `<device_id>.jsonl` frame captures for the replay client
    #[serde(default = "default_replay_dir")]
    pub replay_dir: String,

    /// Simulated round-trip latency of one `get_latest_data` call
    #[serde(default = "default_latency_ms")]
    pub latency_ms: u64,

    /// Ask the device for the image alongside the inference
    #[serde(default = "default_want_image")]
    pub want_image: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StoreConfig {
    /// SQLite database file
    #[serde(default = "default_store_path")]
    pub path: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RetentionConfig {
    /// Period between retention sweeps
    #[serde(default = "default_sweep_interval_seconds")]
    pub sweep_interval_seconds: u64,

    /// Records created longer ago than this are deleted
    #[serde(default = "default_horizon_seconds")]
    pub horizon_seconds: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StreamConfig {
    /// Cadence at which the forwarder drains the event queue
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AggregationConfig {
    /// Bucket width used when a query does not specify one
    #[serde(default = "default_bucket_width_ms")]
    pub default_bucket_width_ms: i64,
}

impl ZonewatchConfig {
    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("client.kind", default_client_kind().to_string())?
            .set_default("client.replay_dir", default_replay_dir())?
            .set_default("client.latency_ms", default_latency_ms())?
            .set_default("client.want_image", default_want_image())?
            .set_default("store.path", default_store_path())?
            .set_default(
                "retention.sweep_interval_seconds",
                default_sweep_interval_seconds(),
            )?
            .set_default("retention.horizon_seconds", default_horizon_seconds())?
            .set_default("stream.poll_interval_ms", default_poll_interval_ms())?
            .set_default(
                "aggregation.default_bucket_width_ms",
                default_bucket_width_ms(),
            )?
            .set_default("devices", Vec::<String>::new())?
            // Add configuration file (optional)
            .add_source(File::with_name(&path_str).required(false))
            // Environment variables, e.g. ZONEWATCH_CLIENT__LATENCY_MS=250
            .add_source(
                Environment::with_prefix("ZONEWATCH")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("devices"),
            )
            .build()?;

        let config: ZonewatchConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.path.trim().is_empty() {
            return Err(ConfigError::Message(
                "Store path must not be empty".to_string(),
            ));
        }

        if self.retention.sweep_interval_seconds == 0 {
            return Err(ConfigError::Message(
                "Retention sweep interval must be greater than 0".to_string(),
            ));
        }

        if self.retention.horizon_seconds == 0 {
            return Err(ConfigError::Message(
                "Retention horizon must be greater than 0".to_string(),
            ));
        }

        if self.stream.poll_interval_ms == 0 {
            return Err(ConfigError::Message(
                "Stream poll interval must be greater than 0".to_string(),
            ));
        }

        if self.aggregation.default_bucket_width_ms <= 0 {
            return Err(ConfigError::Message(
                "Default bucket width must be greater than 0".to_string(),
            ));
        }

        if self.devices.iter().any(|d| d.trim().is_empty()) {
            return Err(ConfigError::Message(
                "Device ids must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> crate::error::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

impl RetentionConfig {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds)
    }

    pub fn horizon(&self) -> Duration {
        Duration::from_secs(self.horizon_seconds)
    }
}

impl StreamConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for ZonewatchConfig {
    fn default() -> Self {
        Self {
            devices: Vec::new(),
            client: ClientConfig {
                kind: default_client_kind(),
                replay_dir: default_replay_dir(),
                latency_ms: default_latency_ms(),
                want_image: default_want_image(),
            },
            store: StoreConfig {
                path: default_store_path(),
            },
            retention: RetentionConfig {
                sweep_interval_seconds: default_sweep_interval_seconds(),
                horizon_seconds: default_horizon_seconds(),
            },
            stream: StreamConfig {
                poll_interval_ms: default_poll_interval_ms(),
            },
            aggregation: AggregationConfig {
                default_bucket_width_ms: default_bucket_width_ms(),
            },
        }
    }
}

// Default value functions
fn default_client_kind() -> ClientKind {
    ClientKind::OnlineV2
}
fn default_replay_dir() -> String {
    "./replay".to_string()
}
fn default_latency_ms() -> u64 {
    200
}
fn default_want_image() -> bool {
    true
}

fn default_store_path() -> String {
    "./zonewatch.db".to_string()
}

fn default_sweep_interval_seconds() -> u64 {
    60
}
fn default_horizon_seconds() -> u64 {
    3600
}

fn default_poll_interval_ms() -> u64 {
    100
}

pub(crate) fn default_bucket_width_ms() -> i64 {
    10_000
}
