use thiserror::Error;

#[derive(Error, Debug)]
pub enum ZonewatchError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Device client error: {0}")]
    Client(#[from] ClientError),

    #[error("Telemetry store error: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid query: {0}")]
    Validation(#[from] ValidationError),

    #[error("System error: {message}")]
    System { message: String },

    #[error("Component error in {component}: {message}")]
    Component { component: String, message: String },
}

impl ZonewatchError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    pub fn component<C: Into<String>, M: Into<String>>(component: C, message: M) -> Self {
        Self::Component {
            component: component.into(),
            message: message.into(),
        }
    }
}

/// Failures talking to the device-management client
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Transport failure for device {device_id}: {details}")]
    Transport { device_id: String, details: String },

    #[error("Client initialization failed: {details}")]
    Initialization { details: String },

    #[error("Malformed frame from device {device_id}: {details}")]
    MalformedFrame { device_id: String, details: String },
}

/// Malformed binary inference payload
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("Invalid base64 payload: {details}")]
    Base64 { details: String },

    #[error("Required field '{field}' is missing")]
    MissingField { field: &'static str },

    #[error("Invalid FlatBuffers payload: {details}")]
    InvalidFlatbuffer { details: String },
}

/// Persistence failures in the telemetry store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Invalid telemetry timestamp '{timestamp}'")]
    InvalidTimestamp { timestamp: String },

    #[error("Stored timestamp {millis} is out of range")]
    CorruptTimestamp { millis: i64 },

    #[error("Failed to encode telemetry: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("Store task failed: {details}")]
    Task { details: String },
}

/// Rejected aggregation query parameters
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Average range must be positive")]
    NonPositiveBucket { bucket_width_ms: i64 },

    #[error("Start time cannot be after end time")]
    StartAfterEnd,
}

pub type Result<T> = std::result::Result<T, ZonewatchError>;
