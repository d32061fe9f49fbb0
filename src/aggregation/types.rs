use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-bucket value, stamped with the bucket start
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateSample {
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceTelemetryRates {
    pub device_id: String,
    pub telemetry_rates: Vec<RateSample>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverallTelemetryRates {
    pub grouped_telemetry_rates: Vec<DeviceTelemetryRates>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceDataRates {
    pub device_id: String,
    pub data_rates: Vec<RateSample>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverallDataRates {
    pub grouped_data_rates: Vec<DeviceDataRates>,
}

/// Average object counts over one bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectCountSample {
    pub object_count: f64,
    pub object_count_in_zone: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectCounts {
    pub object_counts: Vec<ObjectCountSample>,
}

/// Object counts of a device's newest record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastObjectCount {
    pub object_count: i64,
    pub object_count_in_zone: i64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    /// Stored telemetry strings of the bucket, joined with ", "
    pub telemetry_str: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Telemetries {
    pub telemetries: Vec<TelemetrySample>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseInfo {
    pub oldest_timestamp: Option<DateTime<Utc>>,
    /// KB
    pub storage_size: f64,
}
