use crate::error::StoreError;
use crate::inference::ParsedInference;
use crate::timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One persisted poll result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    pub device_id: String,
    /// Device timestamp, millisecond precision
    pub timestamp: DateTime<Utc>,
    /// Image plus stringified inference, in KB
    pub size_kb: f64,
    pub telemetry_repr: String,
    pub object_count: i64,
    pub object_count_in_zone: i64,
    pub created_at: DateTime<Utc>,
}

impl TelemetryRecord {
    /// Build the record for a decoded frame.
    ///
    /// `numeric_timestamp` is the normalised `YYYYMMDDHHMMSSmmm` form; any
    /// other shape is rejected.
    pub fn from_inference(
        device_id: &str,
        numeric_timestamp: &str,
        image: Option<&str>,
        inference: &ParsedInference,
    ) -> Result<Self, StoreError> {
        let timestamp = timestamp::parse_numeric(numeric_timestamp)?;
        let telemetry_repr = inference.to_repr()?;

        let image_kb = image.map_or(0.0, |image| image.len() as f64 / 1024.0);
        let size_kb = image_kb + telemetry_repr.len() as f64 / 1024.0;

        Ok(Self {
            device_id: device_id.to_string(),
            timestamp,
            size_kb,
            telemetry_repr,
            object_count: inference.object_count() as i64,
            object_count_in_zone: inference.object_count_in_zone() as i64,
            created_at: Utc::now(),
        })
    }
}

/// Aggregates of one device over one interval
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalStats {
    pub device_id: String,
    pub record_count: u64,
    pub size_sum_kb: f64,
    pub size_avg_kb: f64,
    pub object_count_avg: Option<f64>,
    pub object_count_in_zone_avg: Option<f64>,
}
