mod engine;
mod query;
mod types;


pub use engine::AggregationEngine;
pub use query::{AggregationQuery, Bucket, TimeRange, TrailingBucket};
pub use types::{
    DatabaseInfo, DeviceDataRates, DeviceTelemetryRates, LastObjectCount, ObjectCountSample,
    ObjectCounts, OverallDataRates, OverallTelemetryRates, RateSample, Telemetries,
    TelemetrySample,
};
