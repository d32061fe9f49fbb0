mod record;
mod retention;
mod sqlite;

#[cfg(test)]
mod tests;

pub use record::{IntervalStats, TelemetryRecord};
pub use retention::RetentionTask;
pub use sqlite::SqliteTelemetryStore;

use crate::error::StoreError;
use chrono::{DateTime, Utc};

/// Time-indexed, append-only store of telemetry records.
///
/// Ranges are left-closed/right-open over the record timestamp. A `None`
/// device scope means "all devices".
pub trait TelemetryStore: Send + Sync {
    fn insert(&self, record: &TelemetryRecord) -> Result<(), StoreError>;

    fn oldest_timestamp(&self, device_id: Option<&str>)
        -> Result<Option<DateTime<Utc>>, StoreError>;

    fn newest_timestamp(&self, device_id: Option<&str>)
        -> Result<Option<DateTime<Utc>>, StoreError>;

    /// Per-device aggregates over `[start, end)`, devices ordered by first
    /// record in the interval. Devices without records are not listed.
    fn interval_stats(
        &self,
        device_id: Option<&str>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<IntervalStats>, StoreError>;

    /// Stored telemetry strings of one device over `[start, end)`, oldest first
    fn telemetry_reprs(
        &self,
        device_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<String>, StoreError>;

    /// Newest record of a device
    fn latest(&self, device_id: &str) -> Result<Option<TelemetryRecord>, StoreError>;

    /// Delete records created before `cutoff`, returning how many were removed
    fn delete_created_before(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError>;

    /// Bytes used by the underlying storage
    fn storage_size_bytes(&self) -> Result<u64, StoreError>;
}
