use super::*;
use crate::config::{RetentionConfig, ZonewatchConfig};
use crate::error::StoreError;
use crate::inference::{BoundingBox, Detection, ParsedInference};
use chrono::{Duration, TimeZone, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn at(seconds: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 10, 22, 12, 0, 0).unwrap() + Duration::seconds(seconds)
}

fn record(device_id: &str, timestamp: DateTime<Utc>, size_kb: f64, count: i64) -> TelemetryRecord {
    TelemetryRecord {
        device_id: device_id.to_string(),
        timestamp,
        size_kb,
        telemetry_repr: format!("{}@{}", device_id, timestamp.timestamp()),
        object_count: count,
        object_count_in_zone: count / 2,
        created_at: Utc::now(),
    }
}

fn detection(zone_flag: bool) -> Detection {
    Detection {
        class_id: 1,
        score: 0.5,
        zone_flag,
        bounding_box: Some(BoundingBox {
            left: 0.0,
            top: 0.0,
            right: 1.0,
            bottom: 1.0,
        }),
    }
}

#[test]
fn test_record_from_inference() {
    let inference = ParsedInference::new(vec![detection(true), detection(false)]);
    let image = "a".repeat(2048);

    let record =
        TelemetryRecord::from_inference("cam-1", "20241022145443870", Some(&image), &inference)
            .unwrap();

    assert_eq!(record.device_id, "cam-1");
    assert_eq!(
        record.timestamp,
        Utc.with_ymd_and_hms(2024, 10, 22, 14, 54, 43).unwrap() + Duration::milliseconds(870)
    );
    assert_eq!(record.object_count, 2);
    assert_eq!(record.object_count_in_zone, 1);
    assert_eq!(record.telemetry_repr, inference.to_repr().unwrap());

    let expected = 2.0 + record.telemetry_repr.len() as f64 / 1024.0;
    assert!((record.size_kb - expected).abs() < 1e-9);
}

#[test]
fn test_record_without_image_counts_only_inference() {
    let inference = ParsedInference::empty();
    let record =
        TelemetryRecord::from_inference("cam-1", "20241022145443870", None, &inference).unwrap();

    assert!((record.size_kb - record.telemetry_repr.len() as f64 / 1024.0).abs() < 1e-9);
}

#[test]
fn test_record_rejects_non_numeric_timestamp() {
    let result = TelemetryRecord::from_inference(
        "cam-1",
        "2024-10-22T14:54:43",
        None,
        &ParsedInference::empty(),
    );

    assert!(matches!(result, Err(StoreError::InvalidTimestamp { .. })));
}

#[test]
fn test_insert_and_latest_round_trip() {
    let store = SqliteTelemetryStore::open_in_memory().unwrap();
    let older = record("cam-1", at(0), 1.5, 4);
    let newer = record("cam-1", at(5) + Duration::milliseconds(123), 2.5, 7);

    store.insert(&newer).unwrap();
    store.insert(&older).unwrap();
    store.insert(&record("cam-2", at(60), 1.0, 1)).unwrap();

    let latest = store.latest("cam-1").unwrap().unwrap();
    assert_eq!(latest.timestamp, newer.timestamp);
    assert_eq!(latest.object_count, 7);
    assert_eq!(latest.object_count_in_zone, 3);
    assert_eq!(latest.telemetry_repr, newer.telemetry_repr);
    assert_eq!(
        latest.created_at.timestamp_millis(),
        newer.created_at.timestamp_millis()
    );

    assert!(store.latest("unknown").unwrap().is_none());
}

#[test]
fn test_timestamp_bounds_are_scoped() {
    let store = SqliteTelemetryStore::open_in_memory().unwrap();
    assert!(store.oldest_timestamp(None).unwrap().is_none());
    assert!(store.newest_timestamp(Some("cam-1")).unwrap().is_none());

    store.insert(&record("cam-1", at(10), 1.0, 1)).unwrap();
    store.insert(&record("cam-1", at(20), 1.0, 1)).unwrap();
    store.insert(&record("cam-2", at(5), 1.0, 1)).unwrap();
    store.insert(&record("cam-2", at(30), 1.0, 1)).unwrap();

    assert_eq!(store.oldest_timestamp(None).unwrap(), Some(at(5)));
    assert_eq!(store.newest_timestamp(None).unwrap(), Some(at(30)));
    assert_eq!(store.oldest_timestamp(Some("cam-1")).unwrap(), Some(at(10)));
    assert_eq!(store.newest_timestamp(Some("cam-1")).unwrap(), Some(at(20)));
}

#[test]
fn test_interval_stats_groups_by_device() {
    let store = SqliteTelemetryStore::open_in_memory().unwrap();
    store.insert(&record("cam-b", at(1), 2.0, 2)).unwrap();
    store.insert(&record("cam-a", at(2), 1.0, 4)).unwrap();
    store.insert(&record("cam-b", at(3), 4.0, 6)).unwrap();
    // Right-open: excluded
    store.insert(&record("cam-a", at(10), 100.0, 100)).unwrap();

    let stats = store.interval_stats(None, at(0), at(10)).unwrap();

    assert_eq!(stats.len(), 2);
    assert_eq!(stats[0].device_id, "cam-b");
    assert_eq!(stats[0].record_count, 2);
    assert_eq!(stats[0].size_sum_kb, 6.0);
    assert_eq!(stats[0].size_avg_kb, 3.0);
    assert_eq!(stats[0].object_count_avg, Some(4.0));
    assert_eq!(stats[0].object_count_in_zone_avg, Some(2.0));
    assert_eq!(stats[1].device_id, "cam-a");
    assert_eq!(stats[1].record_count, 1);

    let scoped = store.interval_stats(Some("cam-a"), at(0), at(11)).unwrap();
    assert_eq!(scoped.len(), 1);
    assert_eq!(scoped[0].record_count, 2);

    assert!(store.interval_stats(None, at(20), at(30)).unwrap().is_empty());
}

#[test]
fn test_telemetry_reprs_in_time_order() {
    let store = SqliteTelemetryStore::open_in_memory().unwrap();
    store.insert(&record("cam-1", at(3), 1.0, 1)).unwrap();
    store.insert(&record("cam-1", at(1), 1.0, 1)).unwrap();
    store.insert(&record("cam-2", at(2), 1.0, 1)).unwrap();

    let reprs = store.telemetry_reprs("cam-1", at(0), at(5)).unwrap();

    assert_eq!(
        reprs,
        vec![
            format!("cam-1@{}", at(1).timestamp()),
            format!("cam-1@{}", at(3).timestamp()),
        ]
    );
}

#[test]
fn test_delete_created_before() {
    let store = SqliteTelemetryStore::open_in_memory().unwrap();
    let mut stale = record("cam-1", at(0), 1.0, 1);
    stale.created_at = Utc::now() - Duration::hours(2);
    store.insert(&stale).unwrap();
    store.insert(&record("cam-1", at(1), 1.0, 1)).unwrap();

    let deleted = store
        .delete_created_before(Utc::now() - Duration::hours(1))
        .unwrap();

    assert_eq!(deleted, 1);
    assert_eq!(store.oldest_timestamp(None).unwrap(), Some(at(1)));
}

#[test]
fn test_file_store_persists_across_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("telemetry.db");

    {
        let store = SqliteTelemetryStore::open(&path).unwrap();
        store.insert(&record("cam-1", at(0), 1.0, 3)).unwrap();
        assert!(store.storage_size_bytes().unwrap() > 0);
    }

    let reopened = SqliteTelemetryStore::open(&path).unwrap();
    assert_eq!(reopened.latest("cam-1").unwrap().unwrap().object_count, 3);
}

#[tokio::test]
async fn test_retention_sweep_removes_expired_records() {
    let store = Arc::new(SqliteTelemetryStore::open_in_memory().unwrap());
    let mut stale = record("cam-1", at(0), 1.0, 1);
    stale.created_at = Utc::now() - Duration::minutes(90);
    store.insert(&stale).unwrap();
    store.insert(&record("cam-1", at(1), 1.0, 1)).unwrap();

    let task = RetentionTask::new(store.clone(), ZonewatchConfig::default().retention);
    let deleted = task.sweep_once().await.unwrap();

    assert_eq!(deleted, 1);
    assert_eq!(store.oldest_timestamp(None).unwrap(), Some(at(1)));
}

#[tokio::test]
async fn test_retention_loop_stops_on_cancel() {
    let store = Arc::new(SqliteTelemetryStore::open_in_memory().unwrap());
    let config = RetentionConfig {
        sweep_interval_seconds: 1,
        horizon_seconds: 3600,
    };
    let cancel = CancellationToken::new();

    let handle = RetentionTask::new(store, config).spawn(cancel.clone());
    cancel.cancel();

    tokio::time::timeout(std::time::Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();
}

/// SQLite store whose first retention delete fails
struct FlakySweepStore {
    inner: SqliteTelemetryStore,
    sweeps: AtomicUsize,
}

impl FlakySweepStore {
    fn new() -> Self {
        Self {
            inner: SqliteTelemetryStore::open_in_memory().unwrap(),
            sweeps: AtomicUsize::new(0),
        }
    }

    fn sweeps(&self) -> usize {
        self.sweeps.load(Ordering::SeqCst)
    }
}

impl TelemetryStore for FlakySweepStore {
    fn insert(&self, record: &TelemetryRecord) -> Result<(), StoreError> {
        self.inner.insert(record)
    }

    fn oldest_timestamp(
        &self,
        device_id: Option<&str>,
    ) -> Result<Option<DateTime<Utc>>, StoreError> {
        self.inner.oldest_timestamp(device_id)
    }

    fn newest_timestamp(
        &self,
        device_id: Option<&str>,
    ) -> Result<Option<DateTime<Utc>>, StoreError> {
        self.inner.newest_timestamp(device_id)
    }

    fn interval_stats(
        &self,
        device_id: Option<&str>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<IntervalStats>, StoreError> {
        self.inner.interval_stats(device_id, start, end)
    }

    fn telemetry_reprs(
        &self,
        device_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<String>, StoreError> {
        self.inner.telemetry_reprs(device_id, start, end)
    }

    fn latest(&self, device_id: &str) -> Result<Option<TelemetryRecord>, StoreError> {
        self.inner.latest(device_id)
    }

    fn delete_created_before(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError> {
        if self.sweeps.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err(StoreError::Task {
                details: "database is locked".to_string(),
            });
        }
        self.inner.delete_created_before(cutoff)
    }

    fn storage_size_bytes(&self) -> Result<u64, StoreError> {
        self.inner.storage_size_bytes()
    }
}

#[tokio::test(start_paused = true)]
async fn test_retention_keeps_sweeping_after_a_failed_sweep() {
    let store = Arc::new(FlakySweepStore::new());
    let mut stale = record("cam-1", at(0), 1.0, 1);
    stale.created_at = Utc::now() - Duration::hours(2);
    store.insert(&stale).unwrap();

    let config = RetentionConfig {
        sweep_interval_seconds: 1,
        horizon_seconds: 3600,
    };
    let cancel = CancellationToken::new();
    let handle = RetentionTask::new(store.clone(), config).spawn(cancel.clone());

    tokio::time::sleep(std::time::Duration::from_millis(1500)).await;
    assert_eq!(store.sweeps(), 1);
    assert!(store.latest("cam-1").unwrap().is_some());

    tokio::time::sleep(std::time::Duration::from_secs(1)).await;
    assert_eq!(store.sweeps(), 2);
    assert!(store.latest("cam-1").unwrap().is_none());

    cancel.cancel();
    handle.await.unwrap();
}
