use super::{IntervalStats, TelemetryRecord, TelemetryStore};
use crate::error::StoreError;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use tracing::{debug, info};

/// SQLite-backed telemetry store.
///
/// Timestamps are stored as UTC epoch milliseconds.
pub struct SqliteTelemetryStore {
    conn: Mutex<Connection>,
}

impl SqliteTelemetryStore {
    /// Open (creating if needed) the database file at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        info!("Opening telemetry store at {}", path.as_ref().display());
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.ensure_schema()?;
        Ok(store)
    }

    fn ensure_schema(&self) -> Result<(), StoreError> {
        self.conn.lock().execute_batch(
            r#"
            PRAGMA journal_mode=WAL;

            CREATE TABLE IF NOT EXISTS telemetry (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              device_id TEXT NOT NULL,
              timestamp_ms INTEGER NOT NULL,
              size_kb REAL NOT NULL,
              telemetry_repr TEXT NOT NULL,
              object_count INTEGER NOT NULL,
              object_count_in_zone INTEGER NOT NULL,
              created_at_ms INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_telemetry_timestamp ON telemetry(timestamp_ms);
            CREATE INDEX IF NOT EXISTS idx_telemetry_device ON telemetry(device_id, timestamp_ms);
            CREATE INDEX IF NOT EXISTS idx_telemetry_created ON telemetry(created_at_ms);
            "#,
        )?;
        Ok(())
    }

    fn timestamp_bound(
        &self,
        aggregate: &str,
        device_id: Option<&str>,
    ) -> Result<Option<DateTime<Utc>>, StoreError> {
        let sql = format!(
            "SELECT {}(timestamp_ms) FROM telemetry WHERE (?1 IS NULL OR device_id = ?1)",
            aggregate
        );
        let millis: Option<i64> = self
            .conn
            .lock()
            .query_row(&sql, params![device_id], |row| row.get(0))?;

        millis.map(from_millis).transpose()
    }
}

fn from_millis(millis: i64) -> Result<DateTime<Utc>, StoreError> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or(StoreError::CorruptTimestamp { millis })
}

/// Row as stored, before timestamps are converted back
struct StoredRecord {
    device_id: String,
    timestamp_ms: i64,
    size_kb: f64,
    telemetry_repr: String,
    object_count: i64,
    object_count_in_zone: i64,
    created_at_ms: i64,
}

impl StoredRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            device_id: row.get(0)?,
            timestamp_ms: row.get(1)?,
            size_kb: row.get(2)?,
            telemetry_repr: row.get(3)?,
            object_count: row.get(4)?,
            object_count_in_zone: row.get(5)?,
            created_at_ms: row.get(6)?,
        })
    }

    fn into_record(self) -> Result<TelemetryRecord, StoreError> {
        Ok(TelemetryRecord {
            device_id: self.device_id,
            timestamp: from_millis(self.timestamp_ms)?,
            size_kb: self.size_kb,
            telemetry_repr: self.telemetry_repr,
            object_count: self.object_count,
            object_count_in_zone: self.object_count_in_zone,
            created_at: from_millis(self.created_at_ms)?,
        })
    }
}

impl TelemetryStore for SqliteTelemetryStore {
    fn insert(&self, record: &TelemetryRecord) -> Result<(), StoreError> {
        self.conn.lock().execute(
            "INSERT INTO telemetry (device_id, timestamp_ms, size_kb, telemetry_repr, \
             object_count, object_count_in_zone, created_at_ms) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.device_id,
                record.timestamp.timestamp_millis(),
                record.size_kb,
                record.telemetry_repr,
                record.object_count,
                record.object_count_in_zone,
                record.created_at.timestamp_millis(),
            ],
        )?;
        Ok(())
    }

    fn oldest_timestamp(
        &self,
        device_id: Option<&str>,
    ) -> Result<Option<DateTime<Utc>>, StoreError> {
        self.timestamp_bound("MIN", device_id)
    }

    fn newest_timestamp(
        &self,
        device_id: Option<&str>,
    ) -> Result<Option<DateTime<Utc>>, StoreError> {
        self.timestamp_bound("MAX", device_id)
    }

    fn interval_stats(
        &self,
        device_id: Option<&str>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<IntervalStats>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT device_id, COUNT(*), SUM(size_kb), AVG(size_kb), \
                    AVG(object_count), AVG(object_count_in_zone) \
             FROM telemetry \
             WHERE (?1 IS NULL OR device_id = ?1) AND timestamp_ms >= ?2 AND timestamp_ms < ?3 \
             GROUP BY device_id \
             ORDER BY MIN(timestamp_ms), device_id",
        )?;

        let rows = stmt.query_map(
            params![device_id, start.timestamp_millis(), end.timestamp_millis()],
            |row| {
                let record_count: i64 = row.get(1)?;
                Ok(IntervalStats {
                    device_id: row.get(0)?,
                    record_count: record_count.max(0) as u64,
                    size_sum_kb: row.get(2)?,
                    size_avg_kb: row.get(3)?,
                    object_count_avg: row.get(4)?,
                    object_count_in_zone_avg: row.get(5)?,
                })
            },
        )?;

        let stats = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        debug!(
            "Interval stats {} - {}: {} device(s)",
            start,
            end,
            stats.len()
        );
        Ok(stats)
    }

    fn telemetry_reprs(
        &self,
        device_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<String>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT telemetry_repr FROM telemetry \
             WHERE device_id = ?1 AND timestamp_ms >= ?2 AND timestamp_ms < ?3 \
             ORDER BY timestamp_ms, id",
        )?;

        let rows = stmt.query_map(
            params![device_id, start.timestamp_millis(), end.timestamp_millis()],
            |row| row.get(0),
        )?;
        let reprs = rows.collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(reprs)
    }

    fn latest(&self, device_id: &str) -> Result<Option<TelemetryRecord>, StoreError> {
        let row = self
            .conn
            .lock()
            .query_row(
                "SELECT device_id, timestamp_ms, size_kb, telemetry_repr, object_count, \
                        object_count_in_zone, created_at_ms \
                 FROM telemetry WHERE device_id = ?1 \
                 ORDER BY timestamp_ms DESC, id DESC LIMIT 1",
                params![device_id],
                StoredRecord::from_row,
            )
            .optional()?;

        row.map(StoredRecord::into_record).transpose()
    }

    fn delete_created_before(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError> {
        let deleted = self.conn.lock().execute(
            "DELETE FROM telemetry WHERE created_at_ms < ?1",
            params![cutoff.timestamp_millis()],
        )?;
        Ok(deleted)
    }

    fn storage_size_bytes(&self) -> Result<u64, StoreError> {
        let bytes: i64 = self.conn.lock().query_row(
            "SELECT page_count * page_size FROM pragma_page_count(), pragma_page_size()",
            [],
            |row| row.get(0),
        )?;
        Ok(bytes.max(0) as u64)
    }
}
