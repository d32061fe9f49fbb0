use crate::config::default_bucket_width_ms;
use crate::error::ValidationError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Time-windowed aggregation request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationQuery {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub bucket_width_ms: i64,
}

impl AggregationQuery {
    /// Create a new query over all retained history
    pub fn new(bucket_width_ms: i64) -> Self {
        Self {
            start: None,
            end: None,
            bucket_width_ms,
        }
    }

    pub fn with_start(mut self, start: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self
    }

    pub fn with_end(mut self, end: DateTime<Utc>) -> Self {
        self.end = Some(end);
        self
    }

    /// Reject a non-positive bucket width or an inverted range
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.bucket_width_ms <= 0 {
            return Err(ValidationError::NonPositiveBucket {
                bucket_width_ms: self.bucket_width_ms,
            });
        }

        if let (Some(start), Some(end)) = (self.start, self.end) {
            if start > end {
                return Err(ValidationError::StartAfterEnd);
            }
        }

        Ok(())
    }

    pub fn bucket_width(&self) -> Duration {
        Duration::milliseconds(self.bucket_width_ms)
    }

    pub fn bucket_seconds(&self) -> f64 {
        self.bucket_width_ms as f64 / 1000.0
    }

    /// Clamp the requested range to the stored history `[oldest, newest]`.
    ///
    /// The start is raised to `oldest`; a missing end becomes `newest`.
    /// Returns `None` when the resolved range is inverted.
    pub fn resolve(&self, oldest: DateTime<Utc>, newest: DateTime<Utc>) -> Option<TimeRange> {
        let start = self.start.map_or(oldest, |start| start.max(oldest));
        let end = self.end.unwrap_or(newest);

        (end >= start).then_some(TimeRange { start, end })
    }
}

impl Default for AggregationQuery {
    fn default() -> Self {
        Self::new(default_bucket_width_ms())
    }
}

/// How the last bucket is handled when it would extend past the range end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrailingBucket {
    /// Stop once the next full bucket would end after the range end
    Drop,
    /// Keep a final bucket starting before the range end, at full width
    Partial,
}

/// Resolved query range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// Consecutive left-closed/right-open buckets from the range start
    pub fn buckets(&self, width: Duration, trailing: TrailingBucket) -> Buckets {
        Buckets {
            next: Some(self.start),
            end: self.end,
            width,
            trailing,
        }
    }
}

/// One `[start, end)` interval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bucket {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Buckets {
    next: Option<DateTime<Utc>>,
    end: DateTime<Utc>,
    width: Duration,
    trailing: TrailingBucket,
}

impl Iterator for Buckets {
    type Item = Bucket;

    fn next(&mut self) -> Option<Bucket> {
        let start = self.next?;
        let end = start.checked_add_signed(self.width)?;

        let fits = match self.trailing {
            TrailingBucket::Drop => end <= self.end,
            TrailingBucket::Partial => start < self.end,
        };
        if !fits {
            self.next = None;
            return None;
        }

        self.next = Some(end);
        Some(Bucket { start, end })
    }
}
