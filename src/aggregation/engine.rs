use super::query::{AggregationQuery, Bucket, TimeRange, TrailingBucket};
use super::types::{
    DatabaseInfo, DeviceDataRates, DeviceTelemetryRates, LastObjectCount, ObjectCountSample,
    ObjectCounts, OverallDataRates, OverallTelemetryRates, RateSample, Telemetries,
    TelemetrySample,
};
use crate::error::Result;
use crate::store::TelemetryStore;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Computes bucketed rates and counts over the telemetry store
#[derive(Clone)]
pub struct AggregationEngine {
    store: Arc<dyn TelemetryStore>,
}

/// Per-device sample lists in order of each device's first appearance
#[derive(Default)]
struct DeviceSeries {
    order: Vec<String>,
    samples: HashMap<String, Vec<RateSample>>,
}

impl DeviceSeries {
    fn push(&mut self, device_id: &str, sample: RateSample) {
        if !self.samples.contains_key(device_id) {
            self.order.push(device_id.to_string());
        }
        self.samples
            .entry(device_id.to_string())
            .or_default()
            .push(sample);
    }

    fn into_ordered(mut self) -> Vec<(String, Vec<RateSample>)> {
        self.order
            .into_iter()
            .map(|device_id| {
                let samples = self.samples.remove(&device_id).unwrap_or_default();
                (device_id, samples)
            })
            .collect()
    }
}

impl AggregationEngine {
    /// Create a new engine reading from `store`
    pub fn new(store: Arc<dyn TelemetryStore>) -> Self {
        Self { store }
    }

    /// Validate, then clamp the query to the stored history of the scope.
    /// `None` means there is nothing to aggregate.
    fn resolve(
        &self,
        device_id: Option<&str>,
        query: &AggregationQuery,
    ) -> Result<Option<TimeRange>> {
        if let Err(e) = query.validate() {
            warn!("Rejected aggregation query {:?}: {}", query, e);
            return Err(e.into());
        }

        let Some(oldest) = self.store.oldest_timestamp(device_id)? else {
            debug!("No telemetry stored for scope {:?}", device_id);
            return Ok(None);
        };
        let Some(newest) = self.store.newest_timestamp(device_id)? else {
            return Ok(None);
        };

        let range = query.resolve(oldest, newest);
        if range.is_none() {
            debug!("No valid time range found for scope {:?}", device_id);
        }
        Ok(range)
    }

    fn buckets(
        &self,
        device_id: Option<&str>,
        query: &AggregationQuery,
        trailing: TrailingBucket,
    ) -> Result<Vec<Bucket>> {
        Ok(self
            .resolve(device_id, query)?
            .map(|range| range.buckets(query.bucket_width(), trailing).collect())
            .unwrap_or_default())
    }

    /// Records per second for every device, per bucket.
    ///
    /// A device only gets a sample for buckets in which it has records.
    pub fn telemetry_rates(&self, query: &AggregationQuery) -> Result<OverallTelemetryRates> {
        debug!("Computing telemetry rates for all devices");
        let seconds = query.bucket_seconds();
        let mut series = DeviceSeries::default();

        for bucket in self.buckets(None, query, TrailingBucket::Drop)? {
            for stats in self.store.interval_stats(None, bucket.start, bucket.end)? {
                series.push(
                    &stats.device_id,
                    RateSample {
                        value: stats.record_count as f64 / seconds,
                        timestamp: bucket.start,
                    },
                );
            }
        }

        Ok(OverallTelemetryRates {
            grouped_telemetry_rates: series
                .into_ordered()
                .into_iter()
                .map(|(device_id, telemetry_rates)| DeviceTelemetryRates {
                    device_id,
                    telemetry_rates,
                })
                .collect(),
        })
    }

    /// Records per second of one device; empty buckets report zero
    pub fn device_telemetry_rates(
        &self,
        device_id: &str,
        query: &AggregationQuery,
    ) -> Result<DeviceTelemetryRates> {
        debug!("Computing telemetry rates for device {}", device_id);
        let seconds = query.bucket_seconds();
        let mut telemetry_rates = Vec::new();

        for bucket in self.buckets(Some(device_id), query, TrailingBucket::Drop)? {
            let count = self
                .store
                .interval_stats(Some(device_id), bucket.start, bucket.end)?
                .first()
                .map_or(0, |stats| stats.record_count);

            telemetry_rates.push(RateSample {
                value: count as f64 / seconds,
                timestamp: bucket.start,
            });
        }

        Ok(DeviceTelemetryRates {
            device_id: device_id.to_string(),
            telemetry_rates,
        })
    }

    /// KB per second for every device. The last bucket may run past the range end.
    pub fn data_rates(&self, query: &AggregationQuery) -> Result<OverallDataRates> {
        debug!("Computing data rates for all devices");
        let seconds = query.bucket_seconds();
        let mut series = DeviceSeries::default();

        for bucket in self.buckets(None, query, TrailingBucket::Partial)? {
            for stats in self.store.interval_stats(None, bucket.start, bucket.end)? {
                series.push(
                    &stats.device_id,
                    RateSample {
                        value: stats.size_sum_kb / seconds,
                        timestamp: bucket.start,
                    },
                );
            }
        }

        Ok(OverallDataRates {
            grouped_data_rates: series
                .into_ordered()
                .into_iter()
                .map(|(device_id, data_rates)| DeviceDataRates {
                    device_id,
                    data_rates,
                })
                .collect(),
        })
    }

    /// Average record size (KB) of one device per bucket, zero when empty.
    ///
    /// Unlike [`AggregationEngine::data_rates`] this is not divided by the
    /// bucket length.
    pub fn device_data_rates(
        &self,
        device_id: &str,
        query: &AggregationQuery,
    ) -> Result<DeviceDataRates> {
        debug!("Computing data rates for device {}", device_id);
        let mut data_rates = Vec::new();

        for bucket in self.buckets(Some(device_id), query, TrailingBucket::Partial)? {
            let average = self
                .store
                .interval_stats(Some(device_id), bucket.start, bucket.end)?
                .first()
                .map_or(0.0, |stats| stats.size_avg_kb);

            data_rates.push(RateSample {
                value: average,
                timestamp: bucket.start,
            });
        }

        Ok(DeviceDataRates {
            device_id: device_id.to_string(),
            data_rates,
        })
    }

    /// Average object counts of one device; buckets without records are omitted
    pub fn object_counts(&self, device_id: &str, query: &AggregationQuery) -> Result<ObjectCounts> {
        debug!("Computing object counts for device {}", device_id);
        let mut object_counts = Vec::new();

        for bucket in self.buckets(Some(device_id), query, TrailingBucket::Drop)? {
            let stats = self
                .store
                .interval_stats(Some(device_id), bucket.start, bucket.end)?;
            let Some(stats) = stats.first() else {
                continue;
            };

            if stats.object_count_avg.is_none() && stats.object_count_in_zone_avg.is_none() {
                continue;
            }
            object_counts.push(ObjectCountSample {
                object_count: stats.object_count_avg.unwrap_or(0.0),
                object_count_in_zone: stats.object_count_in_zone_avg.unwrap_or(0.0),
                timestamp: bucket.start,
            });
        }

        Ok(ObjectCounts { object_counts })
    }

    /// Object counts of the newest record of a device
    pub fn last_object_count(&self, device_id: &str) -> Result<Option<LastObjectCount>> {
        debug!("Fetching last object count for device {}", device_id);
        let latest = self.store.latest(device_id)?;

        Ok(latest.map(|record| LastObjectCount {
            object_count: record.object_count,
            object_count_in_zone: record.object_count_in_zone,
            timestamp: record.timestamp,
        }))
    }

    /// Stored telemetry strings of one device, joined per bucket
    pub fn telemetries(&self, device_id: &str, query: &AggregationQuery) -> Result<Telemetries> {
        debug!("Retrieving telemetries for device {}", device_id);
        let mut telemetries = Vec::new();

        for bucket in self.buckets(Some(device_id), query, TrailingBucket::Drop)? {
            let reprs = self
                .store
                .telemetry_reprs(device_id, bucket.start, bucket.end)?;
            telemetries.push(TelemetrySample {
                telemetry_str: reprs.join(", "),
                timestamp: bucket.start,
            });
        }

        Ok(Telemetries { telemetries })
    }

    /// Oldest stored timestamp and storage footprint
    pub fn database_info(&self) -> Result<DatabaseInfo> {
        let oldest_timestamp = self.store.oldest_timestamp(None)?;

        let storage_size = match oldest_timestamp {
            Some(_) => self.store.storage_size_bytes()? as f64 / 1024.0,
            None => {
                warn!("No telemetry data found in the database");
                0.0
            }
        };

        Ok(DatabaseInfo {
            oldest_timestamp,
            storage_size,
        })
    }
}
