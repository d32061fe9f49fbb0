//! Shared fixtures for unit tests.

use crate::client::{BoundClient, ClientFactory, DeviceClient, RawFrame};
use crate::error::{ClientError, StoreError};
use crate::inference::InferenceFormat;
use crate::store::{IntervalStats, TelemetryRecord, TelemetryStore};
use crate::stream::{StreamMessage, StreamSink};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use flatbuffers::FlatBufferBuilder;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Encode one object per entry of `zone_flags`, each with a 2-D box
pub(crate) fn encode_inference(zone_flags: &[bool]) -> String {
    let mut builder = FlatBufferBuilder::new();

    let mut objects = Vec::with_capacity(zone_flags.len());
    for (index, zone_flag) in zone_flags.iter().enumerate() {
        let start = builder.start_table();
        builder.push_slot::<i32>(4, index as i32, 0);
        builder.push_slot::<i32>(6, 10, 0);
        builder.push_slot::<i32>(8, 20 + index as i32, 0);
        builder.push_slot::<i32>(10, 30, 0);
        let bounding_box = builder.end_table(start);

        let start = builder.start_table();
        builder.push_slot::<u32>(4, index as u32 + 1, 0);
        builder.push_slot::<u8>(6, 1, 0);
        builder.push_slot_always(8, bounding_box);
        builder.push_slot::<f32>(10, 0.5, 0.0);
        builder.push_slot::<bool>(12, *zone_flag, false);
        objects.push(builder.end_table(start));
    }
    let list = builder.create_vector(&objects);

    let start = builder.start_table();
    builder.push_slot_always(4, list);
    let perception = builder.end_table(start);

    let start = builder.start_table();
    builder.push_slot_always(4, perception);
    let top = builder.end_table(start);

    builder.finish(top, None);
    STANDARD.encode(builder.finished_data())
}

pub(crate) fn frame(timestamp: &str, content: &str) -> RawFrame {
    RawFrame {
        timestamp: timestamp.to_string(),
        content: content.to_string(),
    }
}

pub(crate) enum ScriptStep {
    Frame(Option<String>, RawFrame),
    Fail,
}

/// Device client replaying a fixed script, then repeating its last frame
pub(crate) struct ScriptedClient {
    steps: Mutex<VecDeque<ScriptStep>>,
    last: Mutex<Option<(Option<String>, RawFrame)>>,
    latency: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedClient {
    pub(crate) fn new(steps: Vec<ScriptStep>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            last: Mutex::new(None),
            latency: Duration::from_millis(2),
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub(crate) fn frames(frames: Vec<RawFrame>) -> Self {
        Self::new(
            frames
                .into_iter()
                .map(|frame| ScriptStep::Frame(Some("aW1hZ2U=".to_string()), frame))
                .collect(),
        )
    }

    pub(crate) fn bind(self: &Arc<Self>, format: InferenceFormat) -> BoundClient {
        BoundClient::new(Arc::clone(self) as Arc<dyn DeviceClient>, format)
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DeviceClient for ScriptedClient {
    async fn get_latest_data(
        &self,
        device_id: &str,
        want_image: bool,
    ) -> Result<(Option<String>, RawFrame), ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(in_flight, Ordering::SeqCst);

        tokio::time::sleep(self.latency).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let step = self.steps.lock().pop_front();
        let (image, frame) = match step {
            Some(ScriptStep::Frame(image, frame)) => {
                *self.last.lock() = Some((image.clone(), frame.clone()));
                (image, frame)
            }
            Some(ScriptStep::Fail) => {
                return Err(ClientError::Transport {
                    device_id: device_id.to_string(),
                    details: "scripted failure".to_string(),
                })
            }
            None => self
                .last
                .lock()
                .clone()
                .unwrap_or_else(|| (None, frame("", ""))),
        };

        Ok((if want_image { image } else { None }, frame))
    }

    fn client_name(&self) -> &str {
        "scripted"
    }
}

/// Factory handing out one scripted client, or failing when it has none
pub(crate) struct FixedClientFactory {
    client: Option<Arc<ScriptedClient>>,
    format: InferenceFormat,
}

impl FixedClientFactory {
    pub(crate) fn new(client: Arc<ScriptedClient>, format: InferenceFormat) -> Self {
        Self {
            client: Some(client),
            format,
        }
    }

    pub(crate) fn unavailable() -> Self {
        Self {
            client: None,
            format: InferenceFormat::ZoneDetection,
        }
    }
}

impl ClientFactory for FixedClientFactory {
    fn create(&self) -> Result<BoundClient, ClientError> {
        self.client
            .as_ref()
            .map(|client| client.bind(self.format))
            .ok_or_else(|| ClientError::Initialization {
                details: "device service unreachable".to_string(),
            })
    }
}

/// Sink keeping every message in memory
#[derive(Default)]
pub(crate) struct CollectingSink {
    pub(crate) messages: Mutex<Vec<StreamMessage>>,
}

impl CollectingSink {
    pub(crate) fn len(&self) -> usize {
        self.messages.lock().len()
    }
}

#[async_trait]
impl StreamSink for CollectingSink {
    async fn send(&self, message: StreamMessage) -> crate::error::Result<()> {
        self.messages.lock().push(message);
        Ok(())
    }

    fn sink_name(&self) -> &str {
        "collecting"
    }
}

/// Store whose writes always fail
pub(crate) struct FailingStore;

impl TelemetryStore for FailingStore {
    fn insert(&self, _record: &TelemetryRecord) -> Result<(), StoreError> {
        Err(StoreError::Task {
            details: "insert rejected".to_string(),
        })
    }

    fn oldest_timestamp(&self, _: Option<&str>) -> Result<Option<DateTime<Utc>>, StoreError> {
        Ok(None)
    }

    fn newest_timestamp(&self, _: Option<&str>) -> Result<Option<DateTime<Utc>>, StoreError> {
        Ok(None)
    }

    fn interval_stats(
        &self,
        _: Option<&str>,
        _: DateTime<Utc>,
        _: DateTime<Utc>,
    ) -> Result<Vec<IntervalStats>, StoreError> {
        Ok(Vec::new())
    }

    fn telemetry_reprs(
        &self,
        _: &str,
        _: DateTime<Utc>,
        _: DateTime<Utc>,
    ) -> Result<Vec<String>, StoreError> {
        Ok(Vec::new())
    }

    fn latest(&self, _: &str) -> Result<Option<TelemetryRecord>, StoreError> {
        Ok(None)
    }

    fn delete_created_before(&self, _: DateTime<Utc>) -> Result<usize, StoreError> {
        Ok(0)
    }

    fn storage_size_bytes(&self) -> Result<u64, StoreError> {
        Ok(0)
    }
}

/// Store counting every call, so tests can assert it was never touched
#[derive(Default)]
pub(crate) struct CountingStore {
    pub(crate) calls: AtomicUsize,
}

impl CountingStore {
    fn touch(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

impl TelemetryStore for CountingStore {
    fn insert(&self, _record: &TelemetryRecord) -> Result<(), StoreError> {
        self.touch();
        Ok(())
    }

    fn oldest_timestamp(&self, _: Option<&str>) -> Result<Option<DateTime<Utc>>, StoreError> {
        self.touch();
        Ok(None)
    }

    fn newest_timestamp(&self, _: Option<&str>) -> Result<Option<DateTime<Utc>>, StoreError> {
        self.touch();
        Ok(None)
    }

    fn interval_stats(
        &self,
        _: Option<&str>,
        _: DateTime<Utc>,
        _: DateTime<Utc>,
    ) -> Result<Vec<IntervalStats>, StoreError> {
        self.touch();
        Ok(Vec::new())
    }

    fn telemetry_reprs(
        &self,
        _: &str,
        _: DateTime<Utc>,
        _: DateTime<Utc>,
    ) -> Result<Vec<String>, StoreError> {
        self.touch();
        Ok(Vec::new())
    }

    fn latest(&self, _: &str) -> Result<Option<TelemetryRecord>, StoreError> {
        self.touch();
        Ok(None)
    }

    fn delete_created_before(&self, _: DateTime<Utc>) -> Result<usize, StoreError> {
        self.touch();
        Ok(0)
    }

    fn storage_size_bytes(&self) -> Result<u64, StoreError> {
        self.touch();
        Ok(0)
    }
}

/// Poll `condition` until it holds or a generous deadline passes
pub(crate) async fn wait_until<F: Fn() -> bool>(condition: F) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
