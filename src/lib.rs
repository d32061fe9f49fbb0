pub mod aggregation;
pub mod app;
pub mod client;
pub mod collector;
pub mod config;
pub mod error;
pub mod inference;
pub mod pipeline;
pub mod store;
pub mod stream;
pub mod timestamp;

#[cfg(test)]
pub(crate) mod test_support;

pub use aggregation::{AggregationEngine, AggregationQuery};
pub use app::{ComponentState, ShutdownReason, ShutdownRequester, ZonewatchService};
pub use client::{BoundClient, ClientFactory, ClientKind, DeviceClient, RawFrame, ReplayClient};
pub use collector::{CollectorState, DeviceCollector, EventQueue, StreamEvent};
pub use config::ZonewatchConfig;
pub use error::{ClientError, DecodeError, Result, StoreError, ValidationError, ZonewatchError};
pub use inference::{decode, decode_lenient, InferenceFormat, ParsedInference};
pub use pipeline::PipelineOrchestrator;
pub use store::{RetentionTask, SqliteTelemetryStore, TelemetryRecord, TelemetryStore};
pub use stream::{JsonLinesSink, StreamForwarder, StreamMessage, StreamSink};
