use super::types::{ComponentState, ShutdownReason};
use crate::aggregation::AggregationEngine;
use crate::client::{ClientFactory, ConfiguredClientFactory};
use crate::config::ZonewatchConfig;
use crate::error::Result;
use crate::pipeline::PipelineOrchestrator;
use crate::store::{RetentionTask, SqliteTelemetryStore, TelemetryStore};
use crate::stream::{JsonLinesSink, StreamForwarder, StreamSink};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Wires the collection pipeline, retention sweep and stream forwarder together
pub struct ZonewatchService {
    pub(super) config: ZonewatchConfig,
    pub(super) store: Arc<dyn TelemetryStore>,
    pub(super) pipeline: Arc<PipelineOrchestrator>,
    pub(super) engine: AggregationEngine,
    pub(super) forwarder: Arc<StreamForwarder>,

    // Background tasks
    pub(super) retention_handle: Option<JoinHandle<()>>,
    pub(super) forwarder_handle: Option<JoinHandle<()>>,

    // Lifecycle management
    pub(super) component_states: Arc<Mutex<HashMap<String, ComponentState>>>,
    pub(super) shutdown_sender: Arc<Mutex<Option<oneshot::Sender<ShutdownReason>>>>,
    pub(super) shutdown_receiver: Option<oneshot::Receiver<ShutdownReason>>,
    pub(super) cancellation_token: CancellationToken,
}

impl ZonewatchService {
    /// Build the service from configuration: SQLite store at `store.path`,
    /// the configured device client and a JSON-lines stream on stdout
    pub fn new(config: ZonewatchConfig) -> Result<Self> {
        config.validate()?;

        info!("Opening telemetry store at {}", config.store.path);
        let store = Arc::new(SqliteTelemetryStore::open(&config.store.path)?);
        let factory = Arc::new(ConfiguredClientFactory::new(config.client.clone()));
        let sink = Arc::new(JsonLinesSink::stdout());

        Ok(Self::with_parts(config, factory, store, sink))
    }

    /// Build the service around explicit collaborators
    pub fn with_parts(
        config: ZonewatchConfig,
        factory: Arc<dyn ClientFactory>,
        store: Arc<dyn TelemetryStore>,
        sink: Arc<dyn StreamSink>,
    ) -> Self {
        let pipeline = Arc::new(PipelineOrchestrator::new(factory, Arc::clone(&store)));
        let engine = AggregationEngine::new(Arc::clone(&store));
        let forwarder = Arc::new(StreamForwarder::new(
            Arc::clone(&pipeline),
            sink,
            config.stream.poll_interval(),
        ));
        let (shutdown_sender, shutdown_receiver) = oneshot::channel();

        Self {
            config,
            store,
            pipeline,
            engine,
            forwarder,
            retention_handle: None,
            forwarder_handle: None,
            component_states: Arc::new(Mutex::new(HashMap::new())),
            shutdown_sender: Arc::new(Mutex::new(Some(shutdown_sender))),
            shutdown_receiver: Some(shutdown_receiver),
            cancellation_token: CancellationToken::new(),
        }
    }

    pub fn config(&self) -> &ZonewatchConfig {
        &self.config
    }

    pub fn pipeline(&self) -> &Arc<PipelineOrchestrator> {
        &self.pipeline
    }

    pub fn engine(&self) -> &AggregationEngine {
        &self.engine
    }

    pub fn forwarder(&self) -> &Arc<StreamForwarder> {
        &self.forwarder
    }

    pub(super) fn retention_task(&self) -> RetentionTask {
        RetentionTask::new(Arc::clone(&self.store), self.config.retention.clone())
    }
}
