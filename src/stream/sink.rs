use crate::collector::StreamEvent;
use crate::error::{Result, ZonewatchError};
use crate::inference::ParsedInference;
use async_trait::async_trait;
use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

/// Message delivered to the live stream consumer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamMessage {
    pub image: Option<String>,
    pub inference: ParsedInference,
    pub timestamp: String,
    #[serde(rename = "deviceId")]
    pub device_id: String,
}

impl From<StreamEvent> for StreamMessage {
    fn from(event: StreamEvent) -> Self {
        Self {
            image: event.image,
            inference: event.inference,
            timestamp: event.timestamp,
            device_id: event.device_id,
        }
    }
}

/// Destination of forwarded stream messages
#[async_trait]
pub trait StreamSink: Send + Sync {
    async fn send(&self, message: StreamMessage) -> Result<()>;

    fn sink_name(&self) -> &str;
}

/// Writes each message as one JSON line
pub struct JsonLinesSink<W> {
    writer: Mutex<W>,
}

impl<W> JsonLinesSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl JsonLinesSink<tokio::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

#[async_trait]
impl<W> StreamSink for JsonLinesSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn send(&self, message: StreamMessage) -> Result<()> {
        let mut line = serde_json::to_string(&message)
            .map_err(|e| ZonewatchError::component("stream", e.to_string()))?;
        line.push('\n');

        let mut writer = self.writer.lock().await;
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await?;
        Ok(())
    }

    fn sink_name(&self) -> &str {
        "json-lines"
    }
}
