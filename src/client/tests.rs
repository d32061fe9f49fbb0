use super::*;
use crate::config::ClientConfig;
use crate::inference::InferenceFormat;
use std::time::Duration;
use tempfile::TempDir;

fn write_capture(dir: &TempDir, device_id: &str, lines: &[&str]) {
    std::fs::write(
        dir.path().join(format!("{}.jsonl", device_id)),
        lines.join("\n"),
    )
    .unwrap();
}

#[test]
fn test_client_kind_selects_format() {
    assert_eq!(
        ClientKind::OnlineV1.inference_format(),
        InferenceFormat::ZoneDetection
    );
    assert_eq!(
        ClientKind::OnlineV2.inference_format(),
        InferenceFormat::ObjectDetectionExpanded
    );
    assert_eq!(ClientKind::OnlineV1.to_string(), "online-v1");
}

#[tokio::test]
async fn test_replay_serves_frames_then_repeats_last() {
    let dir = TempDir::new().unwrap();
    write_capture(
        &dir,
        "cam-1",
        &[
            r#"{"timestamp": "20240101000000000", "content": "AAAA", "image": "aW1n"}"#,
            "",
            r#"{"timestamp": "20240101000001000", "content": "BBBB"}"#,
        ],
    );

    let client = ReplayClient::new(dir.path(), Duration::ZERO).unwrap();

    let (image, frame) = client.get_latest_data("cam-1", true).await.unwrap();
    assert_eq!(image.as_deref(), Some("aW1n"));
    assert_eq!(frame.timestamp, "20240101000000000");
    assert_eq!(frame.content, "AAAA");

    let (image, frame) = client.get_latest_data("cam-1", true).await.unwrap();
    assert!(image.is_none());
    assert_eq!(frame.timestamp, "20240101000001000");

    let (_, repeated) = client.get_latest_data("cam-1", true).await.unwrap();
    assert_eq!(repeated, frame);
}

#[tokio::test]
async fn test_replay_withholds_image_when_not_requested() {
    let dir = TempDir::new().unwrap();
    write_capture(
        &dir,
        "cam-1",
        &[r#"{"timestamp": "1", "content": "AAAA", "image": "aW1n"}"#],
    );

    let client = ReplayClient::new(dir.path(), Duration::ZERO).unwrap();
    let (image, _) = client.get_latest_data("cam-1", false).await.unwrap();

    assert!(image.is_none());
}

#[tokio::test]
async fn test_replay_missing_capture_is_transport_error() {
    let dir = TempDir::new().unwrap();
    let client = ReplayClient::new(dir.path(), Duration::ZERO).unwrap();

    let result = client.get_latest_data("unknown", true).await;

    assert!(matches!(result, Err(crate::error::ClientError::Transport { .. })));
}

#[tokio::test]
async fn test_replay_malformed_line() {
    let dir = TempDir::new().unwrap();
    write_capture(&dir, "cam-1", &["{not json"]);
    let client = ReplayClient::new(dir.path(), Duration::ZERO).unwrap();

    let result = client.get_latest_data("cam-1", true).await;

    assert!(matches!(
        result,
        Err(crate::error::ClientError::MalformedFrame { .. })
    ));
}

#[test]
fn test_replay_requires_existing_directory() {
    let result = ReplayClient::new("/nonexistent/zonewatch/replay", Duration::ZERO);
    assert!(result.is_err());
}

#[test]
fn test_configured_factory_binds_format() {
    let dir = TempDir::new().unwrap();
    let factory = ConfiguredClientFactory::new(ClientConfig {
        kind: ClientKind::OnlineV1,
        replay_dir: dir.path().to_string_lossy().to_string(),
        latency_ms: 0,
        want_image: true,
    });

    let bound = factory.create().unwrap();

    assert_eq!(bound.format, InferenceFormat::ZoneDetection);
    assert_eq!(bound.client.client_name(), "replay");
}
