//! Integration tests for the runtime surface used by providers

use bridge_traits::time::LogLevel;
use core_runtime::config::ProviderConfig;
use core_runtime::events::{CoreEvent, EventBus, EventStream, PlaybackEvent};
use core_runtime::logging::{init_logging, redact_if_sensitive, LogFormat, LoggingConfig};
use serde_json::json;
use std::time::Duration;

#[test]
fn test_logging_initializes_once() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Debug);

    assert!(init_logging(config.clone()).is_ok());

    // A global subscriber is already installed
    let err = init_logging(config).unwrap_err();
    assert!(err.to_string().contains("Failed to initialize logging"));
}

#[test]
fn test_request_params_are_redacted() {
    let params = [
        ("username", "listener@example.com"),
        ("password", "hunter2"),
        ("user_auth_token", "tok"),
        ("request_sig", "0cc175b9c0f1b6a831c399e269772661"),
        ("track_id", "5966783"),
    ];

    let shown: Vec<String> = params
        .iter()
        .map(|(k, v)| redact_if_sensitive(k, v))
        .collect();

    assert!(!shown[0].contains("example.com"));
    assert_eq!(shown[1], "[REDACTED]");
    assert_eq!(shown[2], "[REDACTED]");
    assert_eq!(shown[3], "[REDACTED]");
    assert_eq!(shown[4], "5966783");
}

#[test]
fn test_config_with_custom_throttle() {
    let config = ProviderConfig::builder()
        .enabled(true)
        .username("listener")
        .password("pw")
        .app_id("1")
        .app_secret("s")
        .rate_limit(5, Duration::from_millis(500))
        .page_size(50)
        .build()
        .unwrap();

    assert_eq!(config.rate_limit.max_requests, 5);
    assert_eq!(config.page_size, 50);
}

#[tokio::test]
async fn test_playback_events_reach_filtered_subscriber() {
    let bus = EventBus::default();
    let mut stream = EventStream::new(bus.subscribe())
        .filter(|event| matches!(event, CoreEvent::Playback(p) if p.provider() == "qobuz"));

    let handle = tokio::spawn(async move {
        let mut names = Vec::new();
        while names.len() < 2 {
            match stream.recv().await {
                Ok(event) => names.push(event.name()),
                Err(_) => break,
            }
        }
        names
    });

    bus.emit(CoreEvent::Playback(PlaybackEvent::StreamingStarted {
        provider: "qobuz".to_string(),
        track_id: "1".to_string(),
        details: json!({"format_id": 6}),
    }))
    .unwrap();
    bus.emit(CoreEvent::Playback(PlaybackEvent::StreamingStarted {
        provider: "other".to_string(),
        track_id: "2".to_string(),
        details: json!({}),
    }))
    .unwrap();
    bus.emit(CoreEvent::Playback(PlaybackEvent::StreamingEnded {
        provider: "qobuz".to_string(),
        track_id: "1".to_string(),
        seconds: 180,
        details: json!({"format_id": 6}),
    }))
    .unwrap();

    let names = handle.await.unwrap();
    assert_eq!(names, vec!["streaming_started", "streaming_ended"]);
}
