//! Logging through the public API: the CLI layer over captured writers and the
//! global json subscriber writing to a file.

use super::test_utils::SharedBuffer;
use jersey::logging::{cli_layer, init_logging, Level, LogContext, LoggingConfig};
use std::fs;
use tempfile::TempDir;
use tracing_subscriber::layer::SubscriberExt;

#[test]
fn test_numeric_threshold_from_config() {
    let config = LoggingConfig {
        level: "20".to_string(),
        ..LoggingConfig::default()
    };
    let threshold = config.threshold().unwrap();
    assert_eq!(threshold, Level::Info);

    let out = SharedBuffer::default();
    let err = SharedBuffer::default();
    let subscriber = tracing_subscriber::registry().with(cli_layer(
        LogContext::new("jersey").with_sub_command("addr"),
        threshold,
        out.clone(),
        err.clone(),
    ));
    tracing::subscriber::with_default(subscriber, || {
        tracing::debug!("hidden");
        tracing::info!("first\nsecond");
        tracing::info!(printed = true, "raw");
    });

    assert_eq!(
        out.contents(),
        "jersey: addr: INFO: first\njersey: addr: INFO: second\nraw\n"
    );
    assert_eq!(err.contents(), "");
}

#[test]
fn test_invalid_format_is_rejected_before_install() {
    let config = LoggingConfig {
        format: "xml".to_string(),
        ..LoggingConfig::default()
    };
    let err = init_logging(&config, LogContext::new("jersey")).unwrap_err();
    assert!(err.to_string().contains("Invalid log format"));
}

#[test]
fn test_invalid_level_is_rejected() {
    let config = LoggingConfig {
        level: "loud".to_string(),
        ..LoggingConfig::default()
    };
    assert!(init_logging(&config, LogContext::new("jersey")).is_err());
}

// The only test in this binary that installs the global subscriber.
#[test]
fn test_json_logging_to_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("logs").join("jersey.log");
    let config = LoggingConfig {
        level: "debug".to_string(),
        format: "json".to_string(),
        output: "file".to_string(),
        file: Some(path.clone()),
        ..LoggingConfig::default()
    };

    init_logging(&config, LogContext::new("jersey")).unwrap();
    let contents = fs::read_to_string(&path).unwrap();
    let line = contents
        .lines()
        .find(|line| line.contains("Starting logging for jersey"))
        .expect("startup event should be logged");
    let event: serde_json::Value = serde_json::from_str(line).unwrap();
    assert_eq!(event["level"], "DEBUG");
    assert!(event["timestamp"].is_string());
}
