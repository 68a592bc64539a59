//! Integration tests for logging system

use bridge_traits::time::LogLevel;
use core_runtime::config::CoreConfig;
use core_runtime::logging::{default_filter, init_logging, LogFormat, LoggingConfig};
use core_runtime::Error;

#[test]
fn test_logging_initializes_once() {
    // The global subscriber can only be installed once per process, so both
    // halves live in the same test.
    let config = LoggingConfig::default()
        .with_format(LogFormat::Json)
        .with_level(LogLevel::Debug);

    assert!(init_logging(config.clone()).is_ok());

    tracing::info!(record_id = "rec-1", "logging initialized");

    let second = init_logging(config);
    assert!(matches!(second, Err(Error::Config(_))));
}

#[test]
fn test_core_config_carries_logging() {
    let logging = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_filter(default_filter(LogLevel::Trace));

    let config = CoreConfig::builder()
        .database_path("recordings.db")
        .logging(logging)
        .build()
        .unwrap();

    assert_eq!(config.logging.format, LogFormat::Compact);
    assert!(config
        .logging
        .filter
        .as_deref()
        .unwrap()
        .contains("core_sync=trace"));
}
