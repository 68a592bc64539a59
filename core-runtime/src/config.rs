//! # Core Configuration Module
//!
//! Configuration for the recording sync core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a
//! `CoreConfig` holding the database location, pool sizing, sync policy and
//! logging settings. `build()` validates fail-fast so that a misconfigured
//! host notices before the first sync pass.
//!
//! ## Usage
//!
//! ```
//! use core_runtime::config::CoreConfig;
//! use bridge_traits::NotificationPriority;
//!
//! let config = CoreConfig::builder()
//!     .database_path("/var/lib/recordings/recordings.db")
//!     .default_playback_type("presentation")
//!     .notification_priority(NotificationPriority::Low)
//!     .build()
//!     .expect("valid configuration");
//!
//! assert_eq!(config.default_playback_type.as_deref(), Some("presentation"));
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use crate::logging::LoggingConfig;
use bridge_traits::NotificationPriority;
use std::path::PathBuf;

/// Upper bound for the connection pool size
const MAX_POOL_CONNECTIONS: u32 = 64;

/// Core configuration for the recording sync core.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Path to the SQLite database file
    pub database_path: PathBuf,

    /// Maximum number of pooled database connections
    pub max_connections: u32,

    /// Identifier of the playback type flagged as default when it is first
    /// created by a sync pass (e.g. "presentation")
    pub default_playback_type: Option<String>,

    /// Priority attached to "refresh session statistics" notifications
    pub notification_priority: NotificationPriority,

    /// Persist a sync job row for every sync pass
    pub record_history: bool,

    /// Buffer size of the event bus
    pub event_buffer_size: usize,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Database path is not empty
    /// - Pool size is within `1..=64`
    /// - Default playback type, when set, is not blank
    /// - Event buffer size is not zero
    pub fn validate(&self) -> Result<()> {
        if self.database_path.as_os_str().is_empty() {
            return Err(Error::Config("Database path cannot be empty".to_string()));
        }

        if self.max_connections == 0 {
            return Err(Error::Config(
                "Connection pool needs at least one connection".to_string(),
            ));
        }

        if self.max_connections > MAX_POOL_CONNECTIONS {
            return Err(Error::Config(format!(
                "Connection pool size exceeds maximum of {}",
                MAX_POOL_CONNECTIONS
            )));
        }

        if let Some(identifier) = &self.default_playback_type {
            if identifier.trim().is_empty() {
                return Err(Error::Config(
                    "Default playback type cannot be blank. Omit it instead.".to_string(),
                ));
            }
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Debug, Default)]
pub struct CoreConfigBuilder {
    database_path: Option<PathBuf>,
    max_connections: Option<u32>,
    default_playback_type: Option<String>,
    notification_priority: Option<NotificationPriority>,
    record_history: Option<bool>,
    event_buffer_size: Option<usize>,
    logging: Option<LoggingConfig>,
}

impl CoreConfigBuilder {
    /// Sets the database path.
    pub fn database_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.database_path = Some(path.into());
        self
    }

    /// Sets the maximum pool size (default: 5).
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = Some(max);
        self
    }

    /// Sets the identifier that becomes the default playback type.
    pub fn default_playback_type(mut self, identifier: impl Into<String>) -> Self {
        self.default_playback_type = Some(identifier.into());
        self
    }

    /// Sets the priority of statistics refresh notifications (default: low).
    pub fn notification_priority(mut self, priority: NotificationPriority) -> Self {
        self.notification_priority = Some(priority);
        self
    }

    /// Enables or disables sync job history (default: enabled).
    pub fn record_history(mut self, enabled: bool) -> Self {
        self.record_history = Some(enabled);
        self
    }

    /// Sets the event bus buffer size.
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Sets the logging configuration.
    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = Some(logging);
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the database path is missing or any value fails
    /// [`CoreConfig::validate`].
    pub fn build(self) -> Result<CoreConfig> {
        let database_path = self.database_path.ok_or_else(|| {
            Error::Config("Database path is required. Use .database_path() to set it.".to_string())
        })?;

        let config = CoreConfig {
            database_path,
            max_connections: self.max_connections.unwrap_or(5),
            default_playback_type: self.default_playback_type,
            notification_priority: self.notification_priority.unwrap_or_default(),
            record_history: self.record_history.unwrap_or(true),
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            logging: self.logging.unwrap_or_default(),
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_requires_database_path() {
        let result = CoreConfig::builder().build();
        assert!(matches!(result, Err(Error::Config(msg)) if msg.contains("Database path")));
    }

    #[test]
    fn test_builder_defaults() {
        let config = CoreConfig::builder()
            .database_path("recordings.db")
            .build()
            .unwrap();

        assert_eq!(config.max_connections, 5);
        assert_eq!(config.default_playback_type, None);
        assert_eq!(config.notification_priority, NotificationPriority::Low);
        assert!(config.record_history);
        assert_eq!(config.event_buffer_size, DEFAULT_EVENT_BUFFER_SIZE);
    }

    #[test]
    fn test_validate_rejects_zero_connections() {
        let result = CoreConfig::builder()
            .database_path("recordings.db")
            .max_connections(0)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_oversized_pool() {
        let result = CoreConfig::builder()
            .database_path("recordings.db")
            .max_connections(MAX_POOL_CONNECTIONS + 1)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_blank_default_type() {
        let result = CoreConfig::builder()
            .database_path("recordings.db")
            .default_playback_type("  ")
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_empty_path() {
        let result = CoreConfig::builder().database_path("").build();
        assert!(result.is_err());
    }
}
