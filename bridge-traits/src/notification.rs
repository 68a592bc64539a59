//! Post-create Notifications
//!
//! When a newly created recording could be associated with a session, the
//! hosting application wants to recompute that session's statistics. The
//! core only hands over the session reference; scheduling the actual work is
//! the host's business.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{BridgeError, Result};

/// Scheduling priority passed along with a notification
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPriority {
    #[default]
    Low,
    Normal,
    High,
}

impl NotificationPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationPriority::Low => "low",
            NotificationPriority::Normal => "normal",
            NotificationPriority::High => "high",
        }
    }
}

impl fmt::Display for NotificationPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationPriority {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(NotificationPriority::Low),
            "normal" => Ok(NotificationPriority::Normal),
            "high" => Ok(NotificationPriority::High),
            other => Err(BridgeError::OperationFailed(format!(
                "Unknown notification priority: {}",
                other
            ))),
        }
    }
}

/// Sink for "session statistics need a refresh" notifications
///
/// Implementations should return quickly. The sync engine dispatches
/// notifications in a detached task after the recording has been committed,
/// so an error returned here is logged and otherwise ignored.
#[async_trait]
pub trait StatisticsNotifier: Send + Sync {
    /// Request a statistics refresh for the session with the given id
    async fn request_statistics_refresh(
        &self,
        meeting_id: &str,
        priority: NotificationPriority,
    ) -> Result<()>;
}

/// Notifier that drops every notification
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

#[async_trait]
impl StatisticsNotifier for NoopNotifier {
    async fn request_statistics_refresh(
        &self,
        _meeting_id: &str,
        _priority: NotificationPriority,
    ) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_parse() {
        assert_eq!(
            "HIGH".parse::<NotificationPriority>().unwrap(),
            NotificationPriority::High
        );
        assert_eq!(
            "low".parse::<NotificationPriority>().unwrap(),
            NotificationPriority::Low
        );
        assert!("urgent".parse::<NotificationPriority>().is_err());
    }

    #[test]
    fn test_priority_ordering() {
        assert!(NotificationPriority::Low < NotificationPriority::Normal);
        assert!(NotificationPriority::Normal < NotificationPriority::High);
        assert_eq!(NotificationPriority::default(), NotificationPriority::Low);
    }
}
