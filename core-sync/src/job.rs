//! # Sync Job State Machine
//!
//! Tracks one sync pass against a recording server with validated state
//! transitions, plus the report a pass produces.
//!
//! ## State Machine
//!
//! ```text
//! Pending → Running → Completed
//!     ↓         ↓
//!     └──────→ Failed
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_sync::{SyncJob, SyncJobStats, SyncStatus};
//!
//! let job = SyncJob::new("server-1", true);
//! let job = job.start().unwrap();
//! let job = job
//!     .complete(SyncJobStats {
//!         items_seen: 3,
//!         items_created: 2,
//!         items_updated: 1,
//!         ..SyncJobStats::default()
//!     })
//!     .unwrap();
//!
//! assert_eq!(job.status, SyncStatus::Completed);
//! ```

use crate::nested::CollectionChanges;
use crate::{Result, SyncError};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// ID Types
// ============================================================================

/// Unique identifier for a sync job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SyncJobId(Uuid);

impl SyncJobId {
    /// Create a new random sync job ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a sync job ID from a string
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid UUID
    pub fn from_string(s: &str) -> Result<Self> {
        Ok(Self(
            Uuid::parse_str(s).map_err(|e| SyncError::InvalidJobId(e.to_string()))?,
        ))
    }

    /// Get the string representation of this ID
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for SyncJobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SyncJobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Status Types
// ============================================================================

/// The current status of a sync job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// Job has been created but not yet started
    Pending,
    /// Job is currently reconciling
    Running,
    /// Every descriptor was visited; individual records may still have failed
    Completed,
    /// The pass was aborted before reconciling anything
    Failed,
}

impl SyncStatus {
    /// Check if this status represents a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, SyncStatus::Completed | SyncStatus::Failed)
    }

    /// Get the string representation for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Pending => "pending",
            SyncStatus::Running => "running",
            SyncStatus::Completed => "completed",
            SyncStatus::Failed => "failed",
        }
    }
}

impl FromStr for SyncStatus {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(SyncStatus::Pending),
            "running" => Ok(SyncStatus::Running),
            "completed" => Ok(SyncStatus::Completed),
            "failed" => Ok(SyncStatus::Failed),
            _ => Err(SyncError::InvalidStatus(s.to_string())),
        }
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Report Types
// ============================================================================

/// Counters persisted with a completed job
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncJobStats {
    /// Descriptors in the external list
    pub items_seen: u64,
    pub items_created: u64,
    pub items_updated: u64,
    pub items_failed: u64,
    /// Recordings retired by the availability sweep
    pub items_unavailable: u64,
}

/// A descriptor that could not be reconciled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFailure {
    /// Position in the external list
    pub index: usize,
    /// External record id, when the descriptor had one
    pub record_id: Option<String>,
    pub message: String,
}

/// What a sync pass did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub job_id: Option<SyncJobId>,
    pub server_id: String,
    pub full_sync: bool,
    pub seen: u64,
    pub created: u64,
    pub updated: u64,
    pub failed: Vec<RecordFailure>,
    pub marked_unavailable: u64,
    pub metadata: CollectionChanges,
    pub playback: CollectionChanges,
    pub orphan_types_deleted: u64,
}

impl SyncReport {
    pub fn new(server_id: impl Into<String>, full_sync: bool) -> Self {
        Self {
            server_id: server_id.into(),
            full_sync,
            ..Self::default()
        }
    }

    /// Whether every descriptor was reconciled
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    /// Counters for the job history
    pub fn stats(&self) -> SyncJobStats {
        SyncJobStats {
            items_seen: self.seen,
            items_created: self.created,
            items_updated: self.updated,
            items_failed: self.failed.len() as u64,
            items_unavailable: self.marked_unavailable,
        }
    }
}

// ============================================================================
// Sync Job Entity
// ============================================================================

/// One sync pass against a recording server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncJob {
    pub id: SyncJobId,
    pub server_id: String,
    pub status: SyncStatus,
    /// Whether the availability sweep runs after the pass
    pub full_sync: bool,
    /// Only available once completed
    pub stats: Option<SyncJobStats>,
    pub error_message: Option<String>,
    pub created_at: i64,
    pub started_at: Option<i64>,
    pub completed_at: Option<i64>,
}

impl SyncJob {
    /// Create a new sync job in pending state
    pub fn new(server_id: impl Into<String>, full_sync: bool) -> Self {
        Self {
            id: SyncJobId::new(),
            server_id: server_id.into(),
            status: SyncStatus::Pending,
            full_sync,
            stats: None,
            error_message: None,
            created_at: current_timestamp(),
            started_at: None,
            completed_at: None,
        }
    }

    /// Start the sync job
    ///
    /// # Errors
    ///
    /// Returns an error if the job is not in `Pending` state
    pub fn start(mut self) -> Result<Self> {
        self.validate_transition(SyncStatus::Running)?;
        self.status = SyncStatus::Running;
        self.started_at = Some(current_timestamp());
        Ok(self)
    }

    /// Mark the job as completed with statistics
    ///
    /// # Errors
    ///
    /// Returns an error if the job is not in `Running` state
    pub fn complete(mut self, stats: SyncJobStats) -> Result<Self> {
        self.validate_transition(SyncStatus::Completed)?;
        self.status = SyncStatus::Completed;
        self.completed_at = Some(current_timestamp());
        self.stats = Some(stats);
        Ok(self)
    }

    /// Mark the job as failed with an error message
    ///
    /// # Errors
    ///
    /// Returns an error if the job is already terminal
    pub fn fail(mut self, error_message: impl Into<String>) -> Result<Self> {
        self.validate_transition(SyncStatus::Failed)?;
        self.status = SyncStatus::Failed;
        self.completed_at = Some(current_timestamp());
        self.error_message = Some(error_message.into());
        Ok(self)
    }

    /// Get the duration of the job in seconds
    ///
    /// Returns None if the job hasn't started or completed yet
    pub fn duration_secs(&self) -> Option<u64> {
        match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => Some(end.saturating_sub(start).max(0) as u64),
            _ => None,
        }
    }

    fn validate_transition(&self, to: SyncStatus) -> Result<()> {
        let valid = matches!(
            (self.status, to),
            (SyncStatus::Pending, SyncStatus::Running)
                | (SyncStatus::Pending, SyncStatus::Failed)
                | (SyncStatus::Running, SyncStatus::Completed)
                | (SyncStatus::Running, SyncStatus::Failed)
        );

        if !valid {
            return Err(SyncError::InvalidStateTransition {
                from: self.status.as_str().to_string(),
                to: to.as_str().to_string(),
                reason: format!(
                    "Cannot transition from {} to {}",
                    self.status.as_str(),
                    to.as_str()
                ),
            });
        }

        Ok(())
    }
}

fn current_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}
