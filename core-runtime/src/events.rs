//! # Event Bus System
//!
//! Broadcasts typed events between the sync engine and whoever hosts it,
//! built on `tokio::sync::broadcast`.
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, SyncEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(16);
//! let mut stream = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Sync(SyncEvent::Started {
//!         job_id: "job-1".to_string(),
//!         server_id: "server-1".to_string(),
//!         is_full_sync: true,
//!     }))
//!     .ok();
//!
//! let event = stream.recv().await.unwrap();
//! assert!(matches!(event, CoreEvent::Sync(SyncEvent::Started { .. })));
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber missed `n` events and can keep receiving.
//! - **`RecvError::Closed`**: all senders are gone; subscribers should exit.
//!
//! Emitting without subscribers returns `SendError`, which publishers ignore
//! with `.ok()`.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Sync pass lifecycle events
    Sync(SyncEvent),
    /// Per-recording events
    Recording(RecordingEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Sync(e) => e.description(),
            CoreEvent::Recording(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Sync(SyncEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Sync(SyncEvent::RecordFailed { .. }) => EventSeverity::Warning,
            CoreEvent::Sync(SyncEvent::Completed { .. }) => EventSeverity::Info,
            CoreEvent::Recording(RecordingEvent::Created { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Sync Events
// ============================================================================

/// Events describing a sync pass against one recording server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SyncEvent {
    /// Sync pass started.
    Started {
        job_id: String,
        server_id: String,
        /// Whether the availability sweep runs after the pass.
        is_full_sync: bool,
    },
    /// A single recording could not be reconciled; the pass continues.
    RecordFailed {
        job_id: String,
        /// External record id, if the descriptor carried one.
        record_id: Option<String>,
        message: String,
    },
    /// Sync pass finished.
    Completed {
        job_id: String,
        created: u64,
        updated: u64,
        failed: u64,
        marked_unavailable: u64,
        duration_secs: u64,
    },
    /// Sync pass aborted before reconciling anything.
    Failed { job_id: String, message: String },
}

impl SyncEvent {
    fn description(&self) -> &str {
        match self {
            SyncEvent::Started { .. } => "Recording sync started",
            SyncEvent::RecordFailed { .. } => "Recording could not be reconciled",
            SyncEvent::Completed { .. } => "Recording sync completed",
            SyncEvent::Failed { .. } => "Recording sync failed",
        }
    }
}

// ============================================================================
// Recording Events
// ============================================================================

/// Events about individual recordings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum RecordingEvent {
    /// A recording was seen for the first time.
    Created {
        recording_id: String,
        record_id: String,
        meeting_id: Option<String>,
    },
    /// The statistics of a session should be recomputed.
    StatisticsRefreshRequested {
        meeting_id: String,
        /// Scheduling priority ("low", "normal", "high").
        priority: String,
    },
}

impl RecordingEvent {
    fn description(&self) -> &str {
        match self {
            RecordingEvent::Created { .. } => "Recording created",
            RecordingEvent::StatisticsRefreshRequested { .. } => {
                "Session statistics refresh requested"
            }
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central broadcast channel for [`CoreEvent`]s.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an
    /// error if there are no active subscribers.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber that receives all future events.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}
