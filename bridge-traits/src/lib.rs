//! # Host Bridge Traits
//!
//! Collaborator contracts the recording sync core depends on but does not
//! implement itself.
//!
//! ## Traits
//!
//! - [`RecordingSource`](source::RecordingSource) - Fetches the raw recording list from a recording server
//! - [`RoomMatcher`](room::RoomMatcher) - Resolves the room owning a recording
//! - [`StatisticsNotifier`](notification::StatisticsNotifier) - Receives "refresh session statistics" requests
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! convert their own failures into it and keep the message actionable.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so that a single implementation can
//! be shared between the sync coordinator and detached notification tasks.

pub mod error;
pub mod notification;
pub mod room;
pub mod source;
pub mod time;

pub use error::BridgeError;

pub use notification::{NoopNotifier, NotificationPriority, StatisticsNotifier};
pub use room::{MetadataRoomMatcher, NoRoomMatcher, RoomMatcher};
pub use source::RecordingSource;
pub use time::{Clock, FixedClock, LogLevel, SystemClock};
