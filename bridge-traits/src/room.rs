//! Room Resolution
//!
//! Recordings are owned by a room of the hosting application. Which room a
//! recording belongs to is decided outside the core, typically by looking at
//! the session id or the metadata the recording server echoes back.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::Result;

/// Resolves the owning room of a recording descriptor
///
/// Called once for every created and every updated recording with the
/// key-mapped descriptor (internal field names, nested `metadata` and
/// `playback` objects still present).
///
/// # Example
///
/// ```ignore
/// use bridge_traits::room::RoomMatcher;
///
/// struct MetaRoomMatcher;
///
/// #[async_trait::async_trait]
/// impl RoomMatcher for MetaRoomMatcher {
///     async fn match_room(&self, desired: &Map<String, Value>) -> Result<Option<String>> {
///         Ok(desired
///             .get("metadata")
///             .and_then(|m| m.get("room-id"))
///             .and_then(Value::as_str)
///             .map(str::to_string))
///     }
/// }
/// ```
#[async_trait]
pub trait RoomMatcher: Send + Sync {
    /// Return the id of the room owning the recording, or `None` when no
    /// room can be associated.
    async fn match_room(&self, desired: &Map<String, Value>) -> Result<Option<String>>;
}

/// Matcher that never associates a room
#[derive(Debug, Clone, Default)]
pub struct NoRoomMatcher;

#[async_trait]
impl RoomMatcher for NoRoomMatcher {
    async fn match_room(&self, _desired: &Map<String, Value>) -> Result<Option<String>> {
        Ok(None)
    }
}

/// Matcher reading the room id from a metadata entry of the descriptor
///
/// Recording servers hand back the metadata that was attached when the
/// session was created, so the hosting application usually stores its room
/// id there.
#[derive(Debug, Clone)]
pub struct MetadataRoomMatcher {
    key: String,
}

impl MetadataRoomMatcher {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

#[async_trait]
impl RoomMatcher for MetadataRoomMatcher {
    async fn match_room(&self, desired: &Map<String, Value>) -> Result<Option<String>> {
        let room = desired
            .get("metadata")
            .and_then(Value::as_object)
            .and_then(|metadata| metadata.get(&self.key))
            .and_then(|value| match value {
                Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            });

        Ok(room)
    }
}
