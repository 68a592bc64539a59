//! Domain models for the recording mirror
//!
//! This module contains the persisted entities with validation and database
//! mapping.

use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Start times above this value are taken to be Unix milliseconds.
const MILLIS_THRESHOLD: i64 = 100_000_000_000;

// =============================================================================
// ID Types
// =============================================================================

/// Unique identifier for a local recording row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(transparent)]
pub struct RecordingId(pub Uuid);

impl RecordingId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for RecordingId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Owner Types
// =============================================================================

/// Kind of entity a metadata item belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnerKind {
    Recording,
    Room,
    Server,
}

impl OwnerKind {
    /// Get the string representation for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            OwnerKind::Recording => "recording",
            OwnerKind::Room => "room",
            OwnerKind::Server => "server",
        }
    }
}

impl fmt::Display for OwnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OwnerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "recording" => Ok(OwnerKind::Recording),
            "room" => Ok(OwnerKind::Room),
            "server" => Ok(OwnerKind::Server),
            other => Err(format!("Unknown metadata owner kind: {}", other)),
        }
    }
}

/// Owner of a metadata item: `(kind, id)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MetadataOwner {
    pub kind: OwnerKind,
    pub id: String,
}

impl MetadataOwner {
    pub fn new(kind: OwnerKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    pub fn recording(id: impl Into<String>) -> Self {
        Self::new(OwnerKind::Recording, id)
    }
}

impl fmt::Display for MetadataOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

// =============================================================================
// Domain Models
// =============================================================================

/// A recording server whose recordings are mirrored locally
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Server {
    pub id: String,
    pub name: String,
    pub url: String,
    pub created_at: i64,
}

impl Server {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            url: url.into(),
            created_at: Utc::now().timestamp(),
        }
    }
}

/// A session of the hosting application that may have produced recordings
///
/// Only ever read by the sync engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Meeting {
    /// Local row id
    pub id: String,
    /// Session id as known to the recording server
    pub meeting_id: String,
    /// Session creation timestamp as reported by the recording server
    pub create_time: i64,
    pub room_id: Option<String>,
    pub name: Option<String>,
}

/// Local mirror of a recording reported by a recording server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Recording {
    /// Local row id
    pub id: String,
    /// Recording id assigned by the recording server, never reassigned
    pub record_id: String,
    /// Owning server
    pub server_id: String,
    /// Owning room, as resolved by the room matcher
    pub room_id: Option<String>,
    /// Matched session row
    pub meeting_ref: Option<String>,
    /// Session id reported by the recording server
    pub meeting_id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub published: bool,
    /// False once a full sync no longer sees the recording
    pub available: bool,
    pub start_time: Option<i64>,
    pub end_time: Option<i64>,
    /// Size in bytes
    pub size: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Recording {
    /// Create a new, available recording for a server
    pub fn new(record_id: impl Into<String>, server_id: impl Into<String>) -> Self {
        let now = Utc::now().timestamp();
        Self {
            id: RecordingId::new().to_string(),
            record_id: record_id.into(),
            server_id: server_id.into(),
            room_id: None,
            meeting_ref: None,
            meeting_id: None,
            name: None,
            description: None,
            published: false,
            available: true,
            start_time: None,
            end_time: None,
            size: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Validate recording data
    pub fn validate(&self) -> Result<(), String> {
        if self.record_id.trim().is_empty() {
            return Err("Recording record_id cannot be empty".to_string());
        }

        if self.server_id.trim().is_empty() {
            return Err("Recording must belong to a server".to_string());
        }

        if let Some(size) = self.size {
            if size < 0 {
                return Err("Recording size cannot be negative".to_string());
            }
        }

        Ok(())
    }

    /// Human readable description derived from a start time
    ///
    /// Start times above 10^11 are read as Unix milliseconds, smaller ones as
    /// Unix seconds.
    ///
    /// ```
    /// use core_library::models::Recording;
    ///
    /// assert_eq!(
    ///     Recording::default_description(Some(1_700_000_000)),
    ///     "Recording of 2023-11-14 22:13 UTC"
    /// );
    /// assert_eq!(Recording::default_description(None), "Recording");
    /// ```
    pub fn default_description(start_time: Option<i64>) -> String {
        let instant = start_time.and_then(|ts| {
            let (secs, millis) = if ts.abs() > MILLIS_THRESHOLD {
                (ts.div_euclid(1000), ts.rem_euclid(1000))
            } else {
                (ts, 0)
            };
            Utc.timestamp_opt(secs, (millis * 1_000_000) as u32).single()
        });

        match instant {
            Some(instant) => format!("Recording of {}", instant.format("%Y-%m-%d %H:%M UTC")),
            None => "Recording".to_string(),
        }
    }
}

/// Free-form metadata attached to an owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct MetadataItem {
    pub id: String,
    /// Stored form of [`OwnerKind`]
    pub owner_kind: String,
    pub owner_id: String,
    /// Unique per owner
    pub name: String,
    pub content: String,
}

impl MetadataItem {
    pub fn new(owner: &MetadataOwner, name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            owner_kind: owner.kind.as_str().to_string(),
            owner_id: owner.id.clone(),
            name: name.into(),
            content: content.into(),
        }
    }

    /// Owner of this item
    pub fn owner(&self) -> Result<MetadataOwner, String> {
        Ok(MetadataOwner::new(
            self.owner_kind.parse()?,
            self.owner_id.clone(),
        ))
    }
}

/// Lookup row for a playback format type ("presentation", "video", ...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct PlaybackType {
    pub id: String,
    /// Identifier as reported by the recording server
    pub identifier: String,
    pub visible: bool,
    /// At most one type carries the default flag
    pub is_default: bool,
}

impl PlaybackType {
    /// Create a visible, non-default type
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            identifier: identifier.into(),
            visible: true,
            is_default: false,
        }
    }
}

/// One playback variant of a recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct PlaybackFormat {
    pub id: String,
    pub recording_id: String,
    pub playback_type_id: String,
    pub url: String,
    /// Duration in minutes
    pub length: f64,
}

impl PlaybackFormat {
    pub fn new(
        recording_id: impl Into<String>,
        playback_type_id: impl Into<String>,
        url: impl Into<String>,
        length: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            recording_id: recording_id.into(),
            playback_type_id: playback_type_id.into(),
            url: url.into(),
            length,
        }
    }
}

/// Playback format joined with its type identifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct PlaybackFormatView {
    pub id: String,
    pub recording_id: String,
    pub playback_type_id: String,
    /// Identifier of the playback type
    pub format_type: String,
    pub url: String,
    pub length: f64,
    pub visible: bool,
    pub is_default: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_defaults() {
        let recording = Recording::new("rec-1", "server-1");
        assert!(recording.available);
        assert!(!recording.published);
        assert!(recording.validate().is_ok());
        assert!(RecordingId::from_string(&recording.id).is_ok());
    }

    #[test]
    fn test_recording_validation() {
        let mut recording = Recording::new("  ", "server-1");
        assert!(recording.validate().is_err());

        recording.record_id = "rec-1".to_string();
        recording.server_id = String::new();
        assert!(recording.validate().is_err());

        recording.server_id = "server-1".to_string();
        recording.size = Some(-1);
        assert!(recording.validate().is_err());
    }

    #[test]
    fn test_default_description_accepts_millis() {
        assert_eq!(
            Recording::default_description(Some(1_700_000_000_000)),
            Recording::default_description(Some(1_700_000_000))
        );
    }

    #[test]
    fn test_owner_kind_round_trip() {
        for kind in [OwnerKind::Recording, OwnerKind::Room, OwnerKind::Server] {
            assert_eq!(kind.as_str().parse::<OwnerKind>().unwrap(), kind);
        }
        assert!("meeting".parse::<OwnerKind>().is_err());
    }

    #[test]
    fn test_metadata_item_owner() {
        let owner = MetadataOwner::recording("r-1");
        let item = MetadataItem::new(&owner, "title", "Weekly sync");
        assert_eq!(item.owner().unwrap(), owner);
        assert_eq!(owner.to_string(), "recording:r-1");
    }
}
