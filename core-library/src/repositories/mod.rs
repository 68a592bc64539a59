//! # Repository Pattern Implementation
//!
//! This module provides repository traits and implementations for data access
//! to the recording mirror.
//!
//! ## Architecture
//!
//! - Traits define the interface for each repository
//! - SQLite implementations use sqlx for async database access
//! - All operations return `Result<T>` for error handling
//! - Pagination is supported via the `Page<T>` wrapper
//!
//! ## Available Repositories
//!
//! - `RecordingRepository` - Mirrored recordings, availability sweep, statistics
//! - `MetadataRepository` - Free-form metadata of any owner kind
//! - `PlaybackTypeRepository` - Shared playback type lookup table
//! - `PlaybackFormatRepository` - Playback variants of a recording
//! - `MeetingRepository` - Sessions of the hosting application
//! - `ServerRepository` - Recording servers

pub mod meeting;
pub mod metadata;
pub mod pagination;
pub mod playback;
pub mod recording;
pub mod server;

pub use meeting::{MeetingRepository, SqliteMeetingRepository};
pub use metadata::{MetadataRepository, SqliteMetadataRepository};
pub use pagination::{Page, PageRequest};
pub use playback::{
    PlaybackFormatRepository, PlaybackTypeRepository, SqlitePlaybackFormatRepository,
    SqlitePlaybackTypeRepository,
};
pub use recording::{RecordingRepository, SqliteRecordingRepository};
pub use server::{ServerRepository, SqliteServerRepository};
