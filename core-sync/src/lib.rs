//! # Recording Sync Engine
//!
//! Reconciles the recording list reported by a recording server with the
//! local database.
//!
//! ## Components
//!
//! - **Key Mapper** (`key_mapper`): Renames external descriptor keys to storage column names
//! - **Payload** (`payload`): Lenient typed decoding of one descriptor
//! - **Meeting Matcher** (`meeting_matcher`): Finds the session that produced a recording
//! - **Nested-Collection Reconciler** (`nested`): Three-way merge shared by all child collections
//! - **Collection Stores** (`collections`): Metadata and playback-format storage for the merge
//! - **Recording Reconciler** (`reconciler`): Creates or updates one recording and its children
//! - **Sync Job State Machine** (`job`): Pass lifecycle and the report it produces
//! - **Repository** (`repository`): Database persistence for sync job history
//! - **Sync Coordinator** (`coordinator`): Drives a pass with per-record isolation and the availability sweep
//! - **Notifier** (`notifier`): Publishes statistics refresh requests on the event bus

pub mod collections;
pub mod coordinator;
pub mod error;
pub mod job;
pub mod key_mapper;
pub mod meeting_matcher;
pub mod nested;
pub mod notifier;
pub mod payload;
pub mod reconciler;
pub mod repository;

pub use collections::{MetadataEntry, MetadataStore, PlaybackStore};
pub use coordinator::{SyncConfig, SyncCoordinator};
pub use error::{Result, SyncError};
pub use job::{RecordFailure, SyncJob, SyncJobId, SyncJobStats, SyncReport, SyncStatus};
pub use key_mapper::map_keys;
pub use meeting_matcher::{find_meeting, match_meeting, MatchTier};
pub use nested::{plan, reconcile, CollectionChanges, CollectionStore, MergePlan};
pub use notifier::EventBusNotifier;
pub use payload::{PlaybackFormatPayload, RecordingPayload};
pub use reconciler::{ReconcileAction, ReconcileOutcome, RecordingReconciler};
pub use repository::{SqliteSyncJobRepository, SyncJobRepository};
