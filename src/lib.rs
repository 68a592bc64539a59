//! Recording sync facade.
//!
//! Re-exports the workspace crates so host applications can depend on
//! `recording-sync` alone:
//!
//! - [`bridge`]: collaborator traits the host implements (room matching,
//!   statistics notifications, recording source, clock)
//! - [`runtime`]: configuration, logging and the event bus
//! - [`library`]: database pool, models, repositories and statistics
//! - [`sync`]: the reconciliation engine and sync coordinator
//!
//! ```rust,ignore
//! use recording_sync::prelude::*;
//!
//! let config = CoreConfig::builder()
//!     .database_path("recordings.db")
//!     .default_playback_type("presentation")
//!     .build()?;
//! init_logging(config.logging.clone())?;
//!
//! let pool = create_pool(DatabaseConfig::from_core(&config)).await?;
//! let event_bus = EventBus::new(config.event_buffer_size);
//! let coordinator = SyncCoordinator::new(
//!     pool,
//!     event_bus.clone(),
//!     Arc::new(MetadataRoomMatcher::new("room-id")),
//!     Arc::new(EventBusNotifier::new(event_bus)),
//!     Arc::new(SystemClock),
//!     SyncConfig::from(&config),
//! );
//! ```

pub use bridge_traits as bridge;
pub use core_library as library;
pub use core_runtime as runtime;
pub use core_sync as sync;

pub mod prelude {
    pub use bridge_traits::{
        Clock, MetadataRoomMatcher, NoRoomMatcher, NoopNotifier, NotificationPriority,
        RecordingSource, RoomMatcher, StatisticsNotifier, SystemClock,
    };
    pub use core_library::repositories::{RecordingRepository, SqliteRecordingRepository};
    pub use core_library::{create_pool, DatabaseConfig};
    pub use core_runtime::config::CoreConfig;
    pub use core_runtime::events::{CoreEvent, EventBus, RecordingEvent, SyncEvent};
    pub use core_runtime::logging::{init_logging, LoggingConfig};
    pub use core_sync::{EventBusNotifier, SyncConfig, SyncCoordinator, SyncReport};
}
