use bridge_traits::BridgeError;
use core_library::LibraryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Library error: {0}")]
    Library(#[from] LibraryError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Collaborator error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Invalid payload for record {record_id}: {message}")]
    InvalidPayload { record_id: String, message: String },

    #[error("Recording descriptor has no record id")]
    MissingRecordId,

    #[error("Sync job {job_id} not found")]
    JobNotFound { job_id: String },

    #[error("Invalid job ID: {0}")]
    InvalidJobId(String),

    #[error("Invalid sync status: {0}")]
    InvalidStatus(String),

    #[error("Invalid state transition from {from} to {to}: {reason}")]
    InvalidStateTransition {
        from: String,
        to: String,
        reason: String,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SyncError {
    /// Whether the error is a uniqueness violation reported by SQLite
    pub fn is_unique_violation(&self) -> bool {
        match self {
            SyncError::Database(sqlx::Error::Database(db)) => db.is_unique_violation(),
            SyncError::Library(e) => e.is_unique_violation(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
