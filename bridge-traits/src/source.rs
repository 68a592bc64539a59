//! Recording Source
//!
//! The client talking to the recording server lives outside the core. The
//! sync engine only needs the raw list of recording descriptors, exactly as
//! the server reported them (external field names such as `recordID`).

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// Fetches the current recording list of a recording server
#[async_trait]
pub trait RecordingSource: Send + Sync {
    /// List all recordings the server currently reports
    ///
    /// # Errors
    ///
    /// Returns an error if the server cannot be reached or answers with a
    /// failure. An empty list is a valid answer, not an error.
    async fn list_recordings(&self, server_id: &str) -> Result<Vec<Value>>;
}
