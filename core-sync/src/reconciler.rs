//! # Recording Reconciler
//!
//! Creates or updates one recording and its child collections from a decoded
//! descriptor. All writes go through the connection handed in by the caller,
//! which owns the transaction; the post-create notification is dispatched
//! separately once that transaction has committed.

use crate::collections::{MetadataEntry, MetadataStore, PlaybackStore};
use crate::meeting_matcher::{find_meeting, MatchTier};
use crate::nested::{reconcile, CollectionChanges};
use crate::payload::RecordingPayload;
use crate::{Result, SyncError};
use bridge_traits::{Clock, NotificationPriority, RoomMatcher, StatisticsNotifier};
use core_library::models::{Meeting, MetadataOwner, Recording};
use core_library::repositories::{playback, recording as recordings};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::SqliteConnection;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Whether a descriptor created or updated its recording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconcileAction {
    Created,
    Updated,
}

/// Result of reconciling one descriptor
#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    /// The recording as persisted
    pub recording: Recording,
    pub action: ReconcileAction,
    /// `None` when the descriptor carried no metadata object
    pub metadata: Option<CollectionChanges>,
    /// `None` when the descriptor carried no playback object
    pub playback: Option<CollectionChanges>,
    /// Playback types garbage-collected after the playback pass
    pub orphan_types_deleted: u64,
    /// Session matched on create
    pub meeting: Option<(Meeting, MatchTier)>,
}

impl ReconcileOutcome {
    /// Session whose statistics should be refreshed once committed
    pub fn notification_target(&self) -> Option<&Meeting> {
        match self.action {
            ReconcileAction::Created => self.meeting.as_ref().map(|(meeting, _)| meeting),
            ReconcileAction::Updated => None,
        }
    }
}

/// Per-record create-or-update logic
pub struct RecordingReconciler {
    room_matcher: Arc<dyn RoomMatcher>,
    notifier: Arc<dyn StatisticsNotifier>,
    clock: Arc<dyn Clock>,
    default_playback_type: Option<String>,
    notification_priority: NotificationPriority,
}

impl RecordingReconciler {
    pub fn new(
        room_matcher: Arc<dyn RoomMatcher>,
        notifier: Arc<dyn StatisticsNotifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            room_matcher,
            notifier,
            clock,
            default_playback_type: None,
            notification_priority: NotificationPriority::default(),
        }
    }

    /// Identifier flagged default when its playback type is first created
    pub fn with_default_playback_type(mut self, identifier: Option<String>) -> Self {
        self.default_playback_type = identifier;
        self
    }

    /// Priority attached to statistics refresh notifications
    pub fn with_notification_priority(mut self, priority: NotificationPriority) -> Self {
        self.notification_priority = priority;
        self
    }

    /// Reconcile one descriptor inside the caller's transaction
    ///
    /// `desired` is the key-mapped descriptor handed to the room matcher;
    /// `payload` is its decoded form. `existing` selects the update path.
    ///
    /// # Errors
    ///
    /// Any error leaves the transaction to be rolled back by the caller.
    #[instrument(skip_all, fields(server_id = %server_id, record_id = ?payload.recordid))]
    pub async fn reconcile(
        &self,
        conn: &mut SqliteConnection,
        server_id: &str,
        desired: &Map<String, Value>,
        payload: &RecordingPayload,
        existing: Option<Recording>,
    ) -> Result<ReconcileOutcome> {
        let room_id = self.room_matcher.match_room(desired).await?;

        let (recording, action, meeting) = match existing {
            Some(recording) => {
                let recording = self
                    .update_recording(conn, recording, server_id, room_id, payload)
                    .await?;
                (recording, ReconcileAction::Updated, None)
            }
            None => {
                let (recording, meeting) = self
                    .create_recording(conn, server_id, room_id, payload)
                    .await?;
                (recording, ReconcileAction::Created, meeting)
            }
        };

        let metadata = match &payload.metadata {
            Some(entries) => {
                let desired = entries
                    .iter()
                    .map(|(name, content)| MetadataEntry::new(name, content))
                    .collect();
                let mut store = MetadataStore::new(conn, MetadataOwner::recording(&recording.id));
                Some(reconcile(&mut store, desired).await?)
            }
            None => None,
        };

        let (playback, orphan_types_deleted) = match &payload.playback {
            Some(formats) => {
                let mut store = PlaybackStore::new(
                    conn,
                    &recording.id,
                    self.default_playback_type.clone(),
                );
                let changes = reconcile(&mut store, formats.clone()).await?;
                let collected = playback::delete_orphan_types(conn).await?;
                (Some(changes), collected)
            }
            None => (None, 0),
        };

        debug!(
            recording_id = %recording.id,
            action = ?action,
            metadata = ?metadata,
            playback = ?playback,
            "Reconciled recording"
        );

        Ok(ReconcileOutcome {
            recording,
            action,
            metadata,
            playback,
            orphan_types_deleted,
            meeting,
        })
    }

    /// Fire the statistics refresh for a created recording
    ///
    /// Runs detached from the sync pass; a failing notifier is logged and
    /// otherwise ignored. Returns the task handle when a notification was
    /// dispatched.
    pub fn dispatch_notification(
        &self,
        outcome: &ReconcileOutcome,
    ) -> Option<tokio::task::JoinHandle<()>> {
        let meeting = outcome.notification_target()?;
        let notifier = Arc::clone(&self.notifier);
        let meeting_id = meeting.id.clone();
        let priority = self.notification_priority;
        let record_id = outcome.recording.record_id.clone();

        Some(tokio::spawn(async move {
            if let Err(e) = notifier
                .request_statistics_refresh(&meeting_id, priority)
                .await
            {
                warn!(
                    meeting_id = %meeting_id,
                    record_id = %record_id,
                    error = %e,
                    "Statistics refresh notification failed"
                );
            }
        }))
    }

    async fn update_recording(
        &self,
        conn: &mut SqliteConnection,
        mut recording: Recording,
        server_id: &str,
        room_id: Option<String>,
        payload: &RecordingPayload,
    ) -> Result<Recording> {
        recording.server_id = server_id.to_string();
        recording.room_id = room_id;

        if let Some(meeting_id) = &payload.meetingid {
            recording.meeting_id = Some(meeting_id.clone());
        }
        if let Some(name) = &payload.name {
            recording.name = Some(name.clone());
        }
        if let Some(published) = payload.published {
            recording.published = published;
        }
        if let Some(start_time) = payload.start_time {
            recording.start_time = Some(start_time);
        }
        if let Some(end_time) = payload.end_time {
            recording.end_time = Some(end_time);
        }
        if let Some(size) = payload.size {
            recording.size = Some(size);
        }
        recording.available = true;
        recording.updated_at = self.clock.unix_timestamp();

        validate(&recording)?;

        recordings::update_recording(conn, &recording).await?;

        Ok(recording)
    }

    async fn create_recording(
        &self,
        conn: &mut SqliteConnection,
        server_id: &str,
        room_id: Option<String>,
        payload: &RecordingPayload,
    ) -> Result<(Recording, Option<(Meeting, MatchTier)>)> {
        let record_id = payload.record_id().ok_or(SyncError::MissingRecordId)?;

        let mut recording = Recording::new(record_id, server_id);
        let now = self.clock.unix_timestamp();
        recording.created_at = now;
        recording.updated_at = now;
        recording.room_id = room_id;
        recording.meeting_id = payload.meetingid.clone();
        recording.name = payload.name.clone();
        recording.published = payload.published.unwrap_or(false);
        recording.start_time = payload.start_time;
        recording.end_time = payload.end_time;
        recording.size = payload.size;
        recording.available = true;
        recording.description = Some(Recording::default_description(payload.start_time));

        let meeting = find_meeting(conn, recording.meeting_id.as_deref(), recording.start_time).await?;
        recording.meeting_ref = meeting.as_ref().map(|(meeting, _)| meeting.id.clone());

        validate(&recording)?;

        recordings::insert_recording(conn, &recording).await?;

        Ok((recording, meeting))
    }
}

fn validate(recording: &Recording) -> Result<()> {
    recording
        .validate()
        .map_err(|message| SyncError::InvalidPayload {
            record_id: recording.record_id.clone(),
            message,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key_mapper::map_keys;
    use bridge_traits::{FixedClock, NoRoomMatcher, NoopNotifier};
    use core_library::create_test_pool;
    use serde_json::json;
    use sqlx::SqlitePool;

    async fn setup() -> SqlitePool {
        let pool = create_test_pool().await.unwrap();
        sqlx::query("INSERT INTO servers (id, name, url, created_at) VALUES ('s1', 'Main', 'https://main', 0)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO meetings (id, meeting_id, create_time) VALUES ('session-1', 'm-1', 1700000000000)")
            .execute(&pool)
            .await
            .unwrap();
        pool
    }

    fn reconciler() -> RecordingReconciler {
        RecordingReconciler::new(
            Arc::new(NoRoomMatcher),
            Arc::new(NoopNotifier),
            Arc::new(FixedClock::from_unix(1_800_000_000)),
        )
        .with_default_playback_type(Some("presentation".to_string()))
    }

    async fn run(
        pool: &SqlitePool,
        reconciler: &RecordingReconciler,
        descriptor: Value,
        existing: Option<Recording>,
    ) -> Result<ReconcileOutcome> {
        let mapped = map_keys(descriptor.as_object().cloned().unwrap());
        let payload = RecordingPayload::from_map(mapped.clone())?;
        let mut tx = pool.begin().await.unwrap();
        let outcome = reconciler
            .reconcile(&mut tx, "s1", &mapped, &payload, existing)
            .await?;
        tx.commit().await.unwrap();
        Ok(outcome)
    }

    #[tokio::test]
    async fn test_create_matches_session_and_synthesizes_description() {
        let pool = setup().await;
        let outcome = run(
            &pool,
            &reconciler(),
            json!({
                "recordID": "rec-1",
                "meetingID": "m-1",
                "name": "Weekly",
                "startTime": 1700000000,
                "metadata": { "title": "Weekly" },
                "playback": { "format": { "type": "presentation", "url": "https://p", "length": 3 } },
            }),
            None,
        )
        .await
        .unwrap();

        assert_eq!(outcome.action, ReconcileAction::Created);
        assert_eq!(outcome.recording.meeting_ref.as_deref(), Some("session-1"));
        assert_eq!(outcome.meeting.as_ref().map(|(_, tier)| *tier), Some(MatchTier::MillisToSeconds));
        assert_eq!(
            outcome.recording.description.as_deref(),
            Some("Recording of 2023-11-14 22:13 UTC")
        );
        assert_eq!(outcome.recording.created_at, 1_800_000_000);
        assert_eq!(outcome.metadata.unwrap().created, 1);
        assert_eq!(outcome.playback.unwrap().created, 1);
        assert_eq!(outcome.notification_target().map(|m| m.id.as_str()), Some("session-1"));
    }

    #[tokio::test]
    async fn test_update_overwrites_present_fields_only() {
        let pool = setup().await;
        let reconciler = reconciler();
        let created = run(
            &pool,
            &reconciler,
            json!({ "recordID": "rec-1", "name": "Old", "size": 10, "published": true }),
            None,
        )
        .await
        .unwrap();

        sqlx::query("UPDATE recordings SET available = 0 WHERE id = ?")
            .bind(&created.recording.id)
            .execute(&pool)
            .await
            .unwrap();
        let mut stale = created.recording.clone();
        stale.available = false;

        let updated = run(
            &pool,
            &reconciler,
            json!({ "recordID": "rec-1", "name": "New", "published": false }),
            Some(stale),
        )
        .await
        .unwrap();

        assert_eq!(updated.action, ReconcileAction::Updated);
        assert!(updated.notification_target().is_none());
        let row: (Option<String>, bool, bool, Option<i64>) =
            sqlx::query_as("SELECT name, published, available, size FROM recordings WHERE id = ?")
                .bind(&created.recording.id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(row, (Some("New".to_string()), false, true, Some(10)));
    }

    #[tokio::test]
    async fn test_absent_sub_objects_leave_children_untouched() {
        let pool = setup().await;
        let reconciler = reconciler();
        let created = run(
            &pool,
            &reconciler,
            json!({ "recordID": "rec-1", "metadata": { "a": "1" } }),
            None,
        )
        .await
        .unwrap();

        let updated = run(
            &pool,
            &reconciler,
            json!({ "recordID": "rec-1" }),
            Some(created.recording),
        )
        .await
        .unwrap();
        assert!(updated.metadata.is_none());
        assert!(updated.playback.is_none());

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM metadata")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_duplicate_record_id_fails() {
        let pool = setup().await;
        let reconciler = reconciler();
        run(&pool, &reconciler, json!({ "recordID": "rec-1" }), None)
            .await
            .unwrap();

        let err = run(&pool, &reconciler, json!({ "recordID": "rec-1" }), None)
            .await
            .unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[tokio::test]
    async fn test_missing_record_id() {
        let pool = setup().await;
        let err = run(&pool, &reconciler(), json!({ "name": "nameless" }), None)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::MissingRecordId));
    }
}
