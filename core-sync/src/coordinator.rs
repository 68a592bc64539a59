//! # Sync Coordinator
//!
//! Drives one sync pass of a recording server.
//!
//! ## Workflow
//!
//! 1. Start a [`SyncJob`] and emit `SyncEvent::Started`
//! 2. For every descriptor, in list order:
//!    - map external keys and decode the payload
//!    - open a transaction, look the recording up by record id
//!    - create or update it with its metadata and playback formats
//!    - commit, then dispatch the statistics refresh for new recordings
//! 3. On a full sync, mark every recording of the server that the list did
//!    not mention as unavailable
//! 4. Complete the job and emit `SyncEvent::Completed`
//!
//! A descriptor that fails is rolled back on its own, reported in
//! [`SyncReport::failed`] and announced with `SyncEvent::RecordFailed`; the
//! pass carries on with the next one.
//!
//! Concurrent passes for the same server must be serialized by the caller.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_sync::{SyncConfig, SyncCoordinator};
//!
//! let coordinator = SyncCoordinator::new(
//!     pool,
//!     event_bus,
//!     room_matcher,
//!     notifier,
//!     Arc::new(SystemClock),
//!     SyncConfig::default(),
//! );
//!
//! let report = coordinator.sync_from_source("server-1", &source, true).await?;
//! println!("created {} recordings", report.created);
//! ```

use crate::{
    job::{RecordFailure, SyncJob, SyncJobId, SyncReport},
    key_mapper::map_keys,
    payload::{descriptor_record_id, RecordingPayload},
    reconciler::{ReconcileAction, ReconcileOutcome, RecordingReconciler},
    repository::{SqliteSyncJobRepository, SyncJobRepository},
    Result, SyncError,
};
use bridge_traits::{Clock, NotificationPriority, RecordingSource, RoomMatcher, StatisticsNotifier};
use core_library::repositories::{recording, RecordingRepository, SqliteRecordingRepository};
use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, EventBus, RecordingEvent, SyncEvent};
use serde_json::{Map, Value};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Sync coordinator configuration
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Identifier flagged default when its playback type is first created
    pub default_playback_type: Option<String>,

    /// Priority attached to statistics refresh notifications
    pub notification_priority: NotificationPriority,

    /// Persist a sync job row for every pass
    pub record_history: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            default_playback_type: None,
            notification_priority: NotificationPriority::Low,
            record_history: true,
        }
    }
}

impl From<&CoreConfig> for SyncConfig {
    fn from(config: &CoreConfig) -> Self {
        Self {
            default_playback_type: config.default_playback_type.clone(),
            notification_priority: config.notification_priority,
            record_history: config.record_history,
        }
    }
}

/// Sync coordinator
pub struct SyncCoordinator {
    pool: SqlitePool,

    /// Event bus for emitting sync events
    event_bus: EventBus,

    reconciler: RecordingReconciler,

    /// Timestamps the availability sweep
    clock: Arc<dyn Clock>,

    recordings: Arc<dyn RecordingRepository>,

    job_repository: Arc<dyn SyncJobRepository>,

    config: SyncConfig,
}

impl SyncCoordinator {
    /// Create a new sync coordinator
    ///
    /// # Arguments
    ///
    /// * `pool` - Database pool, migrated
    /// * `event_bus` - Event bus for sync and recording events
    /// * `room_matcher` - Resolves the room of each descriptor
    /// * `notifier` - Receives statistics refresh requests for new recordings
    /// * `clock` - Time source for recording timestamps
    /// * `config` - Sync configuration
    pub fn new(
        pool: SqlitePool,
        event_bus: EventBus,
        room_matcher: Arc<dyn RoomMatcher>,
        notifier: Arc<dyn StatisticsNotifier>,
        clock: Arc<dyn Clock>,
        config: SyncConfig,
    ) -> Self {
        let reconciler = RecordingReconciler::new(room_matcher, notifier, Arc::clone(&clock))
            .with_default_playback_type(config.default_playback_type.clone())
            .with_notification_priority(config.notification_priority);

        Self {
            recordings: Arc::new(SqliteRecordingRepository::new(pool.clone())),
            job_repository: Arc::new(SqliteSyncJobRepository::new(pool.clone())),
            pool,
            event_bus,
            reconciler,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Reconcile the given descriptor list against the server's recordings
    ///
    /// Descriptors use the external field names (`recordID`, `meetingID`,
    /// `startTime`, `endTime`). With `full_sync` the list is taken as
    /// complete and unseen recordings of the server become unavailable.
    ///
    /// # Errors
    ///
    /// Per-record failures are reported in the returned [`SyncReport`].
    /// An error is returned only when the pass itself cannot run: job
    /// history cannot be written or the availability sweep fails.
    #[instrument(skip(self, descriptors), fields(descriptors = descriptors.len()))]
    pub async fn sync_recordings(
        &self,
        server_id: &str,
        descriptors: Vec<Value>,
        full_sync: bool,
    ) -> Result<SyncReport> {
        let job = self.begin_job(server_id, full_sync).await?;
        self.run_pass(job, descriptors).await
    }

    /// Fetch the recording list from `source` and reconcile it
    ///
    /// # Errors
    ///
    /// A fetch error fails the job without touching any recording; in
    /// particular no availability sweep runs.
    #[instrument(skip(self, source))]
    pub async fn sync_from_source(
        &self,
        server_id: &str,
        source: &dyn RecordingSource,
        full_sync: bool,
    ) -> Result<SyncReport> {
        let job = self.begin_job(server_id, full_sync).await?;

        match source.list_recordings(server_id).await {
            Ok(descriptors) => {
                info!(count = descriptors.len(), "Fetched recording list");
                self.run_pass(job, descriptors).await
            }
            Err(e) => {
                error!(error = %e, "Failed to fetch recording list");
                self.fail_job(job, e.to_string()).await;
                Err(e.into())
            }
        }
    }

    /// Get a sync job by id
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::JobNotFound`] if no such job was recorded
    pub async fn get_job(&self, job_id: SyncJobId) -> Result<SyncJob> {
        self.job_repository
            .find_by_id(&job_id)
            .await?
            .ok_or_else(|| SyncError::JobNotFound {
                job_id: job_id.to_string(),
            })
    }

    /// Recorded passes of a server, most recent first
    pub async fn list_history(&self, server_id: &str, limit: u32) -> Result<Vec<SyncJob>> {
        self.job_repository.get_history(server_id, limit).await
    }

    /// Whether a recorded pass of the server is still pending or running
    pub async fn is_sync_active(&self, server_id: &str) -> Result<bool> {
        self.job_repository.has_active_sync(server_id).await
    }

    async fn begin_job(&self, server_id: &str, full_sync: bool) -> Result<SyncJob> {
        let job = SyncJob::new(server_id, full_sync).start()?;

        if self.config.record_history {
            self.job_repository.insert(&job).await?;
        }

        self.event_bus
            .emit(CoreEvent::Sync(SyncEvent::Started {
                job_id: job.id.to_string(),
                server_id: server_id.to_string(),
                is_full_sync: full_sync,
            }))
            .ok();

        info!(job_id = %job.id, server_id, full_sync, "Started recording sync");
        Ok(job)
    }

    async fn run_pass(&self, job: SyncJob, descriptors: Vec<Value>) -> Result<SyncReport> {
        let mut report = SyncReport::new(job.server_id.clone(), job.full_sync);
        report.job_id = Some(job.id);
        report.seen = descriptors.len() as u64;

        let mut seen: Vec<String> = Vec::with_capacity(descriptors.len());

        for (index, descriptor) in descriptors.into_iter().enumerate() {
            let mapped = match descriptor {
                Value::Object(external) => map_keys(external),
                other => {
                    let message = format!("Descriptor is not an object: {}", other);
                    self.record_failure(&job, &mut report, index, None, message);
                    continue;
                }
            };

            let record_id = descriptor_record_id(&mapped);
            if let Some(record_id) = &record_id {
                seen.push(record_id.clone());
            }

            match self.reconcile_record(&job.server_id, mapped).await {
                Ok(outcome) => self.record_outcome(&mut report, outcome),
                Err(e) => self.record_failure(&job, &mut report, index, record_id, e.to_string()),
            }
        }

        if job.full_sync {
            let swept_at = self.clock.unix_timestamp();
            match self
                .recordings
                .mark_unavailable(&job.server_id, &seen, swept_at)
                .await
            {
                Ok(marked) => report.marked_unavailable = marked,
                Err(e) => {
                    error!(job_id = %job.id, error = %e, "Availability sweep failed");
                    self.fail_job(job, e.to_string()).await;
                    return Err(e.into());
                }
            }
        }

        let job = job.complete(report.stats())?;
        if self.config.record_history {
            self.job_repository.update(&job).await?;
        }

        self.event_bus
            .emit(CoreEvent::Sync(SyncEvent::Completed {
                job_id: job.id.to_string(),
                created: report.created,
                updated: report.updated,
                failed: report.failed.len() as u64,
                marked_unavailable: report.marked_unavailable,
                duration_secs: job.duration_secs().unwrap_or(0),
            }))
            .ok();

        info!(
            job_id = %job.id,
            created = report.created,
            updated = report.updated,
            failed = report.failed.len(),
            marked_unavailable = report.marked_unavailable,
            "Recording sync completed"
        );

        Ok(report)
    }

    /// Reconcile one key-mapped descriptor in its own transaction
    async fn reconcile_record(
        &self,
        server_id: &str,
        mapped: Map<String, Value>,
    ) -> Result<ReconcileOutcome> {
        let payload = RecordingPayload::from_map(mapped.clone())?;
        let record_id = payload
            .record_id()
            .ok_or(SyncError::MissingRecordId)?
            .to_string();

        let mut tx = self.pool.begin().await?;

        let existing = recording::load_by_record_id(&mut tx, &record_id).await?;

        // Dropping `tx` on any error below rolls the record back.
        let outcome = self
            .reconciler
            .reconcile(&mut tx, server_id, &mapped, &payload, existing)
            .await?;

        tx.commit().await?;
        Ok(outcome)
    }

    fn record_outcome(&self, report: &mut SyncReport, outcome: ReconcileOutcome) {
        match outcome.action {
            ReconcileAction::Created => report.created += 1,
            ReconcileAction::Updated => report.updated += 1,
        }
        if let Some(changes) = outcome.metadata {
            report.metadata.absorb(changes);
        }
        if let Some(changes) = outcome.playback {
            report.playback.absorb(changes);
        }
        report.orphan_types_deleted += outcome.orphan_types_deleted;

        if outcome.action == ReconcileAction::Created {
            self.reconciler.dispatch_notification(&outcome);

            self.event_bus
                .emit(CoreEvent::Recording(RecordingEvent::Created {
                    recording_id: outcome.recording.id.clone(),
                    record_id: outcome.recording.record_id.clone(),
                    meeting_id: outcome.recording.meeting_ref.clone(),
                }))
                .ok();
        }

        debug!(
            record_id = %outcome.recording.record_id,
            action = ?outcome.action,
            "Recording reconciled"
        );
    }

    fn record_failure(
        &self,
        job: &SyncJob,
        report: &mut SyncReport,
        index: usize,
        record_id: Option<String>,
        message: String,
    ) {
        warn!(
            job_id = %job.id,
            index,
            record_id = ?record_id,
            error = %message,
            "Failed to reconcile recording"
        );

        self.event_bus
            .emit(CoreEvent::Sync(SyncEvent::RecordFailed {
                job_id: job.id.to_string(),
                record_id: record_id.clone(),
                message: message.clone(),
            }))
            .ok();

        report.failed.push(RecordFailure {
            index,
            record_id,
            message,
        });
    }

    /// Mark the job failed; history errors are logged, not returned
    async fn fail_job(&self, job: SyncJob, message: String) {
        let job_id = job.id;

        self.event_bus
            .emit(CoreEvent::Sync(SyncEvent::Failed {
                job_id: job_id.to_string(),
                message: message.clone(),
            }))
            .ok();

        let failed = match job.fail(message) {
            Ok(failed) => failed,
            Err(e) => {
                warn!(job_id = %job_id, error = %e, "Could not mark sync job failed");
                return;
            }
        };

        if self.config.record_history {
            if let Err(e) = self.job_repository.update(&failed).await {
                warn!(job_id = %job_id, error = %e, "Failed to record sync job failure");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::SyncStatus;
    use async_trait::async_trait;
    use bridge_traits::{BridgeError, FixedClock, NoRoomMatcher, NoopNotifier};
    use core_library::create_test_pool;
    use mockall::mock;
    use serde_json::json;

    mock! {
        Source {}

        #[async_trait]
        impl RecordingSource for Source {
            async fn list_recordings(&self, server_id: &str) -> bridge_traits::error::Result<Vec<Value>>;
        }
    }

    async fn setup() -> (SyncCoordinator, SqlitePool) {
        let pool = create_test_pool().await.unwrap();
        sqlx::query("INSERT INTO servers (id, name, url, created_at) VALUES ('s1', 'Main', 'https://main', 0)")
            .execute(&pool)
            .await
            .unwrap();

        let coordinator = SyncCoordinator::new(
            pool.clone(),
            EventBus::new(64),
            Arc::new(NoRoomMatcher),
            Arc::new(NoopNotifier),
            Arc::new(FixedClock::from_unix(1_800_000_000)),
            SyncConfig::default(),
        );
        (coordinator, pool)
    }

    async fn available(pool: &SqlitePool, record_id: &str) -> bool {
        sqlx::query_scalar::<_, bool>("SELECT available FROM recordings WHERE record_id = ?")
            .bind(record_id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[test]
    fn test_config_from_core_config() {
        let core = CoreConfig::builder()
            .database_path("/tmp/recordings.db")
            .default_playback_type("presentation")
            .notification_priority(NotificationPriority::High)
            .record_history(false)
            .build()
            .unwrap();

        let config = SyncConfig::from(&core);
        assert_eq!(config.default_playback_type.as_deref(), Some("presentation"));
        assert_eq!(config.notification_priority, NotificationPriority::High);
        assert!(!config.record_history);
    }

    #[tokio::test]
    async fn test_failures_do_not_abort_the_pass() {
        let (coordinator, pool) = setup().await;

        let report = coordinator
            .sync_recordings(
                "s1",
                vec![
                    json!("not an object"),
                    json!({ "name": "no id" }),
                    json!({ "recordID": "bad", "size": [1, 2] }),
                    json!({ "recordID": "good", "name": "Weekly" }),
                ],
                true,
            )
            .await
            .unwrap();

        assert_eq!(report.created, 1);
        assert_eq!(report.failed.len(), 3);
        assert_eq!(report.failed[0].index, 0);
        assert_eq!(report.failed[1].record_id, None);
        assert_eq!(report.failed[2].record_id.as_deref(), Some("bad"));
        assert!(available(&pool, "good").await);
    }

    #[tokio::test]
    async fn test_job_history_is_recorded() {
        let (coordinator, _pool) = setup().await;

        let report = coordinator
            .sync_recordings("s1", vec![json!({ "recordID": "r-1" })], false)
            .await
            .unwrap();

        let job = coordinator.get_job(report.job_id.unwrap()).await.unwrap();
        assert_eq!(job.status, SyncStatus::Completed);
        assert_eq!(job.stats.unwrap().items_created, 1);
        assert!(!job.full_sync);

        let history = coordinator.list_history("s1", 10).await.unwrap();
        assert_eq!(history.len(), 1);
        assert!(!coordinator.is_sync_active("s1").await.unwrap());
    }

    #[tokio::test]
    async fn test_source_failure_skips_the_sweep() {
        let (coordinator, pool) = setup().await;
        coordinator
            .sync_recordings("s1", vec![json!({ "recordID": "r-1" })], true)
            .await
            .unwrap();

        let mut source = MockSource::new();
        source
            .expect_list_recordings()
            .returning(|_| Err(BridgeError::OperationFailed("server down".to_string())));

        let result = coordinator.sync_from_source("s1", &source, true).await;
        assert!(matches!(result, Err(SyncError::Bridge(_))));
        assert!(available(&pool, "r-1").await);

        let latest = coordinator.list_history("s1", 1).await.unwrap();
        assert_eq!(latest[0].status, SyncStatus::Failed);
        assert!(latest[0].error_message.as_deref().unwrap().contains("server down"));
    }

    #[tokio::test]
    async fn test_sync_from_source_runs_the_pass() {
        let (coordinator, pool) = setup().await;

        let mut source = MockSource::new();
        source
            .expect_list_recordings()
            .times(1)
            .returning(|_| Ok(vec![json!({ "recordID": "r-1", "published": "true" })]));

        let report = coordinator.sync_from_source("s1", &source, true).await.unwrap();
        assert_eq!(report.created, 1);
        assert!(available(&pool, "r-1").await);
    }

    #[tokio::test]
    async fn test_events_are_emitted() {
        let (coordinator, _pool) = setup().await;
        let mut events = coordinator.event_bus.subscribe();

        coordinator
            .sync_recordings("s1", vec![json!({ "recordID": "r-1" }), json!(7)], false)
            .await
            .unwrap();

        assert!(matches!(
            events.recv().await.unwrap(),
            CoreEvent::Sync(SyncEvent::Started { is_full_sync: false, .. })
        ));
        assert!(matches!(
            events.recv().await.unwrap(),
            CoreEvent::Recording(RecordingEvent::Created { .. })
        ));
        assert!(matches!(
            events.recv().await.unwrap(),
            CoreEvent::Sync(SyncEvent::RecordFailed { record_id: None, .. })
        ));
        assert!(matches!(
            events.recv().await.unwrap(),
            CoreEvent::Sync(SyncEvent::Completed { created: 1, failed: 1, .. })
        ));
    }
}
