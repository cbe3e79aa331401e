//! Job orchestrator
//!
//! Lifecycle API over the job store: admission-controlled create, patch
//! updates with event publication, subscription streams that close on
//! terminal events, and cleanup. Every store call passes through the
//! circuit breaker; while open, calls fail fast with `StoreUnavailable`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_stream::stream;
use futures::StreamExt;
use ragd_domain::entities::{JobEvent, JobPatch, JobState};
use ragd_domain::error::{Error, Result};
use ragd_domain::ports::{JobEventStream, JobStore, StoreHealth};
use ragd_domain::utils::{id, time};

use crate::circuit_breaker::CircuitBreaker;

/// Default whole-job deadline
pub const DEFAULT_JOB_TIMEOUT_SECS: u64 = 300;
/// Default fetch retries per job
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// Store failures before the breaker opens
const BREAKER_FAILURE_THRESHOLD: u32 = 3;
/// Breaker recovery window
const BREAKER_RECOVERY_TIMEOUT: Duration = Duration::from_secs(30);
/// Subscriptions with no events for this long are closed
const SUBSCRIPTION_IDLE_TIMEOUT: Duration = Duration::from_secs(300);

/// Orchestrates job lifecycle over a [`JobStore`]
pub struct JobOrchestrator {
    store: Arc<dyn JobStore>,
    breaker: CircuitBreaker,
    max_concurrent_jobs: usize,
}

impl JobOrchestrator {
    /// Create an orchestrator with the given admission ceiling.
    #[must_use]
    pub fn new(store: Arc<dyn JobStore>, max_concurrent_jobs: usize) -> Self {
        Self {
            store,
            breaker: CircuitBreaker::new(BREAKER_FAILURE_THRESHOLD, BREAKER_RECOVERY_TIMEOUT),
            max_concurrent_jobs,
        }
    }

    /// Admission ceiling for queued+running jobs
    #[must_use]
    pub fn max_concurrent_jobs(&self) -> usize {
        self.max_concurrent_jobs
    }

    /// Name of the backing store (`redis`, `memory`)
    #[must_use]
    pub fn store_name(&self) -> &str {
        self.store.provider_name()
    }

    fn check_breaker(&self) -> Result<()> {
        if self.breaker.try_acquire() {
            Ok(())
        } else {
            Err(Error::StoreUnavailable)
        }
    }

    /// Feed the breaker from a store-call outcome and pass it through.
    fn note<T>(&self, result: Result<T>) -> Result<T> {
        match &result {
            Ok(_) => self.breaker.on_success(),
            Err(error) if error.is_store_failure() => self.breaker.on_failure(),
            Err(_) => {}
        }
        result
    }

    /// Create a new job, enforcing the admission ceiling.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AdmissionDenied`] when queued+running jobs already
    /// meet the ceiling, and store errors otherwise.
    pub async fn create(
        &self,
        timeout_seconds: u64,
        max_retries: u32,
        metadata: HashMap<String, serde_json::Value>,
    ) -> Result<JobState> {
        // Admission counts over the whole active set; terminal jobs linger
        // there until cleanup and must not shadow queued ones.
        let active = self.list_active(usize::MAX).await?;
        let running = active.iter().filter(|job| job.status.is_active()).count();
        if running >= self.max_concurrent_jobs {
            tracing::warn!(
                active_jobs = running,
                limit = self.max_concurrent_jobs,
                "max concurrent jobs reached"
            );
            return Err(Error::AdmissionDenied {
                limit: self.max_concurrent_jobs,
            });
        }

        let now = time::epoch_secs_f64()?;
        let mut job = JobState::new(id::prefixed("job"), now, timeout_seconds, max_retries);
        job.metadata = metadata;

        self.check_breaker()?;
        self.note(self.store.create(&job).await)?;
        let event = job.created_event(id::event_id(time::epoch_millis_u64()?));
        self.note(self.store.publish(&job.job_id, &event).await)?;

        tracing::info!(
            job_id = %job.job_id,
            active_jobs = running + 1,
            limit = self.max_concurrent_jobs,
            "job created"
        );
        Ok(job)
    }

    /// Read one job.
    pub async fn get(&self, job_id: &str) -> Result<Option<JobState>> {
        self.check_breaker()?;
        self.note(self.store.get(job_id).await)
    }

    /// Apply a patch and publish the matching `job_updated` event.
    ///
    /// Returns `false` when the job does not exist. The store write and
    /// the publish are issued sequentially so any one subscriber observes
    /// updates in wall-clock order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for terminal → non-terminal patches
    /// and store errors otherwise.
    pub async fn update(&self, job_id: &str, patch: &JobPatch) -> Result<bool> {
        self.check_breaker()?;
        let Some(mut job) = self.note(self.store.get(job_id).await)? else {
            tracing::warn!(job_id, "job not found for update");
            return Ok(false);
        };

        job.apply(patch, time::epoch_secs_f64()?)?;
        self.note(self.store.put(&job).await)?;
        let event = job.updated_event(id::event_id(time::epoch_millis_u64()?));
        self.note(self.store.publish(job_id, &event).await)?;

        tracing::debug!(job_id, status = %job.status, stage = %job.stage, "job updated");
        Ok(true)
    }

    /// Most-recently-updated active jobs, garbage-collecting stale ids.
    pub async fn list_active(&self, limit: usize) -> Result<Vec<JobState>> {
        self.check_breaker()?;
        let ids = self.note(self.store.active_ids().await)?;

        let mut jobs = Vec::new();
        for job_id in &ids {
            match self.note(self.store.get(job_id).await)? {
                Some(job) => jobs.push(job),
                None => {
                    // Record expired but the set entry survived.
                    self.note(self.store.remove_active(job_id).await)?;
                }
            }
        }
        jobs.sort_by(|a, b| b.updated_at.total_cmp(&a.updated_at));
        jobs.truncate(limit);
        Ok(jobs)
    }

    /// Full bounded event history for a job, oldest first.
    pub async fn history(&self, job_id: &str) -> Result<Vec<JobEvent>> {
        self.check_breaker()?;
        self.note(self.store.history(job_id).await)
    }

    /// Events recorded after `last_event_id` in the job's bounded history.
    ///
    /// An unknown id yields an empty replay, per the streaming contract.
    pub async fn events_after(&self, job_id: &str, last_event_id: &str) -> Result<Vec<JobEvent>> {
        self.check_breaker()?;
        let history = self.note(self.store.history(job_id).await)?;
        let Some(position) = history
            .iter()
            .position(|event| event.event_id == last_event_id)
        else {
            return Ok(Vec::new());
        };
        Ok(history[position + 1..].to_vec())
    }

    /// Subscribe to a job's events.
    ///
    /// The stream yields events published after this call and closes
    /// right after a terminal `job_updated`, or when the subscription has
    /// been idle for five minutes.
    pub async fn subscribe(&self, job_id: &str) -> Result<JobEventStream> {
        self.check_breaker()?;
        let mut inner = self.note(self.store.subscribe(job_id).await)?;
        let job_id = job_id.to_owned();

        let stream = stream! {
            loop {
                match tokio::time::timeout(SUBSCRIPTION_IDLE_TIMEOUT, inner.next()).await {
                    Ok(Some(event)) => {
                        let terminal = event.is_terminal();
                        yield event;
                        if terminal {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(_) => {
                        tracing::warn!(job_id = %job_id, "job event subscription idle timeout");
                        break;
                    }
                }
            }
        };
        Ok(Box::pin(stream))
    }

    /// Remove a job's record, history, and active-set membership.
    pub async fn cleanup(&self, job_id: &str) -> Result<bool> {
        self.check_breaker()?;
        let removed = self.note(self.store.delete(job_id).await)?;
        if removed {
            tracing::info!(job_id, "job cleaned up");
        }
        Ok(removed)
    }

    /// Remove terminal jobs whose last update is older than `hours`.
    pub async fn cleanup_older_than(&self, hours: u64) -> Result<u64> {
        self.check_breaker()?;
        #[allow(clippy::cast_precision_loss)]
        let cutoff = time::epoch_secs_f64()? - (hours * 3600) as f64;

        let ids = self.note(self.store.active_ids().await)?;
        let mut cleaned = 0;
        for job_id in ids {
            let Some(job) = self.note(self.store.get(&job_id).await)? else {
                continue;
            };
            if job.status.is_terminal() && job.updated_at < cutoff {
                self.note(self.store.delete(&job_id).await)?;
                cleaned += 1;
            }
        }
        tracing::info!(cleaned, "cleaned up completed jobs");
        Ok(cleaned)
    }

    /// Store health used by the readiness probe.
    pub async fn health(&self) -> Result<StoreHealth> {
        self.check_breaker()?;
        self.note(self.store.health().await)
    }
}

#[async_trait::async_trait]
impl ragd_domain::ports::JobProgress for JobOrchestrator {
    async fn advance(&self, job_id: &str, patch: &JobPatch) -> Result<bool> {
        self.update(job_id, patch).await
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;
    use ragd_domain::entities::{JobStage, JobStatus};

    use super::*;
    use crate::jobs::MemoryJobStore;

    fn orchestrator(limit: usize) -> JobOrchestrator {
        JobOrchestrator::new(Arc::new(MemoryJobStore::new()), limit)
    }

    #[tokio::test]
    async fn create_get_round_trip() {
        let orch = orchestrator(10);
        let job = orch
            .create(DEFAULT_JOB_TIMEOUT_SECS, DEFAULT_MAX_RETRIES, HashMap::new())
            .await
            .expect("create");
        assert!(job.job_id.starts_with("job_"));

        let loaded = orch.get(&job.job_id).await.expect("get").expect("exists");
        assert_eq!(loaded.status, JobStatus::Queued);
        assert_eq!(loaded.timeout_seconds, DEFAULT_JOB_TIMEOUT_SECS);
    }

    #[tokio::test]
    async fn admission_is_denied_at_the_ceiling() {
        let orch = orchestrator(2);
        orch.create(300, 3, HashMap::new()).await.expect("first");
        orch.create(300, 3, HashMap::new()).await.expect("second");

        let err = orch.create(300, 3, HashMap::new()).await.unwrap_err();
        assert!(matches!(err, Error::AdmissionDenied { limit: 2 }));
    }

    #[tokio::test]
    async fn terminal_jobs_free_admission_slots() {
        let orch = orchestrator(1);
        let job = orch.create(300, 3, HashMap::new()).await.expect("create");
        orch.update(&job.job_id, &JobPatch::failed("boom"))
            .await
            .expect("fail job");

        orch.create(300, 3, HashMap::new())
            .await
            .expect("slot freed by terminal job");
    }

    #[tokio::test]
    async fn update_publishes_monotonic_events_and_closes_on_terminal() {
        let orch = orchestrator(10);
        let job = orch.create(300, 3, HashMap::new()).await.expect("create");
        let subscription = orch.subscribe(&job.job_id).await.expect("subscribe");

        for (stage, progress) in [
            (JobStage::Fetching, 10.0),
            (JobStage::Chunking, 20.0),
            (JobStage::Embedding, 40.0),
        ] {
            orch.update(&job.job_id, &JobPatch::progress(stage, progress, "working"))
                .await
                .expect("update");
        }
        let done = JobPatch {
            status: Some(JobStatus::Success),
            stage: Some(JobStage::Completed),
            progress: Some(100.0),
            chunks_created: Some(4),
            message: Some("done".to_owned()),
            ..JobPatch::default()
        };
        orch.update(&job.job_id, &done).await.expect("complete");

        // Stream must deliver every event in order and then close.
        let events: Vec<_> = subscription.collect().await;
        assert_eq!(events.len(), 4);
        let progresses: Vec<f64> = events.iter().filter_map(|e| e.progress).collect();
        assert_eq!(progresses, vec![10.0, 20.0, 40.0, 100.0]);
        assert!(events.last().expect("last").is_terminal());

        let mut ids: Vec<&String> = events.iter().map(|e| &e.event_id).collect();
        let sorted = {
            let mut sorted = ids.clone();
            sorted.sort();
            sorted
        };
        assert_eq!(ids, sorted, "event ids must be monotonically ordered");
        ids.dedup();
        assert_eq!(ids.len(), events.len());
    }

    #[tokio::test]
    async fn update_unknown_job_returns_false() {
        let orch = orchestrator(10);
        let updated = orch
            .update("job_missing00000", &JobPatch::failed("boom"))
            .await
            .expect("update call succeeds");
        assert!(!updated);
    }

    #[tokio::test]
    async fn events_after_replays_only_the_tail() {
        use ragd_domain::ports::JobStore as _;
        let store = Arc::new(MemoryJobStore::new());
        let orch = JobOrchestrator::new(Arc::clone(&store) as Arc<dyn JobStore>, 10);
        let job = orch.create(300, 3, HashMap::new()).await.expect("create");
        orch.update(
            &job.job_id,
            &JobPatch::progress(JobStage::Fetching, 10.0, "fetching"),
        )
        .await
        .expect("update 1");
        orch.update(
            &job.job_id,
            &JobPatch::progress(JobStage::Chunking, 20.0, "chunking"),
        )
        .await
        .expect("update 2");

        let history = store.history(&job.job_id).await.expect("history");
        assert_eq!(history.len(), 3, "created + two updates");

        // Resuming from the first update replays exactly what followed it.
        let tail = orch
            .events_after(&job.job_id, &history[1].event_id)
            .await
            .expect("replay");
        assert_eq!(tail.len(), 1);
        assert_eq!(tail[0].event_id, history[2].event_id);
        assert!(tail[0].event_id > history[1].event_id);

        let unknown = orch
            .events_after(&job.job_id, "evt_unknown")
            .await
            .expect("replay");
        assert!(unknown.is_empty(), "unknown id replays nothing");
    }

    #[tokio::test]
    async fn list_active_is_most_recent_first() {
        let orch = orchestrator(10);
        let first = orch.create(300, 3, HashMap::new()).await.expect("a");
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = orch.create(300, 3, HashMap::new()).await.expect("b");
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        orch.update(
            &first.job_id,
            &JobPatch::progress(JobStage::Fetching, 10.0, "fetching"),
        )
        .await
        .expect("touch first");

        let active = orch.list_active(10).await.expect("list");
        assert_eq!(active[0].job_id, first.job_id);
        assert_eq!(active[1].job_id, second.job_id);

        let limited = orch.list_active(1).await.expect("list limited");
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn cleanup_older_than_spares_recent_and_running_jobs() {
        let store = Arc::new(MemoryJobStore::new());
        let orch = JobOrchestrator::new(Arc::clone(&store) as Arc<dyn JobStore>, 10);

        let old_terminal = orch.create(300, 3, HashMap::new()).await.expect("old");
        let running = orch.create(300, 3, HashMap::new()).await.expect("running");
        orch.update(&old_terminal.job_id, &JobPatch::failed("boom"))
            .await
            .expect("fail");

        // Age the terminal job well past the cutoff.
        {
            use ragd_domain::ports::JobStore as _;
            let mut aged = store
                .get(&old_terminal.job_id)
                .await
                .expect("get")
                .expect("exists");
            aged.updated_at -= 48.0 * 3600.0;
            store.put(&aged).await.expect("age");
        }

        let cleaned = orch.cleanup_older_than(24).await.expect("cleanup");
        assert_eq!(cleaned, 1);
        assert!(orch.get(&old_terminal.job_id).await.expect("get").is_none());
        assert!(orch.get(&running.job_id).await.expect("get").is_some());
    }

    #[tokio::test]
    async fn open_breaker_fails_fast() {
        let orch = orchestrator(10);
        for _ in 0..3 {
            orch.breaker.on_failure();
        }
        let err = orch.get("job_x").await.unwrap_err();
        assert!(matches!(err, Error::StoreUnavailable));
    }
}
