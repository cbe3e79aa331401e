//! In-process job store
//!
//! Same contract as the Redis store, backed by concurrent maps and a
//! broadcast channel per job. Selected with `STORE_URL=memory`; also the
//! backend the test suite runs against.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use dashmap::DashMap;
use futures::stream;
use ragd_domain::entities::{JobEvent, JobState};
use ragd_domain::error::{Error, Result};
use ragd_domain::ports::{JobEventStream, JobStore, StoreHealth};
use ragd_domain::utils::time;
use tokio::sync::broadcast;

use super::{EVENT_HISTORY_LIMIT, EVENT_HISTORY_TTL_SECS};

const CHANNEL_CAPACITY: usize = 256;

/// In-memory implementation of the job store port
pub struct MemoryJobStore {
    jobs: DashMap<String, JobState>,
    history: DashMap<String, VecDeque<JobEvent>>,
    channels: DashMap<String, broadcast::Sender<JobEvent>>,
    active: Mutex<Vec<String>>,
}

impl MemoryJobStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            jobs: DashMap::new(),
            history: DashMap::new(),
            channels: DashMap::new(),
            active: Mutex::new(Vec::new()),
        }
    }

    fn channel(&self, job_id: &str) -> broadcast::Sender<JobEvent> {
        self.channels
            .entry(job_id.to_owned())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }

    fn active_lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<String>>> {
        self.active
            .lock()
            .map_err(|_| Error::store("active set poisoned"))
    }
}

impl Default for MemoryJobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create(&self, job: &JobState) -> Result<()> {
        self.jobs.insert(job.job_id.clone(), job.clone());
        let mut active = self.active_lock()?;
        if !active.contains(&job.job_id) {
            active.push(job.job_id.clone());
        }
        Ok(())
    }

    async fn get(&self, job_id: &str) -> Result<Option<JobState>> {
        Ok(self.jobs.get(job_id).map(|entry| entry.clone()))
    }

    async fn put(&self, job: &JobState) -> Result<()> {
        self.jobs.insert(job.job_id.clone(), job.clone());
        Ok(())
    }

    async fn publish(&self, job_id: &str, event: &JobEvent) -> Result<()> {
        // History append and fan-out happen in one batch, mirroring the
        // Redis pipeline, so replay never misses a published event.
        let now = time::epoch_secs_f64()?;
        {
            let mut history = self.history.entry(job_id.to_owned()).or_default();
            history.push_back(event.clone());
            while history.len() > EVENT_HISTORY_LIMIT {
                history.pop_front();
            }
            #[allow(clippy::cast_precision_loss)]
            history.retain(|e| now - e.timestamp <= EVENT_HISTORY_TTL_SECS as f64);
        }
        // A send error only means nobody is subscribed right now.
        let _ = self.channel(job_id).send(event.clone());
        Ok(())
    }

    async fn active_ids(&self) -> Result<Vec<String>> {
        Ok(self.active_lock()?.clone())
    }

    async fn remove_active(&self, job_id: &str) -> Result<()> {
        self.active_lock()?.retain(|id| id != job_id);
        Ok(())
    }

    async fn delete(&self, job_id: &str) -> Result<bool> {
        let existed = self.jobs.remove(job_id).is_some();
        self.history.remove(job_id);
        self.channels.remove(job_id);
        self.active_lock()?.retain(|id| id != job_id);
        Ok(existed)
    }

    async fn history(&self, job_id: &str) -> Result<Vec<JobEvent>> {
        let now = time::epoch_secs_f64()?;
        Ok(self
            .history
            .get(job_id)
            .map(|events| {
                #[allow(clippy::cast_precision_loss)]
                events
                    .iter()
                    .filter(|e| now - e.timestamp <= EVENT_HISTORY_TTL_SECS as f64)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn subscribe(&self, job_id: &str) -> Result<JobEventStream> {
        let receiver = self.channel(job_id).subscribe();
        let stream = stream::unfold(receiver, |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(event) => return Some((event, rx)),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "job event subscriber lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        });
        Ok(Box::pin(stream))
    }

    async fn health(&self) -> Result<StoreHealth> {
        #[allow(clippy::cast_possible_truncation)]
        let active_jobs = self.active_lock()?.len() as u64;
        Ok(StoreHealth {
            status: "healthy".to_owned(),
            ping_ms: 0.0,
            memory_used_bytes: 0,
            active_jobs,
        })
    }

    fn provider_name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;
    use ragd_domain::entities::{JobPatch, JobStage};

    use super::*;

    fn job(id: &str) -> JobState {
        JobState::new(id.to_owned(), 1_000.0, 300, 3)
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let store = MemoryJobStore::new();
        store.create(&job("job_a")).await.expect("create");
        let loaded = store.get("job_a").await.expect("get").expect("exists");
        assert_eq!(loaded.job_id, "job_a");
        assert_eq!(store.active_ids().await.expect("ids"), vec!["job_a"]);
    }

    #[tokio::test]
    async fn publish_appends_history_and_fans_out() {
        let store = MemoryJobStore::new();
        let mut state = job("job_b");
        store.create(&state).await.expect("create");

        let mut subscription = store.subscribe("job_b").await.expect("subscribe");

        let now = time::epoch_secs_f64().expect("clock");
        state.created_at = now;
        state.updated_at = now;
        let event = state.created_event("evt_0000000000001_000001".to_owned());
        store.publish("job_b", &event).await.expect("publish");

        let received = subscription.next().await.expect("event arrives");
        assert_eq!(received.event_id, event.event_id);

        let history = store.history("job_b").await.expect("history");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].event_id, event.event_id);
    }

    #[tokio::test]
    async fn history_is_bounded() {
        let store = MemoryJobStore::new();
        let mut state = job("job_c");
        store.create(&state).await.expect("create");
        let now = time::epoch_secs_f64().expect("clock");

        for i in 0..150 {
            state.updated_at = now;
            let patch = JobPatch::progress(JobStage::Embedding, 40.0, format!("step {i}"));
            state.apply(&patch, now).expect("apply");
            let event = state.updated_event(format!("evt_{now:.0}_{i:06}"));
            store.publish("job_c", &event).await.expect("publish");
        }

        let history = store.history("job_c").await.expect("history");
        assert_eq!(history.len(), EVENT_HISTORY_LIMIT);
        // Oldest entries were trimmed, newest survive.
        assert!(history[0].message.as_deref().expect("msg").contains("50"));
    }

    #[tokio::test]
    async fn delete_removes_everything() {
        let store = MemoryJobStore::new();
        let state = job("job_d");
        store.create(&state).await.expect("create");
        store
            .publish("job_d", &state.created_event("evt_1".to_owned()))
            .await
            .expect("publish");

        assert!(store.delete("job_d").await.expect("delete"));
        assert!(store.get("job_d").await.expect("get").is_none());
        assert!(store.history("job_d").await.expect("history").is_empty());
        assert!(store.active_ids().await.expect("ids").is_empty());
        assert!(!store.delete("job_d").await.expect("second delete"));
    }
}
