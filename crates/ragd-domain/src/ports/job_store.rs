//! Job Store Port
//!
//! Durable record of each job plus a per-job publish/subscribe channel and
//! a bounded event history for replay. Key layout (Redis backend):
//! `job:{id}` hash, `jobs:active` set, `job:events:{id}` channel,
//! `job:events:{id}:history` list (≤ 100 entries, 1h TTL).
//!
//! Ordering contract: `put` and `publish` are issued sequentially by the
//! orchestrator for a given job, and every `publish` appends to history in
//! the same operation batch, so a subscriber replaying history then
//! listening live never observes a gap.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::Serialize;

use crate::entities::{JobEvent, JobState};
use crate::error::Result;

/// Stream of events for one job's channel
pub type JobEventStream = Pin<Box<dyn Stream<Item = JobEvent> + Send>>;

/// Store health snapshot reported by `/ready`
#[derive(Debug, Clone, Serialize)]
pub struct StoreHealth {
    /// `healthy` or `unhealthy`
    pub status: String,
    /// Round-trip latency of a ping, in milliseconds
    pub ping_ms: f64,
    /// Backend memory in use, in bytes (0 when unknown)
    pub memory_used_bytes: u64,
    /// Size of the active-job set
    pub active_jobs: u64,
}

/// Port for durable job state and event fan-out
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Write a fresh record, add it to the active set, and arm its TTL
    /// (`timeout_seconds + 3600`) in one atomic batch.
    async fn create(&self, job: &JobState) -> Result<()>;

    /// Read one record.
    async fn get(&self, job_id: &str) -> Result<Option<JobState>>;

    /// Overwrite the full record.
    async fn put(&self, job: &JobState) -> Result<()>;

    /// Publish an event on the job's channel and append it to the bounded
    /// history in the same operation batch.
    async fn publish(&self, job_id: &str, event: &JobEvent) -> Result<()>;

    /// Ids currently in the active set, in unspecified order.
    async fn active_ids(&self) -> Result<Vec<String>>;

    /// Drop an id from the active set (stale-entry garbage collection).
    async fn remove_active(&self, job_id: &str) -> Result<()>;

    /// Remove the record, its history, and its active-set membership.
    /// Returns `true` if a record existed.
    async fn delete(&self, job_id: &str) -> Result<bool>;

    /// Event history for a job, oldest first.
    async fn history(&self, job_id: &str) -> Result<Vec<JobEvent>>;

    /// Subscribe to events published after this call.
    async fn subscribe(&self, job_id: &str) -> Result<JobEventStream>;

    /// Ping the backend and report health.
    async fn health(&self) -> Result<StoreHealth>;

    /// Stable provider identifier (`redis`, `memory`)
    fn provider_name(&self) -> &str;
}
