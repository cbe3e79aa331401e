//! Job Progress Port
//!
//! Seam between the ingestion pipeline and the orchestrator: the worker
//! only ever advances its own job through patches.

use async_trait::async_trait;

use crate::entities::JobPatch;
use crate::error::Result;

/// Port for publishing job progress
#[async_trait]
pub trait JobProgress: Send + Sync {
    /// Apply a patch to a job and publish the matching event.
    /// Returns `false` when the job no longer exists.
    async fn advance(&self, job_id: &str, patch: &JobPatch) -> Result<bool>;
}
