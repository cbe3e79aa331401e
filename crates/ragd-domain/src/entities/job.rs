//! Ingestion job entity and its observable events.
//!
//! A job is the durable record behind one document ingestion. Its status
//! moves `queued → running → {success | error | cancelled}` and never back;
//! every state write is paired with a published [`JobEvent`] so observers
//! (pollers and SSE subscribers) see the same monotonic sequence.

use std::collections::HashMap;

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Lifecycle status of an ingestion job
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Job is waiting to be picked up
    #[display("queued")]
    Queued,
    /// Job is currently executing
    #[display("running")]
    Running,
    /// Job completed successfully
    #[display("success")]
    Success,
    /// Job terminated with an error
    #[display("error")]
    Error,
    /// Job was manually cancelled
    #[display("cancelled")]
    Cancelled,
}

impl JobStatus {
    /// Returns `true` if the job is in a terminal state
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Error | Self::Cancelled)
    }

    /// Returns `true` if the job counts against the admission ceiling
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, Self::Queued | Self::Running)
    }

    /// Parse from the stored string form
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "queued" => Some(Self::Queued),
            "running" => Some(Self::Running),
            "success" => Some(Self::Success),
            "error" => Some(Self::Error),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// Pipeline stage label carried on jobs and events
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display)]
#[serde(rename_all = "lowercase")]
pub enum JobStage {
    /// Job created, worker not started yet
    #[display("initialized")]
    Initialized,
    /// Fetching and cleaning content
    #[display("fetching")]
    Fetching,
    /// Splitting content into semantic chunks
    #[display("chunking")]
    Chunking,
    /// Requesting embeddings for chunk texts
    #[display("embedding")]
    Embedding,
    /// Upserting vectors into the vector store
    #[display("storing")]
    Storing,
    /// Extending the lexical index
    #[display("indexing")]
    Indexing,
    /// Terminal success stage
    #[display("completed")]
    Completed,
    /// Terminal failure stage
    #[display("error")]
    Error,
}

impl JobStage {
    /// Parse from the stored string form
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "initialized" => Some(Self::Initialized),
            "fetching" => Some(Self::Fetching),
            "chunking" => Some(Self::Chunking),
            "embedding" => Some(Self::Embedding),
            "storing" => Some(Self::Storing),
            "indexing" => Some(Self::Indexing),
            "completed" => Some(Self::Completed),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

/// Durable state of one ingestion job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobState {
    /// Unique opaque identifier (`job_` + 12 hex chars)
    pub job_id: String,
    /// Current lifecycle status
    pub status: JobStatus,
    /// Current pipeline stage
    pub stage: JobStage,
    /// Progress percentage in `[0.0, 100.0]`
    pub progress: f64,
    /// Human-readable progress message
    pub message: Option<String>,
    /// Number of chunks written so far
    pub chunks_created: u64,
    /// Creation time (Unix epoch seconds)
    pub created_at: f64,
    /// Last update time (Unix epoch seconds, `>= created_at`)
    pub updated_at: f64,
    /// Fetch retries performed so far
    pub retry_count: u32,
    /// Maximum fetch retries allowed
    pub max_retries: u32,
    /// Whole-job deadline in seconds
    pub timeout_seconds: u64,
    /// Opaque caller-supplied metadata
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl JobState {
    /// Create a new job in `Queued`/`Initialized` state at the given time.
    #[must_use]
    pub fn new(job_id: String, now: f64, timeout_seconds: u64, max_retries: u32) -> Self {
        Self {
            job_id,
            status: JobStatus::Queued,
            stage: JobStage::Initialized,
            progress: 0.0,
            message: None,
            chunks_created: 0,
            created_at: now,
            updated_at: now,
            retry_count: 0,
            max_retries,
            timeout_seconds,
            metadata: HashMap::new(),
        }
    }

    /// Apply an allowed-field patch, refreshing `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Validation`] for a terminal → non-terminal
    /// status transition; the stored record is left untouched.
    pub fn apply(&mut self, patch: &JobPatch, now: f64) -> crate::Result<()> {
        if let Some(status) = patch.status {
            if self.status.is_terminal() && !status.is_terminal() {
                return Err(crate::Error::validation(format!(
                    "job {} is {} and cannot transition to {status}",
                    self.job_id, self.status
                )));
            }
            self.status = status;
        }
        if let Some(stage) = patch.stage {
            self.stage = stage;
        }
        if let Some(progress) = patch.progress {
            self.progress = progress.clamp(0.0, 100.0);
        }
        if let Some(message) = &patch.message {
            self.message = Some(message.clone());
        }
        if let Some(chunks) = patch.chunks_created {
            self.chunks_created = chunks;
        }
        if let Some(retries) = patch.retry_count {
            self.retry_count = retries;
        }
        if let Some(metadata) = &patch.metadata {
            self.metadata.extend(metadata.clone());
        }
        self.updated_at = now;
        Ok(())
    }

    /// The `job_updated` event mirroring this state.
    #[must_use]
    pub fn updated_event(&self, event_id: String) -> JobEvent {
        JobEvent {
            event_type: JobEventType::JobUpdated,
            job_id: self.job_id.clone(),
            status: Some(self.status),
            stage: Some(self.stage),
            progress: Some(self.progress),
            message: self.message.clone(),
            chunks_created: Some(self.chunks_created),
            timestamp: self.updated_at,
            event_id,
        }
    }

    /// The `job_created` event for a freshly created record.
    #[must_use]
    pub fn created_event(&self, event_id: String) -> JobEvent {
        JobEvent {
            event_type: JobEventType::JobCreated,
            job_id: self.job_id.clone(),
            status: Some(self.status),
            stage: None,
            progress: None,
            message: None,
            chunks_created: None,
            timestamp: self.created_at,
            event_id,
        }
    }
}

/// Allowed-field patch for [`JobState::apply`]
#[derive(Debug, Clone, Default)]
pub struct JobPatch {
    /// New status, if changing
    pub status: Option<JobStatus>,
    /// New stage, if changing
    pub stage: Option<JobStage>,
    /// New progress percentage, if changing
    pub progress: Option<f64>,
    /// New progress message, if changing
    pub message: Option<String>,
    /// New chunk count, if changing
    pub chunks_created: Option<u64>,
    /// New retry counter, if changing
    pub retry_count: Option<u32>,
    /// Metadata entries to merge in
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

impl JobPatch {
    /// Patch advancing a running job to the given stage/progress/message.
    #[must_use]
    pub fn progress(stage: JobStage, progress: f64, message: impl Into<String>) -> Self {
        Self {
            status: Some(JobStatus::Running),
            stage: Some(stage),
            progress: Some(progress),
            message: Some(message.into()),
            ..Self::default()
        }
    }

    /// Patch terminating a job with an error message.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: Some(JobStatus::Error),
            stage: Some(JobStage::Error),
            message: Some(message.into()),
            ..Self::default()
        }
    }
}

/// Kind discriminator for published job events
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display)]
#[serde(rename_all = "snake_case")]
pub enum JobEventType {
    /// A job record was created
    #[display("job_created")]
    JobCreated,
    /// A job record was updated
    #[display("job_updated")]
    JobUpdated,
    /// The event stream itself failed
    #[display("stream_error")]
    StreamError,
}

/// One published job event, replayable by `event_id`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobEvent {
    /// Event kind
    #[serde(rename = "type")]
    pub event_type: JobEventType,
    /// Owning job id
    pub job_id: String,
    /// Job status at publish time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<JobStatus>,
    /// Pipeline stage at publish time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<JobStage>,
    /// Progress at publish time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    /// Progress message at publish time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Chunk count at publish time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunks_created: Option<u64>,
    /// Publish time (Unix epoch seconds)
    pub timestamp: f64,
    /// Monotonically ordered id used for client-side resumption
    pub event_id: String,
}

impl JobEvent {
    /// Returns `true` if this event ends any subscription on its job.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.event_type == JobEventType::JobUpdated
            && self.status.is_some_and(JobStatus::is_terminal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> JobState {
        JobState::new("job_abc123def456".to_owned(), 1_000.0, 300, 3)
    }

    #[test]
    fn new_job_is_queued_and_active() {
        let job = job();
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.stage, JobStage::Initialized);
        assert!(job.status.is_active());
        assert!(!job.status.is_terminal());
        assert_eq!(job.created_at, job.updated_at);
    }

    #[test]
    fn apply_refreshes_updated_at_and_clamps_progress() {
        let mut job = job();
        let patch = JobPatch::progress(JobStage::Embedding, 140.0, "embedding");
        job.apply(&patch, 1_005.0).expect("patch applies");
        assert_eq!(job.status, JobStatus::Running);
        assert_eq!(job.progress, 100.0);
        assert_eq!(job.updated_at, 1_005.0);
        assert!(job.updated_at >= job.created_at);
    }

    #[test]
    fn terminal_to_non_terminal_is_rejected() {
        let mut job = job();
        job.apply(&JobPatch::failed("boom"), 1_001.0).expect("fail");
        let resurrect = JobPatch {
            status: Some(JobStatus::Running),
            ..JobPatch::default()
        };
        let err = job.apply(&resurrect, 1_002.0).unwrap_err();
        assert!(matches!(err, crate::Error::Validation { .. }));
        assert_eq!(job.status, JobStatus::Error);
        // Rejected patch must not touch the record.
        assert_eq!(job.updated_at, 1_001.0);
    }

    #[test]
    fn terminal_to_terminal_is_allowed() {
        let mut job = job();
        job.apply(&JobPatch::failed("boom"), 1_001.0).expect("fail");
        let cancel = JobPatch {
            status: Some(JobStatus::Cancelled),
            ..JobPatch::default()
        };
        job.apply(&cancel, 1_002.0).expect("terminal to terminal");
        assert_eq!(job.status, JobStatus::Cancelled);
    }

    #[rstest::rstest]
    #[case(JobStatus::Success, true)]
    #[case(JobStatus::Error, true)]
    #[case(JobStatus::Cancelled, true)]
    #[case(JobStatus::Queued, false)]
    #[case(JobStatus::Running, false)]
    fn terminal_statuses(#[case] status: JobStatus, #[case] terminal: bool) {
        assert_eq!(status.is_terminal(), terminal);
        assert_eq!(status.is_active(), !terminal);
    }

    #[test]
    fn event_terminality_requires_job_updated() {
        let mut job = job();
        job.apply(&JobPatch::failed("boom"), 1_001.0).expect("fail");
        let event = job.updated_event("evt_1".to_owned());
        assert!(event.is_terminal());
        let created = job.created_event("evt_0".to_owned());
        assert!(!created.is_terminal());
    }

    #[test]
    fn status_round_trips_through_stored_string() {
        for status in [
            JobStatus::Queued,
            JobStatus::Running,
            JobStatus::Success,
            JobStatus::Error,
            JobStatus::Cancelled,
        ] {
            assert_eq!(JobStatus::parse(&status.to_string()), Some(status));
        }
        assert_eq!(JobStatus::parse("nonsense"), None);
    }
}
