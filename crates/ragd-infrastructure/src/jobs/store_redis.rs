//! Redis-backed job store
//!
//! Key layout: `job:{id}` hash, `jobs:active` set, `job:events:{id}`
//! pub/sub channel, `job:events:{id}:history` list. Creates go through an
//! atomic pipeline; every publish appends to the bounded history in the
//! same pipeline as the `PUBLISH`.

use std::collections::HashMap;
use std::time::Instant;

use async_trait::async_trait;
use futures::StreamExt;
use ragd_domain::entities::{JobEvent, JobStage, JobState, JobStatus};
use ragd_domain::error::{Error, Result};
use ragd_domain::ports::{JobEventStream, JobStore, StoreHealth};
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use super::{EVENT_HISTORY_LIMIT, EVENT_HISTORY_TTL_SECS, JOB_RECORD_TTL_MARGIN_SECS};

const ACTIVE_SET_KEY: &str = "jobs:active";

/// Redis implementation of the job store port
pub struct RedisJobStore {
    client: redis::Client,
    manager: ConnectionManager,
}

impl RedisJobStore {
    /// Connect to Redis and verify the connection with a ping.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] when the URL is invalid or the server is
    /// unreachable.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| Error::store_with_source(format!("invalid store URL: {e}"), e))?;
        let manager = client
            .get_connection_manager()
            .await
            .map_err(|e| Error::store_with_source(format!("store connection failed: {e}"), e))?;

        let store = Self { client, manager };
        store.ping().await?;
        tracing::info!(url, "job store connection established");
        Ok(store)
    }

    fn job_key(job_id: &str) -> String {
        format!("job:{job_id}")
    }

    fn events_key(job_id: &str) -> String {
        format!("job:events:{job_id}")
    }

    fn history_key(job_id: &str) -> String {
        format!("job:events:{job_id}:history")
    }

    async fn ping(&self) -> Result<f64> {
        let mut con = self.manager.clone();
        let started = Instant::now();
        redis::cmd("PING")
            .query_async::<String>(&mut con)
            .await
            .map_err(|e| Error::store_with_source(format!("ping failed: {e}"), e))?;
        Ok(started.elapsed().as_secs_f64() * 1000.0)
    }

    fn to_field_map(job: &JobState) -> Result<Vec<(String, String)>> {
        let mut fields = vec![
            ("job_id".to_owned(), job.job_id.clone()),
            ("status".to_owned(), job.status.to_string()),
            ("stage".to_owned(), job.stage.to_string()),
            ("progress".to_owned(), job.progress.to_string()),
            ("chunks_created".to_owned(), job.chunks_created.to_string()),
            ("created_at".to_owned(), job.created_at.to_string()),
            ("updated_at".to_owned(), job.updated_at.to_string()),
            ("retry_count".to_owned(), job.retry_count.to_string()),
            ("max_retries".to_owned(), job.max_retries.to_string()),
            ("timeout_seconds".to_owned(), job.timeout_seconds.to_string()),
            (
                "metadata".to_owned(),
                serde_json::to_string(&job.metadata)?,
            ),
        ];
        if let Some(message) = &job.message {
            fields.push(("message".to_owned(), message.clone()));
        }
        Ok(fields)
    }

    fn from_field_map(fields: &HashMap<String, String>) -> Result<JobState> {
        fn required<'m>(fields: &'m HashMap<String, String>, name: &str) -> Result<&'m str> {
            fields
                .get(name)
                .map(String::as_str)
                .ok_or_else(|| Error::store(format!("job record missing field '{name}'")))
        }
        fn parsed<T: std::str::FromStr>(fields: &HashMap<String, String>, name: &str) -> Result<T> {
            required(fields, name)?
                .parse()
                .map_err(|_| Error::store(format!("job record field '{name}' is malformed")))
        }

        let status = JobStatus::parse(required(fields, "status")?)
            .ok_or_else(|| Error::store("job record carries unknown status"))?;
        let stage = JobStage::parse(required(fields, "stage")?)
            .ok_or_else(|| Error::store("job record carries unknown stage"))?;
        let metadata = fields
            .get("metadata")
            .map(|raw| serde_json::from_str(raw))
            .transpose()?
            .unwrap_or_default();

        Ok(JobState {
            job_id: required(fields, "job_id")?.to_owned(),
            status,
            stage,
            progress: parsed(fields, "progress")?,
            message: fields.get("message").cloned(),
            chunks_created: parsed(fields, "chunks_created")?,
            created_at: parsed(fields, "created_at")?,
            updated_at: parsed(fields, "updated_at")?,
            retry_count: parsed(fields, "retry_count")?,
            max_retries: parsed(fields, "max_retries")?,
            timeout_seconds: parsed(fields, "timeout_seconds")?,
            metadata,
        })
    }
}

#[async_trait]
impl JobStore for RedisJobStore {
    async fn create(&self, job: &JobState) -> Result<()> {
        let mut con = self.manager.clone();
        let key = Self::job_key(&job.job_id);
        let fields = Self::to_field_map(job)?;
        let ttl = i64::try_from(job.timeout_seconds + JOB_RECORD_TTL_MARGIN_SECS)
            .map_err(|_| Error::store("job TTL overflow"))?;

        redis::pipe()
            .atomic()
            .hset_multiple(&key, &fields)
            .sadd(ACTIVE_SET_KEY, &job.job_id)
            .expire(&key, ttl)
            .query_async::<()>(&mut con)
            .await
            .map_err(|e| Error::store_with_source(format!("job create failed: {e}"), e))?;
        Ok(())
    }

    async fn get(&self, job_id: &str) -> Result<Option<JobState>> {
        let mut con = self.manager.clone();
        let fields: HashMap<String, String> = con
            .hgetall(Self::job_key(job_id))
            .await
            .map_err(|e| Error::store_with_source(format!("job read failed: {e}"), e))?;
        if fields.is_empty() {
            return Ok(None);
        }
        Self::from_field_map(&fields).map(Some)
    }

    async fn put(&self, job: &JobState) -> Result<()> {
        let mut con = self.manager.clone();
        let fields = Self::to_field_map(job)?;
        con.hset_multiple::<_, _, _, ()>(Self::job_key(&job.job_id), &fields)
            .await
            .map_err(|e| Error::store_with_source(format!("job write failed: {e}"), e))?;
        Ok(())
    }

    async fn publish(&self, job_id: &str, event: &JobEvent) -> Result<()> {
        let mut con = self.manager.clone();
        let payload = serde_json::to_string(event)?;
        let history_key = Self::history_key(job_id);
        let history_ttl = i64::try_from(EVENT_HISTORY_TTL_SECS).unwrap_or(i64::MAX);
        let keep = i64::try_from(EVENT_HISTORY_LIMIT).unwrap_or(i64::MAX) - 1;

        redis::pipe()
            .atomic()
            .publish(Self::events_key(job_id), &payload)
            .lpush(&history_key, &payload)
            .ltrim(&history_key, 0, keep as isize)
            .expire(&history_key, history_ttl)
            .query_async::<()>(&mut con)
            .await
            .map_err(|e| Error::store_with_source(format!("event publish failed: {e}"), e))?;
        Ok(())
    }

    async fn active_ids(&self) -> Result<Vec<String>> {
        let mut con = self.manager.clone();
        con.smembers(ACTIVE_SET_KEY)
            .await
            .map_err(|e| Error::store_with_source(format!("active set read failed: {e}"), e))
    }

    async fn remove_active(&self, job_id: &str) -> Result<()> {
        let mut con = self.manager.clone();
        con.srem::<_, _, ()>(ACTIVE_SET_KEY, job_id)
            .await
            .map_err(|e| Error::store_with_source(format!("active set update failed: {e}"), e))?;
        Ok(())
    }

    async fn delete(&self, job_id: &str) -> Result<bool> {
        let mut con = self.manager.clone();
        let (deleted, _, _): (i64, i64, i64) = redis::pipe()
            .atomic()
            .del(Self::job_key(job_id))
            .del(Self::history_key(job_id))
            .srem(ACTIVE_SET_KEY, job_id)
            .query_async(&mut con)
            .await
            .map_err(|e| Error::store_with_source(format!("job delete failed: {e}"), e))?;
        Ok(deleted > 0)
    }

    async fn history(&self, job_id: &str) -> Result<Vec<JobEvent>> {
        let mut con = self.manager.clone();
        let raw: Vec<String> = con
            .lrange(Self::history_key(job_id), 0, -1)
            .await
            .map_err(|e| Error::store_with_source(format!("history read failed: {e}"), e))?;

        // LPUSH stores newest-first; replay wants oldest-first.
        let mut events: Vec<JobEvent> = raw
            .iter()
            .filter_map(|payload| serde_json::from_str(payload).ok())
            .collect();
        events.reverse();
        Ok(events)
    }

    async fn subscribe(&self, job_id: &str) -> Result<JobEventStream> {
        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(|e| Error::store_with_source(format!("pubsub connect failed: {e}"), e))?;
        pubsub
            .subscribe(Self::events_key(job_id))
            .await
            .map_err(|e| Error::store_with_source(format!("pubsub subscribe failed: {e}"), e))?;
        tracing::debug!(job_id, "subscribed to job events");

        let stream = pubsub.into_on_message().filter_map(|msg| async move {
            let payload: String = msg.get_payload().ok()?;
            match serde_json::from_str::<JobEvent>(&payload) {
                Ok(event) => Some(event),
                Err(error) => {
                    tracing::error!(%error, "discarding malformed job event payload");
                    None
                }
            }
        });
        Ok(Box::pin(stream))
    }

    async fn health(&self) -> Result<StoreHealth> {
        let ping_ms = self.ping().await?;

        let mut con = self.manager.clone();
        let info: String = redis::cmd("INFO")
            .arg("memory")
            .query_async(&mut con)
            .await
            .map_err(|e| Error::store_with_source(format!("info read failed: {e}"), e))?;
        let memory_used_bytes = info
            .lines()
            .find_map(|line| line.strip_prefix("used_memory:"))
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or(0);

        let active_jobs: u64 = con
            .scard(ACTIVE_SET_KEY)
            .await
            .map_err(|e| Error::store_with_source(format!("active count failed: {e}"), e))?;

        Ok(StoreHealth {
            status: "healthy".to_owned(),
            ping_ms,
            memory_used_bytes,
            active_jobs,
        })
    }

    fn provider_name(&self) -> &str {
        "redis"
    }
}
