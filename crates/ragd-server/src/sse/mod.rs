//! SSE streaming layer.
//!
//! Connection records, event framing, Last-Event-ID replay from the
//! job's bounded history, heartbeats, and stale-connection sweeping.
//! Wire format per event: `id:`, `event:`, one or more `data:` lines,
//! then a blank line — exactly what axum's `sse::Event` emits.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use async_stream::stream;
use axum::response::sse::Event;
use dashmap::DashMap;
use futures::{Stream, StreamExt};
use ragd_domain::entities::JobEvent;
use ragd_domain::utils::{id, time};
use ragd_infrastructure::jobs::JobOrchestrator;
use serde_json::json;

/// Multiplier of the heartbeat interval after which a silent connection
/// is considered stale.
const STALE_MULTIPLIER: u32 = 3;

/// One tracked streaming connection
#[derive(Debug, Clone)]
pub struct SseConnection {
    /// Fresh id for this connection
    pub connection_id: String,
    /// Client identity (forwarded or generated)
    pub client_id: String,
    /// Job the connection watches
    pub job_id: String,
    /// Connection open time (epoch seconds)
    pub created_at: f64,
    /// Last observed activity (epoch seconds)
    pub last_ping: f64,
    /// Resumption cursor presented by the client
    pub last_event_id: Option<String>,
}

/// Tracks open SSE connections and their liveness
pub struct SseManager {
    connections: DashMap<String, SseConnection>,
    heartbeat_interval: Duration,
}

impl SseManager {
    /// Create a manager with the configured heartbeat interval.
    #[must_use]
    pub fn new(heartbeat_interval: Duration) -> Self {
        Self {
            connections: DashMap::new(),
            heartbeat_interval,
        }
    }

    /// Heartbeat interval handed to clients
    #[must_use]
    pub fn heartbeat_interval(&self) -> Duration {
        self.heartbeat_interval
    }

    /// Register a new connection.
    pub fn create_connection(
        &self,
        job_id: &str,
        client_id: Option<String>,
        last_event_id: Option<String>,
    ) -> SseConnection {
        let now = time::epoch_secs_f64().unwrap_or_default();
        let connection = SseConnection {
            connection_id: id::prefixed("sse"),
            client_id: client_id.unwrap_or_else(|| id::prefixed("client")),
            job_id: job_id.to_owned(),
            created_at: now,
            last_ping: now,
            last_event_id,
        };
        tracing::info!(
            connection_id = %connection.connection_id,
            client_id = %connection.client_id,
            job_id,
            reconnection = connection.last_event_id.is_some(),
            "sse connection created"
        );
        self.connections
            .insert(connection.connection_id.clone(), connection.clone());
        connection
    }

    /// Record activity on a connection.
    pub fn touch(&self, connection_id: &str) {
        if let Some(mut connection) = self.connections.get_mut(connection_id) {
            connection.last_ping = time::epoch_secs_f64().unwrap_or_default();
        }
    }

    /// Drop a connection record.
    pub fn remove(&self, connection_id: &str) {
        if self.connections.remove(connection_id).is_some() {
            tracing::info!(connection_id, "sse connection cleaned up");
        }
    }

    /// Number of live connections
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Remove connections with no activity within three heartbeats.
    pub fn cleanup_stale(&self) -> usize {
        let now = time::epoch_secs_f64().unwrap_or_default();
        let threshold = self.heartbeat_interval.as_secs_f64() * f64::from(STALE_MULTIPLIER);
        let stale: Vec<String> = self
            .connections
            .iter()
            .filter(|entry| now - entry.last_ping > threshold)
            .map(|entry| entry.connection_id.clone())
            .collect();
        for connection_id in &stale {
            tracing::warn!(connection_id, "cleaning up stale sse connection");
            self.connections.remove(connection_id);
        }
        stale.len()
    }

    /// Spawn the periodic stale-connection sweeper.
    pub fn spawn_sweeper(self: Arc<Self>) {
        let manager = self;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(60));
            loop {
                ticker.tick().await;
                manager.cleanup_stale();
            }
        });
    }
}

/// Removes the connection record when the stream is dropped, whether it
/// completed or the client disconnected mid-stream.
struct ConnectionGuard {
    manager: Arc<SseManager>,
    connection_id: String,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.manager.remove(&self.connection_id);
    }
}

fn fresh_event_id() -> String {
    id::event_id(time::epoch_millis_u64().unwrap_or_default())
}

fn data_event(event_type: &str, data: &serde_json::Value) -> Event {
    Event::default()
        .id(fresh_event_id())
        .event(event_type)
        .data(data.to_string())
}

fn live_event(event: &JobEvent) -> Event {
    Event::default()
        .id(event.event_id.clone())
        .event(event.event_type.to_string())
        .data(serde_json::to_string(event).unwrap_or_else(|_| "{}".to_owned()))
}

fn replay_event(event: &JobEvent) -> Event {
    let payload = json!({
        "type": "event_replay",
        "original_event": { "id": event.event_id, "type": event.event_type },
        "original_data": event,
        "original_timestamp": event.timestamp,
    });
    Event::default()
        .id(format!("replay_{}", event.event_id))
        .event("replay")
        .data(payload.to_string())
}

/// Build the event stream for one job connection.
///
/// Order: `connection_start`, replay of history events after the
/// presented `Last-Event-ID`, the current `job_status` snapshot, then
/// live events with heartbeats. Terminates on a terminal `job_updated`,
/// on an already-terminal snapshot, or on internal failure (after a
/// final `stream_error` event).
pub fn job_event_stream(
    manager: Arc<SseManager>,
    orchestrator: Arc<JobOrchestrator>,
    connection: SseConnection,
) -> impl Stream<Item = Result<Event, Infallible>> {
    let heartbeat = manager.heartbeat_interval();

    stream! {
        let _guard = ConnectionGuard {
            manager: Arc::clone(&manager),
            connection_id: connection.connection_id.clone(),
        };

        // Subscribe before reading history so no event published between
        // replay and live phases is lost.
        let subscription = orchestrator.subscribe(&connection.job_id).await;
        let mut subscription = match subscription {
            Ok(subscription) => subscription,
            Err(error) => {
                yield Ok(stream_error_event(&connection.job_id, &error.to_string()));
                return;
            }
        };

        yield Ok(data_event(
            "connection",
            &json!({
                "type": "connection_start",
                "connection_id": connection.connection_id,
                "client_id": connection.client_id,
                "heartbeat_interval": heartbeat.as_secs(),
                "supports_reconnection": true,
            }),
        ));

        if let Some(last_event_id) = &connection.last_event_id {
            match orchestrator.events_after(&connection.job_id, last_event_id).await {
                Ok(missed) => {
                    tracing::info!(
                        connection_id = %connection.connection_id,
                        missed_count = missed.len(),
                        "replaying missed events"
                    );
                    for event in &missed {
                        yield Ok(replay_event(event));
                    }
                }
                Err(error) => {
                    yield Ok(stream_error_event(&connection.job_id, &error.to_string()));
                    return;
                }
            }
        }

        let snapshot = match orchestrator.get(&connection.job_id).await {
            Ok(Some(job)) => job,
            Ok(None) => {
                yield Ok(stream_error_event(&connection.job_id, "job not found"));
                return;
            }
            Err(error) => {
                yield Ok(stream_error_event(&connection.job_id, &error.to_string()));
                return;
            }
        };
        let terminal_snapshot = snapshot.status.is_terminal();
        yield Ok(data_event(
            "job_status",
            &serde_json::to_value(&snapshot).unwrap_or_default(),
        ));

        if !terminal_snapshot {
            let mut heartbeats = tokio::time::interval(heartbeat);
            heartbeats.reset();
            loop {
                let step = tokio::select! {
                    maybe_event = subscription.next() => LiveStep::Event(maybe_event),
                    _ = heartbeats.tick() => LiveStep::Heartbeat,
                };
                manager.touch(&connection.connection_id);
                match step {
                    LiveStep::Event(None) => break,
                    LiveStep::Event(Some(event)) => {
                        let terminal = event.is_terminal();
                        yield Ok(live_event(&event));
                        if terminal {
                            break;
                        }
                    }
                    LiveStep::Heartbeat => {
                        let now = time::epoch_secs_f64().unwrap_or_default();
                        yield Ok(data_event(
                            "heartbeat",
                            &json!({ "type": "heartbeat", "timestamp": now }),
                        ));
                    }
                }
            }
        }
    }
}

enum LiveStep {
    Event(Option<JobEvent>),
    Heartbeat,
}

fn stream_error_event(job_id: &str, message: &str) -> Event {
    let now = time::epoch_secs_f64().unwrap_or_default();
    data_event(
        "error",
        &json!({
            "type": "stream_error",
            "job_id": job_id,
            "message": message,
            "timestamp": now,
        }),
    )
}
