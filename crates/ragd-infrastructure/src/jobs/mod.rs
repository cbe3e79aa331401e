//! Job store backends and the orchestrator.

pub mod orchestrator;
pub mod store_memory;
pub mod store_redis;

pub use orchestrator::JobOrchestrator;
pub use store_memory::MemoryJobStore;
pub use store_redis::RedisJobStore;

/// Bounded event history: at most this many entries per job.
pub const EVENT_HISTORY_LIMIT: usize = 100;
/// Bounded event history: entries expire after this many seconds.
pub const EVENT_HISTORY_TTL_SECS: u64 = 3600;
/// Job records outlive their deadline by this margin so late observers can
/// still read the terminal state.
pub const JOB_RECORD_TTL_MARGIN_SECS: u64 = 3600;
