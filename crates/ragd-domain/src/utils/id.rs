//! Identifier generation helpers.

use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

/// Generates a new random UUID v4.
#[must_use]
pub fn generate() -> Uuid {
    Uuid::new_v4()
}

/// Short prefixed id: `{prefix}_{12 hex chars}` (`job_…`, `sse_…`, `req_…`).
#[must_use]
pub fn prefixed(prefix: &str) -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("{prefix}_{}", &hex[..12])
}

static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Monotonically ordered event id: `evt_{millis:013}_{seq:06}`.
///
/// Zero-padded so lexicographic order matches publish order; the atomic
/// sequence breaks ties within one millisecond.
#[must_use]
pub fn event_id(epoch_millis: u64) -> String {
    let seq = EVENT_SEQ.fetch_add(1, Ordering::Relaxed) % 1_000_000;
    format!("evt_{epoch_millis:013}_{seq:06}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixed_ids_have_fixed_shape() {
        let id = prefixed("job");
        assert!(id.starts_with("job_"));
        assert_eq!(id.len(), "job_".len() + 12);
        assert_ne!(prefixed("job"), prefixed("job"));
    }

    #[test]
    fn event_ids_are_lexicographically_monotonic() {
        let a = event_id(1_700_000_000_000);
        let b = event_id(1_700_000_000_000);
        let c = event_id(1_700_000_000_001);
        assert!(a < b);
        assert!(b < c);
    }
}
