//! Canonical time utilities — strict, no silent zero fallbacks.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{Error, Result};

/// Current Unix timestamp in seconds, as `f64` wall-clock seconds.
///
/// # Errors
///
/// Returns an error if the system clock is before the Unix epoch (we
/// refuse to silently return 0).
pub fn epoch_secs_f64() -> Result<f64> {
    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| Error::internal(format!("system clock is before Unix epoch: {e}")))?;
    Ok(duration.as_secs_f64())
}

/// Current Unix timestamp in whole milliseconds.
///
/// # Errors
///
/// Returns an error if the system clock is before the Unix epoch.
pub fn epoch_millis_u64() -> Result<u64> {
    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| Error::internal(format!("system clock is before Unix epoch: {e}")))?;
    u64::try_from(duration.as_millis())
        .map_err(|e| Error::internal(format!("timestamp overflow for u64: {e}")))
}
