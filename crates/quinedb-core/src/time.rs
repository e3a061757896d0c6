//! Wall-clock helpers for expiry timestamps.
//!
//! Expiries are absolute milliseconds since the Unix epoch so they survive
//! a snapshot/restart cycle; the dump format stores them verbatim.

use std::time::{SystemTime, UNIX_EPOCH};

/// Returns the current wall-clock time in milliseconds since the Unix epoch.
#[inline]
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Returns true if the given absolute expiry timestamp has passed.
#[inline]
pub fn is_expired(expires_at_ms: u64) -> bool {
    now_ms() >= expires_at_ms
}
