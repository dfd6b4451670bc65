//! Simulated units of work.
//!
//! A unit of work is a capped delay plus a deterministic content digest.
//! The digest depends only on the unit's identity and payload; the delay is
//! the only suspension point in the whole pipeline.

use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};

/// Upper bound on a single unit's simulated duration, in seconds.
///
/// Caps worst-case run time regardless of what the configuration declares,
/// so the simulator stays safe to run unattended.
pub const MAX_UNIT_SECONDS: f64 = 2.0;

/// Deterministic content digest: lowercase hex SHA-256 over `name`
/// followed by `payload`, no separator.
pub fn content_digest(name: &str, payload: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    hasher.update(payload.as_bytes());
    hex::encode(hasher.finalize())
}

/// Simulate one unit of work.
///
/// Sleeps for `seconds` clamped to `[0, MAX_UNIT_SECONDS]` and returns the
/// unit's digest together with the measured wall-clock elapsed time in
/// seconds. The elapsed value comes from a monotonic clock, never from the
/// requested duration, so it may differ slightly from the clamped target.
pub async fn simulate(name: &str, payload: &str, seconds: f64) -> (String, f64) {
    let start = Instant::now();
    let capped = seconds.min(MAX_UNIT_SECONDS).max(0.0);
    if capped > 0.0 {
        tokio::time::sleep(Duration::from_secs_f64(capped)).await;
    }
    (content_digest(name, payload), start.elapsed().as_secs_f64())
}
