use std::time::{SystemTime, UNIX_EPOCH};

/// Wall-clock seconds since the epoch, matching the `acquire_time` /
/// `expiration_time` unit used throughout the lock model.
pub fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
