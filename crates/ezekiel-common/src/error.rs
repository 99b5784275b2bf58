use serde::{Deserialize, Serialize};

/// Snapshot of the current holder of a lock, surfaced to a caller whose
/// acquire/prolong attempt conflicted with it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockHolder {
    pub object_id: String,
    pub acquire_time: i64,
    pub locker: String,
}

/// Errors visible to callers of the lock manager. Internal/unexpected
/// failures (timer races, broadcast lag) never surface here — they are
/// logged and swallowed at the call site instead.
#[derive(thiserror::Error, Debug, Clone)]
pub enum LockError {
    #[error("object '{0}' is already locked by another holder")]
    AlreadyHeld(LockHolder),

    #[error("no lock exists for this object (or the supplied token did not match)")]
    NotFound,

    #[error("identity resolution failed")]
    Unauthorized,
}
