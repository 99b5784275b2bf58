use ezekiel_common::Token;
use serde::{Deserialize, Serialize};

/// Whether a lock auto-expires on a timer or lives until its holder lets go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockKind {
    Temporary,
    Permanent,
}

/// A single held lock on an object. One of these exists per `object_id` in
/// the lock table at any instant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lock {
    pub object_id: String,
    pub token: Token,
    pub locker: String,
    pub acquire_time: i64,
    /// `None` for permanent locks, `Some(seconds)` for temporary ones.
    pub expiration_time: Option<i64>,
    pub kind: LockKind,
}

impl Lock {
    pub fn is_temporary(&self) -> bool {
        self.kind == LockKind::Temporary
    }
}
