//! JSON envelopes for the REST/WS/SSE surface. Kept separate from
//! `ezekiel_core::Lock`, whose field names are for internal use, so the
//! wire format can evolve independently of the domain model.

use ezekiel_common::{LockError, LockHolder};
use ezekiel_core::Lock;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct LockResponse {
    pub success: bool,
    pub object_id: String,
    pub acquire: i64,
    pub expiration: Option<i64>,
    pub token: String,
    pub locker: String,
}

impl From<&Lock> for LockResponse {
    fn from(lock: &Lock) -> Self {
        Self {
            success: true,
            object_id: lock.object_id.clone(),
            acquire: lock.acquire_time,
            expiration: lock.expiration_time,
            token: lock.token.to_hex(),
            locker: lock.locker.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LockAlreadyAcquiredResponse {
    pub success: bool,
    pub object_id: String,
    pub acquire: i64,
    pub locker: String,
    pub exception: &'static str,
    pub message: String,
}

impl From<&LockHolder> for LockAlreadyAcquiredResponse {
    fn from(holder: &LockHolder) -> Self {
        Self {
            success: false,
            object_id: holder.object_id.clone(),
            acquire: holder.acquire_time,
            locker: holder.locker.clone(),
            exception: "LockAlreadyAcquired",
            message: format!("object '{}' is already locked by '{}'", holder.object_id, holder.locker),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LockNotFoundResponse {
    pub success: bool,
    pub object_id: String,
    pub exception: &'static str,
    pub message: String,
}

impl LockNotFoundResponse {
    pub fn new(object_id: impl Into<String>) -> Self {
        let object_id = object_id.into();
        Self {
            success: false,
            message: format!("no lock exists for object '{object_id}'"),
            object_id,
            exception: "LockNotFound",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReleasedResponse {
    pub success: bool,
    pub object_id: String,
}

impl ReleasedResponse {
    pub fn new(object_id: impl Into<String>) -> Self {
        Self { success: true, object_id: object_id.into() }
    }
}

/// Renders a `LockError` into the error-shaped JSON bodies clients expect.
/// `object_id` is threaded through separately because `LockError::NotFound`
/// carries none of its own.
pub fn render_error(error: &LockError, object_id: &str) -> serde_json::Value {
    match error {
        LockError::AlreadyHeld(holder) => {
            serde_json::to_value(LockAlreadyAcquiredResponse::from(holder)).unwrap()
        }
        LockError::NotFound => serde_json::to_value(LockNotFoundResponse::new(object_id)).unwrap(),
        LockError::Unauthorized => serde_json::json!({
            "success": false,
            "object_id": object_id,
            "exception": "Unauthorized",
            "message": "identity resolution failed",
        }),
    }
}
