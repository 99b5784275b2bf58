//! The lock manager and its concurrency envelope — the core of the
//! cooperative object-locking service. Everything in this crate is
//! transport-agnostic: sessions and the REST facade live in `ezekiel-server`
//! and talk to `LockManager` and `EventBus` exclusively through this API.

pub mod auth;
pub mod bus;
pub mod lock;
pub mod manager;
pub mod mirror;
pub mod stats;

pub use auth::{AuthCollaborator, StaticAuthCollaborator};
pub use bus::EventBus;
pub use lock::{Lock, LockKind};
pub use manager::{LockManager, LockManagerConfig};
pub use mirror::ReleaseMirror;
pub use stats::LockStats;
