//! Shared types used by the lock manager, the streaming sessions, and the
//! REST facade: domain error types, the lock token codec, and a wall-clock
//! helper.

pub mod error;
pub mod time;
pub mod token;

pub use error::{LockError, LockHolder};
pub use time::now_secs;
pub use token::Token;
