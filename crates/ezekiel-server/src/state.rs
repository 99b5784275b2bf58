use std::sync::Arc;

use ezekiel_core::{AuthCollaborator, LockManager, LockManagerConfig};

#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<LockManager>,
    pub auth: Arc<dyn AuthCollaborator>,
    /// Keep-alive ping period for the pull (SSE) session; `None` disables
    /// it. The push (WS) session pings unconditionally every 30s and does
    /// not consult this field.
    pub keep_alive: Option<u64>,
}

impl AppState {
    pub fn new(
        config: LockManagerConfig,
        auth: Arc<dyn AuthCollaborator>,
        keep_alive: Option<u64>,
    ) -> Self {
        Self { manager: LockManager::new(config), auth, keep_alive }
    }
}
