//! Entry point for the `ezekiel-server` binary: loads configuration, wires
//! up logging/metrics, and binds the HTTP/WebSocket/SSE surfaces.

use std::sync::Arc;
use std::time::Duration;

use ezekiel_core::{LockManagerConfig, StaticAuthCollaborator};
use ezekiel_server::{AppState, Settings, build_server, logging, metrics};
use tracing::info;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load()?;

    let logging_config = logging::LoggingConfig {
        level: tracing::Level::INFO,
        log_dir: settings.log_dir.as_ref().map(Into::into),
    };
    let _logging_guard = logging::init_logging(&logging_config)?;

    let metrics_handle = metrics::install_recorder()?;

    info!(address = %settings.address, port = settings.port, "starting ezekiel-server");

    // No external auth service is wired in this standalone binary; operators
    // embedding this crate behind a real identity provider should construct
    // their own `AuthCollaborator` and call `build_server` directly instead.
    let auth: Arc<dyn ezekiel_core::AuthCollaborator> =
        Arc::new(StaticAuthCollaborator::new("ezekiel_session"));

    let manager_config = LockManagerConfig {
        short_timeout: Duration::from_secs(settings.short_timeout),
        long_timeout: Duration::from_secs(settings.long_timeout),
    };
    let state = AppState::new(manager_config, auth, settings.keep_alive);

    tokio::spawn(metrics::run_sync_loop(state.manager.clone(), Duration::from_secs(5)));

    let server = build_server(state, metrics_handle, &settings.address, settings.port)?;
    server.await?;
    Ok(())
}
