//! HTTP/WebSocket/SSE transport for the cooperative object-locking service.
//! Everything domain-specific lives in `ezekiel-core`; this crate wires it
//! to actix-web and renders the wire formats clients expect.

pub mod auth;
pub mod config;
pub mod logging;
pub mod metrics;
pub mod rest;
pub mod sse;
pub mod state;
pub mod wire;
pub mod ws;

pub use config::Settings;
pub use state::AppState;

use actix_web::{App, HttpServer, dev::Server, middleware::Logger, web};
use metrics_exporter_prometheus::PrometheusHandle;

/// Mounts the REST, WebSocket and SSE surfaces under `/ezekiel/...` onto an
/// `actix_web::App`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(rest::routes())
        .service(metrics::routes())
        .route("/ezekiel/ws", web::get().to(ws::serve))
        .route("/ezekiel/es/{object_id}", web::get().to(sse::serve));
}

/// Binds and returns the running HTTP server; the caller owns its lifetime
/// (typically awaiting it directly in `main`).
pub fn build_server(
    state: AppState,
    metrics_handle: PrometheusHandle,
    address: &str,
    port: u16,
) -> Result<Server, std::io::Error> {
    Ok(HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(web::Data::new(state.clone()))
            .app_data(web::Data::new(metrics_handle.clone()))
            .configure(configure)
    })
    .bind((address, port))?
    .run())
}
