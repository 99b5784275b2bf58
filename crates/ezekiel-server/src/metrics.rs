//! Prometheus metrics for the lock manager, describing the same counters
//! `LockStats` tracks plus a render handle mounted at `/metrics` — ambient
//! observability carried regardless of which client features are enabled.

use std::sync::Arc;
use std::time::Duration;

use actix_web::{HttpResponse, Scope, web};
use ezekiel_core::{LockManager, LockStats};
use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub fn install_recorder() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    describe_counter!("ezekiel_lock_acquisitions_total", "Total successful lock acquisitions");
    describe_counter!("ezekiel_lock_releases_total", "Total explicit lock releases");
    describe_counter!("ezekiel_lock_expirations_total", "Total timer-driven lock expirations");
    describe_counter!("ezekiel_lock_prolongations_total", "Total lock prolongations");
    describe_counter!("ezekiel_lock_failed_acquisitions_total", "Total rejected acquire attempts");
    describe_gauge!("ezekiel_lock_active", "Currently held locks");

    Ok(handle)
}

/// Copies `LockStats`'s running totals into the Prometheus recorder.
/// `LockStats` is the source of truth (it's what `/ezekiel/rpc/stats`
/// reports too); counters are set `.absolute()` rather than incremented
/// since the manager already does the counting.
pub fn sync_from_stats(stats: &LockStats) {
    counter!("ezekiel_lock_acquisitions_total").absolute(stats.total_acquisitions);
    counter!("ezekiel_lock_releases_total").absolute(stats.total_releases);
    counter!("ezekiel_lock_expirations_total").absolute(stats.total_expirations);
    counter!("ezekiel_lock_prolongations_total").absolute(stats.total_prolongations);
    counter!("ezekiel_lock_failed_acquisitions_total").absolute(stats.failed_acquisitions);
    gauge!("ezekiel_lock_active").set(stats.active_locks as f64);
}

/// Background task that periodically mirrors `LockManager`'s counters into
/// the Prometheus recorder so `/metrics` reflects live state without the
/// manager itself taking a dependency on the `metrics` crate.
pub async fn run_sync_loop(manager: Arc<LockManager>, period: Duration) {
    let mut tick = tokio::time::interval(period);
    loop {
        tick.tick().await;
        sync_from_stats(&manager.stats().await);
    }
}

async fn render(handle: web::Data<PrometheusHandle>) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4; charset=utf-8")
        .body(handle.render())
}

pub fn routes() -> Scope {
    web::scope("/metrics").route("", web::get().to(render))
}
