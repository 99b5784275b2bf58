use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Point-in-time counters, exposed for the admin/observability surface.
/// Not part of the core spec's invariants — ambient observability carried
/// regardless of which features are in scope for a given deployment.
#[derive(Debug, Default, Serialize)]
pub struct LockStats {
    pub active_locks: u64,
    pub total_acquisitions: u64,
    pub total_releases: u64,
    pub total_prolongations: u64,
    pub total_expirations: u64,
    pub failed_acquisitions: u64,
}

#[derive(Default)]
pub(crate) struct StatsCollector {
    total_acquisitions: AtomicU64,
    total_releases: AtomicU64,
    total_prolongations: AtomicU64,
    total_expirations: AtomicU64,
    failed_acquisitions: AtomicU64,
}

impl StatsCollector {
    pub(crate) fn record_acquire(&self) {
        self.total_acquisitions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_release(&self) {
        self.total_releases.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_prolong(&self) {
        self.total_prolongations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_expire(&self) {
        self.total_expirations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failed_acquire(&self) {
        self.failed_acquisitions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, active_locks: u64) -> LockStats {
        LockStats {
            active_locks,
            total_acquisitions: self.total_acquisitions.load(Ordering::Relaxed),
            total_releases: self.total_releases.load(Ordering::Relaxed),
            total_prolongations: self.total_prolongations.load(Ordering::Relaxed),
            total_expirations: self.total_expirations.load(Ordering::Relaxed),
            failed_acquisitions: self.failed_acquisitions.load(Ordering::Relaxed),
        }
    }
}
