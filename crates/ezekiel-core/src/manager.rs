use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use ezekiel_common::{LockError, LockHolder, Token, now_secs};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::bus::EventBus;
use crate::lock::{Lock, LockKind};
use crate::mirror::ReleaseMirror;
use crate::stats::{LockStats, StatsCollector};

/// `short_timeout` is the TTL of a temporary lock and the prolongation
/// window; `long_timeout` is the advisory period pull-mode sessions use to
/// schedule their own prolongation loop.
#[derive(Debug, Clone, Copy)]
pub struct LockManagerConfig {
    pub short_timeout: Duration,
    pub long_timeout: Duration,
}

impl Default for LockManagerConfig {
    fn default() -> Self {
        Self {
            short_timeout: Duration::from_secs(60),
            long_timeout: Duration::from_secs(3600),
        }
    }
}

/// A live cancel/reset handle for a temporary lock's auto-expire timer.
/// Dropping it cancels the timer — the spawned task watches the sender
/// side of this channel and exits as soon as it is dropped, so no explicit
/// cancellation signal is needed beyond removing the table entry.
struct TimerHandle {
    deadline_tx: watch::Sender<Instant>,
}

impl TimerHandle {
    fn reset(&self, new_deadline: Instant) {
        // Only fails if the task already exited (e.g. raced with expiry),
        // which is a harmless no-op here.
        let _ = self.deadline_tx.send(new_deadline);
    }
}

struct TableEntry {
    lock: Lock,
    timer: Option<TimerHandle>,
}

/// Holds the lock table and owns every mutation to it — the single-writer
/// serialization point every mutation to the table goes through. All public methods are async
/// only so callers can `.await` them uniformly from actix handlers; the
/// table itself is guarded by a plain `parking_lot::Mutex` since no `.await`
/// ever happens while it is held.
pub struct LockManager {
    table: Mutex<HashMap<String, TableEntry>>,
    events: EventBus,
    config: LockManagerConfig,
    release_mirror: Option<Arc<dyn ReleaseMirror>>,
    stats: StatsCollector,
}

impl LockManager {
    pub fn new(config: LockManagerConfig) -> Arc<Self> {
        Self::with_release_mirror(config, None)
    }

    pub fn with_release_mirror(
        config: LockManagerConfig,
        release_mirror: Option<Arc<dyn ReleaseMirror>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            table: Mutex::new(HashMap::new()),
            events: EventBus::new(),
            config,
            release_mirror,
            stats: StatsCollector::default(),
        })
    }

    pub fn config(&self) -> LockManagerConfig {
        self.config
    }

    pub fn subscribe_acquired(&self) -> tokio::sync::broadcast::Receiver<Lock> {
        self.events.subscribe_acquired()
    }

    pub fn subscribe_released(&self) -> tokio::sync::broadcast::Receiver<Lock> {
        self.events.subscribe_released()
    }

    pub async fn stats(&self) -> LockStats {
        let active = self.table.lock().len() as u64;
        self.stats.snapshot(active)
    }

    /// Create a PERMANENT lock, or fail with the current holder if one
    /// already exists. No auto-prolongation on conflict.
    pub async fn acquire_exclusive(
        self: &Arc<Self>,
        object_id: &str,
        locker: &str,
    ) -> Result<Lock, LockError> {
        let mut table = self.table.lock();
        if let Some(entry) = table.get(object_id) {
            self.stats.record_failed_acquire();
            return Err(LockError::AlreadyHeld(holder_of(&entry.lock)));
        }

        let lock = Lock {
            object_id: object_id.to_string(),
            token: Token::generate(),
            locker: locker.to_string(),
            acquire_time: now_secs(),
            expiration_time: None,
            kind: LockKind::Permanent,
        };
        table.insert(object_id.to_string(), TableEntry { lock: lock.clone(), timer: None });
        drop(table);

        self.stats.record_acquire();
        debug!(object_id, locker, "acquired permanent lock");
        self.events.publish_acquired(lock.clone());
        Ok(lock)
    }

    /// Create a TEMPORARY lock with an auto-release timer, or — if the
    /// existing holder is the same `locker` — behave exactly as `Prolong`
    /// (idempotent re-acquire).
    pub async fn acquire_temporary(
        self: &Arc<Self>,
        object_id: &str,
        locker: &str,
    ) -> Result<Lock, LockError> {
        let existing_token = {
            let mut table = self.table.lock();
            match table.get(object_id) {
                Some(entry) if entry.lock.locker == locker => Some(entry.lock.token),
                Some(entry) => {
                    self.stats.record_failed_acquire();
                    return Err(LockError::AlreadyHeld(holder_of(&entry.lock)));
                }
                None => {
                    let deadline = Instant::now() + self.config.short_timeout;
                    let lock = Lock {
                        object_id: object_id.to_string(),
                        token: Token::generate(),
                        locker: locker.to_string(),
                        acquire_time: now_secs(),
                        expiration_time: Some(now_secs() + self.config.short_timeout.as_secs() as i64),
                        kind: LockKind::Temporary,
                    };
                    let timer = self.spawn_timer(object_id.to_string(), lock.token, deadline);
                    table.insert(
                        object_id.to_string(),
                        TableEntry { lock: lock.clone(), timer: Some(timer) },
                    );
                    drop(table);
                    self.stats.record_acquire();
                    debug!(object_id, locker, "acquired temporary lock");
                    self.events.publish_acquired(lock.clone());
                    return Ok(lock);
                }
            }
        };

        // Same-locker re-acquire: exactly a prolongation.
        self.prolong(object_id, existing_token.expect("checked above")).await
    }

    /// Reset a temporary lock's expiry, or refresh a permanent lock's
    /// (purely observational, no timer) expiration field. Never emits
    /// events.
    pub async fn prolong(self: &Arc<Self>, object_id: &str, token: Token) -> Result<Lock, LockError> {
        let mut table = self.table.lock();
        let entry = table.get_mut(object_id).ok_or(LockError::NotFound)?;

        if entry.lock.token != token {
            return Err(LockError::AlreadyHeld(holder_of(&entry.lock)));
        }

        let new_expiration = now_secs() + self.config.short_timeout.as_secs() as i64;
        entry.lock.expiration_time = Some(new_expiration);

        if let Some(timer) = &entry.timer {
            timer.reset(Instant::now() + self.config.short_timeout);
        }

        self.stats.record_prolong();
        Ok(entry.lock.clone())
    }

    /// Remove the lock if `token` matches. Wrong-token and missing-object
    /// both surface as `NotFound` — deliberately opaque, so a caller cannot
    /// probe whether an object is locked by someone else.
    pub async fn release(self: &Arc<Self>, object_id: &str, token: Token) -> Result<(), LockError> {
        let removed = {
            let mut table = self.table.lock();
            match table.get(object_id) {
                Some(entry) if entry.lock.token == token => table.remove(object_id),
                _ => return Err(LockError::NotFound),
            }
        };
        let Some(TableEntry { lock, timer }) = removed else {
            return Err(LockError::NotFound);
        };
        // Dropping the timer handle cancels its task.
        drop(timer);

        self.stats.record_release();
        debug!(object_id, locker = %lock.locker, "released lock");
        self.events.publish_released(lock.clone());
        if let Some(mirror) = &self.release_mirror {
            mirror.publish_release(&lock.object_id);
        }
        Ok(())
    }

    /// Called by a session on teardown for each lock it owns. Identical to
    /// `release`, but `LockNotFound` (timer fired first) and the token
    /// having been replaced underneath it are both expected, non-error
    /// outcomes for the caller — so this just hands back the `Result` and
    /// leaves interpretation to the session.
    pub async fn release_on_teardown(self: &Arc<Self>, object_id: &str, token: Token) -> Result<(), LockError> {
        self.release(object_id, token).await
    }

    fn spawn_timer(self: &Arc<Self>, object_id: String, token: Token, deadline: Instant) -> TimerHandle {
        let (deadline_tx, mut deadline_rx) = watch::channel(deadline);
        let manager = Arc::clone(self);

        tokio::spawn(async move {
            let mut deadline = *deadline_rx.borrow();
            loop {
                tokio::select! {
                    _ = tokio::time::sleep_until(deadline) => {
                        manager.expire(object_id, token).await;
                        return;
                    }
                    changed = deadline_rx.changed() => {
                        match changed {
                            Ok(()) => deadline = *deadline_rx.borrow(),
                            // Sender dropped: the lock was released explicitly,
                            // nothing left to expire.
                            Err(_) => return,
                        }
                    }
                }
            }
        });

        TimerHandle { deadline_tx }
    }

    /// Timer callback. Races with explicit `Release`; if the token no
    /// longer matches (already released, or replaced by a new acquire)
    /// this is a silent no-op.
    async fn expire(self: &Arc<Self>, object_id: String, token: Token) {
        let removed = {
            let mut table = self.table.lock();
            match table.get(&object_id) {
                Some(entry) if entry.lock.token == token => table.remove(&object_id),
                _ => None,
            }
        };
        let Some(TableEntry { lock, .. }) = removed else {
            return;
        };

        self.stats.record_expire();
        debug!(object_id = %lock.object_id, "lock expired");
        self.events.publish_released(lock.clone());
        if let Some(mirror) = &self.release_mirror {
            mirror.publish_release(&lock.object_id);
        }
    }
}

fn holder_of(lock: &Lock) -> LockHolder {
    LockHolder {
        object_id: lock.object_id.clone(),
        acquire_time: lock.acquire_time,
        locker: lock.locker.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration as StdDuration;

    fn short_config(secs: u64) -> LockManagerConfig {
        LockManagerConfig {
            short_timeout: StdDuration::from_secs(secs),
            long_timeout: StdDuration::from_secs(secs * 60),
        }
    }

    #[tokio::test]
    async fn basic_temp_lock_lifecycle() {
        let manager = LockManager::new(short_config(1));
        let mut acquired_rx = manager.subscribe_acquired();
        let mut released_rx = manager.subscribe_released();

        let lock = manager.acquire_temporary("X", "alice").await.unwrap();
        assert!(lock.expiration_time.unwrap() >= now_secs());

        assert_eq!(acquired_rx.recv().await.unwrap().object_id, "X");

        tokio::time::sleep(Duration::from_millis(1200)).await;

        let released = released_rx.recv().await.unwrap();
        assert_eq!(released.object_id, "X");
        assert_eq!(released.token, lock.token);

        // Table no longer has the entry.
        assert!(manager.release("X", lock.token).await.is_err());
    }

    #[tokio::test]
    async fn conflict_then_waiter_retries_after_release() {
        let manager = LockManager::new(short_config(60));
        let a = manager.acquire_exclusive("Y", "alice").await.unwrap();

        let err = manager.acquire_exclusive("Y", "bob").await.unwrap_err();
        match err {
            LockError::AlreadyHeld(holder) => assert_eq!(holder.locker, "alice"),
            _ => panic!("expected AlreadyHeld"),
        }

        let mut released_rx = manager.subscribe_released();
        manager.release("Y", a.token).await.unwrap();
        let released = released_rx.recv().await.unwrap();
        assert_eq!(released.object_id, "Y");

        let retried = manager.acquire_exclusive("Y", "bob").await.unwrap();
        assert_ne!(retried.token, a.token);
    }

    #[tokio::test]
    async fn wrong_token_release_is_opaque_and_leaves_table_unchanged() {
        let manager = LockManager::new(short_config(60));
        let lock = manager.acquire_temporary("Z", "alice").await.unwrap();
        let bogus = Token::generate();

        let err = manager.release("Z", bogus).await.unwrap_err();
        assert!(matches!(err, LockError::NotFound));

        // Original token still releases successfully, proving the entry
        // was untouched by the failed attempt.
        manager.release("Z", lock.token).await.unwrap();
    }

    #[tokio::test]
    async fn prolongation_resets_the_timer() {
        let manager = LockManager::new(short_config(2));
        let lock = manager.acquire_temporary("W", "alice").await.unwrap();

        tokio::time::sleep(Duration::from_millis(1500)).await;
        manager.prolong("W", lock.token).await.unwrap();

        tokio::time::sleep(Duration::from_millis(1500)).await;
        // 3.0s elapsed since acquire; prolong at 1.5s pushed expiry to 3.5s.
        assert!(manager.release("W", lock.token).await.is_ok());
    }

    #[tokio::test]
    async fn same_user_reacquire_is_idempotent_prolongation() {
        let manager = LockManager::new(short_config(60));
        let first = manager.acquire_temporary("Q", "alice").await.unwrap();
        let second = manager.acquire_temporary("Q", "alice").await.unwrap();

        assert_eq!(first.token, second.token);
        assert!(second.expiration_time.unwrap() >= first.expiration_time.unwrap());
    }

    #[tokio::test]
    async fn permanent_prolong_is_a_legal_no_op() {
        let manager = LockManager::new(short_config(60));
        let lock = manager.acquire_exclusive("P", "alice").await.unwrap();
        assert!(lock.expiration_time.is_none());

        let prolonged = manager.prolong("P", lock.token).await.unwrap();
        assert_eq!(prolonged.token, lock.token);
        assert!(prolonged.expiration_time.is_some());
    }

    #[tokio::test]
    async fn prolong_wrong_token_surfaces_holder_info() {
        let manager = LockManager::new(short_config(60));
        let lock = manager.acquire_temporary("R", "alice").await.unwrap();
        let bogus = Token::generate();

        let err = manager.prolong("R", bogus).await.unwrap_err();
        match err {
            LockError::AlreadyHeld(holder) => assert_eq!(holder.locker, "alice"),
            _ => panic!("expected AlreadyHeld"),
        }
        // Table state did not change.
        manager.release("R", lock.token).await.unwrap();
    }

    #[tokio::test]
    async fn prolong_on_missing_object_is_not_found() {
        let manager = LockManager::new(short_config(60));
        let err = manager.prolong("missing", Token::generate()).await.unwrap_err();
        assert!(matches!(err, LockError::NotFound));
    }

    #[tokio::test]
    async fn stats_reflect_acquire_and_release_counts() {
        let manager = LockManager::new(short_config(60));
        for i in 0..3 {
            manager
                .acquire_exclusive(&format!("lock-{i}"), "alice")
                .await
                .unwrap();
        }
        let stats = manager.stats().await;
        assert_eq!(stats.active_locks, 3);
        assert_eq!(stats.total_acquisitions, 3);
    }
}
