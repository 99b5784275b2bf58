//! Pull-variant streaming session: one background task per
//! `/ezekiel/es/{object_id}` connection, feeding an SSE body through a
//! `tokio::sync::mpsc` channel.

use std::sync::Arc;
use std::time::Duration;

use actix_web::{Error, HttpRequest, HttpResponse, web, web::Bytes};
use ezekiel_common::{LockError, Token};
use ezekiel_core::LockManager;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::time::{Interval, interval};
use tokio_stream::wrappers::ReceiverStream;

use crate::auth::authenticate;
use crate::state::AppState;
use crate::wire::{LockAlreadyAcquiredResponse, LockResponse, render_error};

const RETRY_INTERVAL: Duration = Duration::from_secs(10);

pub async fn serve(
    req: HttpRequest,
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let object_id = path.into_inner();
    let Some(principal) = authenticate(&req, state.auth.as_ref()) else {
        return Ok(HttpResponse::Unauthorized().finish());
    };

    let (tx, rx) = mpsc::channel::<Bytes>(32);
    let manager = state.manager.clone();
    let keep_alive = state.keep_alive.map(Duration::from_secs);
    let long_timeout = manager.config().long_timeout;

    tokio::spawn(run_pull_session(manager, object_id, principal, tx, keep_alive, long_timeout));

    let stream = ReceiverStream::new(rx).map(Ok::<_, Error>);
    Ok(HttpResponse::Ok()
        .content_type("text/event-stream; charset=utf-8")
        .streaming(stream))
}

async fn run_pull_session(
    manager: Arc<LockManager>,
    object_id: String,
    principal: String,
    tx: mpsc::Sender<Bytes>,
    keep_alive: Option<Duration>,
    long_timeout: Duration,
) {
    let Some(token) = acquire_with_retry(&manager, &object_id, &principal, &tx).await else {
        return;
    };

    let prolong_period = long_timeout / 2;
    let mut prolong_tick = interval(prolong_period);
    prolong_tick.tick().await; // the first tick fires immediately

    let mut ping_tick = keep_alive.map(interval);

    loop {
        tokio::select! {
            _ = prolong_tick.tick() => {
                if let Err(err) = manager.prolong(&object_id, token).await {
                    let _ = send(&tx, "exception", render_error(&err, &object_id)).await;
                    break;
                }
            }
            _ = maybe_tick(&mut ping_tick) => {
                if send(&tx, "ping", serde_json::Value::Null).await.is_err() {
                    break;
                }
            }
            _ = tx.closed() => break,
        }
    }

    let _ = manager.release_on_teardown(&object_id, token).await;
}

/// Retries `AcquireExclusive` every 10s until it succeeds or the client
/// disconnects. Returns the winning token, or `None` if the client went
/// away first or a non-conflict error occurred.
async fn acquire_with_retry(
    manager: &Arc<LockManager>,
    object_id: &str,
    principal: &str,
    tx: &mpsc::Sender<Bytes>,
) -> Option<Token> {
    loop {
        match manager.acquire_exclusive(object_id, principal).await {
            Ok(lock) => {
                let token = lock.token;
                if send(tx, "acquired", serde_json::to_value(LockResponse::from(&lock)).unwrap())
                    .await
                    .is_err()
                {
                    return None;
                }
                return Some(token);
            }
            Err(LockError::AlreadyHeld(holder)) => {
                if send(
                    tx,
                    "rejected",
                    serde_json::to_value(LockAlreadyAcquiredResponse::from(&holder)).unwrap(),
                )
                .await
                .is_err()
                {
                    return None;
                }
            }
            Err(err) => {
                let _ = send(tx, "exception", render_error(&err, object_id)).await;
                return None;
            }
        }

        if tokio::time::timeout(RETRY_INTERVAL, tx.closed()).await.is_ok() {
            return None;
        }
    }
}

async fn maybe_tick(tick: &mut Option<Interval>) {
    match tick {
        Some(tick) => {
            tick.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn send(tx: &mpsc::Sender<Bytes>, event: &str, data: serde_json::Value) -> Result<(), ()> {
    let payload = format!("event: {event}\ndata: {data}\n\n");
    tx.send(Bytes::from(payload)).await.map_err(|_| ())
}
