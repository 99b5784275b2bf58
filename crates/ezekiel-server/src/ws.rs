//! Push-variant streaming session: one actor per WebSocket
//! connection, mirroring the `actix::Actor` + `actix-web-actors::ws`
//! pattern the workspace already declares a dependency on but never
//! instantiates.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use actix::{Actor, ActorContext, ActorFutureExt, AsyncContext, StreamHandler, WrapFuture};
use actix_web::{Error, HttpRequest, HttpResponse, web};
use actix_web_actors::ws;
use ezekiel_common::{LockError, Token};
use ezekiel_core::{Lock, LockManager};
use serde::Deserialize;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tracing::debug;

use crate::auth::authenticate;
use crate::state::AppState;
use crate::wire::{LockAlreadyAcquiredResponse, LockResponse, render_error};

/// Connections idle for longer than this (no ping/pong either direction)
/// are assumed dead and torn down.
const CLIENT_TIMEOUT: Duration = Duration::from_secs(90);

/// Push-variant keep-alive cadence, started unconditionally on every
/// connection — not gated by the `keep_alive` setting, which only governs
/// the pull (SSE) variant's optional ping.
const PING_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct InboundCommand {
    command: String,
    object_id: String,
    token: Option<String>,
}

pub struct WsSession {
    manager: Arc<LockManager>,
    principal: String,
    owned: HashMap<String, Lock>,
    waiting: HashSet<String>,
    hb: Instant,
}

impl WsSession {
    fn new(manager: Arc<LockManager>, principal: String) -> Self {
        Self {
            manager,
            principal,
            owned: HashMap::new(),
            waiting: HashSet::new(),
            hb: Instant::now(),
        }
    }

    fn handle_command(&mut self, raw: &str, ctx: &mut ws::WebsocketContext<Self>) {
        let cmd: InboundCommand = match serde_json::from_str(raw) {
            Ok(cmd) => cmd,
            Err(_) => {
                send_event(ctx, "exception", render_error(&LockError::NotFound, ""));
                return;
            }
        };

        match cmd.command.as_str() {
            "acquire" => self.do_acquire(cmd.object_id, ctx),
            "release" => self.do_release(cmd.object_id, cmd.token, ctx),
            "prolong" => self.do_prolong(cmd.object_id, cmd.token, ctx),
            _ => send_event(ctx, "exception", render_error(&LockError::NotFound, &cmd.object_id)),
        }
    }

    fn do_acquire(&mut self, object_id: String, ctx: &mut ws::WebsocketContext<Self>) {
        let manager = self.manager.clone();
        let principal = self.principal.clone();
        let reply_object_id = object_id.clone();

        let fut = async move { manager.acquire_exclusive(&object_id, &principal).await };
        ctx.spawn(fut.into_actor(self).map(move |result, act, ctx| match result {
            Ok(lock) => {
                act.waiting.remove(&lock.object_id);
                act.owned.insert(lock.object_id.clone(), lock.clone());
                send_event(ctx, "acquired", serde_json::to_value(LockResponse::from(&lock)).unwrap());
            }
            Err(LockError::AlreadyHeld(holder)) => {
                act.waiting.insert(holder.object_id.clone());
                send_event(
                    ctx,
                    "rejected",
                    serde_json::to_value(LockAlreadyAcquiredResponse::from(&holder)).unwrap(),
                );
            }
            Err(err) => send_event(ctx, "exception", render_error(&err, &reply_object_id)),
        }));
    }

    fn do_release(&mut self, object_id: String, token: Option<String>, ctx: &mut ws::WebsocketContext<Self>) {
        self.waiting.remove(&object_id);

        let Some(token) = token.as_deref().and_then(Token::parse) else {
            send_event(ctx, "exception", render_error(&LockError::NotFound, &object_id));
            return;
        };

        let manager = self.manager.clone();
        let reply_object_id = object_id.clone();
        let fut = async move { manager.release(&object_id, token).await };
        ctx.spawn(fut.into_actor(self).map(move |result, act, ctx| match result {
            Ok(()) => {
                act.owned.remove(&reply_object_id);
                send_event(ctx, "released", serde_json::json!({"success": true, "object_id": reply_object_id}));
            }
            Err(err) => send_event(ctx, "exception", render_error(&err, &reply_object_id)),
        }));
    }

    fn do_prolong(&mut self, object_id: String, token: Option<String>, ctx: &mut ws::WebsocketContext<Self>) {
        let Some(token) = token.as_deref().and_then(Token::parse) else {
            send_event(ctx, "exception", render_error(&LockError::NotFound, &object_id));
            return;
        };

        let manager = self.manager.clone();
        let reply_object_id = object_id.clone();
        let fut = async move { manager.prolong(&object_id, token).await };
        ctx.spawn(fut.into_actor(self).map(move |result, act, ctx| match result {
            Ok(lock) => {
                act.owned.insert(lock.object_id.clone(), lock.clone());
                send_event(ctx, "prolonged", serde_json::to_value(LockResponse::from(&lock)).unwrap());
            }
            Err(err) => send_event(ctx, "exception", render_error(&err, &reply_object_id)),
        }));
    }

    /// Retry-on-release: a waited-for object just became free, try again
    /// with no delay or backoff.
    fn retry_acquire(&mut self, object_id: String, ctx: &mut ws::WebsocketContext<Self>) {
        self.do_acquire(object_id, ctx);
    }
}

impl Actor for WsSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        ctx.run_interval(PING_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.hb) > CLIENT_TIMEOUT {
                ctx.stop();
                return;
            }
            send_event(ctx, "ping", serde_json::Value::Null);
        });

        let released_rx = self.manager.subscribe_released();
        ctx.add_stream(BroadcastStream::new(released_rx).filter_map(|item| item.ok()));
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        // Streams registered via add_stream are cancelled as the context
        // tears down, so the EventBus subscription is already gone by the
        // time this runs; only the owned-lock release sequence remains.
        let manager = self.manager.clone();
        let owned: Vec<(String, Token)> =
            self.owned.values().map(|lock| (lock.object_id.clone(), lock.token)).collect();
        self.waiting.clear();
        self.owned.clear();

        tokio::spawn(async move {
            for (object_id, token) in owned {
                // LockNotFound (timer already fired) and AlreadyHeld (raced
                // with a post-expiry reacquire) are both expected outcomes.
                if let Err(err) = manager.release_on_teardown(&object_id, token).await {
                    debug!(object_id, %err, "release on teardown was a no-op");
                }
            }
        });
    }
}

impl StreamHandler<Lock> for WsSession {
    fn handle(&mut self, lock: Lock, ctx: &mut Self::Context) {
        if self.waiting.remove(&lock.object_id) {
            self.retry_acquire(lock.object_id, ctx);
        }
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WsSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        let msg = match msg {
            Ok(msg) => msg,
            Err(_) => {
                ctx.stop();
                return;
            }
        };

        match msg {
            ws::Message::Ping(payload) => {
                self.hb = Instant::now();
                ctx.pong(&payload);
            }
            ws::Message::Pong(_) => self.hb = Instant::now(),
            ws::Message::Text(text) => self.handle_command(&text, ctx),
            ws::Message::Close(reason) => {
                ctx.close(reason);
                ctx.stop();
            }
            ws::Message::Continuation(_) => ctx.stop(),
            _ => {}
        }
    }
}

fn send_event(ctx: &mut ws::WebsocketContext<WsSession>, event: &str, data: serde_json::Value) {
    let envelope = serde_json::json!({ "event": event, "data": data });
    ctx.text(envelope.to_string());
}

pub async fn serve(req: HttpRequest, stream: web::Payload, state: web::Data<AppState>) -> Result<HttpResponse, Error> {
    let Some(principal) = authenticate(&req, state.auth.as_ref()) else {
        return Ok(HttpResponse::Unauthorized().finish());
    };

    let session = WsSession::new(state.manager.clone(), principal);
    ws::start(session, &req, stream)
}
