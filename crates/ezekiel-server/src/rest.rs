//! Short-lived REST facade: thin forwards to `LockManager`
//! under `/ezekiel/rpc/{command}/{object_id}`.

use actix_web::{HttpRequest, HttpResponse, web};
use ezekiel_common::{LockError, Token};
use serde::Deserialize;

use crate::auth::authenticate;
use crate::state::AppState;
use crate::wire::{LockResponse, ReleasedResponse, render_error};

#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    pub token: Option<String>,
}

pub fn routes() -> actix_web::Scope {
    web::scope("/ezekiel/rpc")
        .route("/stats", web::get().to(stats))
        .route("/{command}/{object_id}", web::post().to(dispatch))
}

/// Admin observability endpoint, not part of the original spec's surface
/// but carried as ambient non-functional observability (§4.1).
async fn stats(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(state.manager.stats().await)
}

async fn dispatch(
    req: HttpRequest,
    path: web::Path<(String, String)>,
    query: web::Query<TokenQuery>,
    state: web::Data<AppState>,
) -> HttpResponse {
    let (command, object_id) = path.into_inner();

    match command.as_str() {
        // Only `acquire` resolves an identity — `prolong`/`release` are
        // authorized purely by bearer token (spec.md §3), the same split
        // the original `rest.py` makes (`cas.request_get_user_id` is only
        // called on the acquire branch).
        "acquire" => {
            let Some(principal) = authenticate(&req, state.auth.as_ref()) else {
                return HttpResponse::Forbidden().finish();
            };
            match state.manager.acquire_temporary(&object_id, &principal).await {
                Ok(lock) => HttpResponse::Ok().json(LockResponse::from(&lock)),
                Err(err) => HttpResponse::Ok().json(render_error(&err, &object_id)),
            }
        }
        "prolong" => {
            let Some(token) = parsed_token(&query) else {
                return HttpResponse::Ok().json(render_error(&LockError::NotFound, &object_id));
            };
            match state.manager.prolong(&object_id, token).await {
                Ok(lock) => HttpResponse::Ok().json(LockResponse::from(&lock)),
                Err(err) => HttpResponse::Ok().json(render_error(&err, &object_id)),
            }
        }
        "release" => {
            let Some(token) = parsed_token(&query) else {
                return HttpResponse::Ok().json(render_error(&LockError::NotFound, &object_id));
            };
            match state.manager.release(&object_id, token).await {
                Ok(()) => HttpResponse::Ok().json(ReleasedResponse::new(object_id)),
                Err(err) => HttpResponse::Ok().json(render_error(&err, &object_id)),
            }
        }
        _ => HttpResponse::BadRequest().finish(),
    }
}

fn parsed_token(query: &TokenQuery) -> Option<Token> {
    Token::parse(query.token.as_deref()?)
}
