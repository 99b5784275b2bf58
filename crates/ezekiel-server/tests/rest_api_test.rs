//! Integration tests for the REST lock surface, exercised in-process with
//! `actix_web::test` against the assembled `ServiceConfig`.

use std::sync::Arc;
use std::time::Duration;

use actix_web::{App, test, web};
use ezekiel_core::{AuthCollaborator, LockManagerConfig, StaticAuthCollaborator};
use ezekiel_server::state::AppState;

fn test_state() -> AppState {
    let auth: Arc<dyn AuthCollaborator> =
        Arc::new(StaticAuthCollaborator::new("ezekiel_session").with_identity("alice-token", "alice"));
    AppState::new(
        LockManagerConfig {
            short_timeout: Duration::from_secs(60),
            long_timeout: Duration::from_secs(3600),
        },
        auth,
        Some(30),
    )
}

#[actix_web::test]
async fn acquire_without_identity_is_forbidden() {
    let state = test_state();
    let app = test::init_service(
        App::new().app_data(web::Data::new(state)).configure(ezekiel_server::configure),
    )
    .await;

    let req = test::TestRequest::post().uri("/ezekiel/rpc/acquire/doc-1").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 403);
}

#[actix_web::test]
async fn acquire_prolong_release_round_trip() {
    let state = test_state();
    let app = test::init_service(
        App::new().app_data(web::Data::new(state)).configure(ezekiel_server::configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/ezekiel/rpc/acquire/doc-1")
        .insert_header(("Authorization", "Bearer alice-token"))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["object_id"], "doc-1");
    let token = body["token"].as_str().unwrap().to_string();
    assert_eq!(token.len(), 32);

    let req = test::TestRequest::post()
        .uri(&format!("/ezekiel/rpc/prolong/doc-1?token={token}"))
        .insert_header(("Authorization", "Bearer alice-token"))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["success"], true);

    let req = test::TestRequest::post()
        .uri(&format!("/ezekiel/rpc/release/doc-1?token={token}"))
        .insert_header(("Authorization", "Bearer alice-token"))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["success"], true);

    // Releasing the same token twice is opaque NotFound, not a crash.
    let req = test::TestRequest::post()
        .uri(&format!("/ezekiel/rpc/release/doc-1?token={token}"))
        .insert_header(("Authorization", "Bearer alice-token"))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["exception"], "LockNotFound");
}

#[actix_web::test]
async fn prolong_and_release_need_no_identity_only_the_token() {
    // `acquire` resolves an identity; `prolong`/`release` are authorized by
    // bearer-capability token alone, per spec.md §3 — no `Authorization`
    // header is sent for either call below.
    let state = test_state();
    let app = test::init_service(
        App::new().app_data(web::Data::new(state)).configure(ezekiel_server::configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/ezekiel/rpc/acquire/doc-token-only")
        .insert_header(("Authorization", "Bearer alice-token"))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    let token = body["token"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri(&format!("/ezekiel/rpc/prolong/doc-token-only?token={token}"))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["success"], true);

    let req = test::TestRequest::post()
        .uri(&format!("/ezekiel/rpc/release/doc-token-only?token={token}"))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["success"], true);
}

#[actix_web::test]
async fn conflicting_acquire_reports_current_holder() {
    let state = test_state();
    let auth: Arc<dyn AuthCollaborator> = Arc::new(
        StaticAuthCollaborator::new("ezekiel_session")
            .with_identity("alice-token", "alice")
            .with_identity("bob-token", "bob"),
    );
    let state = AppState::new(state.manager.config(), auth, Some(30));
    let app = test::init_service(
        App::new().app_data(web::Data::new(state)).configure(ezekiel_server::configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/ezekiel/rpc/acquire/doc-2")
        .insert_header(("Authorization", "Bearer alice-token"))
        .to_request();
    let _: serde_json::Value = test::call_and_read_body_json(&app, req).await;

    let req = test::TestRequest::post()
        .uri("/ezekiel/rpc/acquire/doc-2")
        .insert_header(("Authorization", "Bearer bob-token"))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["exception"], "LockAlreadyAcquired");
    assert_eq!(body["locker"], "alice");
}

#[actix_web::test]
async fn unknown_command_is_bad_request() {
    let state = test_state();
    let app = test::init_service(
        App::new().app_data(web::Data::new(state)).configure(ezekiel_server::configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/ezekiel/rpc/frobnicate/doc-1")
        .insert_header(("Authorization", "Bearer alice-token"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
}

#[actix_web::test]
async fn wrong_path_arity_is_not_found() {
    let state = test_state();
    let app = test::init_service(
        App::new().app_data(web::Data::new(state)).configure(ezekiel_server::configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/ezekiel/rpc/acquire")
        .insert_header(("Authorization", "Bearer alice-token"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
}

#[actix_web::test]
async fn stats_endpoint_reports_active_locks() {
    let state = test_state();
    let app = test::init_service(
        App::new().app_data(web::Data::new(state)).configure(ezekiel_server::configure),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/ezekiel/rpc/acquire/doc-3")
        .insert_header(("Authorization", "Bearer alice-token"))
        .to_request();
    let _: serde_json::Value = test::call_and_read_body_json(&app, req).await;

    let req = test::TestRequest::get().uri("/ezekiel/rpc/stats").to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["active_locks"], 1);
    assert_eq!(body["total_acquisitions"], 1);
}
