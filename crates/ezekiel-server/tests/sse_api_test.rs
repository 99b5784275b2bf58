//! Integration test for the pull-variant streaming session: a
//! bare GET against `/ezekiel/es/{object_id}` should yield an SSE body whose
//! first event is `acquired` when the object is free.

use std::sync::Arc;
use std::time::Duration;

use std::future::poll_fn;
use std::pin::Pin;

use actix_web::body::MessageBody;
use actix_web::{App, test, web};
use ezekiel_core::{AuthCollaborator, LockManagerConfig, StaticAuthCollaborator};
use ezekiel_server::state::AppState;

#[actix_web::test]
async fn sse_stream_opens_with_acquired_event() {
    let auth: Arc<dyn AuthCollaborator> =
        Arc::new(StaticAuthCollaborator::new("ezekiel_session").with_identity("alice-token", "alice"));
    let state = AppState::new(
        LockManagerConfig {
            short_timeout: Duration::from_secs(60),
            long_timeout: Duration::from_secs(3600),
        },
        auth,
        Some(30),
    );

    let app = test::init_service(
        App::new().app_data(web::Data::new(state)).configure(ezekiel_server::configure),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/ezekiel/es/doc-sse")
        .insert_header(("Authorization", "Bearer alice-token"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    assert_eq!(
        resp.headers().get("content-type").unwrap(),
        "text/event-stream; charset=utf-8"
    );

    // The task behind this stream runs forever (prolongation/ping loop), so
    // read only the first chunk rather than draining to EOF.
    let mut body = resp.into_body();
    let first_chunk = poll_fn(|cx| Pin::new(&mut body).poll_next(cx)).await;
    let bytes = first_chunk.expect("stream ended before first event").unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.starts_with("event: acquired\n"), "unexpected first event: {text}");
}

#[actix_web::test]
async fn sse_stream_without_identity_is_unauthorized() {
    let auth: Arc<dyn AuthCollaborator> = Arc::new(StaticAuthCollaborator::new("ezekiel_session"));
    let state = AppState::new(LockManagerConfig::default(), auth, None);

    let app = test::init_service(
        App::new().app_data(web::Data::new(state)).configure(ezekiel_server::configure),
    )
    .await;

    let req = test::TestRequest::get().uri("/ezekiel/es/doc-sse").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);
}
