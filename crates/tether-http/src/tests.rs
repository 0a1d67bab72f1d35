//! Router tests against an in-memory store.

use std::sync::Arc;

use axum::{
  Router,
  body::Body,
  http::{Request, StatusCode, header},
};
use serde_json::{Value, json};
use tether_core::lock::IdentityLock;
use tether_store_sqlite::SqliteStore;
use tower::ServiceExt as _;

use crate::{AppState, router};

async fn app() -> Router {
  let store = SqliteStore::open_in_memory()
    .await
    .expect("in-memory store");
  router(Arc::new(AppState {
    store: Arc::new(store),
    lock:  IdentityLock::new(),
  }))
}

async fn post_identify(app: Router, body: Value) -> (StatusCode, Value) {
  let response = app
    .oneshot(
      Request::builder()
        .method("POST")
        .uri("/identify")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap(),
    )
    .await
    .unwrap();

  let status = response.status();
  let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
    .await
    .unwrap();
  (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn identify_returns_the_identity_view() {
  let app = app().await;

  let (status, body) = post_identify(
    app,
    json!({ "email": "a@x.com", "phoneNumber": "111" }),
  )
  .await;

  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["contact"]["emails"], json!(["a@x.com"]));
  assert_eq!(body["contact"]["phoneNumbers"], json!(["111"]));
  assert_eq!(body["contact"]["secondaryContactIds"], json!([]));
  assert!(body["contact"]["primaryContactId"].is_i64());
}

#[tokio::test]
async fn repeat_submission_reuses_the_primary() {
  let app = app().await;

  let (_, first) = post_identify(
    app.clone(),
    json!({ "email": "a@x.com", "phoneNumber": "111" }),
  )
  .await;
  let (status, second) = post_identify(
    app,
    json!({ "email": "a@x.com", "phoneNumber": "222" }),
  )
  .await;

  assert_eq!(status, StatusCode::OK);
  assert_eq!(
    second["contact"]["primaryContactId"],
    first["contact"]["primaryContactId"]
  );
  assert_eq!(second["contact"]["phoneNumbers"], json!(["111", "222"]));
}

#[tokio::test]
async fn missing_both_identifiers_is_rejected() {
  let app = app().await;

  let (status, body) = post_identify(app, json!({})).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(
    body["error"],
    json!("either email or phoneNumber must be provided")
  );
}

#[tokio::test]
async fn explicit_nulls_are_rejected_like_absent_fields() {
  let app = app().await;

  let (status, _) =
    post_identify(app, json!({ "email": null, "phoneNumber": null })).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn empty_strings_are_rejected_like_absent_fields() {
  let app = app().await;

  let (status, body) =
    post_identify(app.clone(), json!({ "email": "", "phoneNumber": "" })).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(
    body["error"],
    json!("either email or phoneNumber must be provided")
  );

  // An empty email alongside a real phone is a phone-only submission.
  let (status, body) =
    post_identify(app, json!({ "email": "", "phoneNumber": "111" })).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["contact"]["emails"], json!([]));
  assert_eq!(body["contact"]["phoneNumbers"], json!(["111"]));
}

#[tokio::test]
async fn health_reports_ok_without_a_store_in_reach() {
  let app = app().await;

  let response = app
    .oneshot(
      Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap(),
    )
    .await
    .unwrap();

  assert_eq!(response.status(), StatusCode::OK);
  let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
    .await
    .unwrap();
  let body: Value = serde_json::from_slice(&bytes).unwrap();
  assert_eq!(body["status"], json!("OK"));
  assert_eq!(body["service"], json!("tether"));
}

#[tokio::test]
async fn unknown_routes_return_json_404() {
  let app = app().await;

  let response = app
    .oneshot(
      Request::builder()
        .uri("/nowhere")
        .body(Body::empty())
        .unwrap(),
    )
    .await
    .unwrap();

  assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn concurrent_identical_submissions_create_one_secondary() {
  let app = app().await;

  // Seed the identity, then race several submissions that each carry
  // the same new phone number. The identity lock must serialise them so
  // only the first one finds the phone novel.
  post_identify(
    app.clone(),
    json!({ "email": "a@x.com", "phoneNumber": "111" }),
  )
  .await;

  let mut handles = Vec::new();
  for _ in 0..8 {
    let app = app.clone();
    handles.push(tokio::spawn(async move {
      post_identify(app, json!({ "email": "a@x.com", "phoneNumber": "222" }))
        .await
    }));
  }
  for handle in handles {
    let (status, _) = handle.await.unwrap();
    assert_eq!(status, StatusCode::OK);
  }

  let (_, body) =
    post_identify(app, json!({ "email": "a@x.com", "phoneNumber": "222" }))
      .await;
  assert_eq!(
    body["contact"]["secondaryContactIds"]
      .as_array()
      .unwrap()
      .len(),
    1
  );
}
