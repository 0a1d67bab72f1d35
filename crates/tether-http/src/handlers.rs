//! Request handlers.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/identify` | Body: `{"email"?, "phoneNumber"?}` — at least one |
//! | `GET`  | `/health`   | Liveness only; touches nothing |

use std::sync::Arc;

use axum::{
  Json,
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tether_core::{resolve, store::ContactStore, view::IdentityView};
use tracing::info;

use crate::{AppState, error::ApiError};

/// `POST /identify` request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifyRequest {
  pub email:        Option<String>,
  pub phone_number: Option<String>,
}

/// `POST /identify`
pub async fn identify<S>(
  State(state): State<Arc<AppState<S>>>,
  Json(body): Json<IdentifyRequest>,
) -> Result<Json<IdentityView>, ApiError>
where
  S: ContactStore,
{
  // Empty strings are absent values, not matchable identifiers.
  let email = body.email.as_deref().filter(|e| !e.is_empty());
  let phone = body.phone_number.as_deref().filter(|p| !p.is_empty());

  if email.is_none() && phone.is_none() {
    return Err(ApiError::BadRequest(
      "either email or phoneNumber must be provided".to_owned(),
    ));
  }

  // Held across the whole read-merge-write-read sequence so concurrent
  // submissions for the same identity cannot interleave.
  let _guards = state.lock.acquire(email, phone).await;

  let view = resolve::identify(state.store.as_ref(), email, phone)
    .await
    .map_err(ApiError::from_resolve)?;

  info!(primary = view.contact.primary_contact_id, "resolved identity");
  Ok(Json(view))
}

/// `GET /health`
pub async fn health() -> impl IntoResponse {
  Json(json!({
    "status": "OK",
    "timestamp": Utc::now().to_rfc3339(),
    "service": "tether",
  }))
}

/// Fallback for unknown routes.
pub async fn not_found() -> impl IntoResponse {
  (
    StatusCode::NOT_FOUND,
    Json(json!({ "error": "endpoint not found" })),
  )
}
