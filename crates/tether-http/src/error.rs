//! API error type and axum `IntoResponse` implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use tether_core::ResolveError;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Map a core resolution failure onto the HTTP taxonomy.
  pub fn from_resolve<E>(err: ResolveError<E>) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    match err {
      ResolveError::MissingIdentifiers => Self::BadRequest(err.to_string()),
      ResolveError::Store(e) => Self::Store(Box::new(e)),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Store(e) => {
        // Internals stay in the logs, not in the response body.
        tracing::error!(error = %e, "identity resolution failed");
        (
          StatusCode::INTERNAL_SERVER_ERROR,
          "internal server error".to_owned(),
        )
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
