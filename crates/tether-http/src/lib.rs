//! HTTP layer for Tether.
//!
//! Exposes an axum [`Router`] with the identify and health endpoints,
//! backed by any [`ContactStore`]. Transport concerns stop here; the
//! resolution algorithm lives in `tether-core`.

pub mod error;
pub mod handlers;

pub use error::ApiError;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  routing::{get, post},
};
use serde::Deserialize;
use tether_core::{lock::IdentityLock, store::ContactStore};
use tower_http::trace::TraceLayer;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` with a
/// `TETHER_*` environment overlay.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:       String,
  #[serde(default = "default_port")]
  pub port:       u16,
  #[serde(default = "default_store_path")]
  pub store_path: PathBuf,
}

fn default_host() -> String {
  "0.0.0.0".to_owned()
}

fn default_port() -> u16 {
  3000
}

fn default_store_path() -> PathBuf {
  PathBuf::from("tether.db")
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:       default_host(),
      port:       default_port(),
      store_path: default_store_path(),
    }
  }
}

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S> {
  pub store: Arc<S>,
  /// Serialises conflicting resolutions for the same identity; see
  /// [`handlers::identify`].
  pub lock:  IdentityLock,
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the application router.
pub fn router<S>(state: Arc<AppState<S>>) -> Router
where
  S: ContactStore + 'static,
{
  Router::new()
    .route("/identify", post(handlers::identify::<S>))
    .route("/health", get(handlers::health))
    .fallback(handlers::not_found)
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

#[cfg(test)]
mod tests;
