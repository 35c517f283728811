//! HTTP transport for the tuplewatch change-watch service.
//!
//! Exposes an axum [`Router`] with a single streaming watch endpoint
//! backed by any [`ChangelogDatastore`]. Auth, TLS, and deployment
//! concerns are the caller's responsibility.

pub mod error;
pub mod watch;

use std::{path::PathBuf, sync::Arc};

use axum::{Router, routing::post};
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use tuplewatch_core::{changelog::ChangelogDatastore, watcher::Watcher};

pub use error::ApiError;


// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` with
/// `TUPLEWATCH_*` environment overrides.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:       String,
  #[serde(default = "default_port")]
  pub port:       u16,
  #[serde(default = "default_store_path")]
  pub store_path: PathBuf,
}

fn default_host() -> String {
  "127.0.0.1".into()
}

fn default_port() -> u16 {
  8082
}

fn default_store_path() -> PathBuf {
  "tuplewatch.db".into()
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S> {
  pub watcher: Arc<Watcher<S>>,
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the axum [`Router`] for the watch service.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: ChangelogDatastore + Clone + Send + Sync + 'static,
  S::Iter: 'static,
{
  Router::new()
    .route("/watch", post(watch::handler::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}
