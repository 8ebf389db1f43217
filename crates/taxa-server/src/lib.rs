//! HTTP server assembly for Taxa: configuration and the top-level router.

use std::{path::PathBuf, sync::Arc};

use axum::{Json, Router, routing::get};
use serde::Deserialize;
use taxa_core::store::TaxonomyStore;
use tokio::signal;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `TAXA_*` environment variables.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:          String,
  #[serde(default = "default_port")]
  pub port:          u16,
  #[serde(default = "default_database_path")]
  pub database_path: PathBuf,
}

fn default_host() -> String { "127.0.0.1".to_owned() }

fn default_port() -> u16 { 5232 }

fn default_database_path() -> PathBuf { PathBuf::from("taxa.db") }

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:          default_host(),
      port:          default_port(),
      database_path: default_database_path(),
    }
  }
}

impl ServerConfig {
  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// The full application: the JSON API under `/api`, a liveness probe at
/// `/health`, and per-request tracing spans.
pub fn app<S>(store: Arc<S>) -> Router
where
  S: TaxonomyStore + Send + Sync + 'static,
{
  Router::new()
    .route(
      "/health",
      get(|| async { Json(serde_json::json!({ "status": "ok" })) }),
    )
    .nest("/api", taxa_api::api_router(store))
    .layer(TraceLayer::new_for_http())
}

// ─── Shutdown ─────────────────────────────────────────────────────────────────

/// Resolve on Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
  let ctrl_c = async {
    if let Err(e) = signal::ctrl_c().await {
      tracing::error!("failed to install Ctrl+C handler: {e}");
      std::future::pending::<()>().await;
    }
  };

  #[cfg(unix)]
  let terminate = recv_or_pending(signal::unix::signal(
    signal::unix::SignalKind::terminate(),
  ));

  #[cfg(not(unix))]
  let terminate = std::future::pending::<()>();

  tokio::select! {
    _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
    _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
  }
}

/// Wait for one delivery of `installed`. A handler that failed to install
/// never resolves, so it cannot trigger a shutdown.
#[cfg(unix)]
async fn recv_or_pending(installed: std::io::Result<signal::unix::Signal>) {
  match installed {
    Ok(mut sig) => {
      sig.recv().await;
    }
    Err(e) => {
      tracing::error!("failed to install SIGTERM handler: {e}");
      std::future::pending::<()>().await;
    }
  }
}
