//! HTTP surface for the cached market data.

mod response;
mod routes;

use axum::Router;
use color_eyre::{eyre::eyre, Result};
use std::net::SocketAddr;
use tokio::signal;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::market::cached_client::CachedMarketClient;

/// Shared handler state. Cloning is cheap; all clones share the caches.
#[derive(Clone)]
pub struct AppState {
  pub market: CachedMarketClient,
}

/// Creates the main application router.
pub fn router(state: AppState) -> Router {
  Router::new()
    .merge(routes::health_router())
    .nest("/api/crypto", routes::crypto_router())
    .layer(CorsLayer::permissive())
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

/// Serve until Ctrl+C or SIGTERM.
pub async fn serve(bind: SocketAddr, state: AppState) -> Result<()> {
  let listener = tokio::net::TcpListener::bind(bind)
    .await
    .map_err(|e| eyre!("Failed to bind {}: {}", bind, e))?;

  info!(addr = %bind, "marketwatch listening");

  axum::serve(listener, router(state))
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| eyre!("Server error: {}", e))?;

  info!("shutdown complete");
  Ok(())
}

async fn shutdown_signal() {
  let ctrl_c = async {
    if let Err(e) = signal::ctrl_c().await {
      warn!(error = %e, "failed to listen for Ctrl+C");
      std::future::pending::<()>().await;
    }
  };

  #[cfg(unix)]
  let terminate = async {
    match signal::unix::signal(signal::unix::SignalKind::terminate()) {
      Ok(mut sig) => {
        sig.recv().await;
      }
      Err(e) => {
        warn!(error = %e, "failed to install SIGTERM handler");
        std::future::pending::<()>().await;
      }
    }
  };

  #[cfg(not(unix))]
  let terminate = std::future::pending::<()>();

  tokio::select! {
    _ = ctrl_c => info!("received Ctrl+C, shutting down"),
    _ = terminate => info!("received SIGTERM, shutting down"),
  }
}
