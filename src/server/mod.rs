//! HTTP search gateway
//!
//! Exposes the [`SearchService`] over `GET /api/search` and reports index
//! readiness on `GET /api/status`.

pub mod errors;
pub mod handlers;


use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use axum::routing::get;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::search::SearchService;

/// Shared handler state
#[derive(Debug, Clone)]
pub struct AppState {
    pub service: Arc<SearchService>,
    /// Upper bound on the `limit` query parameter
    pub max_top_k: usize,
}

impl AppState {
    #[inline]
    pub fn new(service: Arc<SearchService>, max_top_k: usize) -> Self {
        Self {
            service,
            max_top_k: max_top_k.max(1),
        }
    }
}

/// Create the API router
#[inline]
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/search", get(handlers::search))
        .route("/api/status", get(handlers::status))
        .layer(CatchPanicLayer::custom(errors::panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind `addr` and serve until `shutdown` resolves
#[inline]
pub async fn start_server<F>(addr: SocketAddr, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    let local_addr = listener
        .local_addr()
        .context("Failed to read bound address")?;

    info!("Search API listening on http://{}", local_addr);

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .context("Server error")?;

    info!("Server shutdown gracefully");
    Ok(())
}
