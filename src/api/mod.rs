//! HTTP API for the image arena
//!
//! Axum router exposing the voting endpoints, health and Prometheus
//! metrics, plus the image directory as static files.

pub mod error;
pub mod handlers;

pub use error::ApiError;

use crate::service::AppState;
use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Build the router for the given application state
pub fn create_router(state: Arc<AppState>) -> Router {
    let url_prefix = state.config().images.url_prefix.clone();
    let image_files = ServeDir::new(state.config().images.directory.clone());

    Router::new()
        .route("/", get(handlers::root_handler))
        .route("/matchup", get(handlers::matchup_handler))
        .route("/vote", post(handlers::vote_handler))
        .route("/leaderboard-data", get(handlers::leaderboard_handler))
        .route("/submit", post(handlers::submit_handler))
        .route("/health", get(handlers::health_handler))
        .route("/alive", get(handlers::alive_handler))
        .route("/metrics", get(handlers::metrics_handler))
        .nest_service(&url_prefix, image_files)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

/// HTTP server wrapping the router with graceful shutdown
pub struct ApiServer {
    addr: String,
    state: Arc<AppState>,
    shutdown_tx: broadcast::Sender<()>,
}

impl ApiServer {
    /// Create a server for the configured host and port
    pub fn new(state: Arc<AppState>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            addr: state.config().bind_address(),
            state,
            shutdown_tx,
        }
    }

    /// Bind the configured address
    pub async fn bind(&self) -> Result<TcpListener> {
        let addr: SocketAddr = self
            .addr
            .parse()
            .with_context(|| format!("Invalid server address {}", self.addr))?;

        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;
        info!("HTTP server listening on http://{}", addr);

        Ok(listener)
    }

    /// Serve requests on a bound listener until [`ApiServer::stop`] is called
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let app = create_router(self.state.clone());
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
                info!("HTTP server shutdown signal received");
            })
            .await?;

        info!("HTTP server stopped");
        Ok(())
    }

    /// Ask a running server to finish in-flight requests and stop
    pub fn stop(&self) {
        if let Err(e) = self.shutdown_tx.send(()) {
            warn!("Failed to send shutdown signal to HTTP server: {}", e);
        }
    }
}
