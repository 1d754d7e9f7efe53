use std::{net::SocketAddr, sync::Arc};

use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use ballcam_core::TrackingUpdate;
use ballcam_esc::EscClient;
use ballcam_vision::{FrameStore, TrackingHandle};
use tokio::sync::{broadcast, watch};
use tower_http::cors::CorsLayer;

use crate::routes;

#[derive(Debug, Clone)]
pub struct UiConfig {
    pub port: u16,
}

/// Everything the request handlers can reach.
pub struct ServerState {
    pub tracking: TrackingHandle,
    pub frames: FrameStore,
    pub esc: EscClient,
    /// Latest per-frame update from the pipeline, `None` before the first frame.
    pub update_rx: watch::Receiver<Option<TrackingUpdate>>,
}

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/api/ball_stats", get(routes::ball_stats))
        .route("/api/sample_pixel", get(routes::sample_pixel))
        .route("/api/last_sampled_hsv", get(routes::last_sampled_hsv))
        .route("/api/frame.jpg", get(routes::frame_jpeg))
        .route("/api/ws", get(routes::websocket))
        .route("/set_throttle", post(routes::set_throttle))
        .route("/set_throttle/", post(routes::set_throttle))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

/// Serve the HTTP API until a shutdown signal is received.
pub async fn start(
    config: UiConfig,
    state: ServerState,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<()> {
    let app = router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind web server to {}", addr))?;

    let shutdown_fut = async move {
        let _ = shutdown_rx.recv().await;
    };
    tracing::info!("Web UI running at http://localhost:{}", config.port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_fut)
        .await
        .context("Web server failed")?;
    tracing::debug!("Web server stopped");
    Ok(())
}
