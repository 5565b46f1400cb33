//! HTTP server setup and routing
//!
//! Sets up the Axum HTTP server with the channel query/command routes and
//! the SSE event stream.

use crate::error::{Error, Result};
use crate::playback::PlayoutEngine;
use crate::state::SharedState;
use crate::viewers::ViewerCounter;
use axum::{
    routing::{get, post},
    Router,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared application context passed to all handlers
#[derive(Clone)]
pub struct AppContext {
    pub engine: Arc<PlayoutEngine>,
    pub state: Arc<SharedState>,
    pub viewers: Arc<ViewerCounter>,
}

impl AppContext {
    pub fn new(engine: Arc<PlayoutEngine>) -> Self {
        let state = Arc::clone(engine.shared_state());
        Self {
            engine,
            state,
            viewers: Arc::new(ViewerCounter::default()),
        }
    }
}

/// Build the router with all routes attached to `ctx`
pub fn build_router(ctx: AppContext) -> Router {
    Router::new()
        // Health and build identification
        .route("/health", get(super::handlers::health))
        .route("/build_info", get(super::handlers::build_info))

        // Channels
        .route("/channels", get(super::handlers::list_channels))
        .route("/channels/:channel_id/current", get(super::handlers::get_current_program))
        .route("/channels/:channel_id/upcoming", get(super::handlers::get_upcoming))
        .route("/channels/:channel_id/session", get(super::handlers::get_session))
        .route("/channels/:channel_id/command", post(super::handlers::post_command))
        .route(
            "/channels/:channel_id/status",
            get(super::handlers::get_status).put(super::handlers::put_status),
        )
        .route(
            "/channels/:channel_id/playlist/invalidate",
            post(super::handlers::invalidate_playlist),
        )
        .route("/channels/:channel_id/reload", post(super::handlers::reload_channel))
        .route("/channels/:channel_id/log", get(super::handlers::get_playback_log))
        .route("/channels/:channel_id/viewers", get(super::handlers::get_viewers))

        // SSE event stream
        .route("/events", get(super::sse::event_stream))

        .with_state(ctx)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Run HTTP API server until `shutdown` resolves
pub async fn run(
    port: u16,
    ctx: AppContext,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let app = build_router(ctx);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Http(format!("Failed to bind to {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| Error::Http(format!("Server error: {}", e)))?;

    info!("HTTP server stopped");
    Ok(())
}
