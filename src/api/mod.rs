//! REST API module using Axum
//!
//! Provides the HTTP surface around the pipeline:
//! - `POST /api/texts` / `GET /api/texts` - submit text, list results
//! - `GET /api/progress` - SSE stream of stage events
//! - `GET /api/health` - liveness and observer count
//! - Optional static frontend served from a directory with `index.html` fallback

pub mod error;
pub mod health;
pub mod progress;
mod routes;
pub mod submissions;

pub use error::{ApiError, ErrorResponse};
pub use routes::api_routes;

use axum::http::{header, HeaderValue, Method};
use axum::Router;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::broadcast::BroadcastRegistry;
use crate::config::defaults::{DEFAULT_KEEPALIVE_SECS, DEFAULT_OBSERVER_BUFFER, MAX_BODY_BYTES};
use crate::config::AppConfig;
use crate::pipeline::PipelineOrchestrator;

/// Shared state for all handlers
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<BroadcastRegistry>,
    pub orchestrator: Arc<PipelineOrchestrator>,
    /// Cancelled on server shutdown to end open progress streams
    pub shutdown: CancellationToken,
    pub keep_alive: Duration,
    pub observer_buffer: usize,
}

impl AppState {
    pub fn new(registry: Arc<BroadcastRegistry>, orchestrator: Arc<PipelineOrchestrator>) -> Self {
        Self {
            registry,
            orchestrator,
            shutdown: CancellationToken::new(),
            keep_alive: Duration::from_secs(DEFAULT_KEEPALIVE_SECS),
            observer_buffer: DEFAULT_OBSERVER_BUFFER,
        }
    }

    /// Apply the progress channel settings from config
    #[must_use]
    pub fn with_config(mut self, config: &AppConfig) -> Self {
        self.keep_alive = config.keep_alive;
        self.observer_buffer = config.observer_buffer;
        self
    }

    #[must_use]
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }
}

/// Build a CORS layer restricted to the configured origins.
///
/// With no origins configured, cross-origin requests are not allowed.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.trim().parse() {
            Ok(origin) => Some(origin),
            Err(_) => {
                tracing::warn!(origin = %o, "CORS: ignoring invalid origin");
                None
            }
        })
        .collect();

    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::CACHE_CONTROL]);

    if allowed.is_empty() {
        layer
    } else {
        tracing::info!(origins = ?origins, "CORS: allowing configured origins");
        layer.allow_origin(allowed)
    }
}

/// Create the complete application router.
pub fn create_app(state: AppState, config: &AppConfig) -> Router {
    let mut router = api_routes(state);

    if let Some(dir) = config.static_dir.as_deref() {
        router = router.fallback_service(static_files(dir));
    }

    router
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(build_cors_layer(&config.cors_origins))
}

/// Serve files from `dir`, falling back to `index.html` for SPA routing.
fn static_files(dir: &Path) -> ServeDir<ServeFile> {
    tracing::info!(dir = %dir.display(), "Serving static files");
    ServeDir::new(dir).fallback(ServeFile::new(dir.join("index.html")))
}

