//! API route definitions
//!
//! - /api/texts - submit text (POST), list finalized submissions (GET)
//! - /api/progress - SSE progress stream (GET), CORS preflight (OPTIONS)
//! - /api/health - liveness

use axum::{routing::get, Router};

use super::{health, progress, submissions, AppState};

/// API routes, without middleware
pub fn api_routes(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/texts",
            get(submissions::list_texts).post(submissions::create_text),
        )
        .route(
            "/api/progress",
            get(progress::subscribe).options(progress::preflight),
        )
        .route("/api/health", get(health::get_health))
        .with_state(state)
}
