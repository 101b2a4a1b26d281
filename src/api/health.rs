//! Health check endpoint

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use super::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
    /// Observer connections currently registered
    pub observers: usize,
}

pub async fn get_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK",
        message: "Server is running",
        observers: state.registry.len(),
    })
}
