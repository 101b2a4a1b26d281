//! Text submission endpoints
//!
//! - `POST /api/texts` runs a submission through the pipeline
//! - `GET /api/texts` lists finalized submissions

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::ApiError;
use super::AppState;
use crate::types::Submission;

#[derive(Debug, Deserialize)]
pub struct SubmitTextRequest {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SubmissionList {
    pub texts: Vec<Submission>,
}

/// POST /api/texts
///
/// Returns 201 with the finalized record, including when the dependent
/// step fell back to the primary result.
pub async fn create_text(
    State(state): State<AppState>,
    payload: Result<Json<SubmitTextRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Submission>), ApiError> {
    let Json(request) = payload
        .map_err(|rejection| ApiError::bad_request("Invalid request body", Some(rejection.body_text())))?;

    let outcome = state.orchestrator.submit(request.text.as_deref()).await?;
    debug!(id = outcome.submission.id, degraded = outcome.degraded, "Submission created");

    Ok((StatusCode::CREATED, Json(outcome.submission)))
}

/// GET /api/texts
pub async fn list_texts(State(state): State<AppState>) -> Result<Json<SubmissionList>, ApiError> {
    let texts = state.orchestrator.store().list()?;
    Ok(Json(SubmissionList { texts }))
}
