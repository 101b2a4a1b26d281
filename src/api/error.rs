//! Error payloads returned by the HTTP API
//!
//! Every failure is rendered as `{"error": "...", "kind": "...", "details": ...}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::pipeline::PipelineError;
use crate::storage::StorageError;

/// JSON body of an error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Error returned by API handlers
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>, details: Option<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorResponse {
                error: msg.into(),
                kind: "validation",
                details,
            },
        }
    }

    pub const fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        let status = match err {
            PipelineError::Validation(_) => StatusCode::BAD_REQUEST,
            PipelineError::ClientSetup { .. }
            | PipelineError::PrimaryStage { .. }
            | PipelineError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            body: ErrorResponse {
                error: err.to_string(),
                kind: err.kind(),
                details: err.details(),
            },
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        PipelineError::from(err).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolError;
    use crate::types::ValidationError;

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_validation_maps_to_400() {
        let err = ApiError::from(PipelineError::from(ValidationError::EmptyText));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let v = body_json(err.into_response()).await;
        assert_eq!(v["error"], "Text is required");
        assert_eq!(v["kind"], "validation");
        assert!(v.get("details").is_none());
    }

    #[tokio::test]
    async fn test_primary_failure_maps_to_500() {
        let err = ApiError::from(PipelineError::PrimaryStage {
            service: "image".to_string(),
            source: ToolError::Rpc {
                code: -32000,
                message: "insufficient funds".to_string(),
            },
        });
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let v = body_json(resp).await;
        assert_eq!(v["error"], "Failed to call image tool");
        assert_eq!(v["kind"], "primary_stage");
        assert_eq!(v["details"], "Remote error -32000: insufficient funds");
    }

    #[tokio::test]
    async fn test_bad_request_shape() {
        let resp = ApiError::bad_request("Invalid JSON body", Some("EOF".to_string())).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let v = body_json(resp).await;
        assert_eq!(v["kind"], "validation");
        assert_eq!(v["details"], "EOF");
    }
}
