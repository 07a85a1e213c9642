//! Maps `PipelineError` onto HTTP responses for the read API.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use curator_common::errors::PipelineError;
use serde_json::json;

pub struct ApiError(PipelineError);

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            PipelineError::ResourceMissing { .. } => StatusCode::NOT_FOUND,
            PipelineError::ValidationFailure { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self.0, "request failed");
        }

        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}
