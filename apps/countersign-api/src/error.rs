//! Error types for the Countersign API

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use workflow_core::WorkflowError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("Blob not found: {0}")]
    BlobNotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::DocumentNotFound(id) => {
                (StatusCode::NOT_FOUND, format!("Document not found: {}", id))
            }
            ApiError::BlobNotFound(id) => {
                (StatusCode::NOT_FOUND, format!("Blob not found: {}", id))
            }
            ApiError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Workflow(e) => (workflow_status(e), e.to_string()),
            ApiError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                )
            }
            ApiError::Internal(e) => {
                tracing::error!("Internal error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": message,
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

fn workflow_status(err: &WorkflowError) -> StatusCode {
    match err {
        WorkflowError::InvalidState(_) => StatusCode::CONFLICT,
        WorkflowError::Authorization { .. } => StatusCode::FORBIDDEN,
        WorkflowError::Validation(_) => StatusCode::BAD_REQUEST,
        WorkflowError::Conflict(_) => StatusCode::CONFLICT,
        WorkflowError::Composition(_) => StatusCode::UNPROCESSABLE_ENTITY,
    }
}
