use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use lc_common::error::CommonError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Common(#[from] CommonError),

    #[error("{0}")]
    NotFound(String),

    #[error("invalid chapter id: {0}")]
    InvalidId(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("config error: {0}")]
    Config(String),
}

impl AppError {
    pub fn chapter_not_found() -> Self {
        AppError::NotFound("Chapter not found".to_string())
    }

    pub fn metadata_not_found() -> Self {
        AppError::NotFound("Chapter metadata not found".to_string())
    }
}

/// Every handler failure becomes a JSON `{"error": ...}` body; nothing
/// propagates to the host as a panic or a bare 500.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidId(_) => StatusCode::BAD_REQUEST,
            AppError::Decode(_) | AppError::Config(_) | AppError::Common(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let message = match &self {
            // The UI matches on these two strings; keep them verbatim.
            AppError::NotFound(msg) => msg.clone(),
            other => other.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
