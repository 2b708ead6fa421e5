use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::gateway::{ErrorKind, GatewayError};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Upload failed: {0}")]
    Upload(#[from] MultipartError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl AppError {
    fn status(&self) -> StatusCode {
        let err = match self {
            AppError::BadRequest(_) => return StatusCode::BAD_REQUEST,
            AppError::Upload(err) => return err.status(),
            AppError::Gateway(err) => err,
        };

        match err.kind() {
            ErrorKind::Invalid => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::Rejected => err
                .rejected_status()
                .and_then(|s| StatusCode::from_u16(s).ok())
                .filter(|s| s.is_client_error())
                .unwrap_or(StatusCode::BAD_REQUEST),
            ErrorKind::Transient => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::Internal => StatusCode::BAD_GATEWAY,
        }
    }

    fn kind(&self) -> ErrorKind {
        match self {
            AppError::BadRequest(_) => ErrorKind::Invalid,
            // An oversized body is refused, not malformed
            AppError::Upload(err) => match err.status() {
                StatusCode::PAYLOAD_TOO_LARGE => ErrorKind::Rejected,
                s if s.is_client_error() => ErrorKind::Invalid,
                _ => ErrorKind::Internal,
            },
            AppError::Gateway(err) => err.kind(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.kind();

        match kind {
            ErrorKind::Transient => tracing::warn!("Backend unavailable: {}", self),
            ErrorKind::Internal => tracing::error!("Backend exchange failed: {}", self),
            _ => tracing::debug!("Request failed: {}", self),
        }

        let compensation = match &self {
            AppError::Gateway(err) => err.compensation().cloned(),
            AppError::BadRequest(_) | AppError::Upload(_) => None,
        };

        let body = json!({
            "error": self.to_string(),
            "kind": kind.as_str(),
            "retryable": kind == ErrorKind::Transient,
            "compensation": compensation,
        });

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
