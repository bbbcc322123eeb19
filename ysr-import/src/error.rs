//! Error types for ysr-import
//!
//! `ImportError` covers failures that abort a whole import run. Per-record
//! problems (validation, duplicates, store failures) are not errors here;
//! they are collected into the import report.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use ysr_common::auth::AuthError;

use crate::types::ExtractionError;

/// Fatal pipeline error
#[derive(Debug, Error)]
pub enum ImportError {
    /// File extension is not a supported spreadsheet type
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// Spreadsheet could not be read
    #[error("Failed to parse file: {0}")]
    Parse(String),

    /// Language model call failed or returned unusable output
    #[error("Failed to extract records: {0}")]
    Extraction(#[from] ExtractionError),
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Missing or invalid credentials (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but not allowed (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Fatal import pipeline error
    #[error(transparent)]
    Import(#[from] ImportError),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// ysr-common error
    #[error("Common error: {0}")]
    Common(#[from] ysr_common::Error),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Forbidden { .. } => ApiError::Forbidden(err.to_string()),
            AuthError::Database(e) => ApiError::Common(ysr_common::Error::Database(e)),
            other => ApiError::Unauthorized(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg),
            ApiError::Import(ref err) => match err {
                ImportError::UnsupportedFormat(_) => {
                    (StatusCode::BAD_REQUEST, "UNSUPPORTED_FORMAT", err.to_string())
                }
                ImportError::Parse(_) => (StatusCode::BAD_REQUEST, "PARSE_ERROR", err.to_string()),
                ImportError::Extraction(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "EXTRACTION_ERROR",
                    err.to_string(),
                ),
            },
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            ApiError::Io(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                err.to_string(),
            ),
            ApiError::Common(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                err.to_string(),
            ),
        };

        if status.is_server_error() {
            tracing::error!(code = error_code, error = %message, "Request failed");
        } else {
            tracing::debug!(code = error_code, error = %message, "Request rejected");
        }

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use ysr_common::models::Role;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ApiError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (
                ApiError::from(ImportError::UnsupportedFormat(".pdf".into())),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::from(ImportError::Parse("bad".into())),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::from(ImportError::Extraction(ExtractionError::EmptyResponse)),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ApiError::from(AuthError::MissingCredentials),
                StatusCode::UNAUTHORIZED,
            ),
            (
                ApiError::from(AuthError::Forbidden { role: Role::Staff }),
                StatusCode::FORBIDDEN,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }
}
