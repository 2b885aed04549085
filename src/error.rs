use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::parser::ParseError;
use crate::query::QueryError;

/// Unified error type for API responses.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Unauthorized(String),
    Forbidden(String),
    /// Failed on-demand refresh: `{message, error}` body with a 500 status.
    RefreshFailed { message: String, error: String },
    Internal(String),
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadRequest(msg) => write!(f, "bad_request: {msg}"),
            Self::NotFound(msg) => write!(f, "not_found: {msg}"),
            Self::Unauthorized(msg) => write!(f, "unauthorized: {msg}"),
            Self::Forbidden(msg) => write!(f, "forbidden: {msg}"),
            Self::RefreshFailed { message, error } => write!(f, "refresh_failed: {message} ({error})"),
            Self::Internal(msg) => write!(f, "internal_error: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "message": msg })),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "message": msg })),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, json!({ "message": msg })),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, json!({ "message": msg })),
            Self::RefreshFailed { message, error } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "message": message, "error": error }),
            ),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, json!({ "message": msg })),
        };
        (status, axum::Json(body)).into_response()
    }
}

impl From<ParseError> for ApiError {
    fn from(e: ParseError) -> Self {
        Self::BadRequest(e.to_string())
    }
}

impl From<QueryError> for ApiError {
    fn from(e: QueryError) -> Self {
        match e {
            QueryError::InvalidPattern(msg) => Self::BadRequest(msg),
            QueryError::NotFound(msg) => Self::NotFound(msg),
        }
    }
}
