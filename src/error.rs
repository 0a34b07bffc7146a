use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::db::StoreError;

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    /// Required fields absent or blank.
    MissingFields(Vec<String>),
    RateLimited(u64),
    Internal(String),
    /// Storage failure. The message is what the caller sees; the cause is only logged.
    Storage(&'static str, StoreError),
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::BadRequest(msg) => write!(f, "Bad Request: {msg}"),
            AppError::MissingFields(fields) => {
                write!(f, "Missing required field(s): {}", fields.join(", "))
            }
            AppError::RateLimited(secs) => write!(f, "Rate Limited: retry after {secs}s"),
            AppError::Internal(msg) => write!(f, "Internal Error: {msg}"),
            AppError::Storage(msg, err) => write!(f, "{msg} ({err})"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, axum::Json(json!({ "error": msg }))).into_response()
            }
            AppError::MissingFields(fields) => {
                let body = json!({
                    "error": format!("Missing required field(s): {}", fields.join(", ")),
                    "missing": fields,
                });
                (StatusCode::BAD_REQUEST, axum::Json(body)).into_response()
            }
            AppError::RateLimited(secs) => (
                StatusCode::TOO_MANY_REQUESTS,
                [(header::RETRY_AFTER, secs.to_string())],
                axum::Json(json!({ "error": format!("Rate limited. Retry after {secs}s") })),
            )
                .into_response(),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    axum::Json(json!({ "error": "Internal server error" })),
                )
                    .into_response()
            }
            AppError::Storage(msg, err) => {
                tracing::error!("{msg}: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    axum::Json(json!({ "error": msg })),
                )
                    .into_response()
            }
        }
    }
}
