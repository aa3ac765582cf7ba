//! Unified error handling
//!
//! [`AppError`] is the application error enum, [`AppResponse`] the API
//! response envelope. Bridge failures map onto HTTP semantics here: the
//! IMS being unreachable is a 503, an IMS rejection a 422, a duplicate
//! in-flight request a 409.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use ims_bridge::BridgeError;
use serde::Serialize;
use tracing::error;

/// Unified API response structure
///
/// ```json
/// {
///   "code": "E0000",
///   "message": "Success",
///   "data": { ... }
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct AppResponse<T> {
    /// Error code (E0000 means success)
    pub code: String,
    /// Message
    pub message: String,
    /// Response data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

/// Application error enum
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Resource not found: {0}")]
    /// Resource does not exist (404)
    NotFound(String),

    #[error("Validation failed: {0}")]
    /// Request rejected before any write (400)
    Validation(String),

    #[error("Resource conflict: {0}")]
    /// Duplicate in-flight operation (409)
    Conflict(String),

    #[error("Business rule violation: {0}")]
    /// Upstream rejected the operation (422)
    BusinessRule(String),

    #[error("Inventory service unavailable: {0}")]
    /// The IMS is unreachable or not answering (503)
    Upstream(String),

    #[error("Database error: {0}")]
    /// Local store failure (500)
    Database(String),

    #[error("Internal server error: {0}")]
    /// Everything else (500)
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "E0003", msg.as_str()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "E0002", msg.as_str()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "E0004", msg.as_str()),
            AppError::BusinessRule(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "E0005", msg.as_str())
            }
            AppError::Upstream(msg) => {
                error!(target: "ims", error = %msg, "inventory service unavailable");
                (StatusCode::SERVICE_UNAVAILABLE, "E8001", msg.as_str())
            }
            AppError::Database(msg) => {
                error!(target: "database", error = %msg, "database error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, "E9002", "Database error")
            }
            AppError::Internal(msg) => {
                error!(target: "internal", error = %msg, "internal error occurred");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "E9001",
                    "Internal server error",
                )
            }
        };

        let body = Json(AppResponse::<()> {
            code: code.to_string(),
            message: message.to_string(),
            data: None,
        });

        (status, body).into_response()
    }
}

impl From<BridgeError> for AppError {
    fn from(e: BridgeError) -> Self {
        match e {
            BridgeError::NotConnected
            | BridgeError::ConnectionClosed
            | BridgeError::Timeout
            | BridgeError::SendFailed(_)
            | BridgeError::FetchFailed(_) => AppError::Upstream(e.to_string()),
            BridgeError::Conflict(key) => {
                AppError::Conflict(format!("request already in flight for {key}"))
            }
            BridgeError::Rejected(msg) => AppError::BusinessRule(msg),
            BridgeError::Cancelled | BridgeError::Protocol(_) => {
                AppError::Internal(e.to_string())
            }
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => AppError::NotFound("record not found".into()),
            other => AppError::Database(other.to_string()),
        }
    }
}

/// Create a successful response
pub fn ok<T: Serialize>(data: T) -> Json<AppResponse<T>> {
    Json(AppResponse {
        code: "E0000".to_string(),
        message: "Success".to_string(),
        data: Some(data),
    })
}
