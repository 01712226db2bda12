//! HTTP error types for the `keysvc` server.
//!
//! Maps [`ServiceError`] from `keysvc-core` onto status codes for the user
//! bundle routes. Every error produces a JSON body with the caller-facing
//! `status` string and a machine-readable `error` kind. System failures are
//! reported as `"internal error"` with no detail.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use keysvc_core::error::{ErrorKind, ServiceError};

/// Status string for system failures on the HTTP surface.
pub const INTERNAL_ERROR: &str = "internal error";

/// Status string for a rejected bundle key.
pub const NOT_ALLOWED: &str = "not allowed";

/// Application-level error returned from HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    /// Missing header or path input.
    BadRequest(String),
    /// Service key not allow-listed, or a bundle key that does not match.
    Unauthorized(String),
    /// No record, or a stale one.
    NotFound(String),
    /// Store or generator failure.
    Internal,
}

#[derive(Serialize)]
struct ErrorBody {
    status: String,
    error: &'static str,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            Self::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                INTERNAL_ERROR.to_owned(),
            ),
        };

        (
            status,
            axum::Json(ErrorBody {
                status: message,
                error,
            }),
        )
            .into_response()
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err.kind() {
            ErrorKind::Input => Self::BadRequest(err.status()),
            ErrorKind::Authorization => Self::Unauthorized(err.status()),
            ErrorKind::NotFound => Self::NotFound(err.status()),
            ErrorKind::Store | ErrorKind::Generation => Self::Internal,
        }
    }
}
