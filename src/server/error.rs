//! server::error
//!
//! Mapping of failures to HTTP responses.
//!
//! Every failure becomes a JSON envelope with `status: "fail"`. Client
//! errors (400, 405) carry the message under `reason`, server errors (500)
//! under `error`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::session::SessionError;

/// Errors returned by request handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed body or query, or a required field is absent.
    #[error("{0}")]
    BadRequest(String),

    /// The route exists but not for this verb; holds the allowed verb.
    #[error("{0} only")]
    MethodNotAllowed(&'static str),

    /// The session operation failed.
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl ApiError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Session(err) => match err {
                SessionError::NotConfigured
                | SessionError::InvalidPath { .. }
                | SessionError::BranchNotFound { .. }
                | SessionError::MissingField { .. } => StatusCode::BAD_REQUEST,
                SessionError::RepoOpenFailed { .. }
                | SessionError::CommitFailed(_)
                | SessionError::PushFailed { .. }
                | SessionError::RemoteOpFailed(_)
                | SessionError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Shorthand for a missing required field.
    pub fn missing(field: &str) -> Self {
        ApiError::BadRequest(format!("{} missing", field))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();

        let body = if status.is_server_error() {
            error!(%status, error = %message, "request failed");
            json!({ "status": "fail", "error": message })
        } else {
            warn!(%status, reason = %message, "request rejected");
            json!({ "status": "fail", "reason": message })
        };

        (status, Json(body)).into_response()
    }
}
