//! Error responses.
//!
//! # Responsibilities
//! - Map every failure to a status code and a `{"error": "..."}` body
//! - Log 4xx at warn and 5xx at error, once, at the boundary
//!
//! # Design Decisions
//! - Vendor error messages are echoed to the client
//! - Vendor 401s surface as 401 so the frontend can prompt a re-link

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::platforms::{PlatformError, UnknownPlatform};

/// Errors returned by HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    UnknownPlatform(String),

    #[error("Rate limit exceeded. Please try again later.")]
    RateLimited,

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::UnknownPlatform(_) => StatusCode::NOT_FOUND,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn not_authenticated(display_name: &str) -> Self {
        ApiError::Unauthorized(format!("Not authenticated with {display_name}"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %message, "Request failed");
        } else {
            tracing::warn!(status = status.as_u16(), error = %message, "Request rejected");
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<PlatformError> for ApiError {
    fn from(err: PlatformError) -> Self {
        match err {
            PlatformError::Unauthorized(message) => ApiError::Unauthorized(message),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<UnknownPlatform> for ApiError {
    fn from(err: UnknownPlatform) -> Self {
        ApiError::UnknownPlatform(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<tower_sessions::session::Error> for ApiError {
    fn from(err: tower_sessions::session::Error) -> Self {
        ApiError::Internal(format!("Session error: {err}"))
    }
}

/// Handler result type.
pub type ApiResult<T> = Result<T, ApiError>;
