//! Token Guard error types.
//!
//! Two layers:
//! - [`AuthError`] names every reason the validation pipeline can reject a
//!   request. Its `Display` text is the description returned to the caller.
//! - [`ValidationError`] is the immutable `{status, error, error_description}`
//!   value that crosses the validator boundary and is rendered to clients.

use crate::auth::jwks::KeyFetchError;
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Pipeline rejection reasons.
///
/// Maps to status codes:
/// - MissingDomain, MissingAudience, Internal: 500 Internal Server Error
/// - everything else: 401 Unauthorized
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("The AUTH0_DOMAIN setting is missing.")]
    MissingDomain,

    #[error("The AUTH0_AUDIENCE setting is missing.")]
    MissingAudience,

    #[error("Authorization header is missing.")]
    MissingAuthorizationHeader,

    #[error("Authorization header is invalid.")]
    InvalidAuthorizationHeader,

    #[error("Invalid token.")]
    InvalidToken,

    #[error("Only tokens signed using RS256 are supported.")]
    UnsupportedAlgorithm,

    #[error("Token is missing the 'kid' attribute.")]
    MissingKid,

    #[error(transparent)]
    KeyResolution(#[from] KeyFetchError),

    #[error("{0}")]
    Verification(String),

    #[error("{0}")]
    Internal(String),
}

impl AuthError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        self.code().status_code()
    }

    /// Returns the client-facing error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            AuthError::MissingDomain | AuthError::MissingAudience | AuthError::Internal(_) => {
                ErrorCode::InternalServerError
            }
            AuthError::MissingAuthorizationHeader
            | AuthError::InvalidAuthorizationHeader
            | AuthError::InvalidToken
            | AuthError::UnsupportedAlgorithm
            | AuthError::MissingKid
            | AuthError::KeyResolution(_)
            | AuthError::Verification(_) => ErrorCode::UnauthorizedError,
        }
    }

    /// Bounded label for metrics.
    pub fn error_type(&self) -> &'static str {
        match self {
            AuthError::MissingDomain | AuthError::MissingAudience => "configuration",
            AuthError::MissingAuthorizationHeader => "missing_header",
            AuthError::InvalidAuthorizationHeader => "invalid_header",
            AuthError::InvalidToken => "invalid_token",
            AuthError::UnsupportedAlgorithm => "unsupported_algorithm",
            AuthError::MissingKid => "missing_kid",
            AuthError::KeyResolution(_) => "key_resolution",
            AuthError::Verification(_) => "verification",
            AuthError::Internal(_) => "internal",
        }
    }
}

/// Error code carried in the `error` field of [`ValidationError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    UnauthorizedError,
    InternalServerError,
}

impl ErrorCode {
    /// HTTP status paired with this code.
    pub fn status_code(self) -> u16 {
        match self {
            ErrorCode::UnauthorizedError => 401,
            ErrorCode::InternalServerError => 500,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::UnauthorizedError => "UnauthorizedError",
            ErrorCode::InternalServerError => "InternalServerError",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured validation failure returned to callers.
///
/// Serializes as:
///
/// ```json
/// {
///   "status": 401,
///   "error": "UnauthorizedError",
///   "error_description": "Authorization header is missing."
/// }
/// ```
///
/// `Display` renders `"{error}: {error_description}"`, the form used by
/// callback-style handlers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    status: u16,
    error: ErrorCode,
    error_description: String,
}

impl ValidationError {
    /// 401 `UnauthorizedError` with the given description.
    pub fn unauthorized(description: impl Into<String>) -> Self {
        Self::new(ErrorCode::UnauthorizedError, description)
    }

    /// 500 `InternalServerError` with the given description.
    pub fn internal(description: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalServerError, description)
    }

    fn new(error: ErrorCode, description: impl Into<String>) -> Self {
        Self {
            status: error.status_code(),
            error,
            error_description: description.into(),
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn code(&self) -> ErrorCode {
        self.error
    }

    pub fn description(&self) -> &str {
        &self.error_description
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error, self.error_description)
    }
}

impl std::error::Error for ValidationError {}

impl From<AuthError> for ValidationError {
    fn from(err: AuthError) -> Self {
        Self::new(err.code(), err.to_string())
    }
}

impl IntoResponse for ValidationError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(
                target: "guard.errors",
                error = %self.error,
                description = %self.error_description,
                "Token validation failed with server error"
            );
        }

        let body = serde_json::to_string_pretty(&self).unwrap_or_else(|e| {
            tracing::error!(target: "guard.errors", error = %e, "Failed to serialize error body");
            String::from(r#"{"status":500,"error":"InternalServerError"}"#)
        });

        let mut response = (
            status,
            [(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))],
            body,
        )
            .into_response();

        // Add WWW-Authenticate header for 401 responses
        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Bearer error=\"invalid_token\""),
            );
        }

        response
    }
}
