//! # Error Handling Module
//!
//! One error enum for the whole proxy, built with `thiserror`. Every variant
//! knows the HTTP status it maps to and the machine-readable `error` tag that
//! goes into the JSON envelope returned to the browser.
//!
//! The envelope shape is always `{error, message, status}`, so the dashboard
//! can render a failure the same way whether the backend rejected the call,
//! could not be reached, or the operation is not valid for the current mode.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::auth::mode::AuthMode;
use crate::proxy::envelope::ErrorEnvelope;

/// Main result type used throughout the proxy
pub type PlatformResult<T> = Result<T, PlatformError>;

/// Error taxonomy of the proxy
#[derive(Debug, Error, Clone)]
pub enum PlatformError {
    /// Invalid or incomplete configuration, detected at start-up
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Backend answered with a non-success status
    #[error("{message}")]
    BackendRejected { status: u16, message: String },

    /// Backend could not be reached at all
    #[error("Network error: {message}")]
    Network { message: String },

    /// Operation is not offered under the active auth mode
    #[error("{operation} is not available in {mode} mode")]
    ModeMismatch { operation: String, mode: AuthMode },

    /// Malformed inbound request (missing callback parameters, bad state, ...)
    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    /// Unexpected failure inside the proxy
    #[error("Internal server error: {message}")]
    Internal { message: String },
}

impl PlatformError {
    /// Create a configuration error with a custom message
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a backend rejection carrying the backend's status code
    pub fn backend<S: Into<String>>(status: u16, message: S) -> Self {
        Self::BackendRejected {
            status,
            message: message.into(),
        }
    }

    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    pub fn mode_mismatch<S: Into<String>>(operation: S, mode: AuthMode) -> Self {
        Self::ModeMismatch {
            operation: operation.into(),
            mode,
        }
    }

    pub fn invalid_request<S: Into<String>>(reason: S) -> Self {
        Self::InvalidRequest {
            reason: reason.into(),
        }
    }

    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the HTTP status code returned to the browser for this error
    ///
    /// Backend rejections keep the backend's own status; anything the
    /// `http` crate refuses to represent collapses to 502.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BackendRejected { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            Self::Network { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ModeMismatch { .. } => StatusCode::BAD_REQUEST,
            Self::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Configuration { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get a string representation of the error type for API responses
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Configuration { .. } => "configuration_error",
            Self::BackendRejected { .. } => "backend_error",
            Self::Network { .. } => "network_error",
            Self::ModeMismatch { .. } => "mode_mismatch",
            Self::InvalidRequest { .. } => "invalid_request",
            Self::Internal { .. } => "internal_error",
        }
    }

    /// Build the `{error, message, status}` envelope for this error
    pub fn envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope {
            error: self.error_type().to_string(),
            message: self.to_string(),
            status: self.status_code().as_u16(),
        }
    }
}

impl From<std::io::Error> for PlatformError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal {
            message: err.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for PlatformError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Configuration {
            message: err.to_string(),
        }
    }
}

impl From<url::ParseError> for PlatformError {
    fn from(err: url::ParseError) -> Self {
        Self::Configuration {
            message: format!("Invalid URL: {}", err),
        }
    }
}

/// Connection, DNS and timeout failures all count as "backend unreachable".
impl From<reqwest::Error> for PlatformError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network {
            message: err.to_string(),
        }
    }
}

impl IntoResponse for PlatformError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.envelope())).into_response()
    }
}
