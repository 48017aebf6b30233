//! Error taxonomy for the dispatch API
//!
//! Every failure surfaced to a caller is classified into one of these codes.
//! Transport layers map them onto their own status codes.

use http::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Standard error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Missing or malformed required fields (400)
    InvalidArgument,
    /// Unknown order or provider (404)
    NotFound,
    /// Acting provider is not the order's assigned provider (403)
    PermissionDenied,
    /// Operation incompatible with the current status (412)
    FailedPrecondition,
    /// Store or dependency failure (500)
    Internal,
}

impl ErrorCode {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidArgument => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::PermissionDenied => StatusCode::FORBIDDEN,
            Self::FailedPrecondition => StatusCode::PRECONDITION_FAILED,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::NotFound => "NOT_FOUND",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::FailedPrecondition => "FAILED_PRECONDITION",
            Self::Internal => "INTERNAL",
        }
    }

    /// Whether the failure is the caller's fault (never retried by the server)
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Internal)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error body returned by the API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
}
