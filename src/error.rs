//! Relay error types with HTTP status code mapping.
//!
//! [`RelayError`] is the central error type for the relay. Each variant
//! maps to a stable string code (shared by HTTP and WebSocket error
//! bodies), an HTTP status code, and a fatality class for sockets that are
//! still registering.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::Role;

/// Structured JSON error response body.
///
/// All HTTP error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": "NotFound",
///     "message": "pairing not found: 123456"
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with a stable code and a human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Stable error code (e.g. `"Expired"`).
    #[schema(value_type = String)]
    pub code: &'static str,
    /// Human-readable error message.
    pub message: String,
}

/// Server-side error enum.
///
/// | Variant              | Code                 | HTTP status |
/// |----------------------|----------------------|-------------|
/// | `NotFound`           | `NotFound`           | 404         |
/// | `Expired`            | `Expired`            | 410         |
/// | `RoleConflict`       | `RoleConflict`       | 409         |
/// | `PeerNotConnected`   | `PeerNotConnected`   | 409         |
/// | `InvalidMessage`     | `InvalidMessage`     | 400         |
/// | `InvalidRequest`     | `InvalidRequest`     | 400         |
/// | `CodeSpaceExhausted` | `CodeSpaceExhausted` | 500         |
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelayError {
    /// No session is registered under the given code.
    #[error("pairing not found: {0}")]
    NotFound(String),

    /// The code existed but its TTL has passed.
    #[error("pairing expired: {0}")]
    Expired(String),

    /// The requested role slot is already occupied.
    #[error("role {0} is already connected")]
    RoleConflict(Role),

    /// A signal was sent while no peer is attached.
    #[error("peer is not connected")]
    PeerNotConnected,

    /// A WebSocket frame was malformed or illegal in the current state.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// Code generation kept colliding with active sessions.
    #[error("no free pairing code after {attempts} attempts")]
    CodeSpaceExhausted {
        /// Number of generation attempts made.
        attempts: usize,
    },

    /// HTTP request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl RelayError {
    /// Returns the stable string code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NotFound",
            Self::Expired(_) => "Expired",
            Self::RoleConflict(_) => "RoleConflict",
            Self::PeerNotConnected => "PeerNotConnected",
            Self::InvalidMessage(_) => "InvalidMessage",
            Self::CodeSpaceExhausted { .. } => "CodeSpaceExhausted",
            Self::InvalidRequest(_) => "InvalidRequest",
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Expired(_) => StatusCode::GONE,
            Self::RoleConflict(_) | Self::PeerNotConnected => StatusCode::CONFLICT,
            Self::InvalidMessage(_) | Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::CodeSpaceExhausted { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns `true` if a socket that hits this error while registering
    /// must be closed after the error frame is sent.
    #[must_use]
    pub const fn is_fatal_for_registration(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_) | Self::Expired(_) | Self::RoleConflict(_)
        )
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
            },
        };
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn registration_failures_are_fatal() {
        assert!(RelayError::NotFound("123456".into()).is_fatal_for_registration());
        assert!(RelayError::Expired("123456".into()).is_fatal_for_registration());
        assert!(RelayError::RoleConflict(Role::Mobile).is_fatal_for_registration());
        assert!(!RelayError::PeerNotConnected.is_fatal_for_registration());
        assert!(!RelayError::InvalidMessage("bad".into()).is_fatal_for_registration());
    }

    #[test]
    fn status_mapping() {
        assert_eq!(
            RelayError::NotFound(String::new()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            RelayError::Expired(String::new()).status_code(),
            StatusCode::GONE
        );
        assert_eq!(
            RelayError::InvalidRequest(String::new()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            RelayError::CodeSpaceExhausted { attempts: 5 }.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn codes_are_variant_names() {
        assert_eq!(RelayError::PeerNotConnected.error_code(), "PeerNotConnected");
        assert_eq!(
            RelayError::CodeSpaceExhausted { attempts: 1 }.error_code(),
            "CodeSpaceExhausted"
        );
    }
}
