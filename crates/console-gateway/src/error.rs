//! Error types for gateway operations

use std::time::Duration;

use reqwest::StatusCode;

use crate::request::ApiResponse;

/// Transport-level failure: no HTTP response was received.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct NetworkError(pub String);

/// Why a 401 could not be recovered by refreshing the session.
///
/// Every variant has the same effect for the caller: the session is cleared
/// and the original 401 is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RefreshFailure {
    #[error("no refresh token in session")]
    NoRefreshToken,

    #[error("refresh endpoint returned {0}")]
    Status(StatusCode),

    #[error("refresh request failed: {0}")]
    Network(String),

    #[error("refresh timed out after {0:?}")]
    Timeout(Duration),

    #[error("malformed refresh response: {0}")]
    Malformed(String),

    #[error("concurrent refresh failed")]
    ConcurrentRefreshFailed,
}

/// Errors surfaced by the gateway.
///
/// Non-401 HTTP statuses are not errors: they come back as `Ok(ApiResponse)`
/// and the caller decides what they mean.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("unauthorized, session cleared: {cause}")]
    Unauthorized {
        /// The original 401 response
        response: Box<ApiResponse>,
        cause: RefreshFailure,
    },

    #[error("network error: {0}")]
    Network(#[from] NetworkError),

    #[error("login rejected ({status}): {message}")]
    LoginRejected { status: StatusCode, message: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("credential error: {0}")]
    Credential(#[from] console_auth::Error),
}

impl GatewayError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, GatewayError::Unauthorized { .. })
    }
}

/// Result alias for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_display_includes_cause() {
        let err = GatewayError::Unauthorized {
            response: Box::new(ApiResponse::new(StatusCode::UNAUTHORIZED, "")),
            cause: RefreshFailure::Status(StatusCode::BAD_REQUEST),
        };
        assert!(err.is_unauthorized());
        assert_eq!(
            err.to_string(),
            "unauthorized, session cleared: refresh endpoint returned 400 Bad Request"
        );
    }

    #[test]
    fn network_error_converts() {
        let err: GatewayError = NetworkError("connection refused".into()).into();
        assert!(!err.is_unauthorized());
        assert_eq!(err.to_string(), "network error: connection refused");
    }
}
