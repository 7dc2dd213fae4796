//! Closed error taxonomy shared by every manager
//!
//! Each public operation resolves to a success value or exactly one of
//! these kinds. The boundary mapping (`status`/`code`/`message`) is
//! exhaustive on purpose: adding a variant fails to compile until every
//! table is updated.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::store::StoreError;

/// Result alias used across the auth crate
pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Email already registered")]
    EmailExists,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Email not verified")]
    EmailNotVerified,
    #[error("Invalid or expired code")]
    InvalidOtp,
    #[error("Too many attempts, try again later")]
    OtpLocked,
    #[error("Invalid or expired token")]
    InvalidToken,
    #[error("Authentication required")]
    Unauthenticated,
    #[error("Insufficient permissions")]
    Forbidden,
    #[error("Internal server error")]
    Internal,
}

impl AuthError {
    /// Every taxonomy kind, for totality checks over the boundary tables
    pub const ALL: [AuthError; 9] = [
        AuthError::EmailExists,
        AuthError::InvalidCredentials,
        AuthError::EmailNotVerified,
        AuthError::InvalidOtp,
        AuthError::OtpLocked,
        AuthError::InvalidToken,
        AuthError::Unauthenticated,
        AuthError::Forbidden,
        AuthError::Internal,
    ];

    /// HTTP status for the boundary response
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::EmailExists => StatusCode::CONFLICT,
            AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AuthError::EmailNotVerified => StatusCode::FORBIDDEN,
            AuthError::InvalidOtp => StatusCode::UNAUTHORIZED,
            AuthError::OtpLocked => StatusCode::TOO_MANY_REQUESTS,
            AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
            AuthError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden => StatusCode::FORBIDDEN,
            AuthError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code for clients
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::EmailExists => "email_exists",
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::EmailNotVerified => "email_not_verified",
            AuthError::InvalidOtp => "invalid_otp",
            AuthError::OtpLocked => "otp_locked",
            AuthError::InvalidToken => "invalid_token",
            AuthError::Unauthenticated => "unauthenticated",
            AuthError::Forbidden => "forbidden",
            AuthError::Internal => "internal_error",
        }
    }

    /// User-facing message (never includes internal detail)
    pub fn message(&self) -> &'static str {
        match self {
            AuthError::EmailExists => "An account with this email already exists",
            AuthError::InvalidCredentials => "Invalid email or password",
            AuthError::EmailNotVerified => "Please verify your email before signing in",
            AuthError::InvalidOtp => "Invalid or expired verification code",
            AuthError::OtpLocked => "Too many failed attempts. Try again later",
            AuthError::InvalidToken => "Invalid or expired token",
            AuthError::Unauthenticated => "Authentication required",
            AuthError::Forbidden => "Insufficient permissions",
            AuthError::Internal => "Internal server error",
        }
    }
}

/// Storage failures cross the boundary as `Internal`; detail stays in logs
impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        tracing::error!(error = %err, "store failure normalized to internal error");
        AuthError::Internal
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = Json(json!({
            "error": self.code(),
            "message": self.message(),
            "code": status.as_u16()
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_every_kind_has_exactly_one_mapping() {
        // status(), code() and message() are exhaustive matches, so this
        // exercises the full table and checks codes are distinct.
        let mut codes = HashSet::new();
        for kind in AuthError::ALL {
            let status = kind.status();
            assert!(status.is_client_error() || status.is_server_error());
            assert!(!kind.message().is_empty());
            assert!(codes.insert(kind.code()), "duplicate code for {kind:?}");
        }
        assert_eq!(codes.len(), AuthError::ALL.len());
    }

    #[test]
    fn test_internal_hides_detail() {
        let err: AuthError = StoreError::Backend("connection refused".into()).into();
        assert_eq!(err, AuthError::Internal);
        assert!(!err.message().contains("connection"));
    }

    #[test]
    fn test_lockout_reported_distinctly_from_invalid_code() {
        assert_ne!(AuthError::OtpLocked.code(), AuthError::InvalidOtp.code());
        assert_eq!(AuthError::OtpLocked.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
