//! Authentication and authorization
//!
//! Credentials are hashed with bcrypt, sessions are stateless HS256 tokens,
//! and access is decided by composable guards evaluated after a bearer
//! token has been resolved to a stored user.

pub mod clock;
pub mod gate;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;
pub mod session;

use axum::http::StatusCode;
use serde::Serialize;
use thiserror::Error;

pub use clock::{Clock, ManualClock, SystemClock};
pub use gate::{
    both, decide, either, require_owner, require_role, Authenticated, Gate, Guard, Outcome,
    OwnerGuard, RoleGuard,
};
pub use jwt::{issue_token, verify_token, SessionClaims, TokenService, DEFAULT_TOKEN_TTL_SECS};
pub use middleware::{require_auth, require_role_layer, CurrentUser, RoleGate};
pub use models::{Gender, User, UserInfo, UserRole};
pub use password::{hash_password, verify_password, CredentialHasher, PasswordHash};
pub use session::{bearer_token, SessionResolver};

/// Why a request was turned away at the gate.
///
/// Authentication kinds map to 401, authorization kinds to 403.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthFailure {
    #[error("Email and password are required")]
    MalformedRequest,

    #[error("Authorization token is missing or invalid")]
    MissingCredential,

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Token has expired")]
    Expired,

    #[error("Malformed token")]
    Malformed,

    #[error("User not found")]
    UnknownSubject,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Permission denied. Insufficient role privileges.")]
    InsufficientRole,

    #[error("Permission denied. You do not own this resource.")]
    NotOwner,
}

impl AuthFailure {
    /// True for failures that happen after the caller was identified
    pub fn is_authorization(&self) -> bool {
        matches!(self, AuthFailure::InsufficientRole | AuthFailure::NotOwner)
    }

    /// True for failures to establish who the caller is
    pub fn is_authentication(&self) -> bool {
        !self.is_authorization() && *self != AuthFailure::MalformedRequest
    }

    /// HTTP status equivalent of this failure
    pub fn status(&self) -> StatusCode {
        if self.is_authorization() {
            StatusCode::FORBIDDEN
        } else if *self == AuthFailure::MalformedRequest {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::UNAUTHORIZED
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_classes() {
        assert_eq!(AuthFailure::Expired.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthFailure::UnknownSubject.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthFailure::InsufficientRole.status(), StatusCode::FORBIDDEN);
        assert_eq!(AuthFailure::NotOwner.status(), StatusCode::FORBIDDEN);
        assert_eq!(AuthFailure::MalformedRequest.status(), StatusCode::BAD_REQUEST);
        assert!(AuthFailure::InvalidCredentials.is_authentication());
        assert!(!AuthFailure::NotOwner.is_authentication());
    }

    #[test]
    fn test_failure_serializes_as_snake_case() {
        let json = serde_json::to_string(&AuthFailure::InsufficientRole).unwrap();
        assert_eq!(json, "\"insufficient_role\"");
    }
}
