use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::LoginState;

/// Broad error category used for caller-facing handling and retry behavior.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Invalid input, unsupported state, or other configuration issue.
    Config,
    /// Login/credential failure, including incomplete base-request fields.
    Auth,
    /// Transient network or transport failure.
    Network,
    /// Server-side session invalidation; requires a full re-login.
    SessionExpired,
    /// Local persistence failure (session snapshot).
    Storage,
    /// Serialization/deserialization failure.
    Serialization,
    /// Internal bug or invariant break.
    Internal,
}

/// Stable error payload surfaced across the client boundary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
#[error("{category:?}:{code}: {message}")]
pub struct ClientError {
    /// High-level error category.
    pub category: ErrorCategory,
    /// Stable machine-readable error code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

impl ClientError {
    /// Construct a new client error.
    pub fn new(
        category: ErrorCategory,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Build a standard invalid-state-transition error.
    pub fn invalid_state(current: LoginState, action: impl Into<String>) -> Self {
        let action = action.into();
        Self::new(
            ErrorCategory::Internal,
            "invalid_state_transition",
            format!("cannot run '{action}' while login is in state {current:?}"),
        )
    }

    /// Build the error reported when the login retry budget runs out.
    pub fn login_exhausted(attempts: u32) -> Self {
        Self::new(
            ErrorCategory::Auth,
            "login_retries_exhausted",
            format!("login failed after {attempts} attempts"),
        )
    }

    /// Build the error reported when an authenticated call is attempted
    /// with incomplete credentials.
    pub fn missing_credential(field: &str) -> Self {
        Self::new(
            ErrorCategory::Auth,
            "missing_credential",
            format!("credential field '{field}' is empty or unset"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_invalid_state_error_code_stable() {
        let err = ClientError::invalid_state(LoginState::Unauthenticated, "sync_check");
        assert_eq!(err.code, "invalid_state_transition");
        assert_eq!(err.category, ErrorCategory::Internal);
    }

    #[test]
    fn missing_credential_names_the_field() {
        let err = ClientError::missing_credential("skey");
        assert_eq!(err.category, ErrorCategory::Auth);
        assert!(err.message.contains("skey"));
    }
}
