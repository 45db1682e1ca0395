//! Error types for the authorization flow
//!
//! This module defines the single error enum used throughout the crate,
//! using `thiserror` for ergonomic error handling. Every variant carries a
//! stable machine-readable code (see [`AuthFlowError::code`]) alongside its
//! human-readable message, so callers can branch on the failure kind without
//! parsing display strings.
//!
//! The engine never retries failed network calls; all failures propagate to
//! the caller as one of these variants and the caller decides whether to
//! retry, surface a message, or restart the flow from scratch.

use thiserror::Error;

/// Result type alias for authorization flow operations.
pub type Result<T> = std::result::Result<T, AuthFlowError>;

/// Main error type for all authorization flow operations.
///
/// The first six variants map one-to-one onto the protocol failure points of
/// the authorization code flow; the remaining variants cover storage and
/// serialization concerns of the crate itself.
///
/// # Examples
///
/// ```
/// use authflow::error::AuthFlowError;
///
/// let err = AuthFlowError::InvalidState;
/// assert_eq!(err.code(), "invalid_state");
/// assert_eq!(err.to_string(), "Invalid state parameter");
/// ```
#[derive(Error, Debug)]
pub enum AuthFlowError {
    /// Configuration-related errors (malformed endpoint URLs, etc.).
    #[error("Configuration error: {0}")]
    Config(String),

    /// The `state` echoed back in the authorization callback does not match
    /// the value persisted before the redirect.
    #[error("Invalid state parameter")]
    InvalidState,

    /// The provider redirected back with an `error` parameter instead of an
    /// authorization code (for example `access_denied`).
    #[error("Authorization denied by provider: {0}")]
    AuthorizationDenied(String),

    /// The authorization-code exchange failed: non-success status, transport
    /// failure, or a malformed JSON body.
    #[error("Token request failed: {0}")]
    TokenRequest(String),

    /// The refresh-token exchange failed.
    #[error("Token refresh failed: {0}")]
    Refresh(String),

    /// The user identity fetch failed.
    #[error("User info fetch failed: {0}")]
    UserInfo(String),

    /// The logout request failed or no logout endpoint is configured.
    #[error("User logout failed: {0}")]
    Logout(String),

    /// A parameter store operation failed (I/O on the backing file, etc.).
    #[error("Storage error: {0}")]
    Storage(String),

    /// No usable access or refresh token is available in the session.
    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    /// JSON serialization/deserialization errors outside HTTP responses
    /// (HTTP body parse failures map to the operation-specific variant).
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AuthFlowError {
    /// Returns the stable machine-readable code for this error.
    ///
    /// Codes are part of the crate's public contract and never change for a
    /// given variant, so they are safe to log, compare, and ship across
    /// process boundaries.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "configuration",
            Self::InvalidState => "invalid_state",
            Self::AuthorizationDenied(_) => "authorization_denied",
            Self::TokenRequest(_) => "token_request_failed",
            Self::Refresh(_) => "refresh_token_failed",
            Self::UserInfo(_) => "user_info_fetch_failed",
            Self::Logout(_) => "user_logout_failed",
            Self::Storage(_) => "storage",
            Self::MissingCredentials(_) => "missing_credentials",
            Self::Serialization(_) => "serialization",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_state_display() {
        let error = AuthFlowError::InvalidState;
        assert_eq!(error.to_string(), "Invalid state parameter");
    }

    #[test]
    fn test_authorization_denied_display() {
        let error = AuthFlowError::AuthorizationDenied("access_denied".to_string());
        assert_eq!(
            error.to_string(),
            "Authorization denied by provider: access_denied"
        );
    }

    #[test]
    fn test_token_request_display() {
        let error = AuthFlowError::TokenRequest("HTTP 400".to_string());
        assert_eq!(error.to_string(), "Token request failed: HTTP 400");
    }

    #[test]
    fn test_refresh_display() {
        let error = AuthFlowError::Refresh("HTTP 401".to_string());
        assert_eq!(error.to_string(), "Token refresh failed: HTTP 401");
    }

    #[test]
    fn test_user_info_display() {
        let error = AuthFlowError::UserInfo("HTTP 401".to_string());
        assert_eq!(error.to_string(), "User info fetch failed: HTTP 401");
    }

    #[test]
    fn test_logout_display() {
        let error = AuthFlowError::Logout("HTTP 500".to_string());
        assert_eq!(error.to_string(), "User logout failed: HTTP 500");
    }

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(AuthFlowError::InvalidState.code(), "invalid_state");
        assert_eq!(
            AuthFlowError::AuthorizationDenied(String::new()).code(),
            "authorization_denied"
        );
        assert_eq!(
            AuthFlowError::TokenRequest(String::new()).code(),
            "token_request_failed"
        );
        assert_eq!(
            AuthFlowError::Refresh(String::new()).code(),
            "refresh_token_failed"
        );
        assert_eq!(
            AuthFlowError::UserInfo(String::new()).code(),
            "user_info_fetch_failed"
        );
        assert_eq!(
            AuthFlowError::Logout(String::new()).code(),
            "user_logout_failed"
        );
        assert_eq!(
            AuthFlowError::MissingCredentials(String::new()).code(),
            "missing_credentials"
        );
    }

    #[test]
    fn test_json_error_conversion() {
        let json_error = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let error: AuthFlowError = json_error.into();
        assert!(matches!(error, AuthFlowError::Serialization(_)));
        assert_eq!(error.code(), "serialization");
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AuthFlowError>();
    }
}
