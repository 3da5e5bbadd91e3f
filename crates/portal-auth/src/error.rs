//! Authentication error types.

use thiserror::Error;

/// A required login field is missing. Never leaves the login form.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("please select an identity provider")]
    ProviderRequired,

    #[error("unknown identity provider: {0}")]
    UnknownProvider(String),

    #[error("username is required")]
    UsernameRequired,

    #[error("password is required")]
    PasswordRequired,

    #[error("verification code is required")]
    CodeRequired,
}

/// Authentication error type.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Missing or invalid login input
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Backend rejected the credentials
    #[error("{0}")]
    Authentication(String),

    /// Token refresh failed
    #[error("Token refresh failed: {0}")]
    Refresh(String),

    /// The session was cleared or replaced while a refresh was pending
    #[error("Session ended during refresh")]
    SessionEnded,

    /// Authenticated call rejected after the refresh attempt
    #[error("Request was not authorized")]
    Unauthorized,

    /// Transport-level failure
    #[error("Network error: {0}")]
    Network(String),

    /// No session in the credential store
    #[error("Not logged in")]
    NotLoggedIn,

    /// Invalid state transition in the login FSM
    #[error("Invalid login state transition: {0}")]
    InvalidStateTransition(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] portal_storage::StorageError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] portal_config::CoreError),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parse error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl AuthError {
    /// Returns true if this error ends the session.
    ///
    /// Refresh failures and post-refresh authorization failures are never
    /// retried; they always go through the logout coordinator.
    pub fn forces_logout(&self) -> bool {
        matches!(self, AuthError::Refresh(_) | AuthError::Unauthorized)
    }

    /// Returns true if the message is meant to be shown to the user as-is.
    pub fn is_user_visible(&self) -> bool {
        matches!(
            self,
            AuthError::Validation(_) | AuthError::Authentication(_) | AuthError::Network(_)
        )
    }
}

/// Result type alias using AuthError.
pub type AuthResult<T> = Result<T, AuthError>;
