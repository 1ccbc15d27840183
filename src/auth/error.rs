// src/auth/error.rs
// Error taxonomy for the auth core

use thiserror::Error;

/// Errors surfaced by the auth/session/authorization core. All of these are
/// per-request and recoverable; none is fatal to the process.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Malformed input the caller can correct. Never a security event.
    #[error("{0}")]
    Validation(String),

    /// Credential mismatch or missing account. The message is deliberately
    /// identical for both so usernames cannot be enumerated.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// No identity attached to the request.
    #[error("not authenticated")]
    Unauthenticated,

    /// Valid identity, insufficient role. Distinct from a credential failure.
    #[error("forbidden")]
    Forbidden,

    #[error("{0}")]
    NotFound(String),

    /// Uniqueness violation on create/update; caller can pick other values.
    #[error("{0}")]
    Conflict(String),

    /// Password operation against an account that authenticates through an
    /// external provider.
    #[error("this account signs in through an external provider; use your original provider")]
    ProviderMismatch,

    /// The federated identity provider failed or returned malformed data.
    /// Shown to the end user as a generic auth failure; the detail is for
    /// server-side logs only.
    #[error("external provider error: {0}")]
    ExternalProvider(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn external(msg: impl Into<String>) -> Self {
        Self::ExternalProvider(msg.into())
    }
}

impl From<tokio::task::JoinError> for AuthError {
    fn from(e: tokio::task::JoinError) -> Self {
        AuthError::Internal(format!("blocking task failed: {}", e))
    }
}

/// Auth operation result type
pub type AuthResult<T> = Result<T, AuthError>;
