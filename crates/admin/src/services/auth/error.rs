//! Admin authentication error types.

use thiserror::Error;

/// Fixed message for identities that authenticate but are not on the allow-list.
pub const ACCESS_DENIED_MESSAGE: &str = "Access denied. Admin privileges required.";

/// Errors that can occur during admin authentication.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AdminAuthError {
    /// The auth provider rejected the credentials; carries its message.
    #[error("{0}")]
    InvalidCredentials(String),

    /// Bearer token missing, malformed, expired, or unknown to the provider.
    #[error("invalid or expired access token")]
    InvalidToken,

    /// Authenticated, but not on the admin allow-list.
    #[error("{}", ACCESS_DENIED_MESSAGE)]
    AccessDenied,

    /// The auth provider reported a server-side failure; carries its message.
    #[error("{0}")]
    ProviderFailure(String),

    /// Anything else. Details are logged, never returned.
    #[error("Authentication failed")]
    Unavailable,
}
