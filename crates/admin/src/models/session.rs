//! Authenticated admin identity types.
//!
//! Nothing here is persisted. Sessions live with the auth provider and the
//! caller holds the bearer token.

use serde::Serialize;

use shelfmark_core::Email;

/// Admin resolved from a bearer token, attached to each authorized request.
#[derive(Debug, Clone, Serialize)]
pub struct CurrentAdmin {
    /// Auth provider user ID.
    pub user_id: String,
    /// Normalized admin email (on the allow-list).
    pub email: Email,
}

/// Result of a successful admin sign-in.
#[derive(Clone)]
pub struct AdminSession {
    /// Bearer token to send as `Authorization: Bearer ...`.
    pub access_token: String,
    pub token_type: String,
    /// Token lifetime in seconds, as set by the auth provider.
    pub expires_in: i64,
    pub email: Email,
}

impl std::fmt::Debug for AdminSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminSession")
            .field("access_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("email", &self.email)
            .finish()
    }
}
