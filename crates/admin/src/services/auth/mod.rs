//! Admin authentication service.
//!
//! Credential checks belong to the managed auth provider. This service adds
//! the second, independent gate: the identity the provider vouches for must
//! also be on the admin allow-list.

mod allow_list;
mod error;

pub use allow_list::AdminAllowList;
pub use error::{ACCESS_DENIED_MESSAGE, AdminAuthError};

use secrecy::SecretString;
use tracing::instrument;

use shelfmark_core::Email;

use crate::backend::{AnonClient, AuthUser, BackendError};
use crate::models::{AdminSession, CurrentAdmin};

/// Admin authentication service.
pub struct AdminAuthService<'a> {
    anon: &'a AnonClient,
    allow_list: &'a AdminAllowList,
}

impl<'a> AdminAuthService<'a> {
    /// Create a new admin authentication service.
    #[must_use]
    pub const fn new(anon: &'a AnonClient, allow_list: &'a AdminAllowList) -> Self {
        Self { anon, allow_list }
    }

    /// Whether `email` is on the admin allow-list.
    #[must_use]
    pub fn is_admin(&self, email: &str) -> bool {
        self.allow_list.is_admin(email)
    }

    /// Sign in with email and password, then require allow-list membership.
    ///
    /// # Errors
    ///
    /// - `InvalidCredentials` with the provider's message if sign-in fails.
    /// - `AccessDenied` if sign-in succeeds for a non-admin identity.
    /// - `ProviderFailure` with the provider's message for a 5xx answer.
    /// - `Unavailable` for anything else (logged, not exposed).
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn authenticate_admin(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<AdminSession, AdminAuthError> {
        let session = match self.anon.sign_in_with_password(email, password).await {
            Ok(session) => session,
            Err(BackendError::Auth { status, message }) if status < 500 => {
                tracing::info!(status, "admin sign-in rejected by auth provider");
                return Err(AdminAuthError::InvalidCredentials(message));
            }
            Err(BackendError::Auth { status, message }) => {
                tracing::error!(status, %message, "auth provider failed during admin sign-in");
                return Err(AdminAuthError::ProviderFailure(message));
            }
            Err(e) => {
                tracing::error!(error = %e, "admin sign-in failed");
                return Err(AdminAuthError::Unavailable);
            }
        };

        let Some(admin_email) = self.admin_email(&session.user) else {
            tracing::warn!(user_id = %session.user.id, "authenticated user is not an admin");
            return Err(AdminAuthError::AccessDenied);
        };

        tracing::info!(admin = %admin_email, "admin signed in");
        Ok(AdminSession {
            access_token: session.access_token,
            token_type: session.token_type,
            expires_in: session.expires_in,
            email: admin_email,
        })
    }

    /// Resolve a bearer token to an admin.
    ///
    /// # Errors
    ///
    /// - `InvalidToken` if the provider does not recognize the token.
    /// - `AccessDenied` if the token belongs to a non-admin identity.
    /// - `ProviderFailure` with the provider's message for a 5xx answer.
    /// - `Unavailable` if the provider cannot be reached.
    #[instrument(skip_all)]
    pub async fn verify_token(&self, access_token: &str) -> Result<CurrentAdmin, AdminAuthError> {
        let user = match self.anon.get_user(access_token).await {
            Ok(user) => user,
            Err(BackendError::Auth { status, .. }) if status < 500 => {
                return Err(AdminAuthError::InvalidToken);
            }
            Err(BackendError::Auth { status, message }) => {
                tracing::error!(status, %message, "auth provider failed during token check");
                return Err(AdminAuthError::ProviderFailure(message));
            }
            Err(e) => {
                tracing::error!(error = %e, "token verification failed");
                return Err(AdminAuthError::Unavailable);
            }
        };

        let email = self.admin_email(&user).ok_or(AdminAuthError::AccessDenied)?;
        Ok(CurrentAdmin {
            user_id: user.id,
            email,
        })
    }

    fn admin_email(&self, user: &AuthUser) -> Option<Email> {
        let email = Email::parse(user.email.as_deref()?).ok()?;
        self.allow_list.is_admin(email.as_str()).then_some(email)
    }
}
