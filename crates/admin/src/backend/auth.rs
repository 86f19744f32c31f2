//! Managed auth provider: password sign-in and token introspection.

use reqwest::{Method, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::{AnonClient, BackendError, fallback_message};

/// Session issued by the auth provider.
///
/// Token lifetime is owned by the provider; nothing here refreshes it.
#[derive(Clone, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Lifetime of `access_token` in seconds.
    #[serde(default)]
    pub expires_in: i64,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub user: AuthUser,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("access_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("user", &self.user)
            .finish()
    }
}

/// Identity behind a session or bearer token.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

/// Error body returned by the auth provider. Field names vary by version.
#[derive(Deserialize)]
struct AuthErrorBody {
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl AnonClient {
    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Auth` carrying the provider's message when the
    /// provider rejects the credentials.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<AuthSession, BackendError> {
        let url = self.inner.endpoint(["auth", "v1", "token"])?;
        let response = self
            .inner
            .request(Method::POST, url)
            .query(&[("grant_type", "password")])
            .json(&PasswordGrant {
                email,
                password: password.expose_secret(),
            })
            .send()
            .await?;

        read_auth(response).await
    }

    /// Resolve a bearer token to the user it was issued for.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Auth` if the token is invalid or expired.
    #[instrument(skip_all)]
    pub async fn get_user(&self, access_token: &str) -> Result<AuthUser, BackendError> {
        let url = self.inner.endpoint(["auth", "v1", "user"])?;
        let response = self
            .inner
            .request_as(Method::GET, url, access_token)
            .send()
            .await?;

        read_auth(response).await
    }
}

async fn read_auth<R: serde::de::DeserializeOwned>(response: Response) -> Result<R, BackendError> {
    let status = response.status();
    let body = response.bytes().await?;

    if status.is_success() {
        return Ok(serde_json::from_slice(&body)?);
    }

    Err(BackendError::Auth {
        status: status.as_u16(),
        message: auth_error_message(status.as_u16(), &body),
    })
}

fn auth_error_message(status: u16, body: &[u8]) -> String {
    serde_json::from_slice::<AuthErrorBody>(body)
        .ok()
        .and_then(|b| b.msg.or(b.error_description).or(b.message).or(b.error))
        .unwrap_or_else(|| fallback_message(status, body))
}
