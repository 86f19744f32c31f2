//! Managed backend clients (REST gateway, auth, object storage).
//!
//! # Security
//!
//! Two capability-scoped handles are constructed once per process and passed
//! explicitly to whatever needs them:
//!
//! - [`ServiceClient`] carries the **service-role key** (HIGH PRIVILEGE). It
//!   bypasses row-level security and is the only handle with database and
//!   storage write methods.
//! - [`AnonClient`] carries the anonymous key. It can only sign users in and
//!   resolve bearer tokens to identities.
//!
//! Neither is a global. Grep for `ServiceClient` to audit every elevated call.
//!
//! # Example
//!
//! ```rust,ignore
//! use shelfmark_admin::backend::{AnonClient, Filter, ServiceClient};
//!
//! let service = ServiceClient::new(&config.backend);
//! let rows: Vec<Product> = service
//!     .select("products", Some(&Filter::eq("slug", "denim-jacket")), None)
//!     .await?;
//!
//! let anon = AnonClient::new(&config.backend);
//! let session = anon.sign_in_with_password("owner@shop.example", &password).await?;
//! ```

mod auth;
mod database;
mod storage;

pub use auth::{AuthSession, AuthUser};
pub use database::Filter;
pub use storage::StoredObject;

use std::fmt;
use std::sync::Arc;

use reqwest::{Method, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::config::BackendConfig;

/// Errors that can occur when talking to the managed backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body could not be parsed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The database rejected the statement.
    #[error("Database error: {0}")]
    Database(DatabaseError),

    /// The auth provider rejected the request.
    #[error("Auth error ({status}): {message}")]
    Auth { status: u16, message: String },

    /// Object storage rejected the request.
    #[error("Storage error ({status}): {message}")]
    Storage { status: u16, message: String },

    /// A success response did not have the expected shape.
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// An endpoint URL could not be built from the configured base URL.
    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),
}

impl BackendError {
    /// The database error code, when this is a database rejection.
    #[must_use]
    pub const fn database_code(&self) -> Option<&DatabaseErrorCode> {
        match self {
            Self::Database(err) => Some(&err.code),
            _ => None,
        }
    }
}

/// SQLSTATE codes the product write path distinguishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseErrorCode {
    /// `23505`
    UniqueViolation,
    /// `23502`
    NotNullViolation,
    /// `22P02`
    InvalidTextRepresentation,
    /// Any other code, kept verbatim (may be empty).
    Other(String),
}

impl DatabaseErrorCode {
    /// Map a SQLSTATE string to a code.
    #[must_use]
    pub fn from_sqlstate(code: &str) -> Self {
        match code {
            "23505" => Self::UniqueViolation,
            "23502" => Self::NotNullViolation,
            "22P02" => Self::InvalidTextRepresentation,
            other => Self::Other(other.to_string()),
        }
    }

    /// The SQLSTATE string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::UniqueViolation => "23505",
            Self::NotNullViolation => "23502",
            Self::InvalidTextRepresentation => "22P02",
            Self::Other(code) => code,
        }
    }
}

impl fmt::Display for DatabaseErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A database rejection as reported by the REST gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseError {
    /// HTTP status of the gateway response.
    pub status: u16,
    /// SQLSTATE (or gateway) code.
    pub code: DatabaseErrorCode,
    /// Human-readable message from the database.
    pub message: String,
    pub details: Option<String>,
    pub hint: Option<String>,
}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

/// Error body returned by the REST gateway.
#[derive(Debug, Deserialize)]
struct GatewayErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    details: Option<String>,
    #[serde(default)]
    hint: Option<String>,
}

impl DatabaseError {
    /// Build an error from a non-success gateway response body.
    #[must_use]
    pub fn from_response(status: u16, body: &[u8]) -> Self {
        match serde_json::from_slice::<GatewayErrorBody>(body) {
            Ok(parsed) => Self {
                status,
                code: DatabaseErrorCode::from_sqlstate(parsed.code.as_deref().unwrap_or_default()),
                message: parsed
                    .message
                    .unwrap_or_else(|| format!("HTTP {status}")),
                details: parsed.details,
                hint: parsed.hint,
            },
            Err(_) => Self {
                status,
                code: DatabaseErrorCode::Other(String::new()),
                message: fallback_message(status, body),
                details: None,
                hint: None,
            },
        }
    }
}

/// Plain-text message for a response body that is not the expected JSON.
fn fallback_message(status: u16, body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        format!("HTTP {status}")
    } else {
        text.to_string()
    }
}

/// Shared HTTP plumbing: base URL, key headers.
struct Transport {
    http: reqwest::Client,
    base_url: Url,
    api_key: SecretString,
}

impl Transport {
    fn new(base_url: &Url, api_key: &SecretString) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.clone(),
            api_key: api_key.clone(),
        }
    }

    /// Append path segments to the base URL, percent-encoding each one.
    fn endpoint<I>(&self, segments: I) -> Result<Url, BackendError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| BackendError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// A request authorized by this handle's own key.
    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.request_as(method, url, self.api_key.expose_secret())
    }

    /// A request carrying this handle's key but another bearer token.
    fn request_as(&self, method: Method, url: Url, bearer: &str) -> RequestBuilder {
        self.http
            .request(method, url)
            .header("apikey", self.api_key.expose_secret())
            .bearer_auth(bearer)
    }
}

/// Elevated backend client (service-role key).
///
/// Database and storage operations live on this type only.
#[derive(Clone)]
pub struct ServiceClient {
    inner: Arc<Transport>,
}

impl ServiceClient {
    /// Create the elevated client.
    #[must_use]
    pub fn new(config: &BackendConfig) -> Self {
        Self {
            inner: Arc::new(Transport::new(&config.url, &config.service_role_key)),
        }
    }
}

impl fmt::Debug for ServiceClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

/// Normal-privilege backend client (anonymous key).
///
/// Only sign-in and token introspection live on this type.
#[derive(Clone)]
pub struct AnonClient {
    inner: Arc<Transport>,
}

impl AnonClient {
    /// Create the anonymous client.
    #[must_use]
    pub fn new(config: &BackendConfig) -> Self {
        Self {
            inner: Arc::new(Transport::new(&config.url, &config.anon_key)),
        }
    }
}

impl fmt::Debug for AnonClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnonClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn transport(base: &str) -> Transport {
        Transport::new(&Url::parse(base).unwrap(), &SecretString::from("key"))
    }

    #[test]
    fn test_sqlstate_mapping() {
        assert_eq!(
            DatabaseErrorCode::from_sqlstate("23505"),
            DatabaseErrorCode::UniqueViolation
        );
        assert_eq!(
            DatabaseErrorCode::from_sqlstate("23502"),
            DatabaseErrorCode::NotNullViolation
        );
        assert_eq!(
            DatabaseErrorCode::from_sqlstate("22P02"),
            DatabaseErrorCode::InvalidTextRepresentation
        );
        assert_eq!(
            DatabaseErrorCode::from_sqlstate("42501"),
            DatabaseErrorCode::Other("42501".to_string())
        );
        assert_eq!(DatabaseErrorCode::UniqueViolation.to_string(), "23505");
    }

    #[test]
    fn test_database_error_from_gateway_body() {
        let body = br#"{"code":"23505","details":"Key (slug)=(a) already exists.","hint":null,"message":"duplicate key value violates unique constraint \"products_slug_key\""}"#;
        let err = DatabaseError::from_response(409, body);

        assert_eq!(err.code, DatabaseErrorCode::UniqueViolation);
        assert_eq!(err.details.as_deref(), Some("Key (slug)=(a) already exists."));
        assert_eq!(err.hint, None);
        assert!(err.to_string().ends_with("(code 23505)"));
    }

    #[test]
    fn test_database_error_from_non_json_body() {
        let err = DatabaseError::from_response(502, b"<html>bad gateway</html>");
        assert_eq!(err.code, DatabaseErrorCode::Other(String::new()));
        assert_eq!(err.message, "<html>bad gateway</html>");

        let err = DatabaseError::from_response(503, b"");
        assert_eq!(err.message, "HTTP 503");
    }

    #[test]
    fn test_backend_error_database_code() {
        let err = BackendError::Database(DatabaseError::from_response(
            400,
            br#"{"code":"23502","message":"null value in column \"title\""}"#,
        ));
        assert_eq!(
            err.database_code(),
            Some(&DatabaseErrorCode::NotNullViolation)
        );
        assert_eq!(
            BackendError::UnexpectedResponse("x".to_string()).database_code(),
            None
        );
    }

    #[test]
    fn test_endpoint_appends_and_encodes_segments() {
        let t = transport("https://abc.backend.example");
        let url = t.endpoint(["rest", "v1", "products"]).unwrap();
        assert_eq!(url.as_str(), "https://abc.backend.example/rest/v1/products");

        let t = transport("https://abc.backend.example/base/");
        let url = t.endpoint(["storage", "v1", "object", "my bucket", "a.png"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://abc.backend.example/base/storage/v1/object/my%20bucket/a.png"
        );
    }

    #[test]
    fn test_client_debug_redacts_key() {
        let config = BackendConfig::new(
            Url::parse("https://abc.backend.example").unwrap(),
            SecretString::from("service-secret-value"),
            SecretString::from("anon-value"),
        );
        let debug_output = format!("{:?} {:?}", ServiceClient::new(&config), AnonClient::new(&config));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("service-secret-value"));
        assert!(!debug_output.contains("anon-value"));
    }
}
