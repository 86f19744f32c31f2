//! Managed object storage: uploads and public URLs.

use reqwest::{Method, header::CONTENT_TYPE};
use serde::Deserialize;
use tracing::instrument;
use url::Url;

use super::{BackendError, ServiceClient, fallback_message};

/// Object written by an upload.
#[derive(Debug, Clone, Deserialize)]
pub struct StoredObject {
    /// `bucket/path` key reported by storage.
    #[serde(rename = "Key")]
    pub key: String,
}

#[derive(Deserialize)]
struct StorageErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Split an object path into URL segments, ignoring empty ones.
fn object_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

impl ServiceClient {
    /// Upload an object. With `upsert`, an existing object at `path` is
    /// replaced instead of rejected.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Storage` carrying the provider's message if
    /// storage rejects the upload.
    #[instrument(skip(self, body))]
    pub async fn upload(
        &self,
        bucket: &str,
        path: &str,
        body: impl Into<reqwest::Body>,
        content_type: &str,
        upsert: bool,
    ) -> Result<StoredObject, BackendError> {
        let url = self.inner.endpoint(
            ["storage", "v1", "object", bucket]
                .into_iter()
                .chain(object_segments(path)),
        )?;

        let response = self
            .inner
            .request(Method::POST, url)
            .header(CONTENT_TYPE, content_type)
            .header("x-upsert", if upsert { "true" } else { "false" })
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            let message = serde_json::from_slice::<StorageErrorBody>(&bytes)
                .ok()
                .and_then(|b| b.message.or(b.error))
                .unwrap_or_else(|| fallback_message(status.as_u16(), &bytes));
            return Err(BackendError::Storage {
                status: status.as_u16(),
                message,
            });
        }

        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Public URL of an object in a public bucket. No request is made.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::InvalidUrl` if the base URL cannot take a path.
    pub fn public_url(&self, bucket: &str, path: &str) -> Result<Url, BackendError> {
        self.inner.endpoint(
            ["storage", "v1", "object", "public", bucket]
                .into_iter()
                .chain(object_segments(path)),
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;
    use crate::config::BackendConfig;

    #[test]
    fn test_public_url() {
        let client = ServiceClient::new(&BackendConfig::new(
            Url::parse("https://abc.backend.example").unwrap(),
            SecretString::from("service"),
            SecretString::from("anon"),
        ));

        let url = client
            .public_url("product-images", "/jackets//denim front.jpg")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://abc.backend.example/storage/v1/object/public/product-images/jackets/denim%20front.jpg"
        );
    }

    #[test]
    fn test_stored_object_key() {
        let object: StoredObject =
            serde_json::from_str(r#"{"Key":"product-images/a.png","Id":"1"}"#).unwrap();
        assert_eq!(object.key, "product-images/a.png");
    }
}
