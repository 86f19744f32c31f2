//! Product image uploads into object storage.

use serde::Serialize;
use tracing::instrument;

use crate::backend::{BackendError, ServiceClient};

/// Where an uploaded image ended up.
#[derive(Debug, Clone, Serialize)]
pub struct UploadedImage {
    /// Public URL of the object.
    pub url: String,
    /// Path inside the bucket.
    pub path: String,
}

/// Normalize a caller-supplied object path into a storage key.
///
/// Empty segments are dropped, so `products//a.png` becomes `products/a.png`.
/// Returns `None` if a `.` or `..` segment is present or nothing remains.
#[must_use]
pub fn object_key(path: &str) -> Option<String> {
    let mut segments = Vec::new();
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        if segment == "." || segment == ".." {
            return None;
        }
        segments.push(segment);
    }
    (!segments.is_empty()).then(|| segments.join("/"))
}

/// Uploads images into one bucket, overwriting existing objects.
pub struct ImageService<'a> {
    client: &'a ServiceClient,
    bucket: &'a str,
}

impl<'a> ImageService<'a> {
    /// Create a new image service.
    #[must_use]
    pub const fn new(client: &'a ServiceClient, bucket: &'a str) -> Self {
        Self { client, bucket }
    }

    /// Store `bytes` under `key` (see [`object_key`]) and return its public URL.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Storage` with the provider's message if the
    /// upload is rejected.
    #[instrument(skip(self, bytes))]
    pub async fn upload(
        &self,
        key: &str,
        bytes: impl Into<reqwest::Body>,
        content_type: &str,
    ) -> Result<UploadedImage, BackendError> {
        let stored = self
            .client
            .upload(self.bucket, key, bytes, content_type, true)
            .await?;
        tracing::info!(key = %stored.key, "image uploaded");

        let url = self.client.public_url(self.bucket, key)?;
        Ok(UploadedImage {
            url: url.to_string(),
            path: key.to_string(),
        })
    }
}
