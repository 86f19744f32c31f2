//! Product write path.
//!
//! Thin pass-through to the `products` table via the elevated client. The
//! database owns every constraint: slug uniqueness, NOT NULL title, numeric
//! price. There is no locking; concurrent updates to one row are
//! last-writer-wins at the database's default isolation.

use tracing::instrument;

use shelfmark_core::{NewProduct, Product, ProductPatch};

use crate::backend::{BackendError, Filter, ServiceClient};

const NEWEST_FIRST: &str = "created_at.desc";

/// Product operations against one table.
pub struct ProductService<'a> {
    client: &'a ServiceClient,
    table: &'a str,
}

impl<'a> ProductService<'a> {
    /// Create a new product service.
    #[must_use]
    pub const fn new(client: &'a ServiceClient, table: &'a str) -> Self {
        Self { client, table }
    }

    /// All products, newest first.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the query fails.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Product>, BackendError> {
        self.client.select(self.table, None, Some(NEWEST_FIRST)).await
    }

    /// The product with `slug`, if any.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the query fails.
    #[instrument(skip(self))]
    pub async fn get(&self, slug: &str) -> Result<Option<Product>, BackendError> {
        let rows: Vec<Product> = self
            .client
            .select(self.table, Some(&Filter::eq("slug", slug)), None)
            .await?;
        Ok(rows.into_iter().next())
    }

    /// Insert a product.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Database` with `UniqueViolation` for a taken
    /// slug and `NotNullViolation` for a missing title.
    #[instrument(skip(self, product), fields(slug = %product.slug))]
    pub async fn create(&self, product: &NewProduct) -> Result<Product, BackendError> {
        let created: Product = self.client.insert(self.table, product).await?;
        tracing::info!(slug = %created.slug, "product created");
        Ok(created)
    }

    /// Apply a partial update. Returns `None` if no product has `slug`.
    ///
    /// An empty patch writes nothing and returns the current row.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Database` with `UniqueViolation` when a rename
    /// collides with an existing slug.
    #[instrument(skip(self, patch))]
    pub async fn update(
        &self,
        slug: &str,
        patch: &ProductPatch,
    ) -> Result<Option<Product>, BackendError> {
        if patch.is_empty() {
            tracing::debug!("patch has no writable fields, returning current row");
            return self.get(slug).await;
        }

        let rows: Vec<Product> = self
            .client
            .update(self.table, patch, &Filter::eq("slug", slug))
            .await?;
        let updated = rows.into_iter().next();
        if let Some(product) = &updated {
            tracing::info!(slug = %product.slug, "product updated");
        }
        Ok(updated)
    }

    /// Delete a product. Returns `None` if no product has `slug`.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the delete fails.
    #[instrument(skip(self))]
    pub async fn delete(&self, slug: &str) -> Result<Option<Product>, BackendError> {
        let rows: Vec<Product> = self
            .client
            .delete(self.table, &Filter::eq("slug", slug))
            .await?;
        let deleted = rows.into_iter().next();
        if deleted.is_some() {
            tracing::info!("product deleted");
        }
        Ok(deleted)
    }
}
