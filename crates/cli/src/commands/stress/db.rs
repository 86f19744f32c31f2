//! Database-layer stress harness.
//!
//! Talks to the product table through the elevated [`ServiceClient`] with no
//! API in between, so constraint violations surface as raw SQLSTATE codes.

use futures::future::join_all;
use rust_decimal::Decimal;
use serde_json::json;

use shelfmark_admin::backend::{BackendError, DatabaseErrorCode, Filter, ServiceClient};
use shelfmark_admin::config::BackendConfig;
use shelfmark_core::{NewProduct, Product, Slug};

use super::{CONCURRENT_UPDATES, StressError, StressReport, ensure, run_slug};

/// Runs the database cases against one table.
#[derive(Debug, Clone)]
pub struct DbHarness {
    client: ServiceClient,
    table: String,
}

impl DbHarness {
    #[must_use]
    pub fn new(client: ServiceClient, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
        }
    }

    /// Build a harness from `SUPABASE_*` and `PRODUCTS_TABLE`.
    ///
    /// # Errors
    ///
    /// Returns `StressError::Config` if the backend settings are missing.
    pub fn from_env() -> Result<Self, StressError> {
        let config = BackendConfig::from_env()?;
        Ok(Self::new(ServiceClient::new(&config), config.products_table))
    }

    /// Run every case in order and clean up afterwards.
    pub async fn run(&self) -> StressReport {
        let mut report = StressReport::new("db");
        let slug = run_slug("db");
        let renamed = format!("{slug}-renamed");
        let untitled = format!("{slug}-untitled");

        tracing::info!(table = %self.table, %slug, "starting database stress run");

        report.case("fresh insert", self.fresh_insert(&slug)).await;
        report.case("duplicate slug", self.duplicate_slug(&slug)).await;
        report.case("missing title", self.missing_title(&untitled)).await;
        report.case("title and price update", self.title_and_price(&slug)).await;
        report.case("non-numeric price", self.non_numeric_price(&slug)).await;
        report.case("concurrent updates", self.concurrent_updates(&slug)).await;
        report.case("slug rename", self.rename(&slug, &renamed)).await;
        report.case("delete", self.delete(&renamed)).await;

        self.cleanup(&[&slug, &renamed, &untitled]).await;
        report.log_summary();
        report
    }

    async fn fetch(&self, slug: &str) -> Result<Option<Product>, BackendError> {
        let rows: Vec<Product> = self
            .client
            .select(&self.table, Some(&Filter::eq("slug", slug)), None)
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn fetch_required(&self, slug: &str) -> Result<Product, StressError> {
        self.fetch(slug)
            .await?
            .ok_or_else(|| StressError::Assertion(format!("product {slug} not found")))
    }

    async fn fresh_insert(&self, slug: &str) -> Result<(), StressError> {
        let title = Some("Stress Test Product".to_string());
        let mut product = NewProduct::new(parse_slug(slug)?, title);
        product.description = Some("Created by sm-cli stress db".to_string());
        product.price = Some(Decimal::new(1000, 2));
        product.in_stock = Some(true);

        let created: Product = self.client.insert(&self.table, &product).await?;
        ensure(created.slug == slug, || {
            format!("stored slug {:?} does not match {slug:?}", created.slug)
        })
    }

    async fn duplicate_slug(&self, slug: &str) -> Result<(), StressError> {
        let product = NewProduct::new(parse_slug(slug)?, Some("Duplicate".to_string()));
        let result = self.client.insert::<_, Product>(&self.table, &product).await;
        expect_rejection(result, &DatabaseErrorCode::UniqueViolation)
    }

    async fn missing_title(&self, slug: &str) -> Result<(), StressError> {
        let product = NewProduct::new(parse_slug(slug)?, None);
        let result = self.client.insert::<_, Product>(&self.table, &product).await;
        expect_rejection(result, &DatabaseErrorCode::NotNullViolation)
    }

    async fn title_and_price(&self, slug: &str) -> Result<(), StressError> {
        let before = self.fetch_required(slug).await?;
        let title = "Updated Stress Product";
        let price = Decimal::new(1999, 2);

        let rows: Vec<Product> = self
            .client
            .update(
                &self.table,
                &json!({ "title": title, "price": 19.99 }),
                &Filter::eq("slug", slug),
            )
            .await?;
        ensure(rows.len() == 1, || format!("expected 1 updated row, got {}", rows.len()))?;

        let after = self.fetch_required(slug).await?;
        ensure(after.title == title, || format!("title is {:?}", after.title))?;
        ensure(after.price == Some(price), || format!("price is {:?}", after.price))?;
        ensure(same_except_title_and_price(&before, &after), || {
            "fields other than title and price changed".to_string()
        })
    }

    async fn non_numeric_price(&self, slug: &str) -> Result<(), StressError> {
        let result = self
            .client
            .update::<_, Product>(
                &self.table,
                &json!({ "price": "not-a-number" }),
                &Filter::eq("slug", slug),
            )
            .await;
        expect_rejection(result, &DatabaseErrorCode::InvalidTextRepresentation)
    }

    async fn concurrent_updates(&self, slug: &str) -> Result<(), StressError> {
        let titles: Vec<String> = (0..CONCURRENT_UPDATES)
            .map(|i| format!("Concurrent Update {i}"))
            .collect();
        let filter = Filter::eq("slug", slug);

        let updates = titles.iter().map(|title| {
            let patch = json!({ "title": title });
            let filter = &filter;
            async move {
                self.client
                    .update::<_, Product>(&self.table, &patch, filter)
                    .await
            }
        });
        for result in join_all(updates).await {
            result?;
        }

        let product = self.fetch_required(slug).await?;
        ensure(titles.contains(&product.title), || {
            format!("final title {:?} is not one of the concurrent writes", product.title)
        })
    }

    async fn rename(&self, slug: &str, renamed: &str) -> Result<(), StressError> {
        let rows: Vec<Product> = self
            .client
            .update(&self.table, &json!({ "slug": renamed }), &Filter::eq("slug", slug))
            .await?;
        ensure(rows.len() == 1, || format!("expected 1 renamed row, got {}", rows.len()))?;

        ensure(self.fetch(renamed).await?.is_some(), || {
            format!("renamed product {renamed} not found")
        })?;
        ensure(self.fetch(slug).await?.is_none(), || {
            format!("old slug {slug} still present")
        })
    }

    async fn delete(&self, slug: &str) -> Result<(), StressError> {
        let rows: Vec<Product> = self
            .client
            .delete(&self.table, &Filter::eq("slug", slug))
            .await?;
        ensure(rows.len() == 1, || format!("expected 1 deleted row, got {}", rows.len()))?;
        ensure(self.fetch(slug).await?.is_none(), || {
            format!("product {slug} still present after delete")
        })
    }

    async fn cleanup(&self, slugs: &[&str]) {
        for slug in slugs {
            let result: Result<Vec<Product>, _> =
                self.client.delete(&self.table, &Filter::eq("slug", *slug)).await;
            match result {
                Ok(rows) if !rows.is_empty() => tracing::debug!(%slug, "cleaned up"),
                Ok(_) => {}
                Err(e) => tracing::warn!(%slug, error = %e, "cleanup failed"),
            }
        }
    }
}

fn parse_slug(slug: &str) -> Result<Slug, StressError> {
    Slug::parse(slug).map_err(|e| StressError::Assertion(format!("invalid slug {slug:?}: {e}")))
}

/// Pass only if the write was rejected with `expected`.
fn expect_rejection<T>(
    result: Result<T, BackendError>,
    expected: &DatabaseErrorCode,
) -> Result<(), StressError> {
    match result {
        Err(e) if e.database_code() == Some(expected) => {
            tracing::debug!(error = %e, "rejected as expected");
            Ok(())
        }
        Err(e) => Err(StressError::Assertion(format!("expected {expected}, got: {e}"))),
        Ok(_) => Err(StressError::Assertion(format!(
            "expected {expected}, but the write succeeded"
        ))),
    }
}

fn same_except_title_and_price(before: &Product, after: &Product) -> bool {
    before.slug == after.slug
        && before.description == after.description
        && before.images == after.images
        && before.condition == after.condition
        && before.category == after.category
        && before.brand == after.brand
        && before.payee_email == after.payee_email
        && before.checkout_link == after.checkout_link
        && before.currency == after.currency
        && before.in_stock == after.in_stock
        && before.featured == after.featured
        && before.metadata == after.metadata
}
