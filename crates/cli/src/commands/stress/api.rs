//! Admin API stress harness.
//!
//! Same scenarios as the database harness, driven through the HTTP routes.
//! At this layer a non-numeric price is dropped by the partial-update policy
//! instead of reaching the database, and constraint violations arrive as
//! HTTP statuses.

use futures::future::join_all;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use url::Url;

use shelfmark_admin::routes::auth::LoginResponse;
use shelfmark_core::Product;

use super::{CONCURRENT_UPDATES, StressError, StressReport, ensure, run_slug};

/// Default admin API address.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3001";

/// How the harness obtains its bearer token.
pub enum ApiCredentials {
    /// A token issued earlier.
    Token(SecretString),
    /// Sign in through `POST /admin/login`.
    Password { email: String, password: SecretString },
}

impl std::fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Token(_) => f.debug_tuple("Token").field(&"[REDACTED]").finish(),
            Self::Password { email, .. } => f
                .debug_struct("Password")
                .field("email", email)
                .field("password", &"[REDACTED]")
                .finish(),
        }
    }
}

/// Runs the API cases against one admin server.
pub struct ApiHarness {
    http: reqwest::Client,
    base_url: Url,
    token: SecretString,
}

impl std::fmt::Debug for ApiHarness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiHarness")
            .field("base_url", &self.base_url.as_str())
            .field("token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl ApiHarness {
    /// Build a harness, signing in first when given a password.
    ///
    /// # Errors
    ///
    /// Returns `StressError::InvalidUrl` for a bad base URL and
    /// `StressError::Login` if sign-in does not yield a token.
    pub async fn connect(base_url: &str, credentials: ApiCredentials) -> Result<Self, StressError> {
        let http = reqwest::Client::new();
        let base_url = Url::parse(base_url)?;

        let token = match credentials {
            ApiCredentials::Token(token) => token,
            ApiCredentials::Password { email, password } => {
                login(&http, &base_url, &email, &password).await?
            }
        };

        Ok(Self {
            http,
            base_url,
            token,
        })
    }

    /// Run every case in order and clean up afterwards.
    pub async fn run(&self) -> StressReport {
        let mut report = StressReport::new("api");
        let slug = run_slug("api");
        let renamed = format!("{slug}-renamed");

        tracing::info!(base_url = %self.base_url, %slug, "starting API stress run");

        report.case("unauthenticated request", self.unauthenticated()).await;
        report.case("create", self.create(&slug)).await;
        report.case("duplicate slug", self.duplicate(&slug)).await;
        report.case("title and price update", self.title_and_price(&slug)).await;
        report.case("empty title ignored", self.empty_title(&slug)).await;
        report.case("string price ignored", self.string_price(&slug)).await;
        report.case("concurrent updates", self.concurrent_updates(&slug)).await;
        report.case("slug rename", self.rename(&slug, &renamed)).await;
        report.case("delete", self.delete(&renamed)).await;

        self.cleanup(&[&slug, &renamed]).await;
        report.log_summary();
        report
    }

    fn products_url(&self) -> Result<Url, StressError> {
        endpoint(&self.base_url, &["admin", "products"])
    }

    fn product_url(&self, slug: &str) -> Result<Url, StressError> {
        endpoint(&self.base_url, &["admin", "products", slug])
    }

    fn authorized(&self, method: Method, url: Url) -> RequestBuilder {
        self.http
            .request(method, url)
            .bearer_auth(self.token.expose_secret())
    }

    async fn patch(&self, slug: &str, body: &Value) -> Result<Response, StressError> {
        let url = self.product_url(slug)?;
        Ok(self.authorized(Method::PATCH, url).json(body).send().await?)
    }

    /// The product behind `slug`, or `None` on 404.
    async fn fetch(&self, slug: &str) -> Result<Option<Product>, StressError> {
        let url = self.product_url(slug)?;
        let response = self.authorized(Method::GET, url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = expect_status(response, StatusCode::OK).await?;
        Ok(Some(response.json().await?))
    }

    async fn fetch_required(&self, slug: &str) -> Result<Product, StressError> {
        self.fetch(slug)
            .await?
            .ok_or_else(|| StressError::Assertion(format!("product {slug} not found")))
    }

    async fn unauthenticated(&self) -> Result<(), StressError> {
        let response = self.http.get(self.products_url()?).send().await?;
        expect_status(response, StatusCode::UNAUTHORIZED).await?;
        Ok(())
    }

    async fn create(&self, slug: &str) -> Result<(), StressError> {
        let body = json!({
            "slug": slug,
            "title": "API Stress Product",
            "description": "Created by sm-cli stress api",
            "price": 10.0,
            "in_stock": true,
        });
        let response = self
            .authorized(Method::POST, self.products_url()?)
            .json(&body)
            .send()
            .await?;
        let created: Product = expect_status(response, StatusCode::CREATED).await?.json().await?;
        ensure(created.slug == slug, || {
            format!("stored slug {:?} does not match {slug:?}", created.slug)
        })
    }

    async fn duplicate(&self, slug: &str) -> Result<(), StressError> {
        let response = self
            .authorized(Method::POST, self.products_url()?)
            .json(&json!({ "slug": slug, "title": "Duplicate" }))
            .send()
            .await?;
        expect_status(response, StatusCode::CONFLICT).await?;
        Ok(())
    }

    async fn title_and_price(&self, slug: &str) -> Result<(), StressError> {
        let title = "API Updated Product";
        let response = self
            .patch(slug, &json!({ "title": title, "price": 25.5 }))
            .await?;
        let updated: Product = expect_status(response, StatusCode::OK).await?.json().await?;

        ensure(updated.title == title, || format!("title is {:?}", updated.title))?;
        ensure(updated.price == Some(Decimal::new(255, 1)), || {
            format!("price is {:?}", updated.price)
        })
    }

    async fn empty_title(&self, slug: &str) -> Result<(), StressError> {
        let before = self.fetch_required(slug).await?;
        let response = self.patch(slug, &json!({ "title": "" })).await?;
        expect_status(response, StatusCode::OK).await?;

        let after = self.fetch_required(slug).await?;
        ensure(after.title == before.title, || {
            format!("title changed from {:?} to {:?}", before.title, after.title)
        })
    }

    async fn string_price(&self, slug: &str) -> Result<(), StressError> {
        let before = self.fetch_required(slug).await?;
        let response = self.patch(slug, &json!({ "price": "99.99" })).await?;
        expect_status(response, StatusCode::OK).await?;

        let after = self.fetch_required(slug).await?;
        ensure(after.price == before.price, || {
            format!("price changed from {:?} to {:?}", before.price, after.price)
        })
    }

    async fn concurrent_updates(&self, slug: &str) -> Result<(), StressError> {
        let titles: Vec<String> = (0..CONCURRENT_UPDATES)
            .map(|i| format!("API Concurrent Update {i}"))
            .collect();

        let updates = titles
            .iter()
            .map(|title| async move { self.patch(slug, &json!({ "title": title })).await });
        for response in join_all(updates).await {
            expect_status(response?, StatusCode::OK).await?;
        }

        let product = self.fetch_required(slug).await?;
        ensure(titles.contains(&product.title), || {
            format!("final title {:?} is not one of the concurrent writes", product.title)
        })
    }

    async fn rename(&self, slug: &str, renamed: &str) -> Result<(), StressError> {
        let response = self.patch(slug, &json!({ "slug": renamed })).await?;
        let product: Product = expect_status(response, StatusCode::OK).await?.json().await?;
        ensure(product.slug == renamed, || format!("slug is {:?}", product.slug))?;

        ensure(self.fetch(slug).await?.is_none(), || {
            format!("old slug {slug} did not return 404")
        })?;
        ensure(self.fetch(renamed).await?.is_some(), || {
            format!("renamed product {renamed} not found")
        })
    }

    async fn delete(&self, slug: &str) -> Result<(), StressError> {
        let response = self
            .authorized(Method::DELETE, self.product_url(slug)?)
            .send()
            .await?;
        expect_status(response, StatusCode::OK).await?;

        ensure(self.fetch(slug).await?.is_none(), || {
            format!("product {slug} did not return 404 after delete")
        })
    }

    async fn cleanup(&self, slugs: &[&str]) {
        for slug in slugs {
            let Ok(url) = self.product_url(slug) else {
                continue;
            };
            match self.authorized(Method::DELETE, url).send().await {
                Ok(response) if response.status().is_success() => {
                    tracing::debug!(%slug, "cleaned up");
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(%slug, error = %e, "cleanup failed"),
            }
        }
    }
}

/// Sign in through the admin API and return the bearer token.
///
/// # Errors
///
/// Returns `StressError::Login` with the server's message if sign-in fails.
pub async fn login(
    http: &reqwest::Client,
    base_url: &Url,
    email: &str,
    password: &SecretString,
) -> Result<SecretString, StressError> {
    let response = http
        .post(endpoint(base_url, &["admin", "login"])?)
        .json(&json!({ "email": email, "password": password.expose_secret() }))
        .send()
        .await?;
    let status = response.status();
    let body: LoginResponse = response.json().await?;

    match body.access_token {
        Some(token) if body.success => {
            tracing::info!(%email, "signed in to admin API");
            Ok(SecretString::from(token))
        }
        _ => Err(StressError::Login(body.error.unwrap_or_else(|| status.to_string()))),
    }
}

/// `base_url` with `segments` appended, keeping any path prefix it has.
fn endpoint(base_url: &Url, segments: &[&str]) -> Result<Url, StressError> {
    let mut url = base_url.clone();
    url.path_segments_mut()
        .map_err(|()| StressError::Assertion(format!("{base_url} cannot take a path")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Pass the response through if it has `expected` status.
async fn expect_status(response: Response, expected: StatusCode) -> Result<Response, StressError> {
    let status = response.status();
    if status == expected {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(StressError::Assertion(format!(
        "expected {expected}, got {status}: {body}"
    )))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_debug_redacts() {
        let token = ApiCredentials::Token(SecretString::from("tok-secret"));
        assert!(!format!("{token:?}").contains("tok-secret"));

        let password = ApiCredentials::Password {
            email: "owner@shop.example".to_string(),
            password: SecretString::from("pw-secret"),
        };
        let debug_output = format!("{password:?}");
        assert!(debug_output.contains("owner@shop.example"));
        assert!(!debug_output.contains("pw-secret"));
    }

    #[tokio::test]
    async fn test_product_url_encodes_slug() {
        let harness = ApiHarness::connect(
            "http://localhost:3001/",
            ApiCredentials::Token(SecretString::from("tok")),
        )
        .await
        .unwrap();
        assert_eq!(
            harness.product_url("denim-jacket").unwrap().as_str(),
            "http://localhost:3001/admin/products/denim-jacket"
        );
    }

    #[test]
    fn test_endpoint_keeps_base_path_prefix() {
        let base = Url::parse("https://shop.example/shop").unwrap();
        assert_eq!(
            endpoint(&base, &["admin", "login"]).unwrap().as_str(),
            "https://shop.example/shop/admin/login"
        );

        let base = Url::parse("https://shop.example/shop/").unwrap();
        assert_eq!(
            endpoint(&base, &["admin", "products", "a b"]).unwrap().as_str(),
            "https://shop.example/shop/admin/products/a%20b"
        );
    }
}
