//! Integration tests for Shelfmark.
//!
//! # Running Tests
//!
//! ```bash
//! # Everything that runs in-process (fake backend, real admin router)
//! cargo test -p shelfmark-integration-tests
//!
//! # Tests against a live deployment
//! cargo test -p shelfmark-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `admin_auth` - Sign-in, bearer tokens and the allow-list
//! - `admin_products` - Product create / update / delete over HTTP
//! - `admin_upload` - Multipart image upload into storage
//! - `backend_clients` - Managed backend clients against the fake
//! - `stress_harness` - `sm-cli stress` harnesses end to end

pub mod fake_backend;

use std::net::SocketAddr;

use reqwest::Client;
use secrecy::SecretString;

use shelfmark_admin::{
    backend::AnonClient,
    config::{AdminConfig, parse_admin_emails},
    routes,
    state::AppState,
};

pub use fake_backend::FakeBackend;

/// Allow-listed admin registered with the fake auth provider.
pub const ADMIN_EMAIL: &str = "owner@shop.example";
pub const ADMIN_PASSWORD: &str = "correct-horse-battery";
/// Registered user who is not on the allow-list.
pub const SHOPPER_EMAIL: &str = "shopper@shop.example";
pub const SHOPPER_PASSWORD: &str = "shopper-password";

/// Allow-list as it would be written in `ADMIN_EMAILS`.
const ADMIN_EMAILS: &str = " Owner@Shop.Example , ops@shop.example";

/// A running admin server wired to a fresh fake backend.
pub struct TestApp {
    pub backend: FakeBackend,
    pub config: AdminConfig,
    pub base_url: String,
    pub client: Client,
}

impl TestApp {
    /// Start a fake backend and an admin server in front of it.
    pub async fn spawn() -> Self {
        Self::spawn_with(|_| {}).await
    }

    /// Like [`TestApp::spawn`], adjusting the admin configuration first.
    ///
    /// # Panics
    ///
    /// Panics if a local port cannot be bound.
    pub async fn spawn_with(customize: impl FnOnce(&mut AdminConfig)) -> Self {
        let backend = FakeBackend::start().await;
        backend.add_user(ADMIN_EMAIL, ADMIN_PASSWORD);
        backend.add_user(SHOPPER_EMAIL, SHOPPER_PASSWORD);

        let admin_emails = parse_admin_emails(ADMIN_EMAILS).expect("valid allow-list");
        let mut config = AdminConfig::new(backend.backend_config(), admin_emails);
        customize(&mut config);

        let app = routes::app(AppState::new(config.clone()));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind admin server");
        let addr: SocketAddr = listener.local_addr().expect("Failed to read local address");

        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Admin server error");
        });

        Self {
            backend,
            config,
            base_url: format!("http://{addr}"),
            client: Client::new(),
        }
    }

    /// Absolute URL for `path` on the admin server.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Sign in as the allow-listed admin through `POST /admin/login`.
    ///
    /// # Panics
    ///
    /// Panics if sign-in does not return a token.
    pub async fn admin_token(&self) -> String {
        let body: serde_json::Value = self
            .client
            .post(self.url("/admin/login"))
            .json(&serde_json::json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }))
            .send()
            .await
            .expect("login request failed")
            .json()
            .await
            .expect("login response is JSON");

        body["access_token"]
            .as_str()
            .expect("login returned a token")
            .to_string()
    }

    /// A valid provider token for the non-admin user.
    ///
    /// `/admin/login` refuses this user, so the token comes straight from
    /// the auth provider.
    ///
    /// # Panics
    ///
    /// Panics if the fake auth provider rejects the sign-in.
    pub async fn shopper_token(&self) -> String {
        AnonClient::new(&self.config.backend)
            .sign_in_with_password(SHOPPER_EMAIL, &SecretString::from(SHOPPER_PASSWORD))
            .await
            .expect("shopper sign-in")
            .access_token
    }
}
