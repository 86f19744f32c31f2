//! HTTP route handlers for admin.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                  - Liveness
//! GET    /health/ready            - Readiness (REST gateway reachable)
//!
//! # Auth (password checked by the managed auth provider)
//! POST   /admin/login             - Sign in, returns a bearer token
//!
//! # Products (bearer token, admin allow-list)
//! GET    /admin/products          - List, newest first
//! POST   /admin/products          - Create (201)
//! GET    /admin/products/{slug}   - Read
//! PATCH  /admin/products/{slug}   - Partial update
//! DELETE /admin/products/{slug}   - Delete
//!
//! # Images (bearer token, admin allow-list)
//! POST   /admin/upload            - Multipart upload into object storage
//! ```

pub mod auth;
pub mod health;
pub mod products;
pub mod upload;

use axum::Router;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::state::AppState;

/// All routes, without state or layers.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(auth::router())
        .merge(products::router())
        .merge(upload::router())
}

/// The complete application: routes, request tracing and Sentry layers.
pub fn app(state: AppState) -> Router {
    routes()
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        admin = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use secrecy::SecretString;
    use tower::ServiceExt;
    use url::Url;

    use super::*;
    use crate::config::{AdminConfig, BackendConfig};
    use shelfmark_core::Email;

    /// App wired to a backend address nothing listens on.
    fn offline_app() -> Router {
        let backend = BackendConfig::new(
            Url::parse("http://127.0.0.1:9").unwrap(),
            SecretString::from("service"),
            SecretString::from("anon"),
        );
        let config = AdminConfig::new(backend, vec![Email::parse("owner@shop.example").unwrap()]);
        app(AppState::new(config))
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = offline_app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_readiness_fails_without_backend() {
        let response = offline_app()
            .oneshot(Request::get("/health/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_admin_routes_require_bearer_token() {
        for (method, uri) in [
            ("GET", "/admin/products"),
            ("POST", "/admin/products"),
            ("GET", "/admin/products/denim-jacket"),
            ("PATCH", "/admin/products/denim-jacket"),
            ("DELETE", "/admin/products/denim-jacket"),
            ("POST", "/admin/upload"),
        ] {
            let response = offline_app()
                .oneshot(
                    Request::builder()
                        .method(method)
                        .uri(uri)
                        .header(header::CONTENT_TYPE, "application/json")
                        .body(Body::from("{}"))
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{method} {uri}");

            let body = json_body(response).await;
            assert_eq!(body["code"], "unauthorized");
        }
    }

    #[tokio::test]
    async fn test_login_rejects_malformed_body() {
        let response = offline_app()
            .oneshot(
                Request::post("/admin/login")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"email":"owner@shop.example"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = json_body(response).await;
        assert_eq!(body["success"], false);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_login_reports_unreachable_provider_generically() {
        let response = offline_app()
            .oneshot(
                Request::post("/admin/login")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        r#"{"email":"owner@shop.example","password":"correct-horse"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = json_body(response).await;
        assert_eq!(body["error"], "Authentication failed");
    }
}
