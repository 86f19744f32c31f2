//! Authentication extractors for admin.
//!
//! Admin routes are bearer-token only. The token is issued by the managed
//! auth provider (see `POST /admin/login`) and re-checked on every request:
//! the provider must still recognize it and its email must still be on the
//! allow-list.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::{error::AppError, models::CurrentAdmin, state::AppState};

/// Extractor that requires an admin bearer token.
///
/// Rejects with 401 when the token is missing or unknown to the provider,
/// and 403 when it belongs to someone who is not an admin.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireAdmin(admin): RequireAdmin) -> String {
///     format!("Hello, {}!", admin.email)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub CurrentAdmin);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))?;

        let admin = state.auth().verify_token(token).await?;
        tracing::Span::current().record("admin", tracing::field::display(&admin.email));
        Ok(Self(admin))
    }
}

/// The token from an `Authorization: Bearer <token>` header.
fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
