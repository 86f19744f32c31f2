//! Product JSON API.

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    routing::get,
};
use serde_json::Value;
use tracing::instrument;

use shelfmark_core::{NewProduct, Product, ProductPatch, Slug};

use crate::{error::AppError, middleware::RequireAdmin, state::AppState};

/// Build the products router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/products", get(index).post(create))
        .route(
            "/admin/products/{slug}",
            get(show).patch(update).delete(delete),
        )
}

/// Validate a slug taken from the URL path.
fn path_slug(raw: &str) -> Result<Slug, AppError> {
    Slug::parse(raw).map_err(|e| AppError::BadRequest(format!("invalid slug: {e}")))
}

fn not_found(slug: &Slug) -> AppError {
    AppError::NotFound(format!("product {slug}"))
}

/// `GET /admin/products`: all products, newest first.
#[instrument(skip_all, fields(admin = %admin.email))]
pub async fn index(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<Product>>, AppError> {
    Ok(Json(state.products().list().await?))
}

/// `GET /admin/products/{slug}`
#[instrument(skip(admin, state), fields(admin = %admin.email))]
pub async fn show(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Product>, AppError> {
    let slug = path_slug(&slug)?;
    state
        .products()
        .get(slug.as_str())
        .await?
        .map(Json)
        .ok_or_else(|| not_found(&slug))
}

/// `POST /admin/products`: create a product under a caller-chosen slug.
///
/// Omitted fields are left to database defaults, so a missing title comes
/// back as `400 not_null_violation` and a taken slug as `409 unique_violation`.
#[instrument(skip_all, fields(admin = %admin.email))]
pub async fn create(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    payload: Result<Json<NewProduct>, JsonRejection>,
) -> Result<(StatusCode, Json<Product>), AppError> {
    let Json(product) = payload.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    let created = state.products().create(&product).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `PATCH /admin/products/{slug}`: partial update.
///
/// Fields with the wrong JSON type are dropped rather than rejected; see
/// [`ProductPatch::from_json`].
#[instrument(skip(admin, state, payload), fields(admin = %admin.email))]
pub async fn update(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(slug): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Product>, AppError> {
    let slug = path_slug(&slug)?;
    let Json(body) = payload.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    let patch = ProductPatch::from_json(&body).map_err(|e| AppError::BadRequest(e.to_string()))?;

    state
        .products()
        .update(slug.as_str(), &patch)
        .await?
        .map(Json)
        .ok_or_else(|| not_found(&slug))
}

/// `DELETE /admin/products/{slug}`: returns the deleted row.
#[instrument(skip(admin, state), fields(admin = %admin.email))]
pub async fn delete(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Product>, AppError> {
    let slug = path_slug(&slug)?;
    state
        .products()
        .delete(slug.as_str())
        .await?
        .map(Json)
        .ok_or_else(|| not_found(&slug))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_path_slug_rejects_invalid() {
        assert!(path_slug("denim-jacket").is_ok());
        let err = path_slug("../etc").unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
