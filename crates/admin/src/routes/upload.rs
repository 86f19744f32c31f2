//! Image upload proxy into object storage.

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State, multipart::MultipartError},
    routing::post,
};
use tracing::instrument;

use crate::{
    error::AppError,
    middleware::RequireAdmin,
    services::{UploadedImage, object_key},
    state::AppState,
};

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Build the upload router. The default request body limit is lifted.
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/admin/upload",
        post(upload).layer(DefaultBodyLimit::disable()),
    )
}

fn multipart_error(err: &MultipartError) -> AppError {
    AppError::BadRequest(err.body_text())
}

/// `POST /admin/upload`: multipart form with a `file` part and a `path` part.
///
/// Empty path segments are dropped and the response carries the resulting
/// key. The object is written with overwrite allowed. No size limit, scanning or
/// content type validation is applied here.
#[instrument(skip_all, fields(admin = %admin.email))]
pub async fn upload(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadedImage>, AppError> {
    let mut file = None;
    let mut path = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| multipart_error(&e))? {
        match field.name() {
            Some("file") => {
                let content_type = field
                    .content_type()
                    .unwrap_or(DEFAULT_CONTENT_TYPE)
                    .to_string();
                let bytes = field.bytes().await.map_err(|e| multipart_error(&e))?;
                file = Some((bytes, content_type));
            }
            Some("path") => {
                path = Some(field.text().await.map_err(|e| multipart_error(&e))?);
            }
            _ => {}
        }
    }

    let path = path.filter(|p| !p.trim().trim_matches('/').is_empty());
    let (Some((bytes, content_type)), Some(path)) = (file, path) else {
        return Err(AppError::BadRequest("Missing file or path".to_string()));
    };
    let key = object_key(&path).ok_or_else(|| {
        AppError::BadRequest("Invalid path: '.' and '..' segments are not allowed".to_string())
    })?;

    tracing::debug!(size = bytes.len(), %content_type, %key, "uploading image");
    let uploaded = state.images().upload(&key, bytes, &content_type).await?;
    Ok(Json(uploaded))
}
