//! Unified error handling for admin.
//!
//! Every handler error renders as JSON `{ "message": ..., "code": ... }`.
//! Database constraint violations keep their identity all the way to the
//! client (`409 unique_violation`, `400 not_null_violation`,
//! `400 invalid_text_representation`) instead of collapsing into a 500.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::backend::{BackendError, DatabaseErrorCode};
use crate::services::auth::{ACCESS_DENIED_MESSAGE, AdminAuthError};

/// Application-level error type for the admin API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Managed backend operation failed.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Caller is authenticated but not an admin.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// A managed service failed and reported why.
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    pub code: &'static str,
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Backend(err) => backend_status(err),
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Upstream(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code for this error.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Backend(err) => backend_code(err),
            Self::NotFound(_) => "not_found",
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::BadRequest(_) => "bad_request",
            Self::Upstream(_) => "upstream_error",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Message safe to return to the caller.
    fn public_message(&self) -> String {
        match self {
            Self::Backend(BackendError::Database(err)) => err.message.clone(),
            Self::Backend(
                BackendError::Storage { message, .. } | BackendError::Auth { message, .. },
            )
            | Self::Upstream(message) => message.clone(),
            Self::Backend(_) => "External service error".to_string(),
            Self::Internal(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

fn backend_status(err: &BackendError) -> StatusCode {
    match err {
        BackendError::Database(db) => match db.code {
            DatabaseErrorCode::UniqueViolation => StatusCode::CONFLICT,
            DatabaseErrorCode::NotNullViolation | DatabaseErrorCode::InvalidTextRepresentation => {
                StatusCode::BAD_REQUEST
            }
            DatabaseErrorCode::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        },
        BackendError::Storage { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        BackendError::Auth { .. } => StatusCode::UNAUTHORIZED,
        BackendError::Http(_)
        | BackendError::Parse(_)
        | BackendError::UnexpectedResponse(_)
        | BackendError::InvalidUrl(_) => StatusCode::BAD_GATEWAY,
    }
}

fn backend_code(err: &BackendError) -> &'static str {
    match err {
        BackendError::Database(db) => match db.code {
            DatabaseErrorCode::UniqueViolation => "unique_violation",
            DatabaseErrorCode::NotNullViolation => "not_null_violation",
            DatabaseErrorCode::InvalidTextRepresentation => "invalid_text_representation",
            DatabaseErrorCode::Other(_) => "upstream_error",
        },
        BackendError::Storage { .. } => "upstream_error",
        BackendError::Auth { .. } => "unauthorized",
        BackendError::Http(_)
        | BackendError::Parse(_)
        | BackendError::UnexpectedResponse(_)
        | BackendError::InvalidUrl(_) => "bad_gateway",
    }
}

impl From<AdminAuthError> for AppError {
    fn from(err: AdminAuthError) -> Self {
        let message = err.to_string();
        match err {
            AdminAuthError::InvalidCredentials(_) | AdminAuthError::InvalidToken => {
                Self::Unauthorized(message)
            }
            AdminAuthError::AccessDenied => Self::Forbidden(ACCESS_DENIED_MESSAGE.to_string()),
            AdminAuthError::ProviderFailure(_) => Self::Upstream(message),
            AdminAuthError::Unavailable => Self::Internal(message),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Admin request error"
            );
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Admin request rejected");
        }

        let body = ErrorBody {
            message: self.public_message(),
            code: self.code(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DatabaseError;

    fn db_error(code: &str) -> AppError {
        AppError::Backend(BackendError::Database(DatabaseError {
            status: 400,
            code: DatabaseErrorCode::from_sqlstate(code),
            message: format!("db says {code}"),
            details: None,
            hint: None,
        }))
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product denim-jacket".to_string());
        assert_eq!(err.to_string(), "Not found: product denim-jacket");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            err.into_response().status()
        }

        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Forbidden("test".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_database_errors_keep_their_identity() {
        let unique = db_error("23505");
        assert_eq!(unique.status(), StatusCode::CONFLICT);
        assert_eq!(unique.code(), "unique_violation");
        assert_eq!(unique.public_message(), "db says 23505");

        let not_null = db_error("23502");
        assert_eq!(not_null.status(), StatusCode::BAD_REQUEST);
        assert_eq!(not_null.code(), "not_null_violation");

        let bad_type = db_error("22P02");
        assert_eq!(bad_type.status(), StatusCode::BAD_REQUEST);
        assert_eq!(bad_type.code(), "invalid_text_representation");

        let other = db_error("42501");
        assert_eq!(other.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(other.code(), "upstream_error");
    }

    #[test]
    fn test_storage_error_passes_provider_message() {
        let err = AppError::Backend(BackendError::Storage {
            status: 404,
            message: "Bucket not found".to_string(),
        });
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "Bucket not found");
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let err = AppError::Internal("pool exhausted".to_string());
        assert_eq!(err.public_message(), "Internal server error");

        let err = AppError::Backend(BackendError::UnexpectedResponse("no row".to_string()));
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.public_message(), "External service error");
    }

    #[test]
    fn test_auth_errors_map_to_distinct_statuses() {
        let denied: AppError = AdminAuthError::AccessDenied.into();
        assert_eq!(denied.status(), StatusCode::FORBIDDEN);
        assert_eq!(denied.public_message(), format!("Forbidden: {ACCESS_DENIED_MESSAGE}"));

        let bad: AppError =
            AdminAuthError::InvalidCredentials("Invalid login credentials".to_string()).into();
        assert_eq!(bad.status(), StatusCode::UNAUTHORIZED);

        let down: AppError = AdminAuthError::Unavailable.into();
        assert_eq!(down.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(down.public_message(), "Internal server error");

        let failing: AppError =
            AdminAuthError::ProviderFailure("Database error querying schema".to_string()).into();
        assert_eq!(failing.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(failing.code(), "upstream_error");
        assert_eq!(failing.public_message(), "Database error querying schema");
    }
}
