//! Admin sign-in.
//!
//! Passwords are checked by the managed auth provider; this route only adds
//! the allow-list gate and hands back the provider's bearer token.

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    routing::post,
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::{services::AdminAuthError, state::AppState};

/// Build the auth router.
pub fn router() -> Router<AppState> {
    Router::new().route("/admin/login", post(login))
}

/// Login request body.
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Login response: `{ success, error? }` plus the token on success.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
}

impl LoginResponse {
    fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

const fn failure_status(err: &AdminAuthError) -> StatusCode {
    match err {
        AdminAuthError::InvalidCredentials(_) | AdminAuthError::InvalidToken => {
            StatusCode::UNAUTHORIZED
        }
        AdminAuthError::AccessDenied => StatusCode::FORBIDDEN,
        AdminAuthError::ProviderFailure(_) | AdminAuthError::Unavailable => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Sign in an admin.
///
/// POST /admin/login
#[instrument(skip_all)]
async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> (StatusCode, Json<LoginResponse>) {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(LoginResponse::failure(rejection.body_text())),
            );
        }
    };

    let password = SecretString::from(request.password);
    match state.auth().authenticate_admin(&request.email, &password).await {
        Ok(session) => (
            StatusCode::OK,
            Json(LoginResponse {
                success: true,
                error: None,
                access_token: Some(session.access_token),
                token_type: Some(session.token_type),
                expires_in: Some(session.expires_in),
            }),
        ),
        Err(err) => (failure_status(&err), Json(LoginResponse::failure(err.to_string()))),
    }
}
