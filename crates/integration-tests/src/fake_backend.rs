//! In-process stand-in for the managed backend.
//!
//! Serves the three surfaces the admin crate talks to, on a random local
//! port:
//!
//! - REST gateway (`/rest/v1/{table}`) over one products table, enforcing
//!   the unique slug (`23505`), NOT NULL slug and title (`23502`) and
//!   numeric price (`22P02`) constraints, and allowing writes only with the
//!   service-role key (`42501` otherwise);
//! - auth (`/auth/v1/token`, `/auth/v1/user`) over a fixed user table;
//! - object storage (`/storage/v1/object/...`) over one public bucket.
//!
//! Error bodies mimic the real platform's shapes.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use secrecy::SecretString;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use url::Url;
use uuid::Uuid;

use shelfmark_admin::config::BackendConfig;

/// Service-role key the fake accepts for privileged calls.
pub const SERVICE_KEY: &str = "fake-service-role-key";
/// Anonymous key the fake accepts for sign-in and token checks.
pub const ANON_KEY: &str = "fake-anon-key";
/// Table the fake serves.
pub const PRODUCTS_TABLE: &str = "products";
/// Bucket the fake serves.
pub const BUCKET: &str = "product-images";

const COLUMNS: &[&str] = &[
    "slug",
    "title",
    "description",
    "price",
    "images",
    "condition",
    "category",
    "brand",
    "payee_email",
    "checkout_link",
    "currency",
    "in_stock",
    "featured",
    "metadata",
    "created_at",
    "updated_at",
];

#[derive(Debug, Clone)]
struct User {
    id: String,
    email: String,
    password: String,
}

/// A stored object.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub content_type: String,
    pub bytes: Bytes,
}

#[derive(Default)]
struct Inner {
    products: Vec<Map<String, Value>>,
    last_created: Option<DateTime<Utc>>,
    users: Vec<User>,
    tokens: HashMap<String, String>,
    objects: HashMap<String, StoredObject>,
    auth_outage: Option<String>,
}

#[derive(Clone, Default)]
struct FakeState {
    inner: Arc<Mutex<Inner>>,
}

impl FakeState {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Handle to a running fake backend.
pub struct FakeBackend {
    addr: SocketAddr,
    state: FakeState,
}

impl FakeBackend {
    /// Bind to a random local port and start serving.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    pub async fn start() -> Self {
        let state = FakeState::default();
        let app = router(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake backend");
        let addr = listener.local_addr().expect("Failed to read local address");

        tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("Fake backend server error");
        });

        Self { addr, state }
    }

    /// Base URL, as it would appear in `SUPABASE_URL`.
    ///
    /// # Panics
    ///
    /// Never in practice; the address is always a valid URL.
    #[must_use]
    pub fn url(&self) -> Url {
        Url::parse(&format!("http://{}", self.addr)).expect("valid fake backend URL")
    }

    /// Backend settings pointing at this fake.
    #[must_use]
    pub fn backend_config(&self) -> BackendConfig {
        BackendConfig::new(
            self.url(),
            SecretString::from(SERVICE_KEY),
            SecretString::from(ANON_KEY),
        )
    }

    /// Register a user with the fake auth provider.
    pub fn add_user(&self, email: &str, password: &str) {
        self.state.lock().users.push(User {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            password: password.to_string(),
        });
    }

    /// Make every auth call fail with a 500 carrying `message`.
    pub fn fail_auth(&self, message: &str) {
        self.state.lock().auth_outage = Some(message.to_string());
    }

    /// The stored row for `slug`.
    #[must_use]
    pub fn product(&self, slug: &str) -> Option<Value> {
        self.state
            .lock()
            .products
            .iter()
            .find(|row| row.get("slug").and_then(Value::as_str) == Some(slug))
            .cloned()
            .map(Value::Object)
    }

    /// Number of stored rows.
    #[must_use]
    pub fn product_count(&self) -> usize {
        self.state.lock().products.len()
    }

    /// Insert a row directly, bypassing the gateway.
    pub fn seed_product(&self, row: Value) {
        if let Value::Object(row) = row {
            let mut inner = self.state.lock();
            let row = with_defaults(row, next_created_at(&mut inner));
            inner.products.push(row);
        }
    }

    /// The stored object at `bucket/path`.
    #[must_use]
    pub fn object(&self, bucket: &str, path: &str) -> Option<StoredObject> {
        self.state
            .lock()
            .objects
            .get(&format!("{bucket}/{path}"))
            .cloned()
    }
}

fn router(state: FakeState) -> Router {
    Router::new()
        .route("/rest/v1/", get(rest_root))
        .route(
            "/rest/v1/{table}",
            get(select).post(insert).patch(update).delete(delete),
        )
        .route("/auth/v1/token", post(token))
        .route("/auth/v1/user", get(user))
        .route("/storage/v1/object/{*rest}", get(download).post(upload))
        .with_state(state)
}

// =============================================================================
// Request helpers
// =============================================================================

enum Role {
    Service,
    Anon,
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Check the `apikey` header and return which key the bearer carries.
fn api_role(headers: &HeaderMap) -> Result<Role, Response> {
    let apikey = headers.get("apikey").and_then(|v| v.to_str().ok());
    if !matches!(apikey, Some(SERVICE_KEY | ANON_KEY)) {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Invalid API key" })),
        )
            .into_response());
    }
    Ok(if bearer(headers) == Some(SERVICE_KEY) {
        Role::Service
    } else {
        Role::Anon
    })
}

fn pg_error(status: StatusCode, code: &str, message: String, details: Option<String>) -> Response {
    (
        status,
        Json(json!({
            "code": code,
            "message": message,
            "details": details,
            "hint": null,
        })),
    )
        .into_response()
}

fn check_table(table: &str) -> Result<(), Response> {
    if table == PRODUCTS_TABLE {
        Ok(())
    } else {
        Err(pg_error(
            StatusCode::NOT_FOUND,
            "42P01",
            format!("relation \"public.{table}\" does not exist"),
            None,
        ))
    }
}

fn require_service(role: &Role, table: &str) -> Result<(), Response> {
    match role {
        Role::Service => Ok(()),
        Role::Anon => Err(pg_error(
            StatusCode::FORBIDDEN,
            "42501",
            format!("permission denied for table {table}"),
            None,
        )),
    }
}

/// The `column=eq.value` filter in a query string.
fn eq_filter(query: &HashMap<String, String>) -> Option<(String, String)> {
    query
        .iter()
        .filter(|(key, _)| key.as_str() != "select" && key.as_str() != "order")
        .find_map(|(key, value)| {
            value
                .strip_prefix("eq.")
                .map(|v| (key.clone(), v.to_string()))
        })
}

fn matches(row: &Map<String, Value>, filter: Option<&(String, String)>) -> bool {
    filter.is_none_or(|(column, value)| match row.get(column) {
        Some(Value::String(s)) => s == value,
        Some(Value::Null) | None => false,
        Some(other) => other.to_string() == *value,
    })
}

fn timestamp(at: DateTime<Utc>) -> Value {
    Value::String(at.to_rfc3339_opts(SecondsFormat::Micros, true))
}

/// Strictly increasing creation time, so ordering by it is stable.
fn next_created_at(inner: &mut Inner) -> DateTime<Utc> {
    let now = Utc::now();
    let at = match inner.last_created {
        Some(last) if now <= last => last + Duration::microseconds(1),
        _ => now,
    };
    inner.last_created = Some(at);
    at
}

fn with_defaults(mut row: Map<String, Value>, created_at: DateTime<Utc>) -> Map<String, Value> {
    let defaults = [
        ("description", Value::Null),
        ("price", Value::Null),
        ("images", json!([])),
        ("condition", Value::Null),
        ("category", Value::Null),
        ("brand", Value::Null),
        ("payee_email", Value::Null),
        ("checkout_link", Value::Null),
        ("currency", json!("USD")),
        ("in_stock", json!(true)),
        ("featured", json!(false)),
        ("metadata", json!({})),
        ("created_at", timestamp(created_at)),
        ("updated_at", timestamp(created_at)),
    ];
    for (column, value) in defaults {
        row.entry(column).or_insert(value);
    }
    row
}

/// Apply column types and NOT NULL constraints to written values.
fn coerce(row: &mut Map<String, Value>) -> Result<(), Response> {
    if let Some(unknown) = row.keys().find(|k| !COLUMNS.contains(&k.as_str())) {
        return Err(pg_error(
            StatusCode::BAD_REQUEST,
            "PGRST204",
            format!("Could not find the '{unknown}' column of 'products' in the schema cache"),
            None,
        ));
    }

    for column in ["slug", "title"] {
        if matches!(row.get(column), Some(Value::Null)) {
            return Err(not_null(column));
        }
    }

    if let Some(Value::String(raw)) = row.get("price") {
        let number = raw
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .and_then(serde_json::Number::from_f64)
            .ok_or_else(|| {
                pg_error(
                    StatusCode::BAD_REQUEST,
                    "22P02",
                    format!("invalid input syntax for type numeric: \"{raw}\""),
                    None,
                )
            })?;
        row.insert("price".to_string(), Value::Number(number));
    }

    Ok(())
}

fn not_null(column: &str) -> Response {
    pg_error(
        StatusCode::BAD_REQUEST,
        "23502",
        format!(
            "null value in column \"{column}\" of relation \"products\" violates not-null constraint"
        ),
        None,
    )
}

fn unique_violation(slug: &str) -> Response {
    pg_error(
        StatusCode::CONFLICT,
        "23505",
        "duplicate key value violates unique constraint \"products_slug_key\"".to_string(),
        Some(format!("Key (slug)=({slug}) already exists.")),
    )
}

// =============================================================================
// REST gateway
// =============================================================================

async fn rest_root(headers: HeaderMap) -> Response {
    match api_role(&headers) {
        Ok(_) => Json(json!({ "swagger": "2.0" })).into_response(),
        Err(response) => response,
    }
}

async fn select(
    State(state): State<FakeState>,
    Path(table): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Result<Response, Response> {
    api_role(&headers)?;
    check_table(&table)?;

    let filter = eq_filter(&query);
    let mut rows: Vec<Map<String, Value>> = state
        .lock()
        .products
        .iter()
        .filter(|row| matches(row, filter.as_ref()))
        .cloned()
        .collect();

    if let Some((column, direction)) = query.get("order").and_then(|o| o.split_once('.')) {
        rows.sort_by(|a, b| {
            let a = a.get(column).and_then(Value::as_str).unwrap_or_default();
            let b = b.get(column).and_then(Value::as_str).unwrap_or_default();
            a.cmp(b)
        });
        if direction == "desc" {
            rows.reverse();
        }
    }

    Ok(Json(rows).into_response())
}

async fn insert(
    State(state): State<FakeState>,
    Path(table): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Response, Response> {
    let role = api_role(&headers)?;
    check_table(&table)?;
    require_service(&role, &table)?;

    let Value::Object(mut row) = body else {
        return Err(pg_error(
            StatusCode::BAD_REQUEST,
            "PGRST102",
            "Expected a single JSON object".to_string(),
            None,
        ));
    };
    coerce(&mut row)?;

    let mut inner = state.lock();
    let slug = match row.get("slug") {
        Some(Value::String(slug)) => slug.clone(),
        _ => return Err(not_null("slug")),
    };
    if !matches!(row.get("title"), Some(Value::String(_))) {
        return Err(not_null("title"));
    }
    if inner
        .products
        .iter()
        .any(|existing| existing.get("slug").and_then(Value::as_str) == Some(&slug))
    {
        return Err(unique_violation(&slug));
    }

    let created_at = next_created_at(&mut inner);
    let row = with_defaults(row, created_at);
    inner.products.push(row.clone());

    Ok((StatusCode::CREATED, Json(vec![row])).into_response())
}

async fn update(
    State(state): State<FakeState>,
    Path(table): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Response, Response> {
    let role = api_role(&headers)?;
    check_table(&table)?;
    require_service(&role, &table)?;

    let Value::Object(mut patch) = body else {
        return Err(pg_error(
            StatusCode::BAD_REQUEST,
            "PGRST102",
            "Expected a single JSON object".to_string(),
            None,
        ));
    };
    coerce(&mut patch)?;

    let filter = eq_filter(&query);
    let mut inner = state.lock();

    if let Some(Value::String(new_slug)) = patch.get("slug") {
        let taken = inner.products.iter().any(|row| {
            row.get("slug").and_then(Value::as_str) == Some(new_slug.as_str())
                && !matches(row, filter.as_ref())
        });
        if taken {
            return Err(unique_violation(new_slug));
        }
    }

    let now = timestamp(Utc::now());
    let mut updated = Vec::new();
    for row in inner
        .products
        .iter_mut()
        .filter(|row| matches(row, filter.as_ref()))
    {
        for (column, value) in &patch {
            row.insert(column.clone(), value.clone());
        }
        row.insert("updated_at".to_string(), now.clone());
        updated.push(row.clone());
    }

    Ok(Json(updated).into_response())
}

async fn delete(
    State(state): State<FakeState>,
    Path(table): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Result<Response, Response> {
    let role = api_role(&headers)?;
    check_table(&table)?;
    require_service(&role, &table)?;

    let filter = eq_filter(&query);
    let mut inner = state.lock();
    let (deleted, kept): (Vec<_>, Vec<_>) = inner
        .products
        .drain(..)
        .partition(|row| matches(row, filter.as_ref()));
    inner.products = kept;

    Ok(Json(deleted).into_response())
}

// =============================================================================
// Auth
// =============================================================================

#[derive(Deserialize)]
struct PasswordGrant {
    email: String,
    password: String,
}

fn auth_error(status: StatusCode, error_code: &str, msg: &str) -> Response {
    (
        status,
        Json(json!({ "code": status.as_u16(), "error_code": error_code, "msg": msg })),
    )
        .into_response()
}

fn check_auth_outage(inner: &Inner) -> Result<(), Response> {
    match &inner.auth_outage {
        Some(message) => Err(auth_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "unexpected_failure",
            message,
        )),
        None => Ok(()),
    }
}

async fn token(
    State(state): State<FakeState>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(grant): Json<PasswordGrant>,
) -> Result<Response, Response> {
    api_role(&headers)?;
    if query.get("grant_type").map(String::as_str) != Some("password") {
        return Err(auth_error(
            StatusCode::BAD_REQUEST,
            "validation_failed",
            "Unsupported grant type",
        ));
    }

    let mut inner = state.lock();
    check_auth_outage(&inner)?;
    let Some(user) = inner
        .users
        .iter()
        .find(|u| u.email.eq_ignore_ascii_case(grant.email.trim()) && u.password == grant.password)
        .cloned()
    else {
        return Err(auth_error(
            StatusCode::BAD_REQUEST,
            "invalid_credentials",
            "Invalid login credentials",
        ));
    };

    let access_token = Uuid::new_v4().simple().to_string();
    inner.tokens.insert(access_token.clone(), user.id.clone());

    Ok(Json(json!({
        "access_token": access_token,
        "token_type": "bearer",
        "expires_in": 3600,
        "refresh_token": Uuid::new_v4().simple().to_string(),
        "user": { "id": user.id, "email": user.email },
    }))
    .into_response())
}

async fn user(State(state): State<FakeState>, headers: HeaderMap) -> Result<Response, Response> {
    api_role(&headers)?;
    let inner = state.lock();
    check_auth_outage(&inner)?;
    let user = bearer(&headers)
        .and_then(|token| inner.tokens.get(token))
        .and_then(|id| inner.users.iter().find(|u| &u.id == id))
        .ok_or_else(|| {
            auth_error(
                StatusCode::FORBIDDEN,
                "bad_jwt",
                "invalid JWT: unable to parse or verify signature",
            )
        })?;

    Ok(Json(json!({ "id": user.id, "email": user.email })).into_response())
}

// =============================================================================
// Storage
// =============================================================================

fn storage_error(status: StatusCode, error: &str, message: &str) -> Response {
    (
        status,
        Json(json!({
            "statusCode": status.as_u16().to_string(),
            "error": error,
            "message": message,
        })),
    )
        .into_response()
}

async fn upload(
    State(state): State<FakeState>,
    Path(rest): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, Response> {
    let role = api_role(&headers)?;
    if !matches!(role, Role::Service) {
        return Err(storage_error(
            StatusCode::FORBIDDEN,
            "Unauthorized",
            "new row violates row-level security policy",
        ));
    }

    let Some((bucket, path)) = rest.split_once('/').filter(|(_, p)| !p.is_empty()) else {
        return Err(storage_error(StatusCode::BAD_REQUEST, "Invalid Key", "Invalid key"));
    };
    if bucket != BUCKET {
        return Err(storage_error(
            StatusCode::BAD_REQUEST,
            "Bucket not found",
            "Bucket not found",
        ));
    }

    let upsert = headers.get("x-upsert") == Some(&HeaderValue::from_static("true"));
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();
    let key = format!("{bucket}/{path}");

    let mut inner = state.lock();
    if inner.objects.contains_key(&key) && !upsert {
        return Err(storage_error(
            StatusCode::BAD_REQUEST,
            "Duplicate",
            "The resource already exists",
        ));
    }
    inner.objects.insert(
        key.clone(),
        StoredObject {
            content_type,
            bytes: body,
        },
    );

    Ok(Json(json!({ "Key": key, "Id": Uuid::new_v4().to_string() })).into_response())
}

async fn download(
    State(state): State<FakeState>,
    Path(rest): Path<String>,
) -> Result<Response, Response> {
    let not_found = || storage_error(StatusCode::NOT_FOUND, "not_found", "Object not found");
    let key = rest.strip_prefix("public/").ok_or_else(not_found)?;
    let object = state.lock().objects.get(key).cloned().ok_or_else(not_found)?;

    Ok((
        [(header::CONTENT_TYPE, object.content_type)],
        object.bytes,
    )
        .into_response())
}
