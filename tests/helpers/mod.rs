//! In-process stand-in for the platform API, plus app construction helpers.

#![allow(dead_code)]

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use dashboard::app::App;
use dashboard::cache::KvStore;
use dashboard::config::Config;
use figment::Figment;
use figment::providers::Serialized;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const TOKEN: &str = "test-token";
pub const POOL_TOKEN: &str = "pool-token";
pub const SUPERADMIN_TOKEN: &str = "root-token";

/// Shared knobs and counters for the mock server.
#[derive(Clone)]
pub struct MockApi {
    pub freshness: Arc<Mutex<String>>,
    pub status_down: Arc<AtomicBool>,
    pub status_calls: Arc<AtomicUsize>,
    pub score_calls: Arc<AtomicUsize>,
    pub user_calls: Arc<AtomicUsize>,
    pub pool_calls: Arc<AtomicUsize>,
    pub score_delay_ms: Arc<AtomicU64>,
    pub last_auth: Arc<Mutex<Option<String>>>,
}

impl Default for MockApi {
    fn default() -> Self {
        Self {
            freshness: Arc::new(Mutex::new("fresh-1".to_owned())),
            status_down: Arc::default(),
            status_calls: Arc::default(),
            score_calls: Arc::default(),
            user_calls: Arc::default(),
            pool_calls: Arc::default(),
            score_delay_ms: Arc::default(),
            last_auth: Arc::default(),
        }
    }
}

impl MockApi {
    pub fn set_freshness(&self, token: &str) {
        *self.freshness.lock().unwrap() = token.to_owned();
    }

    pub fn score_calls(&self) -> usize {
        self.score_calls.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn pool_calls(&self) -> usize {
        self.pool_calls.load(Ordering::SeqCst)
    }

    pub fn last_auth(&self) -> Option<String> {
        self.last_auth.lock().unwrap().clone()
    }

    fn record_auth(&self, headers: &HeaderMap) -> Result<(), Response> {
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        *self.last_auth.lock().unwrap() = auth.clone();
        match auth {
            Some(value) if value.starts_with("Bearer ") && value != "Bearer expired" => Ok(()),
            _ => Err((StatusCode::UNAUTHORIZED, Json(json!({"error": "unauthorized"})))
                .into_response()),
        }
    }
}

fn scores_body(tenant: u64, user: u64) -> Value {
    json!({
        "scores": [
            {"id": 1, "key": format!("s_{tenant}_{user}_1"), "score": 71.5, "created_at": "2025-03-01T10:00:00Z"},
            {"id": 2, "key": format!("s_{tenant}_{user}_2"), "score": 64.0, "created_at": "2025-03-02T10:00:00Z"},
        ]
    })
}

async fn user_status(State(api): State<MockApi>, headers: HeaderMap, Path(id): Path<u64>) -> Response {
    if let Err(rejection) = api.record_auth(&headers) {
        return rejection;
    }
    api.status_calls.fetch_add(1, Ordering::SeqCst);
    if api.status_down.load(Ordering::SeqCst) {
        return (StatusCode::SERVICE_UNAVAILABLE, "down").into_response();
    }
    let token = api.freshness.lock().unwrap().clone();
    Json(json!({
        "userId": id,
        "profileUpdatedAt": null,
        "scoreCount": 2,
        "cacheKey": token,
    }))
    .into_response()
}

async fn tenant_status(
    State(api): State<MockApi>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Response {
    if let Err(rejection) = api.record_auth(&headers) {
        return rejection;
    }
    api.status_calls.fetch_add(1, Ordering::SeqCst);
    if api.status_down.load(Ordering::SeqCst) {
        return (StatusCode::SERVICE_UNAVAILABLE, "down").into_response();
    }
    let token = api.freshness.lock().unwrap().clone();
    Json(json!({
        "tenantId": id,
        "profileUpdatedAt": "2025-03-02T10:00:00Z",
        "scoreCount": 40,
        "userCount": 12,
        "cacheKey": format!("tenant-{token}"),
    }))
    .into_response()
}

async fn user_scores(
    State(api): State<MockApi>,
    headers: HeaderMap,
    Path((tenant, user)): Path<(u64, u64)>,
) -> Response {
    if let Err(rejection) = api.record_auth(&headers) {
        return rejection;
    }
    api.score_calls.fetch_add(1, Ordering::SeqCst);
    let delay = api.score_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    Json(scores_body(tenant, user)).into_response()
}

async fn tenant_scores(
    State(api): State<MockApi>,
    headers: HeaderMap,
    Path(tenant): Path<u64>,
) -> Response {
    if let Err(rejection) = api.record_auth(&headers) {
        return rejection;
    }
    api.score_calls.fetch_add(1, Ordering::SeqCst);
    Json(scores_body(tenant, 0)).into_response()
}

/// Deliberately malformed: `score` is a string.
async fn latest_score(headers: HeaderMap, State(api): State<MockApi>) -> Response {
    if let Err(rejection) = api.record_auth(&headers) {
        return rejection;
    }
    Json(json!({"id": 9, "key": "s", "score": "high", "created_at": "2025-03-01"})).into_response()
}

async fn get_user(State(api): State<MockApi>, headers: HeaderMap, Path(id): Path<u64>) -> Response {
    if let Err(rejection) = api.record_auth(&headers) {
        return rejection;
    }
    api.user_calls.fetch_add(1, Ordering::SeqCst);
    if id == 404 {
        return (StatusCode::NOT_FOUND, Json(json!({"error": "User not found"}))).into_response();
    }
    if id == 500 {
        return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response();
    }
    Json(json!({
        "id": id,
        "pin": "1234",
        "tenant_id": 2,
        "device_id": "quest-7",
        "name": "Avery",
        "uniform_number": 23,
        "tags": [{"id": 1, "name": "Rookie", "color": "#00ff00"}],
    }))
    .into_response()
}

async fn tag_suggestions(
    State(api): State<MockApi>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if let Err(rejection) = api.record_auth(&headers) {
        return rejection;
    }
    let q = params.get("q").cloned().unwrap_or_default();
    let user = params.get("user_id").cloned().unwrap_or_else(|| "none".into());
    Json(json!({
        "suggestions": [{"id": 1, "name": format!("{q}|{user}"), "color": "#fff"}]
    }))
    .into_response()
}

async fn assign_tags(
    State(api): State<MockApi>,
    headers: HeaderMap,
    Path(_user): Path<u64>,
    Json(body): Json<Value>,
) -> Response {
    if let Err(rejection) = api.record_auth(&headers) {
        return rejection;
    }
    let tags: Vec<Value> = body["tag_ids"]
        .as_array()
        .cloned()
        .unwrap_or_default()
        .into_iter()
        .map(|id| json!({"id": id, "name": format!("tag-{id}"), "color": "#000"}))
        .collect();
    Json(json!({ "tags": tags })).into_response()
}

async fn delete_tag(
    State(api): State<MockApi>,
    headers: HeaderMap,
    Path(_tag): Path<u64>,
) -> Response {
    if let Err(rejection) = api.record_auth(&headers) {
        return rejection;
    }
    StatusCode::NO_CONTENT.into_response()
}

/// User 0 answers with a null list, as some deployments do for empty pools.
async fn pool_user_scores(
    State(api): State<MockApi>,
    headers: HeaderMap,
    Path(user): Path<u64>,
) -> Response {
    if let Err(rejection) = api.record_auth(&headers) {
        return rejection;
    }
    api.pool_calls.fetch_add(1, Ordering::SeqCst);
    let delay = api.score_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    if user == 0 {
        return Json(json!({ "scores": null })).into_response();
    }
    Json(scores_body(0, user)).into_response()
}

async fn pool_user_storage_avg(
    State(api): State<MockApi>,
    headers: HeaderMap,
    Path(user): Path<u64>,
) -> Response {
    if let Err(rejection) = api.record_auth(&headers) {
        return rejection;
    }
    api.pool_calls.fetch_add(1, Ordering::SeqCst);
    Json(json!({
        "averages": [{
            "id": 1,
            "key": format!("s_0_{user}_1"),
            "leftBlinkDuration": 0.21,
            "leftMA": 0.4,
            "created_at": "2025-03-01T10:00:00Z",
        }]
    }))
    .into_response()
}

async fn pool_tags(State(api): State<MockApi>, headers: HeaderMap) -> Response {
    if let Err(rejection) = api.record_auth(&headers) {
        return rejection;
    }
    Json(json!({ "tags": null })).into_response()
}

async fn pool_update_user(
    State(api): State<MockApi>,
    headers: HeaderMap,
    Path(_user): Path<u64>,
    Json(body): Json<Value>,
) -> Response {
    if let Err(rejection) = api.record_auth(&headers) {
        return rejection;
    }
    Json(json!({ "success": true, "tags_protected": body["remove_tags"] })).into_response()
}

async fn managed_devices(State(api): State<MockApi>, headers: HeaderMap) -> Response {
    if let Err(rejection) = api.record_auth(&headers) {
        return rejection;
    }
    Json(json!({
        "devices": [{
            "id": 3,
            "device_id": "quest-3",
            "name": "Bay 3",
            "user_count": 9,
            "has_admin": true,
            "permissions": {"read": true, "write": true, "manage_users": false},
            "added_at": "2025-01-02T00:00:00Z",
        }]
    }))
    .into_response()
}

async fn superadmin_scores(
    State(api): State<MockApi>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if let Err(rejection) = api.record_auth(&headers) {
        return rejection;
    }
    Json(json!({ "scores": [], "params": params })).into_response()
}

pub fn router(api: MockApi) -> Router {
    Router::new()
        .route("/api/users/{id}/cache-status", get(user_status))
        .route("/api/tenants/{id}/cache-status", get(tenant_status))
        .route("/api/tenants/{tenant}/users/{user}/scores", get(user_scores))
        .route("/api/tenants/{tenant}/users/{user}/latest", get(latest_score))
        .route("/api/tenants/{tenant}/scores", get(tenant_scores))
        .route("/api/users/{id}", get(get_user))
        .route("/api/admin/tags/suggestions", get(tag_suggestions))
        .route("/api/admin/tags/{id}", delete(delete_tag))
        .route("/api/admin/users/{user}/tags", post(assign_tags))
        .route("/api/pool-admin/users/{id}/scores", get(pool_user_scores))
        .route("/api/pool-admin/users/{id}/storage-avg", get(pool_user_storage_avg))
        .route("/api/pool-admin/users/{id}/update", put(pool_update_user))
        .route("/api/pool-admin/tags", get(pool_tags))
        .route("/api/superadmin/devices", get(managed_devices))
        .route("/api/superadmin/scores", get(superadmin_scores))
        .with_state(api)
}

/// Serve the mock API on an ephemeral port and return its base URL.
pub async fn spawn(api: MockApi) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(api)).await.unwrap();
    });
    format!("http://{addr}")
}

/// A base URL nothing listens on.
pub async fn dead_base_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

pub fn config(base_url: &str) -> Config {
    Config::from_figment(Figment::new().merge(Serialized::defaults(json!({
        "api_base_url": base_url,
        "request_timeout": "5s",
    }))))
    .unwrap()
}

/// App over `store` with the test token already stored.
pub fn app_with_store(base_url: &str, store: Arc<dyn KvStore>) -> App {
    store.set("auth_token", TOKEN).unwrap();
    App::with_store(config(base_url), store).unwrap()
}
