//! HTTP client for the platform API.
//!
//! Every request carries the stored bearer token of a [`Role`]: the shared
//! endpoints use the client's role, the superadmin and pool-admin endpoints
//! always use their own tier's token. A 401 drops that tier's stored session
//! and surfaces as [`ApiError::Unauthorized`]; tearing down the rest of the
//! session is left to the caller. Idempotent lookups that many views request
//! at once (scores, users) go through the shared [`Deduplicator`].

use crate::api::errors::ApiError;
use crate::api::json::parse_json_with_context;
use crate::api::models::*;
use crate::auth::{Role, TokenStore};
use crate::cache::dedupe::Deduplicator;
use crate::cache::fresh::{Scope, StatusSource};
use crate::utils::log_if_slow;
use anyhow::Context;
use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const SLOW_REQUEST: Duration = Duration::from_secs(2);

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    tokens: TokenStore,
    dedup: Deduplicator,
    role: Role,
}

impl ApiClient {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        tokens: TokenStore,
        dedup: Deduplicator,
    ) -> anyhow::Result<Self> {
        url::Url::parse(base_url).with_context(|| format!("Invalid API base URL: {base_url}"))?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("dashboard/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_owned(),
            tokens,
            dedup,
            role: Role::Member,
        })
    }

    /// Same client, sending the shared endpoints with `role`'s token.
    pub fn as_role(&self, role: Role) -> Self {
        Self {
            role,
            ..self.clone()
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    pub fn dedup(&self) -> &Deduplicator {
        &self.dedup
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(
        &self,
        role: Role,
        request: RequestBuilder,
        url: &str,
    ) -> Result<Response, ApiError> {
        let token = self.tokens.token_for(role).ok_or(ApiError::MissingToken)?;
        let start = Instant::now();
        let response = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| ApiError::transport(url, e))?;
        log_if_slow(start, SLOW_REQUEST, url);
        debug!(url, ?role, status = response.status().as_u16(), "api response");

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            warn!(url, ?role, "token expired, clearing auth state");
            self.tokens.expire(role);
            return Err(ApiError::Unauthorized);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.error)
                .unwrap_or_else(|| format!("API error ({})", status.as_u16()));
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }

    async fn parse<T: DeserializeOwned>(response: Response, url: &str) -> Result<T, ApiError> {
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::transport(url, e))?;
        parse_json_with_context(&body).map_err(|detail| ApiError::ParseFailed {
            status,
            url: url.to_owned(),
            detail,
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.get_as(self.role, path, &[]).await
    }

    pub(super) async fn get_as<T: DeserializeOwned>(
        &self,
        role: Role,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let url = self.url(path);
        let response = self.send(role, self.http.get(&url).query(query), &url).await?;
        Self::parse(response, &url).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.post_as(self.role, path, body).await
    }

    pub(super) async fn post_as<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        role: Role,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.url(path);
        let response = self.send(role, self.http.post(&url).json(body), &url).await?;
        Self::parse(response, &url).await
    }

    pub(super) async fn put_as<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        role: Role,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.url(path);
        let response = self.send(role, self.http.put(&url).json(body), &url).await?;
        Self::parse(response, &url).await
    }

    async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.delete_as(self.role, path).await
    }

    /// Deletes answer with an empty or irrelevant body; only the status matters.
    pub(super) async fn delete_as(&self, role: Role, path: &str) -> Result<(), ApiError> {
        let url = self.url(path);
        self.send(role, self.http.delete(&url), &url).await?;
        Ok(())
    }

    // -- profiles & storage --

    pub async fn fetch_profile(&self, user_id: u64) -> Result<serde_json::Value, ApiError> {
        self.get(&format!("/api/profiles/{user_id}/")).await
    }

    pub async fn insert_storage(&self, data: &StorageData) -> Result<StorageResponse, ApiError> {
        self.post("/api/storage", data).await
    }

    pub async fn get_storage(&self, key: &str) -> Result<StorageResponse, ApiError> {
        self.get(&format!("/api/storage/{}", urlencoding::encode(key)))
            .await
    }

    pub async fn get_storage_avg(&self, key: &str) -> Result<StorageAvgResponse, ApiError> {
        self.get(&format!("/api/storage-avg/{}", urlencoding::encode(key)))
            .await
    }

    pub async fn list_storage_avg(
        &self,
        tenant_id: u64,
        user_id: u64,
    ) -> Result<Vec<StorageAvgResponse>, ApiError> {
        let envelope: AveragesEnvelope = self
            .get(&format!("/api/tenants/{tenant_id}/users/{user_id}/storage-avg"))
            .await?;
        Ok(envelope.averages)
    }

    // -- scores & users (deduplicated) --

    pub async fn list_scores(&self, tenant_id: u64, user_id: u64) -> Result<Vec<Score>, ApiError> {
        let this = self.clone();
        self.dedup
            .dedupe(&format!("listScores_{tenant_id}_{user_id}"), move || async move {
                let envelope: ScoresEnvelope = this
                    .get(&format!("/api/tenants/{tenant_id}/users/{user_id}/scores"))
                    .await?;
                Ok(envelope.scores)
            })
            .await
    }

    pub async fn list_tenant_scores(&self, tenant_id: u64) -> Result<Vec<Score>, ApiError> {
        let this = self.clone();
        self.dedup
            .dedupe(&format!("listTenantScores_{tenant_id}"), move || async move {
                let envelope: ScoresEnvelope =
                    this.get(&format!("/api/tenants/{tenant_id}/scores")).await?;
                Ok(envelope.scores)
            })
            .await
    }

    pub async fn latest_score(&self, tenant_id: u64, user_id: u64) -> Result<Score, ApiError> {
        let this = self.clone();
        self.dedup
            .dedupe(&format!("getLatestScore_{tenant_id}_{user_id}"), move || async move {
                this.get(&format!("/api/tenants/{tenant_id}/users/{user_id}/latest"))
                    .await
            })
            .await
    }

    pub async fn get_user(&self, user_id: u64) -> Result<UserProfile, ApiError> {
        let this = self.clone();
        self.dedup
            .dedupe(&format!("getUser_{user_id}"), move || async move {
                this.get(&format!("/api/users/{user_id}")).await
            })
            .await
    }

    pub async fn users_by_group(&self, link_id: u64) -> Result<Vec<UserProfile>, ApiError> {
        let envelope: GroupEnvelope = self.get(&format!("/api/group/{link_id}")).await?;
        Ok(envelope.user)
    }

    // -- admin --

    pub async fn create_user(
        &self,
        request: &CreateUserRequest,
    ) -> Result<CreateUserResponse, ApiError> {
        self.post("/api/admin/users", request).await
    }

    pub async fn rename_user(
        &self,
        request: &RenameUserRequest,
    ) -> Result<RenameUserResponse, ApiError> {
        self.post("/api/admin/rename", request).await
    }

    pub async fn update_avatar(
        &self,
        request: &UpdateAvatarRequest,
    ) -> Result<UpdateAvatarResponse, ApiError> {
        self.post("/api/admin/updateAvatar", request).await
    }

    // -- tags --

    pub async fn list_tags(&self) -> Result<Vec<Tag>, ApiError> {
        let envelope: TagsEnvelope = self.get("/api/admin/tags").await?;
        Ok(envelope.tags)
    }

    pub async fn create_tag(&self, request: &CreateTagRequest) -> Result<Tag, ApiError> {
        self.post("/api/admin/tags", request).await
    }

    pub async fn delete_tag(&self, tag_id: u64) -> Result<(), ApiError> {
        self.delete(&format!("/api/admin/tags/{tag_id}")).await
    }

    /// Tag names matching `query`; superadmins pass `user_id` to pick the tenant.
    pub async fn tag_suggestions(
        &self,
        query: &str,
        user_id: Option<u64>,
    ) -> Result<Vec<Tag>, ApiError> {
        let mut params = Vec::new();
        if !query.is_empty() {
            params.push(("q", query.to_owned()));
        }
        if let Some(user_id) = user_id {
            params.push(("user_id", user_id.to_string()));
        }
        let envelope: SuggestionsEnvelope = self
            .get_as(self.role, "/api/admin/tags/suggestions", &params)
            .await?;
        Ok(envelope.suggestions)
    }

    pub async fn assign_tags(&self, user_id: u64, tag_ids: &[u64]) -> Result<Vec<Tag>, ApiError> {
        let body = serde_json::json!({ "tag_ids": tag_ids });
        let envelope: TagsEnvelope = self
            .post(&format!("/api/admin/users/{user_id}/tags"), &body)
            .await?;
        Ok(envelope.tags)
    }

    pub async fn remove_tag(&self, user_id: u64, tag_id: u64) -> Result<(), ApiError> {
        self.delete(&format!("/api/admin/users/{user_id}/tags/{tag_id}"))
            .await
    }
}

#[async_trait]
impl StatusSource for ApiClient {
    async fn cache_status(&self, scope: Scope) -> Result<CacheStatus, ApiError> {
        let path = match scope {
            Scope::User(id) => format!("/api/users/{id}/cache-status"),
            Scope::Tenant(id) => format!("/api/tenants/{id}/cache-status"),
        };
        self.get(&path).await
    }
}
