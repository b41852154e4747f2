//! Cached views over the API used by the dashboard screens.
//!
//! Cache keys carry the scope ids so entries for different users or tenants
//! never collide, and start with the cache-owned prefixes so logout clears them.

use crate::api::{ApiClient, ApiError, CacheStatus, Score, StorageAvgResponse, UserProfile};
use crate::auth::Role;
use crate::cache::fresh::{FreshCache, Scope, StatusSource};
use std::sync::Arc;
use tracing::info;

pub fn user_scores_key(tenant_id: u64, user_id: u64) -> String {
    format!("dashboard_scores_{tenant_id}_{user_id}")
}

pub fn tenant_scores_key(tenant_id: u64) -> String {
    format!("tenant_scores_{tenant_id}")
}

pub fn user_profile_key(user_id: u64) -> String {
    format!("user_profile_{user_id}")
}

pub fn pool_scores_key(user_id: u64) -> String {
    format!("user_pool_scores_{user_id}")
}

pub fn pool_storage_avg_key(user_id: u64) -> String {
    format!("user_pool_storage_avg_{user_id}")
}

#[derive(Clone)]
pub struct Dashboard {
    api: ApiClient,
    cache: FreshCache,
    /// Same entries, validated with the pool-admin token.
    pool_cache: FreshCache,
}

impl Dashboard {
    pub fn new(api: ApiClient, cache: FreshCache) -> Self {
        let pool_cache = FreshCache::new(
            cache.cache().clone(),
            Arc::new(api.as_role(Role::PoolAdmin)),
        );
        Self {
            api,
            cache,
            pool_cache,
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn cache(&self) -> &FreshCache {
        &self.cache
    }

    /// Current freshness status straight from the server.
    pub async fn status(&self, scope: Scope) -> Result<CacheStatus, ApiError> {
        self.api.cache_status(scope).await
    }

    /// A single user's scores, validated against the user's freshness token.
    pub async fn user_scores(&self, tenant_id: u64, user_id: u64) -> Result<Vec<Score>, ApiError> {
        let api = &self.api;
        self.cache
            .fetch_with_cache(
                &user_scores_key(tenant_id, user_id),
                Scope::User(user_id),
                || api.list_scores(tenant_id, user_id),
            )
            .await
    }

    /// Every score in a tenant, validated against the tenant-wide token.
    pub async fn tenant_scores(&self, tenant_id: u64) -> Result<Vec<Score>, ApiError> {
        let api = &self.api;
        self.cache
            .fetch_with_cache(
                &tenant_scores_key(tenant_id),
                Scope::Tenant(tenant_id),
                || api.list_tenant_scores(tenant_id),
            )
            .await
    }

    pub async fn user_profile(&self, user_id: u64) -> Result<UserProfile, ApiError> {
        let api = &self.api;
        self.cache
            .fetch_with_cache(&user_profile_key(user_id), Scope::User(user_id), || {
                api.get_user(user_id)
            })
            .await
    }

    /// A pool user's scores as seen by the pool admin.
    pub async fn pool_user_scores(&self, user_id: u64) -> Result<Vec<Score>, ApiError> {
        let api = &self.api;
        self.pool_cache
            .fetch_with_cache(&pool_scores_key(user_id), Scope::User(user_id), || {
                api.pool_user_scores(user_id)
            })
            .await
    }

    /// A pool user's averaged eye-tracking metrics.
    pub async fn pool_user_storage_avg(
        &self,
        user_id: u64,
    ) -> Result<Vec<StorageAvgResponse>, ApiError> {
        let api = &self.api;
        self.pool_cache
            .fetch_with_cache(&pool_storage_avg_key(user_id), Scope::User(user_id), || {
                api.pool_user_storage_avg(user_id)
            })
            .await
    }

    /// Forget a user's cached views so the next read goes to the server.
    pub fn refresh_user(&self, tenant_id: u64, user_id: u64) -> usize {
        [
            user_scores_key(tenant_id, user_id),
            user_profile_key(user_id),
            pool_scores_key(user_id),
            pool_storage_avg_key(user_id),
        ]
        .iter()
        .filter(|key| self.cache.invalidate(key))
        .count()
    }

    pub fn invalidate(&self, key: &str) -> bool {
        self.cache.invalidate(key)
    }

    pub fn clear(&self) -> usize {
        self.cache.invalidate_all()
    }

    /// Drop credentials and every cached view. Preferences survive.
    pub fn logout(&self) -> usize {
        self.api.tokens().clear_session();
        let removed = self.cache.invalidate_all();
        info!(removed, "logged out");
        removed
    }
}
