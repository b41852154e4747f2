use crate::api::ApiClient;
use crate::auth::TokenStore;
use crate::cache::{Deduplicator, FileStore, FreshCache, KvStore, MemoryStore, PersistentCache, Scope};
use crate::cli::Command;
use crate::config::Config;
use crate::dashboard::Dashboard;
use crate::utils::fmt_duration;
use anyhow::Context;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;
use yansi::Paint;

/// Composition root: owns the one store, pending-request table and client of the process.
pub struct App {
    config: Config,
    dashboard: Dashboard,
}

impl App {
    /// Build the application from config, opening the configured store.
    pub fn new(config: Config) -> Result<Self, anyhow::Error> {
        let store: Arc<dyn KvStore> = match &config.cache_path {
            Some(path) => {
                info!(path = %path.display(), "using file-backed store");
                Arc::new(FileStore::open(path, Some(config.cache_quota_bytes)))
            }
            None => {
                info!("using in-memory store");
                Arc::new(MemoryStore::with_quota(config.cache_quota_bytes))
            }
        };
        Self::with_store(config, store)
    }

    /// Build the application around an existing store.
    pub fn with_store(config: Config, store: Arc<dyn KvStore>) -> Result<Self, anyhow::Error> {
        let tokens = TokenStore::new(store.clone());
        let api = ApiClient::new(
            &config.api_base_url,
            config.request_timeout,
            tokens,
            Deduplicator::new(),
        )
        .context("Failed to create API client")?;

        let persistent = PersistentCache::new(store)
            .with_max_age(config.cache_max_age)
            .with_retention(config.cache_retention);
        let fresh = FreshCache::new(persistent, Arc::new(api.clone()));

        info!(
            api_base_url = %config.api_base_url,
            max_age = fmt_duration(config.cache_max_age),
            retention = config.cache_retention,
            quota_bytes = config.cache_quota_bytes,
            "dashboard client ready"
        );

        Ok(App {
            dashboard: Dashboard::new(api, fresh),
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn dashboard(&self) -> &Dashboard {
        &self.dashboard
    }

    /// Execute one CLI command, writing its result to stdout.
    pub async fn run(&self, command: Command) -> Result<(), anyhow::Error> {
        let dashboard = &self.dashboard;
        match command {
            Command::Status { id, tenant } => {
                let scope = if tenant { Scope::Tenant(id) } else { Scope::User(id) };
                print_json(&dashboard.status(scope).await?)
            }
            Command::Scores { tenant_id, user_id } => {
                print_json(&dashboard.user_scores(tenant_id, user_id).await?)
            }
            Command::TenantScores { tenant_id } => {
                print_json(&dashboard.tenant_scores(tenant_id).await?)
            }
            Command::Profile { user_id } => print_json(&dashboard.user_profile(user_id).await?),
            Command::PoolScores { user_id } => {
                print_json(&dashboard.pool_user_scores(user_id).await?)
            }
            Command::PoolAverages { user_id } => {
                print_json(&dashboard.pool_user_storage_avg(user_id).await?)
            }
            Command::Devices => print_json(&dashboard.api().managed_devices().await?),
            Command::DeviceUsers { device_id } => {
                print_json(&dashboard.api().device_users(device_id).await?)
            }
            Command::Overview => print_json(&dashboard.api().superadmin_dashboard().await?),
            Command::Invalidate { key } => {
                if dashboard.invalidate(&key) {
                    println!("{} {key}", "removed".green());
                } else {
                    println!("{} {key}", "not cached".yellow());
                }
                Ok(())
            }
            Command::Clear => {
                let removed = dashboard.clear();
                println!("{} {removed} cached entries", "removed".green());
                Ok(())
            }
            Command::Login { token, role } => {
                dashboard
                    .api()
                    .tokens()
                    .set_token_for(role, &token)
                    .context("Failed to store token")?;
                println!("{} ({role:?})", "token stored".green());
                Ok(())
            }
            Command::Logout => {
                let removed = dashboard.logout();
                println!("{} ({removed} cached entries removed)", "logged out".green());
                Ok(())
            }
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), anyhow::Error> {
    let rendered = serde_json::to_string_pretty(value).context("Failed to render output")?;
    println!("{rendered}");
    Ok(())
}
