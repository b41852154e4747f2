//! Bearer token storage.
//!
//! Tokens are issued by the server; this only keeps them in the shared
//! key-value store next to the cache so a restart keeps the session. Each
//! admin tier has its own token and cached account record.

use crate::cache::store::{KvStore, StoreError};
use clap::ValueEnum;
use std::sync::Arc;
use tracing::info;

pub const AUTH_TOKEN_KEY: &str = "auth_token";
pub const AUTH_USER_KEY: &str = "auth_user";
pub const SUPERADMIN_TOKEN_KEY: &str = "superadmin_token";
pub const SUPERADMIN_USER_KEY: &str = "superadmin_user";
pub const POOL_ADMIN_TOKEN_KEY: &str = "pool_admin_token";
pub const POOL_ADMIN_USER_KEY: &str = "pool_admin_user";

/// Which credential a request is sent with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum)]
pub enum Role {
    /// Tenant admin session; falls back to the superadmin token.
    #[default]
    Member,
    /// Oversees every device.
    Superadmin,
    /// Manages the users carrying its assigned tags across a device pool.
    PoolAdmin,
}

impl Role {
    fn token_key(self) -> &'static str {
        match self {
            Role::Member => AUTH_TOKEN_KEY,
            Role::Superadmin => SUPERADMIN_TOKEN_KEY,
            Role::PoolAdmin => POOL_ADMIN_TOKEN_KEY,
        }
    }

    fn user_key(self) -> &'static str {
        match self {
            Role::Member => AUTH_USER_KEY,
            Role::Superadmin => SUPERADMIN_USER_KEY,
            Role::PoolAdmin => POOL_ADMIN_USER_KEY,
        }
    }
}

#[derive(Clone)]
pub struct TokenStore {
    store: Arc<dyn KvStore>,
}

impl TokenStore {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// The regular session token, falling back to the superadmin token.
    pub fn token(&self) -> Option<String> {
        self.token_for(Role::Member)
    }

    pub fn token_for(&self, role: Role) -> Option<String> {
        let token = match role {
            Role::Member => self
                .store
                .get(AUTH_TOKEN_KEY)
                .or_else(|| self.store.get(SUPERADMIN_TOKEN_KEY)),
            other => self.store.get(other.token_key()),
        };
        token.filter(|token| !token.is_empty())
    }

    pub fn set_token(&self, token: &str) -> Result<(), StoreError> {
        self.set_token_for(Role::Member, token)
    }

    pub fn set_superadmin_token(&self, token: &str) -> Result<(), StoreError> {
        self.set_token_for(Role::Superadmin, token)
    }

    pub fn set_token_for(&self, role: Role, token: &str) -> Result<(), StoreError> {
        self.store.set(role.token_key(), token)
    }

    /// Drop the regular session after the server rejected it.
    pub fn expire_session(&self) {
        self.expire(Role::Member);
    }

    /// Drop one tier's token and account record after the server rejected it.
    pub fn expire(&self, role: Role) {
        self.store.remove(role.token_key());
        self.store.remove(role.user_key());
    }

    /// Remove every stored credential.
    pub fn clear_session(&self) {
        for role in [Role::Member, Role::Superadmin, Role::PoolAdmin] {
            self.expire(role);
        }
        info!("session cleared");
    }
}
