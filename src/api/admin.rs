//! Superadmin and pool-admin endpoints.
//!
//! These always authenticate as their own tier, whatever role the client was
//! built with.

use crate::api::client::ApiClient;
use crate::api::errors::ApiError;
use crate::api::models::*;
use crate::auth::Role;
use serde_json::Value;

impl ApiClient {
    // -- superadmin --

    pub async fn superadmin_dashboard(&self) -> Result<DashboardStats, ApiError> {
        self.get_as(Role::Superadmin, "/api/superadmin/dashboard", &[])
            .await
    }

    pub async fn managed_devices(&self) -> Result<Vec<ManagedDevice>, ApiError> {
        let envelope: ManagedDevicesEnvelope = self
            .get_as(Role::Superadmin, "/api/superadmin/devices", &[])
            .await?;
        Ok(envelope.devices)
    }

    pub async fn add_device(&self, device_id: &str) -> Result<Value, ApiError> {
        let request = AddDeviceRequest {
            device_id: device_id.to_owned(),
        };
        self.post_as(Role::Superadmin, "/api/superadmin/devices", &request)
            .await
    }

    pub async fn remove_device(&self, device_id: u64) -> Result<(), ApiError> {
        self.delete_as(Role::Superadmin, &format!("/api/superadmin/devices/{device_id}"))
            .await
    }

    pub async fn device_users(&self, device_id: u64) -> Result<Vec<DeviceUser>, ApiError> {
        let this = self.clone();
        self.dedup()
            .dedupe(&format!("deviceUsers_{device_id}"), move || async move {
                let envelope: DeviceUsersEnvelope = this
                    .get_as(
                        Role::Superadmin,
                        &format!("/api/superadmin/devices/{device_id}/users"),
                        &[],
                    )
                    .await?;
                Ok(envelope.users)
            })
            .await
    }

    pub async fn create_device_user(
        &self,
        device_id: u64,
        request: &CreateDeviceUserRequest,
    ) -> Result<Value, ApiError> {
        self.post_as(
            Role::Superadmin,
            &format!("/api/superadmin/devices/{device_id}/users"),
            request,
        )
        .await
    }

    /// Every user across all managed devices.
    pub async fn all_users(&self) -> Result<Vec<DeviceUser>, ApiError> {
        let envelope: DeviceUsersEnvelope = self
            .get_as(Role::Superadmin, "/api/superadmin/users", &[])
            .await?;
        Ok(envelope.users)
    }

    /// Raw score listing across devices; the server picks the page shape.
    pub async fn all_scores(&self, query: &ScoreQuery) -> Result<Value, ApiError> {
        let mut params = Vec::new();
        if let Some(limit) = query.limit.filter(|l| *l > 0) {
            params.push(("limit", limit.to_string()));
        }
        if let Some(offset) = query.offset.filter(|o| *o > 0) {
            params.push(("offset", offset.to_string()));
        }
        if let Some(device_id) = query.device_id.as_ref().filter(|d| !d.is_empty()) {
            params.push(("device_id", device_id.clone()));
        }
        self.get_as(Role::Superadmin, "/api/superadmin/scores", &params)
            .await
    }

    // -- pool admin --

    /// Users visible to the pool admin through its assigned tags.
    pub async fn pool_users(&self) -> Result<Vec<PoolUser>, ApiError> {
        let envelope: PoolUsersEnvelope = self
            .get_as(Role::PoolAdmin, "/api/pool-admin/users", &[])
            .await?;
        Ok(envelope.users)
    }

    pub async fn pool_user(&self, user_id: u64) -> Result<PoolUser, ApiError> {
        let envelope: PoolUserEnvelope = self
            .get_as(Role::PoolAdmin, &format!("/api/pool-admin/users/{user_id}"), &[])
            .await?;
        Ok(envelope.user)
    }

    pub async fn pool_create_user(
        &self,
        request: &PoolCreateUserRequest,
    ) -> Result<Value, ApiError> {
        self.post_as(Role::PoolAdmin, "/api/pool-admin/users/create", request)
            .await
    }

    pub async fn pool_update_user(
        &self,
        user_id: u64,
        request: &PoolUpdateUserRequest,
    ) -> Result<PoolUpdateUserResponse, ApiError> {
        self.put_as(
            Role::PoolAdmin,
            &format!("/api/pool-admin/users/{user_id}/update"),
            request,
        )
        .await
    }

    pub async fn pool_tags(&self) -> Result<Vec<PoolTag>, ApiError> {
        let envelope: PoolTagsEnvelope = self
            .get_as(Role::PoolAdmin, "/api/pool-admin/tags", &[])
            .await?;
        Ok(envelope.tags)
    }

    pub async fn pool_devices(&self) -> Result<Vec<PoolDevice>, ApiError> {
        let envelope: PoolDevicesEnvelope = self
            .get_as(Role::PoolAdmin, "/api/pool-admin/devices", &[])
            .await?;
        Ok(envelope.devices)
    }

    pub async fn pool_user_scores(&self, user_id: u64) -> Result<Vec<Score>, ApiError> {
        let this = self.clone();
        self.dedup()
            .dedupe(&format!("poolUserScores_{user_id}"), move || async move {
                let envelope: ScoresEnvelope = this
                    .get_as(
                        Role::PoolAdmin,
                        &format!("/api/pool-admin/users/{user_id}/scores"),
                        &[],
                    )
                    .await?;
                Ok(envelope.scores)
            })
            .await
    }

    pub async fn pool_user_storage_avg(
        &self,
        user_id: u64,
    ) -> Result<Vec<StorageAvgResponse>, ApiError> {
        let this = self.clone();
        self.dedup()
            .dedupe(&format!("poolUserStorageAvg_{user_id}"), move || async move {
                let envelope: AveragesEnvelope = this
                    .get_as(
                        Role::PoolAdmin,
                        &format!("/api/pool-admin/users/{user_id}/storage-avg"),
                        &[],
                    )
                    .await?;
                Ok(envelope.averages)
            })
            .await
    }
}
