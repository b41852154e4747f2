//! Wire types for the platform API.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Freshness summary for a user or tenant scope.
///
/// `cache_key` is the server's freshness token: it changes whenever the
/// profile or score set behind the scope is mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<u64>,
    pub profile_updated_at: Option<String>,
    pub score_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_count: Option<u64>,
    pub cache_key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: u64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub id: u64,
    pub key: String,
    pub score: f64,
    pub created_at: String,
}

/// Uniform numbers arrive as either strings or numbers depending on who created the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UniformNumber {
    Number(i64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: u64,
    pub pin: String,
    pub tenant_id: u64,
    pub device_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uniform_number: Option<UniformNumber>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub portrait_image: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StorageData {
    pub key: String,
    pub data: HashMap<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<HashMap<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageResponse {
    pub id: u64,
    pub key: String,
    pub data: HashMap<String, Value>,
    #[serde(default)]
    pub meta: Option<HashMap<String, Value>>,
    #[serde(default)]
    pub version: Option<u32>,
    pub created_at: String,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Averaged eye-tracking metrics for one session recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageAvgResponse {
    pub id: u64,
    pub key: String,
    #[serde(default)]
    pub left_blink_duration: Option<f64>,
    #[serde(default)]
    pub right_blink_duration: Option<f64>,
    #[serde(default, rename = "leftMA")]
    pub left_ma: Option<f64>,
    #[serde(default, rename = "rightMA")]
    pub right_ma: Option<f64>,
    #[serde(default)]
    pub left_pupil_size: Option<f64>,
    #[serde(default)]
    pub right_pupil_size: Option<f64>,
    #[serde(rename = "created_at")]
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateUserRequest {
    pub pin: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uniform_number: Option<UniformNumber>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub portrait_image: Option<String>,
    /// Required when a superadmin creates the user; tenant admins omit it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreateUserResponse {
    pub id: u64,
    pub pin: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub uniform_number: Option<UniformNumber>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameUserRequest {
    pub user_id: u64,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenameUserResponse {
    pub success: bool,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAvatarRequest {
    pub user_id: u64,
    pub avatar_url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAvatarResponse {
    pub success: bool,
    pub avatar_url: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateTagRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Lets a superadmin pick the tenant the tag belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<u64>,
}

// -- superadmin --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevicePermissions {
    pub read: bool,
    pub write: bool,
    pub manage_users: bool,
}

/// A headset a superadmin manages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagedDevice {
    pub id: u64,
    pub device_id: String,
    pub name: String,
    pub user_count: u64,
    pub has_admin: bool,
    pub permissions: DevicePermissions,
    pub added_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceType {
    pub key: String,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceUser {
    pub id: u64,
    pub pin: String,
    pub created_at: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub uniform_number: Option<UniformNumber>,
    #[serde(default)]
    pub portrait_image: Option<String>,
    pub score_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<u64>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub performance_type: Option<PerformanceType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceStats {
    pub id: u64,
    pub device_id: String,
    pub name: String,
    pub user_count: u64,
    pub session_count: u64,
    pub avg_score: Option<f64>,
}

/// Cross-device totals for the superadmin overview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_devices: u64,
    pub total_users: u64,
    pub total_sessions: u64,
    pub avg_score: Option<f64>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub devices: Vec<DeviceStats>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AddDeviceRequest {
    pub device_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateDeviceUserRequest {
    pub pin: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uniform_number: Option<UniformNumber>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub portrait_image: Option<String>,
}

/// Paging and device filter for the cross-device score listing.
#[derive(Debug, Clone, Default)]
pub struct ScoreQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub device_id: Option<String>,
}

// -- pool admin --

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolUser {
    pub id: u64,
    pub pin: String,
    pub tenant_id: u64,
    pub device_name: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub uniform_number: Option<UniformNumber>,
    #[serde(default)]
    pub portrait_image: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolTag {
    pub id: u64,
    pub name: String,
    pub color: String,
    #[serde(default)]
    pub category: Option<String>,
    pub tenant_id: u64,
    pub device_name: String,
    pub is_admin_tag: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolDevice {
    pub id: u64,
    pub name: String,
    pub device_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PoolCreateUserRequest {
    pub tenant_id: u64,
    pub pin: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uniform_number: Option<UniformNumber>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub portrait_image: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extra_tags: Vec<u64>,
}

/// Partial update; tags the admin may not touch come back in `tags_protected`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PoolUpdateUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uniform_number: Option<UniformNumber>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub portrait_image: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub add_tags: Vec<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub remove_tags: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PoolUpdateUserResponse {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tags_protected: Vec<u64>,
}

// List endpoints wrap their arrays in an object; a missing or null field means empty.

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Deserialize)]
pub(crate) struct ScoresEnvelope {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub scores: Vec<Score>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AveragesEnvelope {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub averages: Vec<StorageAvgResponse>,
}

/// The group endpoint returns its list under `user` for compatibility.
#[derive(Debug, Deserialize)]
pub(crate) struct GroupEnvelope {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub user: Vec<UserProfile>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TagsEnvelope {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tags: Vec<Tag>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SuggestionsEnvelope {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub suggestions: Vec<Tag>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ManagedDevicesEnvelope {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub devices: Vec<ManagedDevice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DeviceUsersEnvelope {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub users: Vec<DeviceUser>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PoolUsersEnvelope {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub users: Vec<PoolUser>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PoolUserEnvelope {
    pub user: PoolUser,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PoolTagsEnvelope {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tags: Vec<PoolTag>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PoolDevicesEnvelope {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub devices: Vec<PoolDevice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: Option<String>,
}
