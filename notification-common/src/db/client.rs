//! Repository traits behind every stateful component (§4.1-4.4): one trait
//! per storage-backed responsibility, so `PreferenceStore`, `DeviceTokenRegistry`
//! and the in-app adapter can each be driven by a memory-backed test double
//! or the Postgres implementation interchangeably.
use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::db::error::DbResult;
use crate::enums::{Channel, NotificationStatus, NotificationType, Platform};
use crate::notification::Notification;
use crate::quiet_hours::QuietHoursConfig;

/// Row stored by `updatePreferences` / read by `getPreferences` (§4.2). The
/// absence of a row is handled by `PreferenceStore`, not by this layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoredPreferences {
    pub channels: HashMap<Channel, bool>,
    pub types: HashMap<NotificationType, HashSet<Channel>>,
}

/// A registered device (§4.3 `DeviceTokenRegistry`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceToken {
    pub id: String,
    pub tenant_id: String,
    pub account_id: String,
    pub token: String,
    pub platform: Platform,
    pub device_id: Option<String>,
    pub info: HashMap<String, String>,
    pub created_at: u64,
    pub last_used_at: u64,
}

/// Filter/pagination input to `NotificationRepository::list_for_account`
/// (§4.4.1 `list`).
#[derive(Debug, Clone, Default)]
pub struct NotificationListFilter {
    pub channel: Option<Channel>,
    pub unread_only: bool,
    pub page: u32,
    pub page_size: u32,
}

/// The triple `{ items, totalCount, unreadCount }` the in-app adapter's
/// `list` returns (§4.4.1).
#[derive(Debug, Clone, Default)]
pub struct NotificationPage {
    pub items: Vec<Notification>,
    pub total_count: u64,
    pub unread_count: u64,
}

#[async_trait]
pub trait PreferenceRepository: Send + Sync {
    async fn get_preferences(
        &self,
        tenant_id: &str,
        account_id: &str,
    ) -> DbResult<Option<StoredPreferences>>;

    /// Atomic upsert of both maps (§4.2 `updatePreferences`): implementations
    /// must leave prior state untouched on failure.
    async fn update_preferences(
        &self,
        tenant_id: &str,
        account_id: &str,
        prefs: &StoredPreferences,
    ) -> DbResult<()>;
}

#[async_trait]
pub trait QuietHoursRepository: Send + Sync {
    async fn get_config(
        &self,
        tenant_id: &str,
        account_id: &str,
    ) -> DbResult<Option<QuietHoursConfig>>;

    async fn set_config(
        &self,
        tenant_id: &str,
        account_id: &str,
        config: &QuietHoursConfig,
    ) -> DbResult<()>;
}

#[async_trait]
pub trait DeviceTokenRepository: Send + Sync {
    /// Upsert keyed on `(tenant, account, deviceId)` when `deviceId` is
    /// non-empty, else on `token` (§4.3 `register`). Returns the stable row
    /// id.
    async fn upsert(&self, token: &DeviceToken) -> DbResult<String>;

    async fn unregister(&self, tenant_id: &str, account_id: &str, token: &str) -> DbResult<bool>;

    async fn list_for_account(
        &self,
        tenant_id: &str,
        account_id: &str,
    ) -> DbResult<Vec<DeviceToken>>;

    async fn active_tokens(&self, tenant_id: &str, account_id: &str) -> DbResult<Vec<String>>;

    async fn evict_by_token(&self, token: &str) -> DbResult<()>;
}

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn insert(&self, notification: &Notification) -> DbResult<()>;

    async fn find_by_id(&self, notification_id: &str) -> DbResult<Option<Notification>>;

    async fn update_status(
        &self,
        notification_id: &str,
        status: NotificationStatus,
        external_id: Option<String>,
        error: Option<String>,
    ) -> DbResult<()>;

    async fn list_for_account(
        &self,
        tenant_id: &str,
        account_id: &str,
        filter: &NotificationListFilter,
    ) -> DbResult<NotificationPage>;

    /// Returns the number of rows actually transitioned (§4.4.1 `markAsRead`
    /// only touches rows with `readAt = None` belonging to the account).
    async fn mark_as_read(
        &self,
        tenant_id: &str,
        account_id: &str,
        ids: &[String],
    ) -> DbResult<u64>;
}
