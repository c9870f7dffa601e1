//! In-app adapter (§4.4.1): the sole persistent record for a delivery, and
//! the backing store for the account-facing query operations.

use std::sync::Arc;

use async_trait::async_trait;
use notification_common::db::error::{DbError, DbResult};
use notification_common::db::{NotificationListFilter, NotificationPage, NotificationRepository};
use notification_common::enums::{Channel, NotificationStatus};
use notification_common::notification::{AdapterResult, Notification, NormalizedRequest};

use super::ChannelAdapter;

pub struct InAppAdapter {
    notifications: Arc<dyn NotificationRepository>,
}

impl InAppAdapter {
    pub fn new(notifications: Arc<dyn NotificationRepository>) -> Self {
        InAppAdapter { notifications }
    }

    pub async fn list(
        &self,
        tenant_id: &str,
        account_id: &str,
        filter: &NotificationListFilter,
    ) -> DbResult<NotificationPage> {
        self.notifications
            .list_for_account(tenant_id, account_id, filter)
            .await
    }

    pub async fn mark_as_read(
        &self,
        tenant_id: &str,
        account_id: &str,
        ids: &[String],
    ) -> DbResult<u64> {
        self.notifications
            .mark_as_read(tenant_id, account_id, ids)
            .await
    }

    pub async fn status(&self, notification_id: &str) -> Option<Notification> {
        self.notifications
            .find_by_id(notification_id)
            .await
            .ok()
            .flatten()
    }

    pub async fn update_status(
        &self,
        notification_id: &str,
        status: NotificationStatus,
        external_id: Option<String>,
        error: Option<String>,
    ) -> DbResult<()> {
        self.notifications
            .update_status(notification_id, status, external_id, error)
            .await
    }
}

#[async_trait]
impl ChannelAdapter for InAppAdapter {
    async fn send(&self, request: &NormalizedRequest) -> AdapterResult {
        let mut row = Notification::new(request.notification_id.clone(), request, Channel::InApp);
        row.apply_status(NotificationStatus::Delivered, None, None);
        match self.notifications.insert(&row).await {
            Ok(_) => AdapterResult::ok(request.notification_id.clone()),
            // Lost the race on the `id` unique constraint (§5 concurrency
            // model): adopt the winner's row instead of double-dispatching.
            Err(DbError::Conditional) => match self.notifications.find_by_id(&request.notification_id).await {
                Ok(Some(existing)) => AdapterResult {
                    success: existing.status != NotificationStatus::Failed,
                    external_id: Some(existing.id),
                    error: existing.error,
                },
                _ => AdapterResult::fail("conflicting notification id"),
            },
            Err(e) => AdapterResult::fail(e.to_string()),
        }
    }
}
