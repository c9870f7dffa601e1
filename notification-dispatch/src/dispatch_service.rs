//! `DispatchService` (§4.6): the public entry point. Validates requests,
//! enforces idempotency, invokes `ChannelRouter`, writes audit records for
//! security-classified types, and hosts the query operations over the
//! in-app store.

use std::collections::HashMap;
use std::sync::Arc;

use notification_common::audit::AuditEvent;
use notification_common::audit::AuditSink;
use notification_common::db::{NotificationListFilter, NotificationPage};
use notification_common::enums::{Channel, NotificationStatus, NotificationType, Priority};
use notification_common::notification::{AdapterResult, Notification, NormalizedRequest};
use uuid::Uuid;

use crate::audit_client::record_and_swallow;
use crate::channels::in_app::InAppAdapter;
use crate::error::{ApiErrorKind, ApiResult};
use crate::router::ChannelRouter;

/// One item of a `SendNotification` call (§6).
#[derive(Debug, Clone)]
pub struct SendNotificationRequest {
    pub tenant_id: String,
    pub account_id: String,
    pub notification_type: NotificationType,
    pub channels: Vec<Channel>,
    pub title: String,
    pub body: String,
    pub locale: String,
    pub data: HashMap<String, String>,
    pub source_service: String,
    pub priority: Priority,
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendNotificationResponse {
    pub success: bool,
    pub notification_id: String,
    pub message: String,
}

/// One item of a `SendBulkNotification` call's `notifications[]` (§6).
#[derive(Debug, Clone)]
pub struct BulkNotificationItem {
    pub account_id: String,
    pub notification_type: NotificationType,
    pub channels: Vec<Channel>,
    pub title: String,
    pub body: String,
    pub locale: String,
    pub data: HashMap<String, String>,
    pub priority: Priority,
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SendBulkNotificationRequest {
    pub tenant_id: String,
    pub notifications: Vec<BulkNotificationItem>,
    pub source_service: String,
}

#[derive(Debug, Clone)]
pub struct BulkNotificationResult {
    pub account_id: String,
    pub success: bool,
    pub notification_id: String,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SendBulkNotificationResponse {
    pub success: bool,
    pub total_count: u32,
    pub sent_count: u32,
    pub failed_count: u32,
    pub results: Vec<BulkNotificationResult>,
}

#[derive(Debug, Clone, Default)]
pub struct GetNotificationsRequest {
    pub tenant_id: String,
    pub account_id: String,
    pub channel: Option<Channel>,
    pub unread_only: bool,
    pub page: u32,
    pub page_size: u32,
}

#[derive(Debug, Clone)]
pub struct GetNotificationsResponse {
    pub notifications: Vec<Notification>,
    pub total_count: u64,
    pub unread_count: u64,
    pub page: u32,
    pub page_size: u32,
}

#[derive(Debug, Clone)]
pub struct MarkAsReadResponse {
    pub success: bool,
    pub updated_count: u64,
}

#[derive(Debug, Clone)]
pub struct NotificationStatusResponse {
    pub notification_id: String,
    pub status: NotificationStatus,
    pub channel: Option<Channel>,
    pub external_id: Option<String>,
    pub sent_at: Option<u64>,
    pub delivered_at: Option<u64>,
    pub error: Option<String>,
    pub retry_count: u32,
}

pub struct DispatchService {
    router: Arc<ChannelRouter>,
    in_app: Arc<InAppAdapter>,
    audit: Arc<dyn AuditSink>,
}

impl DispatchService {
    pub fn new(router: Arc<ChannelRouter>, in_app: Arc<InAppAdapter>, audit: Arc<dyn AuditSink>) -> Self {
        DispatchService { router, in_app, audit }
    }

    fn validate(tenant_id: &str, account_id: &str, title: &str) -> ApiResult<()> {
        if tenant_id.trim().is_empty() {
            return Err(ApiErrorKind::Validation("tenantId is required".to_string()).into());
        }
        if account_id.trim().is_empty() {
            return Err(ApiErrorKind::Validation("accountId is required".to_string()).into());
        }
        if title.trim().is_empty() {
            return Err(ApiErrorKind::Validation("title is required".to_string()).into());
        }
        Ok(())
    }

    /// §4.6 `sendNotification`.
    pub async fn send_notification(&self, req: SendNotificationRequest) -> ApiResult<SendNotificationResponse> {
        Self::validate(&req.tenant_id, &req.account_id, &req.title)?;

        // "Whether `channels = []` with `priority = urgent` should also apply
        // `recommendedChannels`... preserve that" (§9 open question): the
        // fallback applies whenever the caller left `channels` empty,
        // regardless of priority.
        let channels = if req.channels.is_empty() {
            ChannelRouter::recommended_channels(req.notification_type, req.priority)
        } else {
            req.channels.clone()
        };

        let notification_id = req.idempotency_key.clone().unwrap_or_else(|| Uuid::new_v4().to_string());

        if req.idempotency_key.is_some() {
            if let Some(existing) = self.in_app.status(&notification_id).await {
                return Ok(SendNotificationResponse {
                    success: true,
                    notification_id: existing.id,
                    message: "idempotent".to_string(),
                });
            }
        }

        let locale = if req.locale.is_empty() { "en".to_string() } else { req.locale.clone() };
        let normalized = NormalizedRequest {
            notification_id: notification_id.clone(),
            tenant_id: req.tenant_id.clone(),
            account_id: req.account_id.clone(),
            notification_type: req.notification_type,
            title: req.title.clone(),
            body: req.body.clone(),
            data: req.data.clone(),
            locale,
            priority: req.priority,
            source_service: req.source_service.clone(),
        };

        let results = self.router.route(&normalized, &channels).await;
        let any_success = results.iter().any(|(_, r)| r.success);

        if req.notification_type.is_security_classified() {
            let dispatched_channels: Vec<Channel> = results.iter().map(|(c, _)| *c).collect();
            let event = AuditEvent::for_dispatch(
                &req.account_id,
                &notification_id,
                req.notification_type,
                &dispatched_channels,
                any_success,
            );
            record_and_swallow(self.audit.as_ref(), event).await;
        }

        let message = if any_success {
            format!("Sent to {} channel(s)", results.len())
        } else {
            format!("Failed to send: {}", Self::joined_errors(&results))
        };

        Ok(SendNotificationResponse {
            success: any_success,
            notification_id,
            message,
        })
    }

    fn joined_errors(results: &[(Channel, AdapterResult)]) -> String {
        results
            .iter()
            .filter_map(|(c, r)| r.error.as_ref().map(|e| format!("{c}: {e}")))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// §4.6 `sendBulkNotification`: sequential, so per-item idempotency is
    /// preserved the same way a single `sendNotification` call would see it.
    pub async fn send_bulk_notification(
        &self,
        req: SendBulkNotificationRequest,
    ) -> ApiResult<SendBulkNotificationResponse> {
        let mut results = Vec::with_capacity(req.notifications.len());
        let mut sent_count = 0u32;
        let mut failed_count = 0u32;

        for item in req.notifications {
            let single = SendNotificationRequest {
                tenant_id: req.tenant_id.clone(),
                account_id: item.account_id.clone(),
                notification_type: item.notification_type,
                channels: item.channels,
                title: item.title,
                body: item.body,
                locale: item.locale,
                data: item.data,
                source_service: req.source_service.clone(),
                priority: item.priority,
                idempotency_key: item.idempotency_key,
            };
            match self.send_notification(single).await {
                Ok(response) => {
                    if response.success {
                        sent_count += 1;
                    } else {
                        failed_count += 1;
                    }
                    results.push(BulkNotificationResult {
                        account_id: item.account_id,
                        success: response.success,
                        notification_id: response.notification_id,
                        error: if response.success { None } else { Some(response.message) },
                    });
                }
                Err(e) => {
                    failed_count += 1;
                    results.push(BulkNotificationResult {
                        account_id: item.account_id,
                        success: false,
                        notification_id: String::new(),
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        let total_count = results.len() as u32;
        Ok(SendBulkNotificationResponse {
            success: failed_count == 0,
            total_count,
            sent_count,
            failed_count,
            results,
        })
    }

    /// §4.6 `getNotifications`: delegates to the in-app adapter, normalizing
    /// `page`/`pageSize` (§8 boundary behaviors).
    pub async fn get_notifications(&self, req: GetNotificationsRequest) -> ApiResult<GetNotificationsResponse> {
        let page = if req.page == 0 { 1 } else { req.page };
        let page_size = if req.page_size == 0 { 20 } else { req.page_size };
        let filter = NotificationListFilter {
            channel: req.channel,
            unread_only: req.unread_only,
            page,
            page_size,
        };
        let NotificationPage { items, total_count, unread_count } =
            self.in_app.list(&req.tenant_id, &req.account_id, &filter).await?;
        Ok(GetNotificationsResponse {
            notifications: items,
            total_count,
            unread_count,
            page,
            page_size,
        })
    }

    /// §4.6 `markAsRead`.
    pub async fn mark_as_read(
        &self,
        tenant_id: &str,
        account_id: &str,
        notification_ids: &[String],
    ) -> ApiResult<MarkAsReadResponse> {
        let updated_count = self.in_app.mark_as_read(tenant_id, account_id, notification_ids).await?;
        Ok(MarkAsReadResponse { success: true, updated_count })
    }

    /// §4.6 `getNotificationStatus`.
    pub async fn get_notification_status(&self, notification_id: &str) -> NotificationStatusResponse {
        match self.in_app.status(notification_id).await {
            Some(record) => NotificationStatusResponse {
                notification_id: record.id,
                status: record.status,
                channel: Some(record.channel),
                external_id: record.external_id,
                sent_at: record.sent_at,
                delivered_at: record.delivered_at,
                error: record.error,
                retry_count: record.retry_count,
            },
            None => NotificationStatusResponse {
                notification_id: notification_id.to_string(),
                status: NotificationStatus::Unspecified,
                channel: None,
                external_id: None,
                sent_at: None,
                delivered_at: None,
                error: Some("Notification not found".to_string()),
                retry_count: 0,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use notification_common::db::memory::{
        MemoryDeviceTokenRepository, MemoryNotificationRepository, MemoryPreferenceRepository,
        MemoryQuietHoursRepository,
    };
    use notification_common::db::NotificationRepository;
    use notification_common::preferences::PreferenceStore;

    use super::*;
    use crate::channels::{AdapterRegistry, ChannelAdapter};

    struct RecordingAudit {
        events: std::sync::Mutex<Vec<AuditEvent>>,
    }

    #[async_trait]
    impl AuditSink for RecordingAudit {
        async fn record(&self, event: AuditEvent) -> Result<(), String> {
            self.events.lock().unwrap().push(event);
            Ok(())
        }
    }

    struct AlwaysOk;
    #[async_trait]
    impl ChannelAdapter for AlwaysOk {
        async fn send(&self, request: &NormalizedRequest) -> AdapterResult {
            AdapterResult::ok(format!("ext-{}", request.notification_id))
        }
    }

    fn service(
        notifications: Arc<dyn NotificationRepository>,
        audit: Arc<RecordingAudit>,
    ) -> DispatchService {
        let in_app = Arc::new(InAppAdapter::new(notifications));
        let preferences = Arc::new(PreferenceStore::new(Arc::new(MemoryPreferenceRepository::default())));
        let quiet_hours = Arc::new(MemoryQuietHoursRepository::default());
        let adapters = AdapterRegistry::new()
            .with(Channel::InApp, in_app.clone())
            .with(Channel::Push, Arc::new(AlwaysOk))
            .with(Channel::Email, Arc::new(AlwaysOk));
        let router = Arc::new(ChannelRouter::new(preferences, quiet_hours, adapters));
        DispatchService::new(router, in_app, audit)
    }

    fn req(idempotency_key: Option<&str>) -> SendNotificationRequest {
        SendNotificationRequest {
            tenant_id: "t1".to_string(),
            account_id: "a1".to_string(),
            notification_type: NotificationType::System,
            channels: vec![Channel::InApp, Channel::Email],
            title: "hi".to_string(),
            body: "body".to_string(),
            locale: "".to_string(),
            data: HashMap::new(),
            source_service: "test".to_string(),
            priority: Priority::Normal,
            idempotency_key: idempotency_key.map(|s| s.to_string()),
        }
    }

    #[tokio::test]
    async fn happy_path_reports_success_and_channel_count() {
        let notifications: Arc<dyn NotificationRepository> = Arc::new(MemoryNotificationRepository::default());
        let audit = Arc::new(RecordingAudit { events: Default::default() });
        let svc = service(notifications, audit);

        let response = svc.send_notification(req(None)).await.unwrap();
        assert!(response.success);
        assert_eq!(response.message, "Sent to 2 channel(s)");
    }

    #[tokio::test]
    async fn repeat_idempotency_key_is_a_no_op() {
        let notifications: Arc<dyn NotificationRepository> = Arc::new(MemoryNotificationRepository::default());
        let audit = Arc::new(RecordingAudit { events: Default::default() });
        let svc = service(notifications, audit);

        let first = svc.send_notification(req(Some("K"))).await.unwrap();
        assert_eq!(first.notification_id, "K");
        assert_eq!(first.message, "Sent to 2 channel(s)");

        let second = svc.send_notification(req(Some("K"))).await.unwrap();
        assert_eq!(second.notification_id, "K");
        assert_eq!(second.message, "idempotent");
    }

    #[tokio::test]
    async fn security_classified_type_fires_exactly_one_audit_event() {
        let notifications: Arc<dyn NotificationRepository> = Arc::new(MemoryNotificationRepository::default());
        let audit = Arc::new(RecordingAudit { events: Default::default() });
        let svc = service(notifications, audit.clone());

        let mut request = req(None);
        request.notification_type = NotificationType::SecurityAlert;
        svc.send_notification(request).await.unwrap();

        assert_eq!(audit.events.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn non_security_type_fires_no_audit_event() {
        let notifications: Arc<dyn NotificationRepository> = Arc::new(MemoryNotificationRepository::default());
        let audit = Arc::new(RecordingAudit { events: Default::default() });
        let svc = service(notifications, audit.clone());

        svc.send_notification(req(None)).await.unwrap();
        assert!(audit.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_title_is_a_validation_error() {
        let notifications: Arc<dyn NotificationRepository> = Arc::new(MemoryNotificationRepository::default());
        let audit = Arc::new(RecordingAudit { events: Default::default() });
        let svc = service(notifications, audit);

        let mut request = req(None);
        request.title = "   ".to_string();
        assert!(svc.send_notification(request).await.is_err());
    }

    #[tokio::test]
    async fn bulk_send_counts_successes_and_failures() {
        let notifications: Arc<dyn NotificationRepository> = Arc::new(MemoryNotificationRepository::default());
        let audit = Arc::new(RecordingAudit { events: Default::default() });
        let svc = service(notifications, audit);

        let good = BulkNotificationItem {
            account_id: "a1".to_string(),
            notification_type: NotificationType::System,
            channels: vec![Channel::InApp],
            title: "hi".to_string(),
            body: "b".to_string(),
            locale: "".to_string(),
            data: HashMap::new(),
            priority: Priority::Normal,
            idempotency_key: None,
        };
        let bad = BulkNotificationItem {
            account_id: "".to_string(),
            title: "".to_string(),
            ..good.clone()
        };

        let response = svc
            .send_bulk_notification(SendBulkNotificationRequest {
                tenant_id: "t1".to_string(),
                notifications: vec![good, bad],
                source_service: "test".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(response.total_count, 2);
        assert_eq!(response.sent_count, 1);
        assert_eq!(response.failed_count, 1);
        assert!(!response.success);
    }

    #[tokio::test]
    async fn status_for_unknown_id_reports_not_found() {
        let notifications: Arc<dyn NotificationRepository> = Arc::new(MemoryNotificationRepository::default());
        let audit = Arc::new(RecordingAudit { events: Default::default() });
        let svc = service(notifications, audit);

        let status = svc.get_notification_status("missing").await;
        assert_eq!(status.status, NotificationStatus::Unspecified);
        assert_eq!(status.error.as_deref(), Some("Notification not found"));
    }

    #[tokio::test]
    async fn page_and_page_size_normalize_to_defaults() {
        let notifications: Arc<dyn NotificationRepository> = Arc::new(MemoryNotificationRepository::default());
        let audit = Arc::new(RecordingAudit { events: Default::default() });
        let svc = service(notifications, audit);

        let response = svc
            .get_notifications(GetNotificationsRequest {
                tenant_id: "t1".to_string(),
                account_id: "a1".to_string(),
                channel: None,
                unread_only: false,
                page: 0,
                page_size: 0,
            })
            .await
            .unwrap();
        assert_eq!(response.page, 1);
        assert_eq!(response.page_size, 20);
    }
}
