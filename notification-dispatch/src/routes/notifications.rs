//! `SendNotification` / `SendBulkNotification` / `GetNotifications` /
//! `MarkAsRead` / `GetNotificationStatus` (§6 dispatch & query operations).
use std::collections::HashMap;
use std::str::FromStr;

use actix_web::{web, HttpResponse};
use notification_common::enums::{Channel, NotificationStatus, NotificationType, Priority};
use notification_common::util::EpochSeconds;
use serde::{Deserialize, Serialize};

use crate::dispatch_service::{
    BulkNotificationItem, GetNotificationsRequest, SendBulkNotificationRequest, SendNotificationRequest,
};
use crate::error::{ApiErrorKind, ApiResult};
use crate::server::ServerState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendNotificationBody {
    pub tenant_id: String,
    pub account_id: String,
    #[serde(rename = "type")]
    pub notification_type: String,
    #[serde(default)]
    pub channels: Vec<String>,
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub locale: String,
    #[serde(default)]
    pub data: HashMap<String, String>,
    #[serde(default)]
    pub source_service: String,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub idempotency_key: Option<String>,
    /// Accepted for contract parity (§6); scheduled delivery is a non-goal.
    #[serde(default)]
    #[allow(dead_code)]
    pub expires_at: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendNotificationResponseBody {
    pub success: bool,
    pub notification_id: String,
    pub message: String,
}

fn parse_type(raw: &str) -> ApiResult<NotificationType> {
    NotificationType::from_str(raw).map_err(|_| ApiErrorKind::Validation(format!("unknown type: {raw}")).into())
}

fn parse_priority(raw: Option<&str>) -> ApiResult<Priority> {
    match raw {
        None | Some("") => Ok(Priority::Normal),
        Some(raw) => {
            Priority::from_str(raw).map_err(|_| ApiErrorKind::Validation(format!("unknown priority: {raw}")).into())
        }
    }
}

fn parse_channels(raw: &[String]) -> ApiResult<Vec<Channel>> {
    raw.iter()
        .map(|c| Channel::from_str(c).map_err(|_| ApiErrorKind::Validation(format!("unknown channel: {c}")).into()))
        .collect()
}

pub async fn send_notification(
    state: web::Data<ServerState>,
    body: web::Json<SendNotificationBody>,
) -> ApiResult<HttpResponse> {
    let body = body.into_inner();
    let request = SendNotificationRequest {
        tenant_id: body.tenant_id,
        account_id: body.account_id,
        notification_type: parse_type(&body.notification_type)?,
        channels: parse_channels(&body.channels)?,
        title: body.title,
        body: body.body,
        locale: body.locale,
        data: body.data,
        source_service: body.source_service,
        priority: parse_priority(body.priority.as_deref())?,
        idempotency_key: body.idempotency_key,
    };
    let response = state.dispatch.send_notification(request).await?;
    Ok(HttpResponse::Ok().json(SendNotificationResponseBody {
        success: response.success,
        notification_id: response.notification_id,
        message: response.message,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkNotificationItemBody {
    pub account_id: String,
    #[serde(rename = "type")]
    pub notification_type: String,
    #[serde(default)]
    pub channels: Vec<String>,
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub locale: String,
    #[serde(default)]
    pub data: HashMap<String, String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendBulkNotificationBody {
    pub tenant_id: String,
    pub notifications: Vec<BulkNotificationItemBody>,
    #[serde(default)]
    pub source_service: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkNotificationResultBody {
    pub account_id: String,
    pub success: bool,
    pub notification_id: String,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendBulkNotificationResponseBody {
    pub success: bool,
    pub total_count: u32,
    pub sent_count: u32,
    pub failed_count: u32,
    pub results: Vec<BulkNotificationResultBody>,
}

pub async fn send_bulk_notification(
    state: web::Data<ServerState>,
    body: web::Json<SendBulkNotificationBody>,
) -> ApiResult<HttpResponse> {
    let body = body.into_inner();
    let mut items = Vec::with_capacity(body.notifications.len());
    for item in body.notifications {
        items.push(BulkNotificationItem {
            account_id: item.account_id,
            notification_type: parse_type(&item.notification_type)?,
            channels: parse_channels(&item.channels)?,
            title: item.title,
            body: item.body,
            locale: item.locale,
            data: item.data,
            priority: parse_priority(item.priority.as_deref())?,
            idempotency_key: item.idempotency_key,
        });
    }
    let request = SendBulkNotificationRequest {
        tenant_id: body.tenant_id,
        notifications: items,
        source_service: body.source_service,
    };
    let response = state.dispatch.send_bulk_notification(request).await?;
    Ok(HttpResponse::Ok().json(SendBulkNotificationResponseBody {
        success: response.success,
        total_count: response.total_count,
        sent_count: response.sent_count,
        failed_count: response.failed_count,
        results: response
            .results
            .into_iter()
            .map(|r| BulkNotificationResultBody {
                account_id: r.account_id,
                success: r.success,
                notification_id: r.notification_id,
                error: r.error,
            })
            .collect(),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetNotificationsQuery {
    pub tenant_id: String,
    pub account_id: String,
    pub channel: Option<String>,
    #[serde(default)]
    pub unread_only: bool,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub page_size: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationBody {
    pub id: String,
    pub tenant_id: String,
    pub account_id: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub channel: Channel,
    pub title: String,
    pub body: String,
    pub data: HashMap<String, String>,
    pub priority: Priority,
    pub status: NotificationStatus,
    pub source_service: String,
    pub external_id: Option<String>,
    pub error: Option<String>,
    pub retry_count: u32,
    pub sent_at: Option<u64>,
    pub delivered_at: Option<u64>,
    pub read_at: Option<u64>,
    pub created_at: u64,
    pub updated_at: u64,
}

impl From<notification_common::notification::Notification> for NotificationBody {
    fn from(n: notification_common::notification::Notification) -> Self {
        NotificationBody {
            id: n.id,
            tenant_id: n.tenant_id,
            account_id: n.account_id,
            notification_type: n.notification_type,
            channel: n.channel,
            title: n.title,
            body: n.body,
            data: n.data,
            priority: n.priority,
            status: n.status,
            source_service: n.source_service,
            external_id: n.external_id,
            error: n.error,
            retry_count: n.retry_count,
            sent_at: n.sent_at,
            delivered_at: n.delivered_at,
            read_at: n.read_at,
            created_at: n.created_at,
            updated_at: n.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetNotificationsResponseBody {
    pub notifications: Vec<NotificationBody>,
    pub total_count: u64,
    pub unread_count: u64,
    pub page: u32,
    pub page_size: u32,
}

pub async fn get_notifications(
    state: web::Data<ServerState>,
    query: web::Query<GetNotificationsQuery>,
) -> ApiResult<HttpResponse> {
    let query = query.into_inner();
    let channel = match query.channel {
        Some(c) if !c.is_empty() => {
            Some(Channel::from_str(&c).map_err(|_| ApiErrorKind::Validation(format!("unknown channel: {c}")))?)
        }
        _ => None,
    };
    let response = state
        .dispatch
        .get_notifications(GetNotificationsRequest {
            tenant_id: query.tenant_id,
            account_id: query.account_id,
            channel,
            unread_only: query.unread_only,
            page: query.page,
            page_size: query.page_size,
        })
        .await?;
    Ok(HttpResponse::Ok().json(GetNotificationsResponseBody {
        notifications: response.notifications.into_iter().map(Into::into).collect(),
        total_count: response.total_count,
        unread_count: response.unread_count,
        page: response.page,
        page_size: response.page_size,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkAsReadBody {
    pub tenant_id: String,
    pub account_id: String,
    pub notification_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkAsReadResponseBody {
    pub success: bool,
    pub updated_count: u64,
}

pub async fn mark_as_read(
    state: web::Data<ServerState>,
    body: web::Json<MarkAsReadBody>,
) -> ApiResult<HttpResponse> {
    let body = body.into_inner();
    let response = state
        .dispatch
        .mark_as_read(&body.tenant_id, &body.account_id, &body.notification_ids)
        .await?;
    Ok(HttpResponse::Ok().json(MarkAsReadResponseBody {
        success: response.success,
        updated_count: response.updated_count,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationStatusResponseBody {
    pub notification_id: String,
    pub status: NotificationStatus,
    pub channel: Option<Channel>,
    pub external_id: Option<String>,
    pub sent_at: EpochSeconds,
    pub delivered_at: EpochSeconds,
    pub error: Option<String>,
    pub retry_count: u32,
}

pub async fn get_notification_status(
    state: web::Data<ServerState>,
    path: web::Path<String>,
) -> HttpResponse {
    let response = state.dispatch.get_notification_status(&path.into_inner()).await;
    HttpResponse::Ok().json(NotificationStatusResponseBody {
        notification_id: response.notification_id,
        status: response.status,
        channel: response.channel,
        external_id: response.external_id,
        sent_at: response.sent_at.into(),
        delivered_at: response.delivered_at.into(),
        error: response.error,
        retry_count: response.retry_count,
    })
}
