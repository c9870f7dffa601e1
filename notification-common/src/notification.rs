//! The `Notification` record (§3) and the `NormalizedRequest` (§4.4) that
//! channel adapters consume.
use std::collections::HashMap;

use serde_derive::{Deserialize, Serialize};

use crate::enums::{Channel, NotificationStatus, NotificationType, Priority};
use crate::util::ms_since_epoch;

/// The record of one logical dispatch to one account (§3 `Notification`).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Notification {
    pub id: String,
    pub tenant_id: String,
    pub account_id: String,
    pub notification_type: NotificationType,
    pub channel: Channel,
    pub title: String,
    pub body: String,
    #[serde(default)]
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

impl Notification {
    /// Build a brand-new `pending` row for `channel`, stamped with the
    /// current time. Invariant (i): `read_at` stays `None` until the
    /// explicit mark-read transition.
    pub fn new(id: String, req: &NormalizedRequest, channel: Channel) -> Self {
        let now = ms_since_epoch();
        Notification {
            id,
            tenant_id: req.tenant_id.clone(),
            account_id: req.account_id.clone(),
            notification_type: req.notification_type,
            channel,
            title: req.title.clone(),
            body: req.body.clone(),
            data: req.data.clone(),
            priority: req.priority,
            status: NotificationStatus::Pending,
            source_service: req.source_service.clone(),
            external_id: None,
            error: None,
            retry_count: 0,
            sent_at: None,
            delivered_at: None,
            read_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply an adapter result, setting timestamps per the transition rules
    /// in §4.4.1 `updateStatus`: `sent_at` on transition to `sent`,
    /// `delivered_at` on transition to `delivered`.
    pub fn apply_status(
        &mut self,
        status: NotificationStatus,
        external_id: Option<String>,
        error: Option<String>,
    ) {
        let now = ms_since_epoch();
        if status == NotificationStatus::Sent && self.sent_at.is_none() {
            self.sent_at = Some(now);
        }
        if status == NotificationStatus::Delivered {
            self.sent_at.get_or_insert(now);
            self.delivered_at = Some(now);
        }
        self.status = status;
        if external_id.is_some() {
            self.external_id = external_id;
        }
        self.error = error;
        self.updated_at = now;
    }

    /// Transition to `read`, setting `read_at` (invariant (i)).
    pub fn mark_read(&mut self) {
        let now = ms_since_epoch();
        self.status = NotificationStatus::Read;
        self.read_at = Some(now);
        self.updated_at = now;
    }
}

/// The normalized, channel-agnostic request each `ChannelAdapter::send`
/// consumes (§4.4).
#[derive(Clone, Debug)]
pub struct NormalizedRequest {
    pub notification_id: String,
    pub tenant_id: String,
    pub account_id: String,
    pub notification_type: NotificationType,
    pub title: String,
    pub body: String,
    pub data: HashMap<String, String>,
    pub locale: String,
    pub priority: Priority,
    pub source_service: String,
}

/// The uniform result every `ChannelAdapter::send` returns (§4.4).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AdapterResult {
    pub success: bool,
    pub external_id: Option<String>,
    pub error: Option<String>,
}

impl AdapterResult {
    pub fn ok(external_id: impl Into<String>) -> Self {
        AdapterResult {
            success: true,
            external_id: Some(external_id.into()),
            error: None,
        }
    }

    pub fn ok_without_id() -> Self {
        AdapterResult {
            success: true,
            external_id: None,
            error: None,
        }
    }

    pub fn fail(error: impl Into<String>) -> Self {
        AdapterResult {
            success: false,
            external_id: None,
            error: Some(error.into()),
        }
    }
}
