//! The abstract push capability (§9 Design Note 4): a batch multicast send
//! with a declared, provider-agnostic error taxonomy, so the adapter's
//! invalid-token eviction logic never has to know which vendor SDK produced
//! the failure.

use std::collections::HashMap;

use async_trait::async_trait;
use notification_common::enums::Priority;

use super::error::{PushErrorCode, PushSendError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AndroidPriority {
    High,
    Normal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AndroidChannel {
    Urgent,
    High,
    Default,
}

/// The per-priority mapping table in §4.4.2.
pub struct PriorityMapping {
    pub android_priority: AndroidPriority,
    pub android_channel: AndroidChannel,
    pub apns_priority: u8,
}

pub fn priority_mapping(priority: Priority) -> PriorityMapping {
    match priority {
        Priority::Urgent => PriorityMapping {
            android_priority: AndroidPriority::High,
            android_channel: AndroidChannel::Urgent,
            apns_priority: 10,
        },
        Priority::High => PriorityMapping {
            android_priority: AndroidPriority::High,
            android_channel: AndroidChannel::High,
            apns_priority: 10,
        },
        Priority::Normal | Priority::Low => PriorityMapping {
            android_priority: AndroidPriority::Normal,
            android_channel: AndroidChannel::Default,
            apns_priority: 5,
        },
    }
}

/// The multicast message built by the adapter and handed to a provider.
#[derive(Debug, Clone)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    pub data: HashMap<String, String>,
    pub priority: Priority,
    /// `requireInteraction = true` iff `priority >= high` (§4.4.2 web push).
    pub require_interaction: bool,
    /// Propagated from `data.link` to the provider's link field, when present.
    pub link: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PerMessageResult {
    pub success: bool,
    pub message_id: Option<String>,
    pub error: Option<PushErrorCode>,
}

#[derive(Debug, Clone, Default)]
pub struct MulticastResult {
    pub success_count: u32,
    pub failure_count: u32,
    /// In input-token order (§4.4.2).
    pub per_message: Vec<PerMessageResult>,
}

#[async_trait]
pub trait PushProvider: Send + Sync {
    /// Whether credentials were supplied at all (§4.4.2: uninitialized ⇒
    /// `send` reports "push not configured" without side effects).
    fn is_configured(&self) -> bool;

    async fn send_each_for_multicast(
        &self,
        tokens: &[String],
        message: &PushMessage,
    ) -> Result<MulticastResult, PushSendError>;
}
