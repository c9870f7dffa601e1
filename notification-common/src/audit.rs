//! The audit event a security-classified dispatch fires (§4.7). The sink
//! itself is an outbound RPC client, implemented against this trait so
//! `DispatchService` can be tested against an in-memory recorder instead of
//! the real audit service.
use async_trait::async_trait;
use serde::Serialize;

use crate::enums::NotificationType;

/// `notification type -> audit event type` (§4.7 table).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditEventType {
    PasswordChanged,
    MfaVerified,
    AccountLocked,
    LoginSuccess,
    Unspecified,
}

impl AuditEventType {
    pub fn for_notification_type(notification_type: NotificationType) -> Self {
        match notification_type {
            NotificationType::PasswordReset => AuditEventType::PasswordChanged,
            NotificationType::MfaCode => AuditEventType::MfaVerified,
            NotificationType::AccountLocked => AuditEventType::AccountLocked,
            NotificationType::LoginAlert => AuditEventType::LoginSuccess,
            _ => AuditEventType::Unspecified,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditResult {
    Success,
    Failure,
}

impl AuditResult {
    pub fn from_any_success(any_success: bool) -> Self {
        if any_success {
            AuditResult::Success
        } else {
            AuditResult::Failure
        }
    }
}

/// The event body §4.7 specifies verbatim.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub event_type: AuditEventType,
    pub account_type: String,
    pub account_id: String,
    pub ip_address: String,
    pub user_agent: String,
    pub result: AuditResult,
    pub metadata: AuditMetadata,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditMetadata {
    pub action: String,
    pub notification_id: String,
    pub channels: String,
    pub notification_type: NotificationType,
}

impl AuditEvent {
    pub fn for_dispatch(
        account_id: &str,
        notification_id: &str,
        notification_type: NotificationType,
        channels: &[crate::enums::Channel],
        any_success: bool,
    ) -> Self {
        AuditEvent {
            event_type: AuditEventType::for_notification_type(notification_type),
            account_type: "user".to_string(),
            account_id: account_id.to_string(),
            ip_address: "notification-service".to_string(),
            user_agent: "notification-service".to_string(),
            result: AuditResult::from_any_success(any_success),
            metadata: AuditMetadata {
                action: "NOTIFICATION_SENT".to_string(),
                notification_id: notification_id.to_string(),
                channels: channels
                    .iter()
                    .map(|c| c.to_string())
                    .collect::<Vec<_>>()
                    .join(","),
                notification_type,
            },
        }
    }
}

/// Failure policy: errors are logged and swallowed by callers — they never
/// fail the dispatch (§4.7).
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, event: AuditEvent) -> Result<(), String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_type_mapping_matches_spec_table() {
        assert_eq!(
            AuditEventType::for_notification_type(NotificationType::PasswordReset),
            AuditEventType::PasswordChanged
        );
        assert_eq!(
            AuditEventType::for_notification_type(NotificationType::MfaCode),
            AuditEventType::MfaVerified
        );
        assert_eq!(
            AuditEventType::for_notification_type(NotificationType::AccountLocked),
            AuditEventType::AccountLocked
        );
        assert_eq!(
            AuditEventType::for_notification_type(NotificationType::LoginAlert),
            AuditEventType::LoginSuccess
        );
        assert_eq!(
            AuditEventType::for_notification_type(NotificationType::SecurityAlert),
            AuditEventType::Unspecified
        );
    }
}
