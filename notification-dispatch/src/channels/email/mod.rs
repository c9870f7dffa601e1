pub mod client;

use async_trait::async_trait;
use notification_common::enums::NotificationType;
use notification_common::notification::{AdapterResult, NormalizedRequest};

use self::client::{EmailClient, SendEmailRequest};
use super::ChannelAdapter;
use crate::settings::EmailSettings;

pub struct EmailAdapter {
    settings: EmailSettings,
    client: EmailClient,
    source_service: String,
}

impl EmailAdapter {
    pub fn new(settings: EmailSettings, client: EmailClient, source_service: String) -> Self {
        EmailAdapter {
            settings,
            client,
            source_service,
        }
    }

    /// §4.4.4's type → template table; everything else maps to "unspecified".
    fn template_for(notification_type: NotificationType) -> &'static str {
        match notification_type {
            NotificationType::AdminInvite => "ADMIN_INVITE",
            NotificationType::PartnerInvite => "PARTNER_INVITE",
            NotificationType::PasswordReset => "PASSWORD_RESET",
            NotificationType::MfaCode => "MFA_CODE",
            NotificationType::AccountLocked => "ACCOUNT_LOCKED",
            _ => "unspecified",
        }
    }
}

#[async_trait]
impl ChannelAdapter for EmailAdapter {
    async fn send(&self, request: &NormalizedRequest) -> AdapterResult {
        if !self.settings.is_configured() {
            return AdapterResult::fail("email not configured");
        }
        let Some(to_email) = request.data.get("email").cloned() else {
            return AdapterResult::fail("no email address");
        };

        let from_email = request
            .data
            .get("fromEmail")
            .cloned()
            .unwrap_or_else(|| self.settings.from_email.clone());
        let locale = if request.locale.is_empty() {
            "en".to_string()
        } else {
            request.locale.clone()
        };

        let mut metadata = std::collections::HashMap::new();
        metadata.insert(
            "notificationId".to_string(),
            request.notification_id.clone(),
        );
        metadata.insert(
            "notificationType".to_string(),
            request.notification_type.to_string(),
        );

        let send_request = SendEmailRequest {
            tenant_id: request.tenant_id.clone(),
            account_id: request.account_id.clone(),
            to_email,
            template: Self::template_for(request.notification_type).to_string(),
            locale,
            variables: request.data.clone(),
            source_service: self.source_service.clone(),
            from_email,
            metadata,
        };

        match self
            .client
            .send_email(&self.settings.service_url, &send_request)
            .await
        {
            Ok(response) if response.success => AdapterResult::ok(response.email_log_id),
            Ok(response) => AdapterResult::fail(response.message),
            Err(e) => AdapterResult::fail(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use notification_common::enums::Priority;

    use super::*;

    fn req(data: HashMap<String, String>, notification_type: NotificationType) -> NormalizedRequest {
        NormalizedRequest {
            notification_id: "n-1".to_string(),
            tenant_id: "tenant-1".to_string(),
            account_id: "account-1".to_string(),
            notification_type,
            title: "hi".to_string(),
            body: "body".to_string(),
            data,
            locale: "".to_string(),
            priority: Priority::Normal,
            source_service: "test".to_string(),
        }
    }

    #[test]
    fn template_mapping_matches_spec_table() {
        assert_eq!(
            EmailAdapter::template_for(NotificationType::AdminInvite),
            "ADMIN_INVITE"
        );
        assert_eq!(
            EmailAdapter::template_for(NotificationType::PartnerInvite),
            "PARTNER_INVITE"
        );
        assert_eq!(
            EmailAdapter::template_for(NotificationType::PasswordReset),
            "PASSWORD_RESET"
        );
        assert_eq!(
            EmailAdapter::template_for(NotificationType::MfaCode),
            "MFA_CODE"
        );
        assert_eq!(
            EmailAdapter::template_for(NotificationType::AccountLocked),
            "ACCOUNT_LOCKED"
        );
        assert_eq!(
            EmailAdapter::template_for(NotificationType::System),
            "unspecified"
        );
    }

    #[tokio::test]
    async fn not_configured_without_service_url() {
        let adapter = EmailAdapter::new(
            EmailSettings {
                service_url: "".to_string(),
                from_email: "noreply@example.com".to_string(),
            },
            EmailClient::new(reqwest::Client::new()),
            "notification-service".to_string(),
        );
        let result = adapter.send(&req(HashMap::new(), NotificationType::System)).await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("email not configured"));
    }

    #[tokio::test]
    async fn requires_email_address() {
        let adapter = EmailAdapter::new(
            EmailSettings {
                service_url: "http://localhost:9999".to_string(),
                from_email: "noreply@example.com".to_string(),
            },
            EmailClient::new(reqwest::Client::new()),
            "notification-service".to_string(),
        );
        let result = adapter.send(&req(HashMap::new(), NotificationType::System)).await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("no email address"));
    }
}
