//! SMS adapter (§4.4.3). The specification reserves this as an abstract
//! adapter contract pending a concrete provider integration; this
//! implementation stubs the send with a deterministic provider-prefixed id
//! once a provider is selected by configuration.

use async_trait::async_trait;
use notification_common::notification::{AdapterResult, NormalizedRequest};
use uuid::Uuid;

use super::ChannelAdapter;
use crate::settings::{SmsProviderKind, SmsSettings};

pub struct SmsAdapter {
    settings: SmsSettings,
}

impl SmsAdapter {
    pub fn new(settings: SmsSettings) -> Self {
        SmsAdapter { settings }
    }

    fn provider_prefix(&self) -> &'static str {
        match self.settings.provider {
            SmsProviderKind::Twilio => "twilio",
            SmsProviderKind::AwsSns => "aws-sns",
            SmsProviderKind::None => "sms",
        }
    }
}

#[async_trait]
impl ChannelAdapter for SmsAdapter {
    async fn send(&self, request: &NormalizedRequest) -> AdapterResult {
        if !self.settings.is_configured() {
            return AdapterResult::fail("sms not configured");
        }
        if !request.data.contains_key("phoneNumber") {
            return AdapterResult::fail("no phone number");
        }

        let message_id = format!("{}-{}", self.provider_prefix(), Uuid::new_v4().simple());
        AdapterResult::ok(message_id)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use notification_common::enums::{NotificationType, Priority};

    use super::*;

    fn req(data: HashMap<String, String>) -> NormalizedRequest {
        NormalizedRequest {
            notification_id: "n-1".to_string(),
            tenant_id: "tenant-1".to_string(),
            account_id: "account-1".to_string(),
            notification_type: NotificationType::System,
            title: "hi".to_string(),
            body: "body".to_string(),
            data,
            locale: "en".to_string(),
            priority: Priority::Normal,
            source_service: "test".to_string(),
        }
    }

    #[tokio::test]
    async fn not_configured_without_provider() {
        let adapter = SmsAdapter::new(SmsSettings::default());
        let result = adapter.send(&req(HashMap::new())).await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("sms not configured"));
    }

    #[tokio::test]
    async fn requires_phone_number() {
        let adapter = SmsAdapter::new(SmsSettings {
            provider: SmsProviderKind::Twilio,
            ..Default::default()
        });
        let result = adapter.send(&req(HashMap::new())).await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("no phone number"));
    }

    #[tokio::test]
    async fn sends_with_provider_prefixed_id() {
        let adapter = SmsAdapter::new(SmsSettings {
            provider: SmsProviderKind::Twilio,
            ..Default::default()
        });
        let mut data = HashMap::new();
        data.insert("phoneNumber".to_string(), "+15551234567".to_string());
        let result = adapter.send(&req(data)).await;
        assert!(result.success);
        assert!(result.external_id.unwrap().starts_with("twilio-"));
    }
}
