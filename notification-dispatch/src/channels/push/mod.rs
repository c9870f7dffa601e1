pub mod error;
pub mod http;
pub mod provider;

use std::sync::Arc;

use async_trait::async_trait;
use notification_common::device_tokens::DeviceTokenRegistry;
use notification_common::notification::{AdapterResult, NormalizedRequest};

use self::provider::{priority_mapping, AndroidPriority, PushMessage, PushProvider};
use super::ChannelAdapter;

pub struct PushAdapter {
    tokens: Arc<DeviceTokenRegistry>,
    provider: Arc<dyn PushProvider>,
}

impl PushAdapter {
    pub fn new(tokens: Arc<DeviceTokenRegistry>, provider: Arc<dyn PushProvider>) -> Self {
        PushAdapter { tokens, provider }
    }

    /// `sendToTokens` (§4.4.2): same contract as `send`, but bypasses the
    /// registry lookup entirely — the caller supplies the raw token list.
    pub async fn send_to_tokens(
        &self,
        tokens: &[String],
        title: &str,
        body: &str,
        data: std::collections::HashMap<String, String>,
        priority: notification_common::enums::Priority,
    ) -> AdapterResult {
        if tokens.is_empty() {
            return AdapterResult::fail("no tokens");
        }
        if !self.provider.is_configured() {
            return AdapterResult::fail("push not configured");
        }

        let link = data.get("link").cloned();
        let mapping = priority_mapping(priority);
        let message = PushMessage {
            title: title.to_string(),
            body: body.to_string(),
            data,
            priority,
            require_interaction: matches!(mapping.android_priority, AndroidPriority::High),
            link,
        };

        let result = match self.provider.send_each_for_multicast(tokens, &message).await {
            Ok(r) => r,
            Err(e) => return AdapterResult::fail(e.to_string()),
        };

        for (token, per_message) in tokens.iter().zip(result.per_message.iter()) {
            if let Some(code) = per_message.error {
                if code.is_evictable() {
                    let _ = self.tokens.evict_by_token(token).await;
                }
            }
        }

        let success = result.success_count > 0;
        let external_id = result.per_message.first().and_then(|m| m.message_id.clone());
        AdapterResult {
            success,
            external_id,
            error: if result.failure_count > 0 {
                Some(format!("{} device(s) failed", result.failure_count))
            } else {
                None
            },
        }
    }
}

#[async_trait]
impl ChannelAdapter for PushAdapter {
    async fn send(&self, request: &NormalizedRequest) -> AdapterResult {
        if !self.provider.is_configured() {
            return AdapterResult::fail("push not configured");
        }

        let active_tokens = match self
            .tokens
            .active_tokens(&request.tenant_id, &request.account_id)
            .await
        {
            Ok(tokens) => tokens,
            Err(e) => return AdapterResult::fail(e.to_string()),
        };
        if active_tokens.is_empty() {
            return AdapterResult::fail("no registered devices");
        }

        let mut data = request.data.clone();
        data.insert("notificationId".to_string(), request.notification_id.clone());
        data.insert(
            "type".to_string(),
            request.notification_type.to_string(),
        );
        let link = data.get("link").cloned();
        let mapping = priority_mapping(request.priority);

        let message = PushMessage {
            title: request.title.clone(),
            body: request.body.clone(),
            data,
            priority: request.priority,
            require_interaction: matches!(mapping.android_priority, AndroidPriority::High),
            link,
        };

        let result = match self
            .provider
            .send_each_for_multicast(&active_tokens, &message)
            .await
        {
            Ok(r) => r,
            Err(e) => return AdapterResult::fail(e.to_string()),
        };

        for (token, per_message) in active_tokens.iter().zip(result.per_message.iter()) {
            if let Some(code) = per_message.error {
                if code.is_evictable() {
                    let _ = self.tokens.evict_by_token(token).await;
                }
            }
        }

        let success = result.success_count > 0;
        let external_id = result
            .per_message
            .first()
            .and_then(|m| m.message_id.clone());

        AdapterResult {
            success,
            external_id,
            error: if result.failure_count > 0 {
                Some(format!("{} device(s) failed", result.failure_count))
            } else {
                None
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;
    use notification_common::db::memory::MemoryDeviceTokenRepository;
    use notification_common::db::{DeviceToken, DeviceTokenRepository};
    use notification_common::enums::{NotificationType, Platform, Priority};

    use super::provider::{MulticastResult, PerMessageResult};
    use super::*;
    use crate::channels::push::error::{PushErrorCode, PushSendError};

    struct StubProvider {
        configured: bool,
        outcomes: Vec<PerMessageResult>,
    }

    #[async_trait]
    impl PushProvider for StubProvider {
        fn is_configured(&self) -> bool {
            self.configured
        }

        async fn send_each_for_multicast(
            &self,
            _tokens: &[String],
            _message: &PushMessage,
        ) -> Result<MulticastResult, PushSendError> {
            let success_count = self.outcomes.iter().filter(|o| o.success).count() as u32;
            let failure_count = self.outcomes.len() as u32 - success_count;
            Ok(MulticastResult {
                success_count,
                failure_count,
                per_message: self.outcomes.clone(),
            })
        }
    }

    fn req() -> NormalizedRequest {
        NormalizedRequest {
            notification_id: "n-1".to_string(),
            tenant_id: "tenant-1".to_string(),
            account_id: "account-1".to_string(),
            notification_type: NotificationType::System,
            title: "hi".to_string(),
            body: "body".to_string(),
            data: HashMap::new(),
            locale: "en".to_string(),
            priority: Priority::Normal,
            source_service: "test".to_string(),
        }
    }

    async fn register_tokens(repo: &MemoryDeviceTokenRepository, tenant: &str, account: &str, tokens: &[&str]) {
        for (i, token) in tokens.iter().enumerate() {
            repo.upsert(&DeviceToken {
                id: String::new(),
                tenant_id: tenant.to_string(),
                account_id: account.to_string(),
                token: token.to_string(),
                platform: Platform::Android,
                device_id: Some(format!("device-{i}")),
                info: HashMap::new(),
                created_at: 0,
                last_used_at: 0,
            })
            .await
            .unwrap();
        }
    }

    #[tokio::test]
    async fn reports_not_configured_without_credentials() {
        let memory = MemoryDeviceTokenRepository::default();
        let registry = Arc::new(DeviceTokenRegistry::new(Arc::new(memory)));
        let provider = Arc::new(StubProvider {
            configured: false,
            outcomes: vec![],
        });
        let adapter = PushAdapter::new(registry, provider);

        let result = adapter.send(&req()).await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("push not configured"));
    }

    #[tokio::test]
    async fn reports_no_devices_when_registry_empty() {
        let memory = MemoryDeviceTokenRepository::default();
        let registry = Arc::new(DeviceTokenRegistry::new(Arc::new(memory)));
        let provider = Arc::new(StubProvider {
            configured: true,
            outcomes: vec![],
        });
        let adapter = PushAdapter::new(registry, provider);

        let result = adapter.send(&req()).await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("no registered devices"));
    }

    #[tokio::test]
    async fn evicts_invalid_and_unregistered_tokens() {
        let memory = MemoryDeviceTokenRepository::default();
        register_tokens(&memory, "tenant-1", "account-1", &["tok-a", "tok-b", "tok-c"]).await;
        let memory: Arc<dyn DeviceTokenRepository> = Arc::new(memory);
        let registry = Arc::new(DeviceTokenRegistry::new(memory.clone()));
        let provider = Arc::new(StubProvider {
            configured: true,
            outcomes: vec![
                PerMessageResult {
                    success: true,
                    message_id: Some("msg-1".to_string()),
                    error: None,
                },
                PerMessageResult {
                    success: false,
                    message_id: None,
                    error: Some(PushErrorCode::InvalidToken),
                },
                PerMessageResult {
                    success: false,
                    message_id: None,
                    error: Some(PushErrorCode::NotRegistered),
                },
            ],
        });
        let adapter = PushAdapter::new(registry, provider);

        let result = adapter.send(&req()).await;
        assert!(result.success);
        assert_eq!(result.error.as_deref(), Some("2 device(s) failed"));

        let remaining = memory.list_for_account("tenant-1", "account-1").await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].token, "tok-a");
    }

    #[tokio::test]
    async fn send_to_tokens_rejects_empty_list_without_calling_provider() {
        let memory = MemoryDeviceTokenRepository::default();
        let registry = Arc::new(DeviceTokenRegistry::new(Arc::new(memory)));
        let provider = Arc::new(StubProvider { configured: true, outcomes: vec![] });
        let adapter = PushAdapter::new(registry, provider);

        let result = adapter
            .send_to_tokens(&[], "t", "b", HashMap::new(), Priority::Normal)
            .await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("no tokens"));
    }

    #[tokio::test]
    async fn send_to_tokens_bypasses_registry_lookup() {
        let memory = MemoryDeviceTokenRepository::default();
        let registry = Arc::new(DeviceTokenRegistry::new(Arc::new(memory)));
        let provider = Arc::new(StubProvider {
            configured: true,
            outcomes: vec![PerMessageResult {
                success: true,
                message_id: Some("msg-1".to_string()),
                error: None,
            }],
        });
        let adapter = PushAdapter::new(registry, provider);

        let result = adapter
            .send_to_tokens(&["raw-token".to_string()], "t", "b", HashMap::new(), Priority::Normal)
            .await;
        assert!(result.success);
        assert_eq!(result.external_id.as_deref(), Some("msg-1"));
    }
}
