//! HTTP-backed `PushProvider`, modeled on FCM's HTTP v1 API: one POST per
//! token (mirroring what `sendEachForMulticast` does internally), joined
//! into a single `MulticastResult`.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use reqwest::StatusCode;
use serde::Deserialize;
use url::Url;

use super::error::{PushErrorCode, PushSendError};
use super::provider::{
    priority_mapping, AndroidChannel, AndroidPriority, MulticastResult, PerMessageResult,
    PushMessage, PushProvider,
};

/// One configured project's send credential, read from the JSON blob in
/// `PushSettings::credentials`.
#[derive(Debug, Clone, Deserialize)]
pub struct FcmCredential {
    pub project_id: String,
    pub access_token: String,
}

pub struct FcmHttpProvider {
    base_url: Url,
    credential: Option<FcmCredential>,
    http: reqwest::Client,
    timeout: Duration,
}

impl FcmHttpProvider {
    pub fn new(base_url: Url, credentials_json: &str, http: reqwest::Client) -> Self {
        let credential = Self::first_credential(credentials_json);
        FcmHttpProvider {
            base_url,
            credential,
            http,
            timeout: Duration::from_secs(5),
        }
    }

    fn first_credential(credentials_json: &str) -> Option<FcmCredential> {
        let parsed: HashMap<String, FcmCredential> =
            serde_json::from_str(credentials_json).ok()?;
        parsed.into_values().next()
    }

    fn endpoint(&self, project_id: &str) -> Url {
        self.base_url
            .join(&format!("v1/projects/{project_id}/messages:send"))
            .expect("project id is not URL-safe")
    }

    fn android_priority_str(priority: AndroidPriority) -> &'static str {
        match priority {
            AndroidPriority::High => "high",
            AndroidPriority::Normal => "normal",
        }
    }

    fn android_channel_str(channel: AndroidChannel) -> &'static str {
        match channel {
            AndroidChannel::Urgent => "urgent",
            AndroidChannel::High => "high",
            AndroidChannel::Default => "default",
        }
    }

    async fn send_one(
        &self,
        credential: &FcmCredential,
        token: &str,
        message: &PushMessage,
    ) -> PerMessageResult {
        let mapping = priority_mapping(message.priority);
        let mut data = message.data.clone();
        if let Some(link) = &message.link {
            data.insert("link".to_string(), link.clone());
        }

        let body = serde_json::json!({
            "message": {
                "token": token,
                "notification": { "title": message.title, "body": message.body },
                "data": data,
                "android": {
                    "priority": Self::android_priority_str(mapping.android_priority),
                    "notification": { "channel_id": Self::android_channel_str(mapping.android_channel) },
                },
                "apns": {
                    "headers": { "apns-priority": mapping.apns_priority.to_string() },
                    "payload": { "aps": { "content-available": 1 } },
                },
                "webpush": { "headers": { "Urgency": if message.require_interaction { "high" } else { "normal" } } },
            }
        });

        let response = match self
            .http
            .post(self.endpoint(&credential.project_id))
            .bearer_auth(&credential.access_token)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
        {
            Ok(r) => r,
            Err(_) => {
                return PerMessageResult {
                    success: false,
                    message_id: None,
                    error: Some(PushErrorCode::Transient),
                }
            }
        };

        match response.status() {
            StatusCode::OK => {
                #[derive(Deserialize)]
                struct SendResponse {
                    name: Option<String>,
                }
                let parsed = response.json::<SendResponse>().await.ok();
                PerMessageResult {
                    success: true,
                    message_id: parsed.and_then(|r| r.name),
                    error: None,
                }
            }
            StatusCode::NOT_FOUND | StatusCode::GONE => PerMessageResult {
                success: false,
                message_id: None,
                error: Some(PushErrorCode::NotRegistered),
            },
            StatusCode::BAD_REQUEST => PerMessageResult {
                success: false,
                message_id: None,
                error: Some(PushErrorCode::InvalidToken),
            },
            StatusCode::TOO_MANY_REQUESTS => PerMessageResult {
                success: false,
                message_id: None,
                error: Some(PushErrorCode::RateLimited),
            },
            status if status.is_server_error() => PerMessageResult {
                success: false,
                message_id: None,
                error: Some(PushErrorCode::Transient),
            },
            _ => PerMessageResult {
                success: false,
                message_id: None,
                error: Some(PushErrorCode::Fatal),
            },
        }
    }
}

#[async_trait]
impl PushProvider for FcmHttpProvider {
    fn is_configured(&self) -> bool {
        self.credential.is_some()
    }

    async fn send_each_for_multicast(
        &self,
        tokens: &[String],
        message: &PushMessage,
    ) -> Result<MulticastResult, PushSendError> {
        let credential = self
            .credential
            .as_ref()
            .ok_or_else(|| PushSendError::BadResponse("no credential configured".to_string()))?;

        let per_message: Vec<PerMessageResult> = join_all(
            tokens
                .iter()
                .map(|token| self.send_one(credential, token, message)),
        )
        .await;

        let success_count = per_message.iter().filter(|r| r.success).count() as u32;
        let failure_count = per_message.len() as u32 - success_count;

        Ok(MulticastResult {
            success_count,
            failure_count,
            per_message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uses_first_configured_credential() {
        let json = r#"{"dev":{"project_id":"dev-project","access_token":"tok"}}"#;
        let provider =
            FcmHttpProvider::new(Url::parse("https://fcm.googleapis.com").unwrap(), json, reqwest::Client::new());
        assert!(provider.is_configured());
    }

    #[test]
    fn unconfigured_without_credentials() {
        let provider = FcmHttpProvider::new(
            Url::parse("https://fcm.googleapis.com").unwrap(),
            "{}",
            reqwest::Client::new(),
        );
        assert!(!provider.is_configured());
    }
}
