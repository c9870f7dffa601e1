//! `ChannelRouter` (§4.5): combines `PreferenceStore` and `QuietHoursEngine`
//! to compute the effective channel set, then fans out to the adapters.

use std::sync::Arc;

use futures::future::join_all;
use notification_common::enums::{Channel, NotificationType, Priority};
use notification_common::notification::{AdapterResult, NormalizedRequest};
use notification_common::preferences::PreferenceStore;
use notification_common::quiet_hours::is_in_quiet_hours;
use notification_common::db::QuietHoursRepository;
use notification_common::util::ms_since_epoch;

use crate::channels::AdapterRegistry;

pub struct ChannelRouter {
    preferences: Arc<PreferenceStore>,
    quiet_hours: Arc<dyn QuietHoursRepository>,
    adapters: AdapterRegistry,
}

impl ChannelRouter {
    pub fn new(
        preferences: Arc<PreferenceStore>,
        quiet_hours: Arc<dyn QuietHoursRepository>,
        adapters: AdapterRegistry,
    ) -> Self {
        ChannelRouter {
            preferences,
            quiet_hours,
            adapters,
        }
    }

    /// `recommendedChannels(type, priority)` (§4.5).
    pub fn recommended_channels(notification_type: NotificationType, priority: Priority) -> Vec<Channel> {
        if priority >= Priority::High {
            return vec![Channel::InApp, Channel::Push, Channel::Email];
        }
        if matches!(
            notification_type,
            NotificationType::SecurityAlert
                | NotificationType::MfaCode
                | NotificationType::AccountLocked
                | NotificationType::LoginAlert
                | NotificationType::PasswordReset
        ) {
            return vec![Channel::InApp, Channel::Push, Channel::Email];
        }
        if notification_type == NotificationType::Marketing {
            return vec![Channel::Email];
        }
        vec![Channel::InApp, Channel::Email]
    }

    /// The 5-step algorithm in §4.5.
    pub async fn route(
        &self,
        request: &NormalizedRequest,
        requested_channels: &[Channel],
    ) -> Vec<(Channel, AdapterResult)> {
        let enabled = self
            .preferences
            .enabled_channels_for_type(
                &request.tenant_id,
                &request.account_id,
                request.notification_type,
                requested_channels,
            )
            .await;
        if enabled.is_empty() {
            return vec![];
        }

        if request.priority != Priority::Urgent {
            let config = self
                .quiet_hours
                .get_config(&request.tenant_id, &request.account_id)
                .await
                .ok()
                .flatten()
                .unwrap_or_default();
            let suppressed = is_in_quiet_hours(&config, ms_since_epoch() as i64);
            if suppressed {
                return if enabled.contains(&Channel::InApp) {
                    vec![(Channel::InApp, self.send_to_channel(Channel::InApp, request).await)]
                } else {
                    vec![]
                };
            }
        }

        let sends = enabled.iter().map(|channel| {
            let channel = *channel;
            async move { (channel, self.send_to_channel(channel, request).await) }
        });
        join_all(sends).await
    }

    /// Direct dispatch bypassing policy, used only by the audit-exempt
    /// broadcast path (§4.5 `sendToChannel`).
    pub async fn send_to_channel(&self, channel: Channel, request: &NormalizedRequest) -> AdapterResult {
        match self.adapters.get(channel) {
            Some(adapter) => adapter.send(request).await,
            None => AdapterResult::fail(format!("no adapter configured for {channel}")),
        }
    }

    /// Used by the `sendToAllChannels` audit-exempt path (§4.5): sends to
    /// every requested channel directly, without preference or quiet-hours
    /// filtering.
    pub async fn send_to_all_channels(
        &self,
        request: &NormalizedRequest,
        channels: &[Channel],
    ) -> Vec<(Channel, AdapterResult)> {
        let sends = channels.iter().map(|channel| {
            let channel = *channel;
            async move { (channel, self.send_to_channel(channel, request).await) }
        });
        join_all(sends).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use notification_common::db::memory::{MemoryPreferenceRepository, MemoryQuietHoursRepository};
    use notification_common::quiet_hours::QuietHoursConfig;

    use super::*;
    use crate::channels::ChannelAdapter;
    use async_trait::async_trait;

    struct RecordingAdapter {
        result: AdapterResult,
    }

    #[async_trait]
    impl ChannelAdapter for RecordingAdapter {
        async fn send(&self, _request: &NormalizedRequest) -> AdapterResult {
            self.result.clone()
        }
    }

    fn req(notification_type: NotificationType, priority: Priority) -> NormalizedRequest {
        NormalizedRequest {
            notification_id: "n-1".to_string(),
            tenant_id: "t1".to_string(),
            account_id: "a1".to_string(),
            notification_type,
            title: "hi".to_string(),
            body: "body".to_string(),
            data: HashMap::new(),
            locale: "en".to_string(),
            priority,
            source_service: "test".to_string(),
        }
    }

    fn router(adapters: AdapterRegistry, quiet_hours: Arc<dyn QuietHoursRepository>) -> ChannelRouter {
        let preferences = Arc::new(PreferenceStore::new(Arc::new(
            MemoryPreferenceRepository::default(),
        )));
        ChannelRouter::new(preferences, quiet_hours, adapters)
    }

    #[tokio::test]
    async fn marketing_with_no_type_preference_only_reaches_email() {
        let adapters = AdapterRegistry::new()
            .with(Channel::Email, Arc::new(RecordingAdapter { result: AdapterResult::ok("e1") }))
            .with(Channel::InApp, Arc::new(RecordingAdapter { result: AdapterResult::ok("i1") }))
            .with(Channel::Push, Arc::new(RecordingAdapter { result: AdapterResult::ok("p1") }));
        let quiet_hours = Arc::new(MemoryQuietHoursRepository::default());
        let router = router(adapters, quiet_hours);

        let results = router
            .route(
                &req(NotificationType::Marketing, Priority::Normal),
                &[Channel::InApp, Channel::Push, Channel::Email],
            )
            .await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, Channel::Email);
    }

    #[tokio::test]
    async fn urgent_priority_bypasses_quiet_hours() {
        let adapters = AdapterRegistry::new()
            .with(Channel::Push, Arc::new(RecordingAdapter { result: AdapterResult::ok("p1") }))
            .with(Channel::Email, Arc::new(RecordingAdapter { result: AdapterResult::ok("e1") }));
        let quiet_hours_repo = MemoryQuietHoursRepository::default();
        quiet_hours_repo
            .set_config(
                "t1",
                "a1",
                &QuietHoursConfig {
                    enabled: true,
                    start_time: "00:00".to_string(),
                    end_time: "23:59".to_string(),
                    timezone: "UTC".to_string(),
                },
            )
            .await
            .unwrap();
        let router = router(adapters, Arc::new(quiet_hours_repo));

        let results = router
            .route(
                &req(NotificationType::SecurityAlert, Priority::Urgent),
                &[Channel::Push, Channel::Email],
            )
            .await;

        assert_eq!(results.len(), 2);
    }

    #[test]
    fn recommended_channels_matches_spec_table() {
        assert_eq!(
            ChannelRouter::recommended_channels(NotificationType::System, Priority::High),
            vec![Channel::InApp, Channel::Push, Channel::Email]
        );
        assert_eq!(
            ChannelRouter::recommended_channels(NotificationType::SecurityAlert, Priority::Low),
            vec![Channel::InApp, Channel::Push, Channel::Email]
        );
        assert_eq!(
            ChannelRouter::recommended_channels(NotificationType::Marketing, Priority::Low),
            vec![Channel::Email]
        );
        assert_eq!(
            ChannelRouter::recommended_channels(NotificationType::System, Priority::Low),
            vec![Channel::InApp, Channel::Email]
        );
    }
}
