//! `PreferenceStore` (§4.2): per-account channel/type preferences, with
//! fail-open reads and fail-closed writes (Design Note 2).
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::db::client::{PreferenceRepository, StoredPreferences};
use crate::db::error::DbResult;
use crate::enums::{Channel, NotificationType};
use crate::errors::Fallback;

/// `(channelPrefs, typePrefs)` as returned by `getPreferences` (§4.2).
#[derive(Debug, Clone)]
pub struct Preferences {
    pub channels: HashMap<Channel, bool>,
    pub types: HashMap<NotificationType, HashSet<Channel>>,
}

impl Preferences {
    /// "All four channels enabled; `system`, `security_alert`, `login_alert`
    /// → `{in_app, push, email}`; `marketing` → `{email}`" (§4.2).
    fn defaults() -> Self {
        let mut channels = HashMap::new();
        for c in Channel::ALL {
            channels.insert(c, true);
        }

        let security_set: HashSet<Channel> =
            [Channel::InApp, Channel::Push, Channel::Email].into_iter().collect();
        let marketing_set: HashSet<Channel> = [Channel::Email].into_iter().collect();

        let mut types = HashMap::new();
        types.insert(NotificationType::System, security_set.clone());
        types.insert(NotificationType::SecurityAlert, security_set.clone());
        types.insert(NotificationType::LoginAlert, security_set);
        types.insert(NotificationType::Marketing, marketing_set);

        Preferences { channels, types }
    }

    /// Entries absent from a stored row fall back to the default per-channel
    /// via the accessor methods below (`unwrap_or(true)`), so no merging is
    /// needed here beyond carrying the stored maps through as-is.
    fn from_stored(stored: StoredPreferences) -> Self {
        Preferences {
            channels: stored.channels,
            types: stored.types,
        }
    }
}

pub struct PreferenceStore {
    repo: Arc<dyn PreferenceRepository>,
}

impl PreferenceStore {
    pub fn new(repo: Arc<dyn PreferenceRepository>) -> Self {
        PreferenceStore { repo }
    }

    /// Fail-open: a storage error yields the defaults, flagged via
    /// `Fallback::fallback_used` (Design Note 2).
    pub async fn get_preferences(&self, tenant_id: &str, account_id: &str) -> Fallback<Preferences> {
        match self.repo.get_preferences(tenant_id, account_id).await {
            Ok(Some(stored)) => Fallback::ok(Preferences::from_stored(stored)),
            Ok(None) => Fallback::ok(Preferences::defaults()),
            Err(_) => Fallback::fallback(Preferences::defaults()),
        }
    }

    /// Atomic upsert of both maps; failure leaves prior state untouched
    /// (§4.2) because the repository performs the write inside one
    /// transaction.
    pub async fn update_preferences(
        &self,
        tenant_id: &str,
        account_id: &str,
        channels: HashMap<Channel, bool>,
        types: HashMap<NotificationType, HashSet<Channel>>,
    ) -> DbResult<()> {
        self.repo
            .update_preferences(tenant_id, account_id, &StoredPreferences { channels, types })
            .await
    }

    pub async fn is_channel_enabled(&self, tenant_id: &str, account_id: &str, channel: Channel) -> bool {
        let prefs = self.get_preferences(tenant_id, account_id).await.into_inner();
        prefs.channels.get(&channel).copied().unwrap_or(true)
    }

    /// "Missing row ⇒ `true` unless `type == marketing` (then `false`)" (§4.2).
    pub async fn is_type_enabled_for_channel(
        &self,
        tenant_id: &str,
        account_id: &str,
        notification_type: NotificationType,
        channel: Channel,
    ) -> bool {
        let prefs = self.get_preferences(tenant_id, account_id).await.into_inner();
        match prefs.types.get(&notification_type) {
            Some(enabled) => enabled.contains(&channel),
            None => notification_type != NotificationType::Marketing,
        }
    }

    /// `requested ∩ {channels enabled per channelPrefs} ∩ {channels in
    /// typePrefs.enabledChannels}`, preserving the ordering of `requested`
    /// (§4.2).
    pub async fn enabled_channels_for_type(
        &self,
        tenant_id: &str,
        account_id: &str,
        notification_type: NotificationType,
        requested: &[Channel],
    ) -> Vec<Channel> {
        let prefs = self.get_preferences(tenant_id, account_id).await.into_inner();
        let type_allows = |c: &Channel| match prefs.types.get(&notification_type) {
            Some(enabled) => enabled.contains(c),
            None => notification_type != NotificationType::Marketing,
        };

        requested
            .iter()
            .copied()
            .filter(|c| prefs.channels.get(c).copied().unwrap_or(true))
            .filter(type_allows)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryPreferenceRepository;

    fn store() -> PreferenceStore {
        PreferenceStore::new(Arc::new(MemoryPreferenceRepository::default()))
    }

    #[tokio::test]
    async fn defaults_match_spec_table() {
        let store = store();
        let prefs = store.get_preferences("t1", "a1").await.into_inner();
        for c in Channel::ALL {
            assert!(prefs.channels[&c]);
        }
        assert_eq!(
            prefs.types[&NotificationType::System],
            [Channel::InApp, Channel::Push, Channel::Email].into_iter().collect()
        );
        assert_eq!(
            prefs.types[&NotificationType::Marketing],
            [Channel::Email].into_iter().collect()
        );
    }

    #[tokio::test]
    async fn missing_type_row_defaults_to_enabled_except_marketing() {
        let store = store();
        assert!(
            store
                .is_type_enabled_for_channel("t1", "a1", NotificationType::AdminInvite, Channel::Sms)
                .await
        );
        assert!(
            !store
                .is_type_enabled_for_channel("t1", "a1", NotificationType::Marketing, Channel::Sms)
                .await
        );
    }

    #[tokio::test]
    async fn enabled_channels_preserves_requested_order() {
        let store = store();
        store
            .update_preferences(
                "t1",
                "a1",
                [(Channel::Sms, true), (Channel::Push, true), (Channel::InApp, true), (Channel::Email, true)]
                    .into_iter()
                    .collect(),
                [(
                    NotificationType::System,
                    [Channel::Sms, Channel::InApp].into_iter().collect(),
                )]
                .into_iter()
                .collect(),
            )
            .await
            .unwrap();

        let requested = vec![Channel::Email, Channel::InApp, Channel::Sms, Channel::Push];
        let enabled = store
            .enabled_channels_for_type("t1", "a1", NotificationType::System, &requested)
            .await;
        assert_eq!(enabled, vec![Channel::InApp, Channel::Sms]);
    }

    #[tokio::test]
    async fn disabled_channel_is_excluded_regardless_of_type_prefs() {
        let store = store();
        store
            .update_preferences(
                "t1",
                "a1",
                [(Channel::Push, false)].into_iter().collect(),
                HashMap::new(),
            )
            .await
            .unwrap();
        let enabled = store
            .enabled_channels_for_type("t1", "a1", NotificationType::System, &[Channel::Push])
            .await;
        assert!(enabled.is_empty());
    }
}
