//! In-memory repository backend. Used by integration tests and by deployments
//! that run without the `postgres` feature (e.g. a single-node dev instance).
use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::db::client::{
    DeviceToken, DeviceTokenRepository, NotificationListFilter, NotificationPage,
    NotificationRepository, PreferenceRepository, QuietHoursRepository, StoredPreferences,
};
use crate::db::error::DbResult;
use crate::enums::NotificationStatus;
use crate::notification::Notification;
use crate::quiet_hours::QuietHoursConfig;
use crate::util::ms_since_epoch;

fn key(tenant_id: &str, account_id: &str) -> String {
    format!("{tenant_id}\u{0}{account_id}")
}

#[derive(Default)]
pub struct MemoryPreferenceRepository {
    rows: Mutex<HashMap<String, StoredPreferences>>,
}

#[async_trait]
impl PreferenceRepository for MemoryPreferenceRepository {
    async fn get_preferences(
        &self,
        tenant_id: &str,
        account_id: &str,
    ) -> DbResult<Option<StoredPreferences>> {
        Ok(self.rows.lock().unwrap().get(&key(tenant_id, account_id)).cloned())
    }

    async fn update_preferences(
        &self,
        tenant_id: &str,
        account_id: &str,
        prefs: &StoredPreferences,
    ) -> DbResult<()> {
        self.rows
            .lock()
            .unwrap()
            .insert(key(tenant_id, account_id), prefs.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryQuietHoursRepository {
    rows: Mutex<HashMap<String, QuietHoursConfig>>,
}

#[async_trait]
impl QuietHoursRepository for MemoryQuietHoursRepository {
    async fn get_config(
        &self,
        tenant_id: &str,
        account_id: &str,
    ) -> DbResult<Option<QuietHoursConfig>> {
        Ok(self.rows.lock().unwrap().get(&key(tenant_id, account_id)).cloned())
    }

    async fn set_config(
        &self,
        tenant_id: &str,
        account_id: &str,
        config: &QuietHoursConfig,
    ) -> DbResult<()> {
        self.rows
            .lock()
            .unwrap()
            .insert(key(tenant_id, account_id), config.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryDeviceTokenRepository {
    rows: Mutex<Vec<DeviceToken>>,
}

#[async_trait]
impl DeviceTokenRepository for MemoryDeviceTokenRepository {
    async fn upsert(&self, token: &DeviceToken) -> DbResult<String> {
        let mut rows = self.rows.lock().unwrap();
        let existing = rows.iter_mut().find(|r| {
            if let Some(device_id) = token.device_id.as_deref().filter(|d| !d.is_empty()) {
                r.tenant_id == token.tenant_id
                    && r.account_id == token.account_id
                    && r.device_id.as_deref() == Some(device_id)
            } else {
                r.token == token.token
            }
        });
        if let Some(row) = existing {
            row.token = token.token.clone();
            row.platform = token.platform;
            row.info = token.info.clone();
            row.last_used_at = ms_since_epoch();
            return Ok(row.id.clone());
        }
        let mut new_row = token.clone();
        if new_row.id.is_empty() {
            new_row.id = Uuid::new_v4().to_string();
        }
        new_row.last_used_at = ms_since_epoch();
        let id = new_row.id.clone();
        rows.push(new_row);
        Ok(id)
    }

    async fn unregister(&self, tenant_id: &str, account_id: &str, token: &str) -> DbResult<bool> {
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|r| {
            !(r.tenant_id == tenant_id && r.account_id == account_id && r.token == token)
        });
        Ok(rows.len() != before)
    }

    async fn list_for_account(
        &self,
        tenant_id: &str,
        account_id: &str,
    ) -> DbResult<Vec<DeviceToken>> {
        let mut out: Vec<DeviceToken> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.tenant_id == tenant_id && r.account_id == account_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.last_used_at.cmp(&a.last_used_at));
        Ok(out)
    }

    async fn active_tokens(&self, tenant_id: &str, account_id: &str) -> DbResult<Vec<String>> {
        Ok(self
            .list_for_account(tenant_id, account_id)
            .await?
            .into_iter()
            .map(|r| r.token)
            .collect())
    }

    async fn evict_by_token(&self, token: &str) -> DbResult<()> {
        self.rows.lock().unwrap().retain(|r| r.token != token);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryNotificationRepository {
    rows: Mutex<Vec<Notification>>,
}

#[async_trait]
impl NotificationRepository for MemoryNotificationRepository {
    async fn insert(&self, notification: &Notification) -> DbResult<()> {
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|n| n.id == notification.id) {
            // `id` is the only serialization point for idempotent sends
            // (§5): the loser of a concurrent insert race must see this and
            // fall back to reading the winner's row.
            return Err(crate::db::error::DbError::Conditional);
        }
        rows.push(notification.clone());
        Ok(())
    }

    async fn find_by_id(&self, notification_id: &str) -> DbResult<Option<Notification>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|n| n.id == notification_id)
            .cloned())
    }

    async fn update_status(
        &self,
        notification_id: &str,
        status: NotificationStatus,
        external_id: Option<String>,
        error: Option<String>,
    ) -> DbResult<()> {
        if let Some(row) = self
            .rows
            .lock()
            .unwrap()
            .iter_mut()
            .find(|n| n.id == notification_id)
        {
            row.apply_status(status, external_id, error);
        }
        Ok(())
    }

    async fn list_for_account(
        &self,
        tenant_id: &str,
        account_id: &str,
        filter: &NotificationListFilter,
    ) -> DbResult<NotificationPage> {
        let rows = self.rows.lock().unwrap();
        let unread_count = rows
            .iter()
            .filter(|n| n.tenant_id == tenant_id && n.account_id == account_id && n.read_at.is_none())
            .count() as u64;

        let mut matching: Vec<Notification> = rows
            .iter()
            .filter(|n| n.tenant_id == tenant_id && n.account_id == account_id)
            .filter(|n| filter.channel.map_or(true, |c| n.channel == c))
            .filter(|n| !filter.unread_only || n.read_at.is_none())
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total_count = matching.len() as u64;
        let page = if filter.page == 0 { 1 } else { filter.page };
        let page_size = if filter.page_size == 0 { 20 } else { filter.page_size };
        let skip = ((page - 1) as usize) * (page_size as usize);
        let items = matching.into_iter().skip(skip).take(page_size as usize).collect();

        Ok(NotificationPage {
            items,
            total_count,
            unread_count,
        })
    }

    async fn mark_as_read(
        &self,
        tenant_id: &str,
        account_id: &str,
        ids: &[String],
    ) -> DbResult<u64> {
        let mut updated = 0u64;
        let mut rows = self.rows.lock().unwrap();
        for row in rows.iter_mut() {
            if row.tenant_id == tenant_id
                && row.account_id == account_id
                && row.read_at.is_none()
                && ids.contains(&row.id)
            {
                row.mark_read();
                updated += 1;
            }
        }
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::{Channel, Platform};

    fn token(tenant: &str, account: &str, raw: &str) -> DeviceToken {
        DeviceToken {
            id: String::new(),
            tenant_id: tenant.to_string(),
            account_id: account.to_string(),
            token: raw.to_string(),
            platform: Platform::Ios,
            device_id: None,
            info: Default::default(),
            created_at: ms_since_epoch(),
            last_used_at: ms_since_epoch(),
        }
    }

    #[tokio::test]
    async fn device_token_upsert_by_raw_token_without_device_id() {
        let repo = MemoryDeviceTokenRepository::default();
        let id1 = repo.upsert(&token("t1", "a1", "tok-a")).await.unwrap();
        let mut second = token("t1", "a1", "tok-a");
        second.platform = Platform::Android;
        let id2 = repo.upsert(&second).await.unwrap();
        assert_eq!(id1, id2);
        let rows = repo.list_for_account("t1", "a1").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].platform, Platform::Android);
    }

    #[tokio::test]
    async fn device_token_upsert_by_device_id_overwrites_token() {
        let repo = MemoryDeviceTokenRepository::default();
        let mut first = token("t1", "a1", "tok-a");
        first.device_id = Some("dev-1".into());
        repo.upsert(&first).await.unwrap();

        let mut second = token("t1", "a1", "tok-b");
        second.device_id = Some("dev-1".into());
        repo.upsert(&second).await.unwrap();

        let rows = repo.list_for_account("t1", "a1").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].token, "tok-b");
    }

    #[tokio::test]
    async fn evict_by_token_removes_across_tenants() {
        let repo = MemoryDeviceTokenRepository::default();
        repo.upsert(&token("t1", "a1", "shared")).await.unwrap();
        repo.upsert(&token("t2", "a2", "shared")).await.unwrap();
        repo.evict_by_token("shared").await.unwrap();
        assert!(repo.list_for_account("t1", "a1").await.unwrap().is_empty());
        assert!(repo.list_for_account("t2", "a2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn mark_as_read_only_touches_unread_owned_rows() {
        use crate::notification::NormalizedRequest;
        let repo = MemoryNotificationRepository::default();
        let req = NormalizedRequest {
            notification_id: "n1".into(),
            tenant_id: "t1".into(),
            account_id: "a1".into(),
            notification_type: crate::enums::NotificationType::System,
            title: "hi".into(),
            body: "b".into(),
            data: Default::default(),
            locale: "en".into(),
            priority: crate::enums::Priority::Normal,
            source_service: "svc".into(),
        };
        let n = Notification::new("n1".into(), &req, Channel::InApp);
        repo.insert(&n).await.unwrap();

        let updated = repo
            .mark_as_read("t1", "a1", &["n1".to_string(), "missing".to_string()])
            .await
            .unwrap();
        assert_eq!(updated, 1);

        let again = repo.mark_as_read("t1", "a1", &["n1".to_string()]).await.unwrap();
        assert_eq!(again, 0);
    }
}
