//! `DeviceTokenRegistry` (§4.3): push-token bookkeeping shared by the push
//! adapter and the device-registration RPCs.
use std::collections::HashMap;
use std::sync::Arc;

use crate::db::client::{DeviceToken, DeviceTokenRepository};
use crate::db::error::DbResult;
use crate::enums::Platform;
use crate::util::ms_since_epoch;

pub struct DeviceTokenRegistry {
    repo: Arc<dyn DeviceTokenRepository>,
}

impl DeviceTokenRegistry {
    pub fn new(repo: Arc<dyn DeviceTokenRepository>) -> Self {
        DeviceTokenRegistry { repo }
    }

    /// Upsert keyed on `(tenant, account, deviceId)` when `deviceId` is
    /// non-empty, else on `token`. Returns the stable row id (§4.3
    /// `register`).
    pub async fn register(
        &self,
        tenant_id: &str,
        account_id: &str,
        token: &str,
        platform: Platform,
        device_id: Option<String>,
        info: Option<HashMap<String, String>>,
    ) -> DbResult<String> {
        let now = ms_since_epoch();
        self.repo
            .upsert(&DeviceToken {
                id: String::new(),
                tenant_id: tenant_id.to_owned(),
                account_id: account_id.to_owned(),
                token: token.to_owned(),
                platform,
                device_id,
                info: info.unwrap_or_default(),
                created_at: now,
                last_used_at: now,
            })
            .await
    }

    pub async fn unregister(&self, tenant_id: &str, account_id: &str, token: &str) -> DbResult<bool> {
        self.repo.unregister(tenant_id, account_id, token).await
    }

    /// Ordered by `lastUsedAt desc` (§4.3 `listForAccount`).
    pub async fn list_for_account(&self, tenant_id: &str, account_id: &str) -> DbResult<Vec<DeviceToken>> {
        self.repo.list_for_account(tenant_id, account_id).await
    }

    pub async fn active_tokens(&self, tenant_id: &str, account_id: &str) -> DbResult<Vec<String>> {
        self.repo.active_tokens(tenant_id, account_id).await
    }

    /// Remediation path driven by the push provider's "not registered" /
    /// "invalid" signals; removes the token across every tenant (§4.3).
    pub async fn evict_by_token(&self, token: &str) -> DbResult<()> {
        self.repo.evict_by_token(token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryDeviceTokenRepository;

    fn registry() -> DeviceTokenRegistry {
        DeviceTokenRegistry::new(Arc::new(MemoryDeviceTokenRepository::default()))
    }

    #[tokio::test]
    async fn register_without_device_id_upserts_by_token() {
        let reg = registry();
        let id1 = reg
            .register("t1", "a1", "tok", Platform::Ios, None, None)
            .await
            .unwrap();
        let id2 = reg
            .register("t1", "a1", "tok", Platform::Android, None, None)
            .await
            .unwrap();
        assert_eq!(id1, id2);
        let rows = reg.list_for_account("t1", "a1").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].platform, Platform::Android);
    }

    #[tokio::test]
    async fn unregister_reports_whether_a_row_existed() {
        let reg = registry();
        reg.register("t1", "a1", "tok", Platform::Web, None, None)
            .await
            .unwrap();
        assert!(reg.unregister("t1", "a1", "tok").await.unwrap());
        assert!(!reg.unregister("t1", "a1", "tok").await.unwrap());
    }

    #[tokio::test]
    async fn active_tokens_returns_raw_strings_for_push_adapter() {
        let reg = registry();
        reg.register("t1", "a1", "tok-1", Platform::Ios, None, None)
            .await
            .unwrap();
        reg.register("t1", "a1", "tok-2", Platform::Android, None, None)
            .await
            .unwrap();
        let mut tokens = reg.active_tokens("t1", "a1").await.unwrap();
        tokens.sort();
        assert_eq!(tokens, vec!["tok-1".to_string(), "tok-2".to_string()]);
    }
}
