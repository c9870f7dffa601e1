//! The provider-agnostic error taxonomy Design Note 3/4 calls for: the
//! source's push adapter only knew "invalid token" through the FCM SDK's own
//! error codes, which made eviction logic provider-specific. Every
//! `PushProvider` implementation must translate its own wire errors into
//! this enum so the adapter's eviction logic stays provider-agnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushErrorCode {
    InvalidToken,
    NotRegistered,
    RateLimited,
    Transient,
    Fatal,
}

impl PushErrorCode {
    /// Per-message failures with these codes cause
    /// `DeviceTokenRegistry::evict_by_token` to run (§4.4.2).
    pub fn is_evictable(&self) -> bool {
        matches!(self, PushErrorCode::InvalidToken | PushErrorCode::NotRegistered)
    }
}

/// Transport-level failure of the batch multicast call itself (distinct from
/// a per-message failure, which is carried in `MulticastResult`).
#[derive(Debug, thiserror::Error)]
pub enum PushSendError {
    #[error("push provider request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("push provider returned an unexpected response: {0}")]
    BadResponse(String),
}
