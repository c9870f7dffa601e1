//! Small time helper shared by every entity that stamps `createdAt`/`sentAt`/etc.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

/// Milliseconds since the Unix epoch, used for every `*At` timestamp field.
pub fn ms_since_epoch() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before the Unix epoch")
        .as_millis() as u64
}

/// Wire-level encoding of an optional timestamp as a seconds-since-epoch
/// tuple, resolving `GetNotificationStatus`'s "seconds-since-epoch tuples"
/// wording (§6; see SPEC_FULL.md Supplemented Features): an absent
/// timestamp serializes as `{present: false, value: 0}`, distinct from an
/// epoch-zero timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EpochSeconds {
    pub present: bool,
    pub value: u64,
}

impl From<Option<u64>> for EpochSeconds {
    /// `ms` is milliseconds-since-epoch, the internal storage unit; this
    /// converts to whole seconds for the wire.
    fn from(ms: Option<u64>) -> Self {
        match ms {
            Some(ms) => EpochSeconds { present: true, value: ms / 1000 },
            None => EpochSeconds { present: false, value: 0 },
        }
    }
}
