//! Canonical string/enum conversion tables.
//!
//! The teacher's routers each hand-rolled their own string<->enum mappings
//! for platform/priority/status. Design Note 3 calls for centralizing those
//! once; this module is that one place for every enum in the dispatch
//! pipeline (channel, notification type, status, priority, device platform).

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    InApp,
    Push,
    Sms,
    Email,
}

impl Channel {
    pub const ALL: [Channel; 4] = [Channel::InApp, Channel::Push, Channel::Sms, Channel::Email];
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    System,
    AdminInvite,
    PartnerInvite,
    PasswordReset,
    SecurityAlert,
    MfaCode,
    AccountLocked,
    LoginAlert,
    Marketing,
}

impl NotificationType {
    /// `type ∈ {security_alert, mfa_code, account_locked, login_alert,
    /// password_reset}` per §4.7 — fires exactly one audit event after
    /// dispatch.
    pub fn is_security_classified(&self) -> bool {
        matches!(
            self,
            NotificationType::SecurityAlert
                | NotificationType::MfaCode
                | NotificationType::AccountLocked
                | NotificationType::LoginAlert
                | NotificationType::PasswordReset
        )
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Normal,
    High,
    Urgent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    Pending,
    Sent,
    Delivered,
    Failed,
    Read,
    /// Used by `GetNotificationStatus` when the id is unknown (§4.6).
    Unspecified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Ios,
    Android,
    Web,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn channel_round_trips_through_snake_case() {
        for c in Channel::ALL {
            let s = c.to_string();
            assert_eq!(Channel::from_str(&s).unwrap(), c);
        }
        assert_eq!(Channel::InApp.to_string(), "in_app");
    }

    #[test]
    fn security_classification_matches_spec_table() {
        assert!(NotificationType::SecurityAlert.is_security_classified());
        assert!(NotificationType::MfaCode.is_security_classified());
        assert!(NotificationType::AccountLocked.is_security_classified());
        assert!(NotificationType::LoginAlert.is_security_classified());
        assert!(NotificationType::PasswordReset.is_security_classified());
        assert!(!NotificationType::System.is_security_classified());
        assert!(!NotificationType::Marketing.is_security_classified());
        assert!(!NotificationType::AdminInvite.is_security_classified());
        assert!(!NotificationType::PartnerInvite.is_security_classified());
    }

    #[test]
    fn priority_ordering_is_ascending() {
        assert!(Priority::Low < Priority::Normal);
        assert!(Priority::Normal < Priority::High);
        assert!(Priority::High < Priority::Urgent);
    }
}
