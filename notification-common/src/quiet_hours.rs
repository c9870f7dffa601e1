//! `QuietHoursEngine` (§4.1) — a pure temporal predicate over an account's
//! configured quiet window. No I/O, no storage: this is the component Design
//! Note 1 calls out as unit-testable without any storage.

use chrono::{NaiveTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::errors::{ApiErrorKind, ApiResult};

/// `(tenantId, accountId) -> { enabled, startTime, endTime, timezone }` (§3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuietHoursConfig {
    pub enabled: bool,
    pub start_time: String,
    pub end_time: String,
    pub timezone: String,
}

impl Default for QuietHoursConfig {
    /// "Disabled with default window 22:00-08:00 UTC" (§3, absence case).
    fn default() -> Self {
        QuietHoursConfig {
            enabled: false,
            start_time: crate::DEFAULT_QUIET_HOURS_START.to_string(),
            end_time: crate::DEFAULT_QUIET_HOURS_END.to_string(),
            timezone: crate::DEFAULT_QUIET_HOURS_TZ.to_string(),
        }
    }
}

/// Parse `HH:MM` into minutes-since-midnight. Malformed input is a
/// programmer/caller error, rejected at parse time (§4.1 failure semantics).
fn parse_hhmm(s: &str) -> ApiResult<u32> {
    let time = NaiveTime::parse_from_str(s, "%H:%M")
        .map_err(|_| ApiErrorKind::InvalidTimeOfDay(s.to_string()))?;
    Ok(time.hour() * 60 + time.minute())
}

/// Regex-shaped validation used by the `UpdateQuietHours` RPC (§6):
/// `/^([01]?\d|2[0-3]):[0-5]\d$/`. `NaiveTime::parse_from_str` alone accepts
/// single-digit minutes (`"9:5"` -> `09:05`), which is looser than the
/// documented shape, so the minute field's width is checked explicitly.
pub fn is_valid_time_of_day(s: &str) -> bool {
    let Some((hour, minute)) = s.split_once(':') else {
        return false;
    };
    if hour.is_empty() || hour.len() > 2 || !hour.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    if minute.len() != 2 || !minute.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    parse_hhmm(s).is_ok()
}

/// Uses the platform's IANA timezone database (§4.1 `isValidTimezone`).
pub fn is_valid_timezone(name: &str) -> bool {
    name.parse::<Tz>().is_ok()
}

fn resolve_tz(name: &str) -> Tz {
    // Invalid timezone falls back to UTC for evaluation (§4.1 edge cases);
    // administrative writes must still reject it via `is_valid_timezone`.
    name.parse::<Tz>().unwrap_or(chrono_tz::UTC)
}

/// Decide whether `at_instant` (a Unix millisecond timestamp) falls inside
/// the configured quiet window, evaluated in `config.timezone`.
pub fn is_in_quiet_hours(config: &QuietHoursConfig, at_instant_ms: i64) -> bool {
    if !config.enabled {
        return false;
    }
    let (start, end) = match (parse_hhmm(&config.start_time), parse_hhmm(&config.end_time)) {
        (Ok(s), Ok(e)) => (s, e),
        _ => return false,
    };

    let tz = resolve_tz(&config.timezone);
    let local = tz.timestamp_millis_opt(at_instant_ms).single().unwrap_or_else(|| {
        Utc.timestamp_millis_opt(at_instant_ms)
            .single()
            .expect("instant out of range")
            .with_timezone(&tz)
    });
    let current = local.hour() * 60 + local.minute();

    if start > end {
        // Window straddles midnight.
        current >= start || current < end
    } else {
        current >= start && current < end
    }
}

/// The next wall-clock `endTime` in the zone, minutes resolution. Returns
/// `None` when quiet hours are disabled (§4.1 `nextEndInstant`).
pub fn next_end_instant(config: &QuietHoursConfig, from_instant_ms: i64) -> Option<i64> {
    if !config.enabled {
        return None;
    }
    let end = parse_hhmm(&config.end_time).ok()?;
    let tz = resolve_tz(&config.timezone);
    let from_local = tz
        .timestamp_millis_opt(from_instant_ms)
        .single()
        .unwrap_or_else(|| {
            Utc.timestamp_millis_opt(from_instant_ms)
                .single()
                .expect("instant out of range")
                .with_timezone(&tz)
        });

    let end_time = NaiveTime::from_hms_opt(end / 60, end % 60, 0).expect("valid minutes-of-day");
    let mut candidate = from_local.date_naive().and_time(end_time);
    if candidate <= from_local.naive_local() {
        candidate += chrono::Duration::days(1);
    }
    let localized = tz.from_local_datetime(&candidate).single()?;
    Some(localized.timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(start: &str, end: &str, tz: &str) -> QuietHoursConfig {
        QuietHoursConfig {
            enabled: true,
            start_time: start.to_string(),
            end_time: end.to_string(),
            timezone: tz.to_string(),
        }
    }

    fn utc_ms(h: u32, m: u32) -> i64 {
        Utc.with_ymd_and_hms(2026, 1, 15, h, m, 0)
            .single()
            .unwrap()
            .timestamp_millis()
    }

    #[test]
    fn disabled_is_never_in_quiet_hours() {
        let mut c = cfg("22:00", "08:00", "UTC");
        c.enabled = false;
        assert!(!is_in_quiet_hours(&c, utc_ms(23, 0)));
    }

    #[test]
    fn overnight_window_straddles_midnight() {
        let c = cfg("22:00", "08:00", "UTC");
        assert!(is_in_quiet_hours(&c, utc_ms(23, 0)));
        assert!(is_in_quiet_hours(&c, utc_ms(0, 0)));
        assert!(is_in_quiet_hours(&c, utc_ms(7, 59)));
        assert!(!is_in_quiet_hours(&c, utc_ms(8, 0)));
        assert!(!is_in_quiet_hours(&c, utc_ms(12, 0)));
    }

    #[test]
    fn same_day_window_boundaries() {
        let c = cfg("13:00", "15:00", "UTC");
        assert!(is_in_quiet_hours(&c, utc_ms(13, 0)));
        assert!(is_in_quiet_hours(&c, utc_ms(14, 59)));
        assert!(!is_in_quiet_hours(&c, utc_ms(15, 0)));
        assert!(!is_in_quiet_hours(&c, utc_ms(12, 59)));
    }

    #[test]
    fn single_minute_window_is_legal() {
        let c = cfg("12:00", "12:01", "UTC");
        assert!(is_in_quiet_hours(&c, utc_ms(12, 0)));
        assert!(!is_in_quiet_hours(&c, utc_ms(12, 1)));
    }

    #[test]
    fn invalid_timezone_falls_back_to_utc_for_evaluation() {
        let c = cfg("22:00", "08:00", "Not/AZone");
        assert!(is_in_quiet_hours(&c, utc_ms(23, 0)));
        assert!(!is_valid_timezone("Not/AZone"));
    }

    #[test]
    fn valid_iana_zone_is_accepted() {
        assert!(is_valid_timezone("America/New_York"));
        assert!(is_valid_timezone("UTC"));
    }

    #[test]
    fn time_of_day_validation_matches_hhmm_shape() {
        assert!(is_valid_time_of_day("00:00"));
        assert!(is_valid_time_of_day("23:59"));
        assert!(!is_valid_time_of_day("24:00"));
        assert!(!is_valid_time_of_day("9:5"));
    }

    #[test]
    fn pure_function_is_deterministic() {
        let c = cfg("22:00", "08:00", "America/New_York");
        let t = utc_ms(5, 0);
        assert_eq!(is_in_quiet_hours(&c, t), is_in_quiet_hours(&c, t));
    }

    #[test]
    fn next_end_instant_rolls_to_tomorrow_when_past() {
        let c = cfg("22:00", "08:00", "UTC");
        let from = utc_ms(9, 0);
        let next = next_end_instant(&c, from).unwrap();
        assert!(next > from);
        // Should land on 08:00 the next day, i.e. 23h after 09:00.
        assert_eq!((next - from) / (1000 * 60 * 60), 23);
    }

    #[test]
    fn next_end_instant_none_when_disabled() {
        let mut c = cfg("22:00", "08:00", "UTC");
        c.enabled = false;
        assert_eq!(next_end_instant(&c, utc_ms(1, 0)), None);
    }
}
