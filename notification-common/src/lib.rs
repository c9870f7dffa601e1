#![recursion_limit = "256"]

#[macro_use]
extern crate slog;
#[macro_use]
extern crate slog_scope;

pub mod audit;
pub mod db;
pub mod device_tokens;
pub mod enums;
pub mod errors;
pub mod logging;
pub mod metrics;
pub mod middleware;
pub mod notification;
pub mod preferences;
pub mod quiet_hours;
pub mod tags;
pub mod util;

/// Default quiet-hours window used when an account has never configured one.
pub const DEFAULT_QUIET_HOURS_START: &str = "22:00";
pub const DEFAULT_QUIET_HOURS_END: &str = "08:00";
pub const DEFAULT_QUIET_HOURS_TZ: &str = "UTC";
