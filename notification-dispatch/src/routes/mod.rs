pub mod device_tokens;
pub mod health;
pub mod notifications;
pub mod preferences;
pub mod quiet_hours;
