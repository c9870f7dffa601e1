//! Application settings, loaded from an optional config file layered with
//! environment variables (`NOTIFY__...`).

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

pub const ENV_PREFIX: &str = "notify";

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    pub host: String,
    pub port: u16,

    /// Postgres connection string.
    pub db_dsn: Option<String>,
    /// JSON blob of schema/table overrides; see
    /// `notification_common::db::postgres::PostgresDbSettings`.
    pub db_settings: String,

    pub human_logs: bool,

    pub statsd_host: Option<String>,
    pub statsd_port: u16,
    pub statsd_label: String,

    pub push: PushSettings,
    pub sms: SmsSettings,
    pub email: EmailSettings,
    pub audit: AuditSettings,

    /// Tag attached to outbound RPCs (email, audit) identifying this service.
    pub source_service: String,
}

impl Default for Settings {
    fn default() -> Settings {
        Settings {
            host: "127.0.0.1".to_string(),
            port: 8000,
            db_dsn: None,
            db_settings: "".to_owned(),
            human_logs: false,
            statsd_host: None,
            statsd_port: 8125,
            statsd_label: "notification_dispatch".to_string(),
            push: PushSettings::default(),
            sms: SmsSettings::default(),
            email: EmailSettings::default(),
            audit: AuditSettings::default(),
            source_service: "notification-service".to_string(),
        }
    }
}

impl Settings {
    /// Load the settings from the config file if supplied, then the environment.
    pub fn with_env_and_config_file(filename: &Option<String>) -> Result<Self, ConfigError> {
        let mut config = Config::builder();

        if let Some(config_filename) = filename {
            config = config.add_source(File::with_name(config_filename));
        }

        // Specify the separator so the shell can pass args down to substructures.
        config = config.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

        let built: Self = config.build()?.try_deserialize::<Self>().map_err(|error| {
            match error {
                ConfigError::Message(error_msg) => {
                    println!("Bad configuration: {:?}", &error_msg);
                    println!("Please set in config file or use environment variable.");
                    println!(
                        "For example to set `host` use env var `{}_HOST`\n",
                        ENV_PREFIX.to_uppercase()
                    );
                    error!("Configuration error: Value undefined {:?}", &error_msg);
                    ConfigError::NotFound(error_msg)
                }
                _ => {
                    error!("Configuration error: Other: {:?}", &error);
                    error
                }
            }
        })?;

        Ok(built)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Push-provider credentials, keyed by an opaque "profile" name the same way
/// the FCM/GCM credential map used to be; the abstract `PushProvider`
/// implementation decides how to interpret each profile's `credential` blob.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
#[serde(deny_unknown_fields)]
pub struct PushSettings {
    /// A JSON map of `{profile: {"credential": "...", ...}}`. Empty ⇒ push
    /// adapter reports "push not configured".
    pub credentials: String,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SmsProviderKind {
    #[default]
    None,
    Twilio,
    AwsSns,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
#[serde(deny_unknown_fields)]
pub struct SmsSettings {
    pub provider: SmsProviderKind,
    pub account_sid: Option<String>,
    pub auth_token: Option<String>,
    pub from_number: Option<String>,
}

impl SmsSettings {
    pub fn is_configured(&self) -> bool {
        self.provider != SmsProviderKind::None
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
#[serde(deny_unknown_fields)]
pub struct EmailSettings {
    /// Base URL of the opaque email-rendering RPC service. Empty ⇒ adapter
    /// reports "email not configured".
    pub service_url: String,
    pub from_email: String,
}

impl Default for EmailSettings {
    fn default() -> Self {
        Self {
            service_url: "".to_string(),
            from_email: "noreply@example.com".to_string(),
        }
    }
}

impl EmailSettings {
    pub fn is_configured(&self) -> bool {
        !self.service_url.is_empty()
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
#[serde(deny_unknown_fields)]
pub struct AuditSettings {
    /// Base URL of the opaque audit-logging RPC service. Empty ⇒ sink
    /// logs-and-swallows without attempting a call.
    pub service_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_address() {
        let settings = Settings {
            host: "0.0.0.0".to_string(),
            port: 9123,
            ..Default::default()
        };
        assert_eq!(settings.bind_address(), "0.0.0.0:9123");
    }

    #[test]
    fn test_default_settings() {
        let port = format!("{}__PORT", super::ENV_PREFIX).to_uppercase();

        use std::env;
        let prior = env::var(&port);
        env::set_var(&port, "9123");

        let settings = Settings::with_env_and_config_file(&None).unwrap();
        assert_eq!(&settings.port, &9123);
        assert_eq!(settings.host, "127.0.0.1".to_owned());

        if let Ok(p) = prior {
            env::set_var(&port, p);
        } else {
            env::remove_var(&port);
        }
    }

    #[test]
    fn sms_not_configured_by_default() {
        assert!(!SmsSettings::default().is_configured());
    }

    #[test]
    fn email_not_configured_without_service_url() {
        assert!(!EmailSettings::default().is_configured());
    }
}
