//! API server configuration.
//!
//! Sources, lowest priority first:
//! 1. Built-in defaults
//! 2. `chai.toml` in the working directory (optional)
//! 3. Environment variables prefixed `CHAI_`, nested keys split on `__`
//!    (`CHAI_PORT`, `CHAI_SMS__PROVIDER`)
//!
//! `.env` is read by `main` before loading, so the same variables can live
//! there during development.

use std::net::SocketAddr;
use std::time::Duration;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use serde::Deserialize;

/// API server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Interface to bind
    pub host: String,

    /// HTTP port
    pub port: u16,

    /// sqlx SQLite URL
    pub database_url: String,

    /// Pool size
    pub db_max_connections: u32,

    /// HMAC secret for bearer tokens
    pub jwt_secret: String,

    /// Bearer token lifetime in seconds
    pub jwt_lifetime_secs: i64,

    /// Echo OTP codes in API responses. Development only.
    pub expose_otp: bool,

    pub sms: SmsConfig,
}

/// SMS delivery settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SmsConfig {
    pub provider: SmsProvider,
    pub account_sid: Option<String>,
    pub auth_token: Option<String>,
    /// Sender number registered with the provider
    pub from: Option<String>,
    /// Prefixed to 10-digit local numbers to form the E.164 recipient.
    /// The leading `+` is optional (`CHAI_SMS__DEFAULT_COUNTRY_CODE=91`).
    pub default_country_code: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmsProvider {
    /// Write messages to the log instead of sending them
    Log,
    Twilio,
}

impl ApiConfig {
    /// Load configuration from `chai.toml` and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_builder(
            Config::builder()
                .add_source(File::with_name("chai").required(false))
                .add_source(
                    Environment::with_prefix("CHAI")
                        .prefix_separator("_")
                        .separator("__")
                        .try_parsing(true),
                ),
        )
    }

    /// Applies defaults under `builder`'s sources, then validates.
    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let config: ApiConfig = builder
            .set_default("host", "0.0.0.0")?
            .set_default("port", 8080)?
            .set_default("database_url", "sqlite://gaon_wali_chai.db")?
            .set_default("db_max_connections", 5)?
            .set_default("jwt_secret", "")?
            .set_default("jwt_lifetime_secs", 60 * 60 * 24 * 30)?
            .set_default("expose_otp", false)?
            .set_default("sms.provider", "log")?
            .set_default("sms.default_country_code", "+91")?
            .set_default("sms.timeout_secs", 10)?
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.trim().is_empty() {
            return Err(ConfigError::MissingRequired("jwt_secret".to_string()));
        }
        if self.jwt_lifetime_secs <= 0 {
            return Err(ConfigError::InvalidValue("jwt_lifetime_secs".to_string()));
        }
        if self.db_max_connections == 0 {
            return Err(ConfigError::InvalidValue("db_max_connections".to_string()));
        }

        let digits = self.sms.country_code_digits();
        if !(1..=3).contains(&digits.len()) || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ConfigError::InvalidValue(
                "sms.default_country_code".to_string(),
            ));
        }

        if self.sms.provider == SmsProvider::Twilio {
            let required = [
                ("sms.account_sid", &self.sms.account_sid),
                ("sms.auth_token", &self.sms.auth_token),
                ("sms.from", &self.sms.from),
            ];
            for (key, value) in required {
                if value.as_deref().map_or(true, |v| v.trim().is_empty()) {
                    return Err(ConfigError::MissingRequired(key.to_string()));
                }
            }
        }

        Ok(())
    }

    /// Socket address to bind.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| ConfigError::InvalidValue("host".to_string()))
    }
}

impl SmsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Country calling code with its `+`, e.g. `+91`.
    pub fn country_code(&self) -> String {
        format!("+{}", self.country_code_digits())
    }

    fn country_code_digits(&self) -> &str {
        let code = self.default_country_code.trim();
        code.strip_prefix('+').unwrap_or(code)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Failed to read configuration: {0}")]
    Source(#[from] config::ConfigError),
}
