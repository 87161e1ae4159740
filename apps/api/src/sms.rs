//! SMS gateways for OTP delivery.
//!
//! ```text
//! sms.provider = "log"     → LogSms     (message written to the log)
//! sms.provider = "twilio"  → TwilioSms  (POST .../Accounts/{sid}/Messages.json)
//! ```
//!
//! Phones are stored as bare digits. Twilio wants E.164, so a 10-digit
//! number gets `sms.default_country_code` in front and a longer one gets `+`.

use std::sync::Arc;

use async_trait::async_trait;
use chai_core::ports::{SmsError, SmsGateway};
use tracing::{debug, info};

use crate::config::{ConfigError, SmsConfig, SmsProvider};

const TWILIO_API: &str = "https://api.twilio.com";
const DEFAULT_COUNTRY_CODE: &str = "+91";

/// Builds the gateway selected by `sms.provider`.
pub fn gateway(config: &SmsConfig) -> Result<Arc<dyn SmsGateway>, ConfigError> {
    match config.provider {
        SmsProvider::Log => Ok(Arc::new(LogSms)),
        SmsProvider::Twilio => Ok(Arc::new(TwilioSms::from_config(config)?)),
    }
}

/// Logs messages instead of sending them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSms;

#[async_trait]
impl SmsGateway for LogSms {
    async fn send(&self, phone: &str, message: &str) -> Result<(), SmsError> {
        info!(phone = %phone, message = %message, "SMS (log provider)");
        Ok(())
    }
}

/// Twilio Programmable Messaging over its REST API.
#[derive(Debug, Clone)]
pub struct TwilioSms {
    client: reqwest::Client,
    base_url: String,
    account_sid: String,
    auth_token: String,
    from: String,
    country_code: String,
}

impl TwilioSms {
    pub fn new(
        account_sid: impl Into<String>,
        auth_token: impl Into<String>,
        from: impl Into<String>,
        timeout: std::time::Duration,
    ) -> Result<Self, SmsError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SmsError::Transport(e.to_string()))?;

        Ok(TwilioSms {
            client,
            base_url: TWILIO_API.to_string(),
            account_sid: account_sid.into(),
            auth_token: auth_token.into(),
            from: from.into(),
            country_code: DEFAULT_COUNTRY_CODE.to_string(),
        })
    }

    fn from_config(config: &SmsConfig) -> Result<Self, ConfigError> {
        let required = |key: &str, value: &Option<String>| {
            value
                .clone()
                .ok_or_else(|| ConfigError::MissingRequired(key.to_string()))
        };

        TwilioSms::new(
            required("sms.account_sid", &config.account_sid)?,
            required("sms.auth_token", &config.auth_token)?,
            required("sms.from", &config.from)?,
            config.timeout(),
        )
        .map(|sms| sms.with_country_code(config.country_code()))
        .map_err(|e| ConfigError::InvalidValue(format!("sms: {}", e)))
    }

    /// Country code for 10-digit local numbers, with its `+`.
    pub fn with_country_code(mut self, country_code: impl Into<String>) -> Self {
        self.country_code = country_code.into();
        self
    }

    /// Points the client at another host (a local stub in tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url.trim_end_matches('/'),
            self.account_sid
        )
    }

    fn recipient(&self, phone: &str) -> String {
        if phone.starts_with('+') {
            phone.to_string()
        } else if phone.len() == 10 {
            format!("{}{}", self.country_code, phone)
        } else {
            format!("+{phone}")
        }
    }
}

#[async_trait]
impl SmsGateway for TwilioSms {
    async fn send(&self, phone: &str, message: &str) -> Result<(), SmsError> {
        let to = self.recipient(phone);
        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("To", to.as_str()), ("From", self.from.as_str()), ("Body", message)])
            .send()
            .await
            .map_err(|e| SmsError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SmsError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        debug!(to = %to, "SMS accepted by provider");
        Ok(())
    }
}
