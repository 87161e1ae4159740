//! # OTP Lifecycle
//!
//! One-time passwords sent by SMS for registration and password reset.
//!
//! ## Record States
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   store_otp ──► ┌────────┐   verify (match)   ┌────────┐                │
//! │                 │ Active │ ─────────────────► │  Used  │                │
//! │                 └───┬────┘                    └────────┘                │
//! │                     │  ▲                           ▲                    │
//! │     now > expires_at│  │ newer store_otp for the   │                    │
//! │                     ▼  │ same (phone, purpose) ────┘                    │
//! │                 ┌────────┐                                              │
//! │                 │Expired │  never verifies, stays unused                │
//! │                 └────────┘                                              │
//! │                                                                         │
//! │  At most one Active record per (phone, purpose).                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The code is a fixed-width string. `"004271"` is a valid code and is never
//! compared numerically.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationError;
use crate::OTP_TTL_MINUTES;

// =============================================================================
// Purpose
// =============================================================================

/// What an OTP authorizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum OtpPurpose {
    Registration,
    ForgotPassword,
}

impl OtpPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            OtpPurpose::Registration => "registration",
            OtpPurpose::ForgotPassword => "forgot_password",
        }
    }
}

impl fmt::Display for OtpPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Code
// =============================================================================

/// A six-digit, zero-padded OTP code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OtpCode(String);

impl OtpCode {
    /// Number of digits in a code.
    pub const LEN: usize = 6;

    /// Draws a uniformly random code in `000000..=999999`.
    pub fn generate() -> Self {
        let value: u32 = rand::rng().random_range(0..1_000_000);
        OtpCode(format!("{:06}", value))
    }

    /// Parses user input. Exactly six ASCII digits, surrounding whitespace
    /// ignored.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Required {
                field: "otp".to_string(),
            });
        }
        if trimmed.len() != Self::LEN || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ValidationError::InvalidFormat {
                field: "otp".to_string(),
                reason: "must be exactly 6 digits".to_string(),
            });
        }
        Ok(OtpCode(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OtpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Record
// =============================================================================

/// Where a stored OTP is in its lifecycle at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpState {
    Active,
    Expired,
    Used,
}

/// A persisted OTP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpRecord {
    pub id: String,
    pub phone: String,
    pub code: OtpCode,
    pub purpose: OtpPurpose,
    pub expires_at: DateTime<Utc>,
    pub is_used: bool,
    pub created_at: DateTime<Utc>,
}

impl OtpRecord {
    /// A fresh, unused record with a random code expiring after the TTL.
    pub fn issue(phone: &str, purpose: OtpPurpose, now: DateTime<Utc>) -> Self {
        OtpRecord {
            id: uuid::Uuid::new_v4().to_string(),
            phone: phone.to_string(),
            code: OtpCode::generate(),
            purpose,
            expires_at: now + Duration::minutes(OTP_TTL_MINUTES),
            is_used: false,
            created_at: now,
        }
    }

    /// Expired once `now` is strictly past `expires_at`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub fn state(&self, now: DateTime<Utc>) -> OtpState {
        if self.is_used {
            OtpState::Used
        } else if self.is_expired(now) {
            OtpState::Expired
        } else {
            OtpState::Active
        }
    }

    /// SMS body carrying this code.
    pub fn sms_message(&self) -> String {
        format!(
            "Your Gaon Wali Chai verification code is: {}. Valid for {} minutes.",
            self.code, OTP_TTL_MINUTES
        )
    }
}

// =============================================================================
// Tests
// =============================================================================
