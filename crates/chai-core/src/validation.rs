//! # Validation Module
//!
//! Input validation for request payloads.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: axum extractors                                               │
//! │  └── JSON shape, types (serde)                                          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Services                                                      │
//! │  └── THIS MODULE: lengths, formats, ranges                              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                             │
//! │  ├── UNIQUE (phone, email, cart line, order number)                     │
//! │  └── Foreign keys, CHECK constraints                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::types::{AddressInput, AddressPatch, ProfilePatch};
use crate::MAX_ITEM_QUANTITY;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Minimum password length.
pub const MIN_PASSWORD_LEN: usize = 8;

// =============================================================================
// Phone & Credentials
// =============================================================================

/// Normalizes a phone number to bare digits.
///
/// ## Rules
/// - Spaces, dashes and parentheses are removed
/// - A leading `+91` country code is dropped, then any other leading `+`
/// - The rest must be 10 to 15 ASCII digits
///
/// ## Example
/// ```rust
/// use chai_core::validation::normalize_phone;
///
/// assert_eq!(normalize_phone("+91 98765-43210").unwrap(), "9876543210");
/// assert!(normalize_phone("12345").is_err());
/// ```
pub fn normalize_phone(input: &str) -> ValidationResult<String> {
    let compact: String = input
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect();

    if compact.is_empty() {
        return Err(ValidationError::Required {
            field: "phone".to_string(),
        });
    }

    let digits = compact
        .strip_prefix("+91")
        .or_else(|| compact.strip_prefix('+'))
        .unwrap_or(&compact);

    if !digits.bytes().all(|b| b.is_ascii_digit()) || !(10..=15).contains(&digits.len()) {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "must be 10 to 15 digits".to_string(),
        });
    }

    Ok(digits.to_string())
}

/// Validates a new password. Only the length is checked.
pub fn validate_password(password: &str) -> ValidationResult<()> {
    if password.is_empty() {
        return Err(ValidationError::Required {
            field: "password".to_string(),
        });
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::TooShort {
            field: "password".to_string(),
            min: MIN_PASSWORD_LEN,
        });
    }
    Ok(())
}

/// Validates a display name (1..=255 characters after trimming).
pub fn validate_name(name: &str) -> ValidationResult<()> {
    validate_required_text("name", name, 255)
}

/// Loose email check: one `@`, non-empty local part, a dot in the domain.
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();
    validate_required_text("email", email, 255)?;

    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    };

    if !valid {
        return Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            reason: "must be a valid email address".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Generic Text
// =============================================================================

/// Required text: non-blank after trimming and at most `max` characters.
pub fn validate_required_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(())
}

/// Optional text: when present, at most `max` characters.
pub fn validate_optional_text(field: &str, value: Option<&str>, max: usize) -> ValidationResult<()> {
    match value {
        Some(v) if v.chars().count() > max => Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        }),
        _ => Ok(()),
    }
}

// =============================================================================
// Cart
// =============================================================================

/// Validates a cart line quantity (1..=99).
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if !(1..=MAX_ITEM_QUANTITY).contains(&qty) {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }
    Ok(())
}

// =============================================================================
// Addresses & Profile
// =============================================================================

const LABEL_MAX: usize = 50;
const LINE_MAX: usize = 255;
const CITY_MAX: usize = 100;
const STATE_MAX: usize = 100;
const PINCODE_MAX: usize = 20;

pub fn validate_address_input(input: &AddressInput) -> ValidationResult<()> {
    validate_required_text("label", &input.label, LABEL_MAX)?;
    validate_required_text("address_line1", &input.address_line1, LINE_MAX)?;
    validate_optional_text("address_line2", input.address_line2.as_deref(), LINE_MAX)?;
    validate_required_text("city", &input.city, CITY_MAX)?;
    validate_required_text("state", &input.state, STATE_MAX)?;
    validate_required_text("pincode", &input.pincode, PINCODE_MAX)?;
    Ok(())
}

/// Fields present in the patch follow the same rules as on create.
pub fn validate_address_patch(patch: &AddressPatch) -> ValidationResult<()> {
    let required = [
        ("label", patch.label.as_deref(), LABEL_MAX),
        ("address_line1", patch.address_line1.as_deref(), LINE_MAX),
        ("city", patch.city.as_deref(), CITY_MAX),
        ("state", patch.state.as_deref(), STATE_MAX),
        ("pincode", patch.pincode.as_deref(), PINCODE_MAX),
    ];
    for (field, value, max) in required {
        if let Some(value) = value {
            validate_required_text(field, value, max)?;
        }
    }
    validate_optional_text("address_line2", patch.address_line2.as_deref(), LINE_MAX)
}

pub fn validate_profile_patch(patch: &ProfilePatch) -> ValidationResult<()> {
    if let Some(name) = &patch.name {
        validate_name(name)?;
    }
    if let Some(email) = &patch.email {
        validate_email(email)?;
    }
    validate_optional_text("profile_image", patch.profile_image.as_deref(), 2048)
}

// =============================================================================
// Tests
// =============================================================================
