//! # Error Types
//!
//! Domain-specific error types for chai-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  chai-core errors (this file)                                           │
//! │  ├── CoreError        - Business rule failures returned by services    │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  chai-core ports                                                        │
//! │  └── StoreError       - What a repository reports back                 │
//! │                                                                         │
//! │  chai-db errors (separate crate)                                        │
//! │  └── DbError          - sqlx failures, mapped into StoreError          │
//! │                                                                         │
//! │  apps/api errors                                                        │
//! │  └── ApiError         - HTTP status + JSON envelope                    │
//! │                                                                         │
//! │  Flow: DbError → StoreError → CoreError → ApiError → Client            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::order::OrderStatus;
use crate::ports::StoreError;

/// Result type for service operations.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations and lookup failures raised by services.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Input failed validation before any business logic ran.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// The entity does not exist, or belongs to another user.
    #[error("{entity} not found")]
    NotFound { entity: &'static str, id: String },

    /// Phone number (or email) already belongs to an account.
    #[error("The {field} has already been taken")]
    AlreadyTaken { field: &'static str, value: String },

    /// Phone/password pair did not match an account.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// OTP was wrong, expired, or already consumed.
    #[error("Invalid or expired OTP")]
    InvalidOtp,

    /// Verification requested for an account that is already verified.
    #[error("Account is already verified")]
    AlreadyVerified,

    /// Order placement attempted with no cart lines.
    #[error("Cart is empty")]
    CartEmpty,

    /// A product, size or variant is missing from sale.
    #[error("{name} is not available")]
    ProductUnavailable { name: String },

    /// Variant does not belong to the product being added.
    #[error("Variant {variant_id} does not belong to this product")]
    ForeignVariant { variant_id: String },

    /// Requested or merged quantity goes past the per-line limit.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// The order's status does not allow the requested change.
    ///
    /// ```text
    /// cancel_order("ORD-20240115-...")
    ///      │
    ///      ▼
    /// status = Preparing, Preparing → Cancelled not allowed
    ///      │
    ///      ▼
    /// InvalidStatusTransition { from: Preparing, to: Cancelled }
    ///      │
    ///      ▼
    /// Client sees: "Order cannot be cancelled at this stage"
    /// ```
    #[error("Order {order_number} cannot move from {from} to {to}")]
    InvalidStatusTransition {
        order_number: String,
        from: OrderStatus,
        to: OrderStatus,
    },

    /// Storage reported a failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A collaborator (hasher, token issuer) failed.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Shorthand for [`CoreError::NotFound`].
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity,
            id: id.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Every variant names the offending field so the API can build a
/// `{ field: [messages] }` map for the client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("The {field} field is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("The {field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("The {field} may not be greater than {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("The {field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Invalid format (phone, email, OTP code).
    #[error("The {field} format is invalid: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is outside the accepted set (provider names, order statuses).
    #[error("The selected {field} is invalid")]
    InvalidChoice { field: String },
}

impl ValidationError {
    /// The request field this error refers to.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field }
            | ValidationError::TooShort { field, .. }
            | ValidationError::TooLong { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::InvalidFormat { field, .. }
            | ValidationError::InvalidChoice { field } => field,
        }
    }
}
