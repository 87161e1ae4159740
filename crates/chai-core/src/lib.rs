//! # chai-core: Pure Business Logic for Gaon Wali Chai
//!
//! This crate holds every business rule of the storefront backend: pricing,
//! the OTP lifecycle, the cart-to-order snapshot and the order status
//! machine. It has no I/O of its own. Storage and SMS delivery are reached
//! through the traits in [`ports`], which `chai-db` and `apps/api` implement.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Gaon Wali Chai Architecture                         │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Mobile App (REST client)                     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ JSON over HTTP                         │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    apps/api (axum handlers)                     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ chai-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────────────┐  │   │
//! │  │   │  money   │ │ pricing  │ │   otp    │ │  order           │  │   │
//! │  │   │  Money   │ │ totals   │ │ codes    │ │  snapshot+status │  │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └──────────────────┘  │   │
//! │  │   ┌──────────────────────┐  ┌──────────────────────────────┐   │   │
//! │  │   │  ports (traits)      │  │  services (use the ports)    │   │   │
//! │  │   └──────────────────────┘  └──────────────────────────────┘   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ implements ports                       │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    chai-db (SQLite repositories)                │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Money type in integer paise, tax in basis points
//! - [`types`] - Users, catalog, cart and address records
//! - [`pricing`] - Line totals and order totals
//! - [`otp`] - One-time password codes and their lifecycle rules
//! - [`order`] - Order records, status machine, cart snapshot builder
//! - [`pagination`] - Page requests and paged results
//! - [`validation`] - Input validation
//! - [`ports`] - Storage, SMS, hashing and token traits
//! - [`services`] - Use cases written against the ports
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use chai_core::money::Money;
//! use chai_core::pricing::{line_total, PricingEngine};
//!
//! // Medium Kulhad Chai (₹70) with two ₹10 add-ons, two cups
//! let line = line_total(
//!     Money::from_paise(7000),
//!     &[Money::from_paise(1000), Money::from_paise(1000)],
//!     2,
//! );
//! assert_eq!(line.paise(), 18000);
//!
//! let totals = PricingEngine::default().totals([line]);
//! assert_eq!(totals.tax.paise(), 900);
//! assert_eq!(totals.total.paise(), 20900);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod order;
pub mod otp;
pub mod pagination;
pub mod ports;
pub mod pricing;
pub mod services;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::{Money, TaxRate};
pub use order::{Order, OrderLine, OrderLineVariant, OrderStatus, PaymentStatus};
pub use otp::{OtpCode, OtpPurpose, OtpRecord};
pub use pagination::{Page, PageRequest};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Tax applied to every order subtotal: 5% in basis points.
pub const TAX_RATE_BPS: u32 = 500;

/// Flat delivery fee for every order: ₹20.00 in paise.
pub const DELIVERY_FEE_PAISE: i64 = 2000;

/// How long an issued OTP stays valid.
pub const OTP_TTL_MINUTES: i64 = 10;

/// Maximum quantity of a single cart line.
pub const MAX_ITEM_QUANTITY: i64 = 99;

/// Minutes from placement to the estimated delivery time.
pub const ESTIMATED_DELIVERY_MINUTES: i64 = 30;
