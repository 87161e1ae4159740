//! # Ports
//!
//! Traits the services depend on. `chai-db` implements the stores over
//! SQLite, `apps/api` implements the SMS gateway, password hasher and token
//! issuer. Service tests plug in in-memory fakes.
//!
//! ```text
//! ┌──────────────────┐   Arc<dyn OtpStore>      ┌───────────────────────┐
//! │  services::*     │ ───────────────────────► │ chai_db::OtpRepository│
//! │                  │   Arc<dyn SmsGateway>    ├───────────────────────┤
//! │                  │ ───────────────────────► │ api::sms::TwilioSms   │
//! └──────────────────┘                          └───────────────────────┘
//! ```
//!
//! Every store call is one logical unit: when a method touches more than
//! one row (OTP rotation, default address switch, order placement) the
//! implementation runs it in a single transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::order::{Order, OrderStatus, PlacedOrder};
use crate::otp::{OtpPurpose, OtpRecord};
use crate::pagination::{Page, PageRequest};
use crate::types::{
    Address, AddressInput, AddressPatch, AuthProvider, CartAddition, CartLine, CartLineDetail,
    Category, NewUser, Product, ProductDetail, ProductFilter, ProfilePatch, User,
};

// =============================================================================
// Errors
// =============================================================================

/// Errors reported by store implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A referenced row is missing (foreign key target, row to update).
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A unique constraint rejected the write.
    #[error("duplicate value for {field}")]
    Conflict { field: String },

    /// The rows changed between read and write; the write was rolled back.
    #[error("concurrent modification: {0}")]
    Stale(String),

    /// Backend failure (connection, query, decode).
    #[error("storage failure: {0}")]
    Backend(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// SMS delivery failure.
#[derive(Debug, Error)]
pub enum SmsError {
    #[error("sms transport failed: {0}")]
    Transport(String),

    #[error("sms provider rejected message: status {status}: {body}")]
    Rejected { status: u16, body: String },
}

// =============================================================================
// Collaborators
// =============================================================================

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Sends text messages.
#[async_trait]
pub trait SmsGateway: Send + Sync {
    async fn send(&self, phone: &str, message: &str) -> Result<(), SmsError>;
}

/// Hashes and verifies passwords.
pub trait PasswordHasher: Send + Sync {
    /// Returns a self-describing hash string (PHC format).
    fn hash(&self, password: &str) -> Result<String, String>;

    /// `false` for a mismatch or an unparseable hash.
    fn verify(&self, password: &str, hash: &str) -> bool;
}

/// A bearer token handed to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub expires_in_secs: i64,
}

/// Issues bearer tokens for authenticated users.
pub trait TokenIssuer: Send + Sync {
    fn issue(&self, user: &User) -> Result<IssuedToken, String>;
}

// =============================================================================
// Stores
// =============================================================================

/// OTP persistence.
#[async_trait]
pub trait OtpStore: Send + Sync {
    /// Marks every unused record for `(record.phone, record.purpose)` as used,
    /// then inserts `record`. One transaction.
    async fn rotate(&self, record: &OtpRecord) -> StoreResult<()>;

    /// Most recently created unused record matching phone, code and purpose.
    /// Expiry is not checked here.
    async fn find_latest_unused(
        &self,
        phone: &str,
        code: &str,
        purpose: OtpPurpose,
    ) -> StoreResult<Option<OtpRecord>>;

    /// Sets `is_used` only if it is still unset. Returns whether this call
    /// flipped it.
    async fn consume(&self, id: &str) -> StoreResult<bool>;
}

/// User accounts.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with [`StoreError::Conflict`] on a duplicate phone or email.
    async fn create(&self, user: &NewUser) -> StoreResult<User>;
    async fn find_by_id(&self, id: &str) -> StoreResult<Option<User>>;
    async fn find_by_phone(&self, phone: &str) -> StoreResult<Option<User>>;
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn find_by_provider(
        &self,
        provider: AuthProvider,
        provider_id: &str,
    ) -> StoreResult<Option<User>>;
    async fn mark_verified(&self, id: &str, at: DateTime<Utc>) -> StoreResult<User>;
    async fn set_password(&self, id: &str, password_hash: &str) -> StoreResult<()>;
    /// Links a social provider and marks the account verified.
    async fn link_provider(
        &self,
        id: &str,
        provider: AuthProvider,
        provider_id: &str,
    ) -> StoreResult<User>;
    async fn update_profile(&self, id: &str, patch: &ProfilePatch) -> StoreResult<User>;
}

/// Revoked bearer tokens.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Revokes a token id until `expires_at`. Revoking twice is a no-op.
    async fn revoke(&self, token_id: &str, expires_at: DateTime<Utc>) -> StoreResult<()>;
    async fn is_revoked(&self, token_id: &str) -> StoreResult<bool>;
}

/// Read-only catalog.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Active categories by sort order, then name.
    async fn list_categories(&self) -> StoreResult<Vec<Category>>;
    /// Active category by id.
    async fn find_category(&self, id: &str) -> StoreResult<Option<Category>>;
    /// Available products matching `filter`, by sort order, then name.
    async fn list_products(
        &self,
        filter: &ProductFilter,
        page: PageRequest,
    ) -> StoreResult<Page<Product>>;
    /// Any product by id (available or not) with all its sizes and variants.
    async fn find_product(&self, id: &str) -> StoreResult<Option<ProductDetail>>;
}

/// Per-user carts.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// The user's lines with product, size and selected variants, oldest first.
    async fn lines(&self, user_id: &str) -> StoreResult<Vec<CartLineDetail>>;

    /// Inserts the line or adds to the quantity of the existing
    /// (user, product, size) line. When `addition.variant_ids` is set the
    /// line's variants are replaced. One transaction.
    ///
    /// `None` when the merged quantity would exceed `max_quantity`. The
    /// check and the write are one atomic step.
    async fn upsert(
        &self,
        user_id: &str,
        addition: &CartAddition,
        max_quantity: i64,
    ) -> StoreResult<Option<CartLine>>;

    /// `None` when the line does not exist or belongs to someone else.
    async fn set_quantity(
        &self,
        user_id: &str,
        line_id: &str,
        quantity: i64,
    ) -> StoreResult<Option<CartLine>>;

    /// `false` when the line does not exist or belongs to someone else.
    async fn remove(&self, user_id: &str, line_id: &str) -> StoreResult<bool>;

    /// Deletes all lines; returns how many were removed.
    async fn clear(&self, user_id: &str) -> StoreResult<u64>;

    /// Σ quantity over the user's lines.
    async fn item_count(&self, user_id: &str) -> StoreResult<i64>;
}

/// Address book.
#[async_trait]
pub trait AddressStore: Send + Sync {
    /// Default first, then newest first.
    async fn list(&self, user_id: &str) -> StoreResult<Vec<Address>>;
    async fn find(&self, user_id: &str, id: &str) -> StoreResult<Option<Address>>;
    /// When `input.is_default` is set, other defaults are cleared first.
    async fn create(&self, user_id: &str, input: &AddressInput) -> StoreResult<Address>;
    /// When `patch.is_default == Some(true)`, other defaults are cleared first.
    async fn update(
        &self,
        user_id: &str,
        id: &str,
        patch: &AddressPatch,
    ) -> StoreResult<Option<Address>>;
    async fn delete(&self, user_id: &str, id: &str) -> StoreResult<bool>;
}

/// Orders.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Writes the header, lines and line variants and deletes the consumed
    /// cart lines, all in one transaction.
    ///
    /// Fails with [`StoreError::Stale`] when a consumed line is gone or its
    /// revision moved, with [`StoreError::NotFound`] when the delivery
    /// address no longer belongs to the user, and with
    /// [`StoreError::Conflict`] on a duplicate order number. Nothing is
    /// written in any of these cases.
    async fn place(&self, placed: &PlacedOrder) -> StoreResult<()>;

    /// An order of this user by number, with lines and variants.
    async fn find_by_number(&self, user_id: &str, order_number: &str)
        -> StoreResult<Option<Order>>;

    /// Headers only (empty `items`), newest first.
    async fn list(
        &self,
        user_id: &str,
        status: Option<OrderStatus>,
        page: PageRequest,
    ) -> StoreResult<Page<Order>>;

    /// Moves the order from `from` to `to` only if it is still in `from`.
    /// Returns whether the row changed.
    async fn update_status(
        &self,
        order_id: &str,
        from: OrderStatus,
        to: OrderStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<bool>;
}
