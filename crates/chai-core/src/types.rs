//! # Domain Types
//!
//! Records for users, the catalog, cart lines and addresses. Order and OTP
//! records live in their own modules next to the rules that govern them.
//!
//! ## Type Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Domain Types                                   │
//! │                                                                         │
//! │  ┌────────────┐    ┌────────────┐    ┌──────────────┐                  │
//! │  │  Category  │◄───│  Product   │───►│ ProductSize  │  price per size  │
//! │  └────────────┘    │            │    └──────────────┘                  │
//! │                    │            │───►┌──────────────┐                  │
//! │                    └─────▲──────┘    │ProductVariant│  add-on price    │
//! │                          │           └──────────────┘                  │
//! │  ┌────────────┐    ┌─────┴──────┐                                      │
//! │  │    User    │───►│  CartLine  │  (user, product, size) unique        │
//! │  │            │    └────────────┘                                      │
//! │  │            │───►┌────────────┐                                      │
//! │  └────────────┘    │  Address   │  at most one default per user        │
//! │                    └────────────┘                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every entity is keyed by a UUID v4 string. Prices are stored in paise
//! (`*_paise` fields) with a matching [`Money`] accessor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Users
// =============================================================================

/// How an account was first created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    /// Phone number + password, verified by OTP.
    Phone,
    Google,
    Facebook,
}

impl AuthProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthProvider::Phone => "phone",
            AuthProvider::Google => "google",
            AuthProvider::Facebook => "facebook",
        }
    }

    /// Parses a social login provider name. `phone` is not a social provider.
    pub fn parse_social(value: &str) -> Result<Self, ValidationError> {
        match value {
            "google" => Ok(AuthProvider::Google),
            "facebook" => Ok(AuthProvider::Facebook),
            _ => Err(ValidationError::InvalidChoice {
                field: "provider".to_string(),
            }),
        }
    }
}

/// A customer account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct User {
    pub id: String,
    pub name: String,
    /// Normalized digits only. `None` for social accounts without a phone.
    pub phone: Option<String>,
    pub email: Option<String>,
    /// Argon2 PHC string. Never serialized.
    #[serde(skip_serializing, default)]
    pub password_hash: Option<String>,
    pub profile_image: Option<String>,
    pub is_verified: bool,
    pub phone_verified_at: Option<DateTime<Utc>>,
    pub auth_provider: AuthProvider,
    /// Social provider linked to this account, if any.
    pub provider: Option<AuthProvider>,
    #[serde(skip_serializing, default)]
    pub provider_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a user row.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub profile_image: Option<String>,
    pub is_verified: bool,
    pub auth_provider: AuthProvider,
    pub provider: Option<AuthProvider>,
    pub provider_id: Option<String>,
}

/// Partial profile update. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub profile_image: Option<String>,
}

// =============================================================================
// Catalog
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Category {
    pub id: String,
    pub name: String,
    pub icon: Option<String>,
    pub sort_order: i64,
    pub is_active: bool,
}

/// A sellable item. The price a customer pays comes from the chosen
/// [`ProductSize`]; `base_price_paise` is the "from" price shown in listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    pub id: String,
    pub category_id: String,
    pub name: String,
    pub description: Option<String>,
    pub base_price_paise: i64,
    pub image: Option<String>,
    pub is_featured: bool,
    pub is_available: bool,
    pub sort_order: i64,
}

impl Product {
    pub fn base_price(&self) -> Money {
        Money::from_paise(self.base_price_paise)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ProductSize {
    pub id: String,
    pub product_id: String,
    pub name: String,
    pub price_paise: i64,
    pub is_available: bool,
}

impl ProductSize {
    pub fn price(&self) -> Money {
        Money::from_paise(self.price_paise)
    }
}

/// An add-on (extra ginger, cheese slice) priced on top of the size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ProductVariant {
    pub id: String,
    pub product_id: String,
    pub name: String,
    pub price_paise: i64,
    pub image: Option<String>,
    pub is_available: bool,
}

impl ProductVariant {
    pub fn price(&self) -> Money {
        Money::from_paise(self.price_paise)
    }
}

/// A product with its category, sizes and variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub category: Option<Category>,
    pub sizes: Vec<ProductSize>,
    pub variants: Vec<ProductVariant>,
}

impl ProductDetail {
    /// Finds a size of this product by id.
    pub fn size(&self, size_id: &str) -> Option<&ProductSize> {
        self.sizes.iter().find(|s| s.id == size_id)
    }

    /// Finds a variant of this product by id.
    pub fn variant(&self, variant_id: &str) -> Option<&ProductVariant> {
        self.variants.iter().find(|v| v.id == variant_id)
    }
}

/// Product listing filters. All set filters must match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProductFilter {
    pub category_id: Option<String>,
    pub featured: Option<bool>,
    /// Case-insensitive substring of the product name.
    pub search: Option<String>,
}

// =============================================================================
// Cart
// =============================================================================

/// One line of a user's cart, unique per (user, product, size).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CartLine {
    pub id: String,
    pub user_id: String,
    pub product_id: String,
    pub size_id: String,
    pub quantity: i64,
    /// Bumped on every change to the line. Checked when the line is
    /// consumed by an order.
    pub revision: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A cart line joined with the catalog rows it prices against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLineDetail {
    #[serde(flatten)]
    pub line: CartLine,
    pub product: Product,
    pub size: ProductSize,
    pub variants: Vec<ProductVariant>,
}

impl CartLineDetail {
    /// `(size price + Σ variant prices) × quantity`.
    pub fn line_total(&self) -> Money {
        let variant_prices: Vec<Money> = self.variants.iter().map(ProductVariant::price).collect();
        crate::pricing::line_total(self.size.price(), &variant_prices, self.line.quantity)
    }
}

/// Request to add a product to the cart.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CartAddition {
    pub product_id: String,
    pub size_id: String,
    pub quantity: i64,
    /// When present, replaces the variants of the (possibly existing) line.
    #[serde(default)]
    pub variant_ids: Option<Vec<String>>,
}

// =============================================================================
// Addresses
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Address {
    pub id: String,
    pub user_id: String,
    pub label: String,
    pub address_line1: String,
    pub address_line2: Option<String>,
    pub city: String,
    pub state: String,
    pub pincode: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for a new address.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AddressInput {
    pub label: String,
    pub address_line1: String,
    #[serde(default)]
    pub address_line2: Option<String>,
    pub city: String,
    pub state: String,
    pub pincode: String,
    #[serde(default)]
    pub is_default: bool,
}

/// Partial address update. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AddressPatch {
    pub label: Option<String>,
    pub address_line1: Option<String>,
    pub address_line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub pincode: Option<String>,
    pub is_default: Option<bool>,
}

impl AddressPatch {
    /// Applies the patch to an address in place.
    pub fn apply_to(&self, address: &mut Address) {
        if let Some(label) = &self.label {
            address.label = label.clone();
        }
        if let Some(line1) = &self.address_line1 {
            address.address_line1 = line1.clone();
        }
        if let Some(line2) = &self.address_line2 {
            address.address_line2 = Some(line2.clone());
        }
        if let Some(city) = &self.city {
            address.city = city.clone();
        }
        if let Some(state) = &self.state {
            address.state = state.clone();
        }
        if let Some(pincode) = &self.pincode {
            address.pincode = pincode.clone();
        }
        if let Some(is_default) = self.is_default {
            address.is_default = is_default;
        }
    }
}
