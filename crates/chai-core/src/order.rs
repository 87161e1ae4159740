//! # Orders
//!
//! The immutable order snapshot, its status machine, and the builder that
//! turns a cart snapshot into an order.
//!
//! ## Status Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Pending ──► Confirmed ──► Preparing ──► Ready ──► Delivered            │
//! │     │                                                                   │
//! │     └──────► Cancelled                                                  │
//! │                                                                         │
//! │  Delivered and Cancelled are terminal.                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Cart → Order
//! ```text
//! CartLineDetail (live catalog rows)        OrderLine (frozen copy)
//! ─────────────────────────────────        ─────────────────────────
//! product.name, product.image      ──►     product_name, product_image
//! size.name, size.price            ──►     size_name, size_price_paise
//! variants[].name/price            ──►     variants[].variant_name/price
//! line_total()                     ──►     item_total_paise
//! ```
//! Later catalog edits never change a placed order.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::pricing::{OrderTotals, PricingEngine};
use crate::types::CartLineDetail;
use crate::validation::{validate_optional_text, validate_required_text};
use crate::ESTIMATED_DELIVERY_MINUTES;

// =============================================================================
// Status Enums
// =============================================================================

/// Fulfilment status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Preparing,
    Ready,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Parses a status filter from a query string.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        OrderStatus::ALL
            .into_iter()
            .find(|s| s.as_str() == value)
            .ok_or_else(|| ValidationError::InvalidChoice {
                field: "status".to_string(),
            })
    }

    /// Whether the order may move from `self` to `next`.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Confirmed, Preparing)
                | (Preparing, Ready)
                | (Ready, Delivered)
                | (Pending, Cancelled)
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment status. Orders start `Pending`; no gateway moves them yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

// =============================================================================
// Order Records
// =============================================================================

/// A frozen add-on on an order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct OrderLineVariant {
    pub id: String,
    pub order_line_id: String,
    pub variant_name: String,
    pub variant_price_paise: i64,
}

/// A frozen copy of one cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct OrderLine {
    pub id: String,
    pub order_id: String,
    /// Kept for reference only; `None` once the product is deleted.
    pub product_id: Option<String>,
    pub product_name: String,
    pub product_image: Option<String>,
    pub size_name: String,
    pub size_price_paise: i64,
    pub quantity: i64,
    pub item_total_paise: i64,
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    pub variants: Vec<OrderLineVariant>,
}

impl OrderLine {
    pub fn item_total(&self) -> Money {
        Money::from_paise(self.item_total_paise)
    }
}

/// An order header with its lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Order {
    pub id: String,
    pub user_id: String,
    pub order_number: String,
    pub subtotal_paise: i64,
    pub tax_paise: i64,
    pub delivery_fee_paise: i64,
    pub total_paise: i64,
    pub status: OrderStatus,
    pub payment_method: String,
    pub payment_status: PaymentStatus,
    pub delivery_address_id: Option<String>,
    pub special_instructions: Option<String>,
    pub estimated_delivery_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Empty in list results, populated for single-order reads.
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    pub items: Vec<OrderLine>,
}

impl Order {
    pub fn totals(&self) -> OrderTotals {
        OrderTotals {
            subtotal: Money::from_paise(self.subtotal_paise),
            tax: Money::from_paise(self.tax_paise),
            delivery_fee: Money::from_paise(self.delivery_fee_paise),
            total: Money::from_paise(self.total_paise),
        }
    }
}

// =============================================================================
// Placement
// =============================================================================

/// Checkout request from the client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OrderRequest {
    pub payment_method: String,
    pub delivery_address_id: String,
    #[serde(default)]
    pub special_instructions: Option<String>,
}

impl OrderRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_required_text("payment_method", &self.payment_method, 50)?;
        validate_required_text("delivery_address_id", &self.delivery_address_id, 64)?;
        validate_optional_text("special_instructions", self.special_instructions.as_deref(), 1000)?;
        Ok(())
    }
}

/// A cart line consumed by an order, with the revision it was priced at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLineRef {
    pub id: String,
    pub revision: i64,
}

/// Everything the order store writes in one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedOrder {
    pub order: Order,
    /// Cart lines to delete. Any line whose revision moved since the
    /// snapshot aborts the write.
    pub consumed_lines: Vec<CartLineRef>,
}

/// Generates `ORD-YYYYMMDD-<16 hex digits>`.
///
/// 64 random bits per day make collisions negligible; the unique index on
/// `order_number` rejects the rest.
pub fn generate_order_number(now: DateTime<Utc>) -> String {
    let suffix: u64 = rand::rng().random();
    format!("ORD-{}-{:016x}", now.format("%Y%m%d"), suffix)
}

/// Builds an order from a cart snapshot.
///
/// ## Errors
/// - [`CoreError::CartEmpty`] when `lines` is empty
/// - [`CoreError::ProductUnavailable`] when a product, size or variant was
///   taken off sale after it went into the cart
pub fn build_order(
    user_id: &str,
    request: &OrderRequest,
    lines: &[CartLineDetail],
    pricing: &PricingEngine,
    now: DateTime<Utc>,
) -> CoreResult<PlacedOrder> {
    if lines.is_empty() {
        return Err(CoreError::CartEmpty);
    }

    let order_id = uuid::Uuid::new_v4().to_string();
    let mut items = Vec::with_capacity(lines.len());

    for detail in lines {
        ensure_available(detail)?;

        let line_id = uuid::Uuid::new_v4().to_string();
        let variants = detail
            .variants
            .iter()
            .map(|v| OrderLineVariant {
                id: uuid::Uuid::new_v4().to_string(),
                order_line_id: line_id.clone(),
                variant_name: v.name.clone(),
                variant_price_paise: v.price_paise,
            })
            .collect();

        items.push(OrderLine {
            id: line_id,
            order_id: order_id.clone(),
            product_id: Some(detail.product.id.clone()),
            product_name: detail.product.name.clone(),
            product_image: detail.product.image.clone(),
            size_name: detail.size.name.clone(),
            size_price_paise: detail.size.price_paise,
            quantity: detail.line.quantity,
            item_total_paise: detail.line_total().paise(),
            variants,
        });
    }

    let totals = pricing.totals(items.iter().map(OrderLine::item_total));

    let order = Order {
        id: order_id,
        user_id: user_id.to_string(),
        order_number: generate_order_number(now),
        subtotal_paise: totals.subtotal.paise(),
        tax_paise: totals.tax.paise(),
        delivery_fee_paise: totals.delivery_fee.paise(),
        total_paise: totals.total.paise(),
        status: OrderStatus::Pending,
        payment_method: request.payment_method.trim().to_string(),
        payment_status: PaymentStatus::Pending,
        delivery_address_id: Some(request.delivery_address_id.clone()),
        special_instructions: request
            .special_instructions
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        estimated_delivery_at: Some(now + Duration::minutes(ESTIMATED_DELIVERY_MINUTES)),
        created_at: now,
        updated_at: now,
        items,
    };

    let consumed_lines = lines
        .iter()
        .map(|d| CartLineRef {
            id: d.line.id.clone(),
            revision: d.line.revision,
        })
        .collect();

    Ok(PlacedOrder {
        order,
        consumed_lines,
    })
}

fn ensure_available(detail: &CartLineDetail) -> CoreResult<()> {
    if !detail.product.is_available {
        return Err(CoreError::ProductUnavailable {
            name: detail.product.name.clone(),
        });
    }
    if !detail.size.is_available {
        return Err(CoreError::ProductUnavailable {
            name: format!("{} ({})", detail.product.name, detail.size.name),
        });
    }
    if let Some(variant) = detail.variants.iter().find(|v| !v.is_available) {
        return Err(CoreError::ProductUnavailable {
            name: variant.name.clone(),
        });
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
