//! Cart use cases.
//!
//! ```text
//! add_to_cart(product, size, qty, variants?)
//!      │
//!      ├── product exists + available?      no → NotFound / ProductUnavailable
//!      ├── size belongs + available?        no → NotFound / ProductUnavailable
//!      ├── variants belong + available?     no → ForeignVariant / ProductUnavailable
//!      ▼
//! CartStore::upsert  (insert, or add to the existing line's quantity
//!      │              while the sum stays ≤ 99)
//!      └── None                              → QuantityTooLarge
//! ```

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::error::{CoreError, CoreResult};
use crate::ports::{CartStore, CatalogStore};
use crate::pricing::{OrderTotals, PricingEngine};
use crate::types::{CartAddition, CartLine, CartLineDetail};
use crate::validation::validate_quantity;
use crate::MAX_ITEM_QUANTITY;

/// A cart with its priced totals.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub lines: Vec<CartLineDetail>,
    pub totals: OrderTotals,
}

/// Result of adding to the cart.
#[derive(Debug, Clone)]
pub struct CartAdded {
    pub line: CartLine,
    /// Σ quantity over the whole cart after the add.
    pub cart_count: i64,
}

#[derive(Clone)]
pub struct CartService {
    cart: Arc<dyn CartStore>,
    catalog: Arc<dyn CatalogStore>,
    pricing: PricingEngine,
}

impl CartService {
    pub fn new(
        cart: Arc<dyn CartStore>,
        catalog: Arc<dyn CatalogStore>,
        pricing: PricingEngine,
    ) -> Self {
        CartService {
            cart,
            catalog,
            pricing,
        }
    }

    pub async fn view(&self, user_id: &str) -> CoreResult<CartView> {
        let lines = self.cart.lines(user_id).await?;
        let totals = self.pricing.cart_totals(&lines);
        Ok(CartView { lines, totals })
    }

    pub async fn add(&self, user_id: &str, addition: CartAddition) -> CoreResult<CartAdded> {
        validate_quantity(addition.quantity)?;

        let product = self
            .catalog
            .find_product(&addition.product_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Product", &addition.product_id))?;
        if !product.product.is_available {
            return Err(CoreError::ProductUnavailable {
                name: product.product.name,
            });
        }

        let size = product
            .size(&addition.size_id)
            .ok_or_else(|| CoreError::not_found("Product size", &addition.size_id))?;
        if !size.is_available {
            return Err(CoreError::ProductUnavailable {
                name: format!("{} ({})", product.product.name, size.name),
            });
        }

        let variant_ids = match &addition.variant_ids {
            Some(ids) => {
                let mut unique: Vec<String> = Vec::with_capacity(ids.len());
                for id in ids {
                    let variant = product.variant(id).ok_or_else(|| CoreError::ForeignVariant {
                        variant_id: id.clone(),
                    })?;
                    if !variant.is_available {
                        return Err(CoreError::ProductUnavailable {
                            name: variant.name.clone(),
                        });
                    }
                    if !unique.contains(id) {
                        unique.push(id.clone());
                    }
                }
                Some(unique)
            }
            None => None,
        };

        let addition = CartAddition {
            variant_ids,
            ..addition
        };
        let upserted = self
            .cart
            .upsert(user_id, &addition, MAX_ITEM_QUANTITY)
            .await?;
        let Some(line) = upserted else {
            let existing = self
                .cart
                .lines(user_id)
                .await?
                .into_iter()
                .find(|d| {
                    d.line.product_id == addition.product_id && d.line.size_id == addition.size_id
                })
                .map_or(0, |d| d.line.quantity);
            return Err(CoreError::QuantityTooLarge {
                requested: existing + addition.quantity,
                max: MAX_ITEM_QUANTITY,
            });
        };
        let cart_count = self.cart.item_count(user_id).await?;

        debug!(user_id = %user_id, line_id = %line.id, quantity = line.quantity, "Cart line upserted");
        Ok(CartAdded { line, cart_count })
    }

    pub async fn update_quantity(
        &self,
        user_id: &str,
        line_id: &str,
        quantity: i64,
    ) -> CoreResult<CartLine> {
        validate_quantity(quantity)?;
        self.cart
            .set_quantity(user_id, line_id, quantity)
            .await?
            .ok_or_else(|| CoreError::not_found("Cart item", line_id))
    }

    pub async fn remove(&self, user_id: &str, line_id: &str) -> CoreResult<()> {
        if !self.cart.remove(user_id, line_id).await? {
            return Err(CoreError::not_found("Cart item", line_id));
        }
        Ok(())
    }

    pub async fn clear(&self, user_id: &str) -> CoreResult<u64> {
        Ok(self.cart.clear(user_id).await?)
    }
}
