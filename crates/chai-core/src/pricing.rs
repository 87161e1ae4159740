//! # Pricing Engine
//!
//! The single place where cart and order amounts are computed. The cart
//! preview and order placement both call [`PricingEngine::totals`], so the
//! amount a customer sees is the amount that gets frozen into the order.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  line_total   = (size price + Σ variant prices) × quantity              │
//! │  subtotal     = Σ line_total                                            │
//! │  tax          = subtotal × 5%, half away from zero, to the paisa        │
//! │  delivery_fee = ₹20.00                                                  │
//! │  total        = subtotal + tax + delivery_fee                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Client-supplied totals are never read. Orders recompute from the cart.

use serde::Serialize;

use crate::money::{Money, TaxRate};
use crate::types::CartLineDetail;
use crate::{DELIVERY_FEE_PAISE, TAX_RATE_BPS};

/// Computes one line: `(size_price + Σ variant_prices) × quantity`.
///
/// ## Example
/// ```rust
/// use chai_core::money::Money;
/// use chai_core::pricing::line_total;
///
/// let total = line_total(Money::from_paise(5000), &[], 3);
/// assert_eq!(total.paise(), 15000);
/// ```
pub fn line_total(size_price: Money, variant_prices: &[Money], quantity: i64) -> Money {
    let unit: Money = size_price + variant_prices.iter().sum::<Money>();
    unit.multiply_quantity(quantity)
}

/// Totals for a cart preview or an order header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OrderTotals {
    pub subtotal: Money,
    pub tax: Money,
    pub delivery_fee: Money,
    pub total: Money,
}

/// Tax rate and delivery fee applied to every order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingEngine {
    tax_rate: TaxRate,
    delivery_fee: Money,
}

impl Default for PricingEngine {
    /// 5% tax and a ₹20.00 delivery fee.
    fn default() -> Self {
        PricingEngine {
            tax_rate: TaxRate::from_bps(TAX_RATE_BPS),
            delivery_fee: Money::from_paise(DELIVERY_FEE_PAISE),
        }
    }
}

impl PricingEngine {
    pub fn new(tax_rate: TaxRate, delivery_fee: Money) -> Self {
        PricingEngine {
            tax_rate,
            delivery_fee,
        }
    }

    /// Totals over already-computed line totals.
    ///
    /// The delivery fee is charged even for an empty list; order placement
    /// rejects empty carts before pricing.
    pub fn totals<I>(&self, line_totals: I) -> OrderTotals
    where
        I: IntoIterator<Item = Money>,
    {
        let subtotal: Money = line_totals.into_iter().sum();
        let tax = subtotal.calculate_tax(self.tax_rate);
        OrderTotals {
            subtotal,
            tax,
            delivery_fee: self.delivery_fee,
            total: subtotal + tax + self.delivery_fee,
        }
    }

    /// Totals over a cart snapshot.
    pub fn cart_totals(&self, lines: &[CartLineDetail]) -> OrderTotals {
        self.totals(lines.iter().map(CartLineDetail::line_total))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn paise(v: i64) -> Money {
        Money::from_paise(v)
    }

    #[test]
    fn test_line_total_with_variants() {
        // Medium ₹70 + two ₹10 add-ons, quantity 2 → ₹180
        let total = line_total(paise(7000), &[paise(1000), paise(1000)], 2);
        assert_eq!(total, paise(18000));
    }

    #[test]
    fn test_line_total_without_variants() {
        assert_eq!(line_total(paise(5000), &[], 1), paise(5000));
    }

    #[test]
    fn test_order_totals_example() {
        let totals = PricingEngine::default().totals([paise(18000)]);
        assert_eq!(totals.subtotal, paise(18000));
        assert_eq!(totals.tax, paise(900));
        assert_eq!(totals.delivery_fee, paise(2000));
        assert_eq!(totals.total, paise(20900));
    }

    #[test]
    fn test_total_identity_holds() {
        let engine = PricingEngine::default();
        for lines in [vec![paise(1010)], vec![paise(333), paise(777)], vec![paise(99_999)]] {
            let t = engine.totals(lines);
            assert_eq!(t.total, t.subtotal + t.tax + t.delivery_fee);
        }
    }

    #[test]
    fn test_tax_rounded_once_on_subtotal() {
        // Two lines of ₹5.05: per-line tax would be 25.25 → 25 each (50),
        // subtotal tax is 1010 × 5% = 50.5 → 51.
        let t = PricingEngine::default().totals([paise(505), paise(505)]);
        assert_eq!(t.tax, paise(51));
    }

    #[test]
    fn test_custom_engine() {
        let engine = PricingEngine::new(TaxRate::zero(), Money::zero());
        let t = engine.totals([paise(1000)]);
        assert_eq!(t.total, paise(1000));
    }
}
