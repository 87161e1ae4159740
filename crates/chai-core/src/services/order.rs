//! Order placement, history and cancellation.
//!
//! ## Placement
//! ```text
//! place_order(user, request)
//!      │
//!      ├── 1. address owned by user?            no → NotFound("Address")
//!      ├── 2. cart snapshot (lines + catalog rows)
//!      ├── 3. build_order: empty? unavailable?  → CartEmpty / ProductUnavailable
//!      │       price lines, freeze names/prices, new order number
//!      ▼
//! OrderStore::place (one transaction)
//!      ├── insert header, lines, line variants
//!      └── delete consumed cart lines; a line changed since step 2 → Stale,
//!          everything rolled back
//! ```

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::error::{CoreError, CoreResult};
use crate::order::{build_order, Order, OrderRequest, OrderStatus};
use crate::pagination::{Page, PageRequest};
use crate::ports::{AddressStore, CartStore, Clock, OrderStore};
use crate::pricing::PricingEngine;
use crate::types::Address;

/// An order with its delivery address, if the address still exists.
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetails {
    #[serde(flatten)]
    pub order: Order,
    pub delivery_address: Option<Address>,
}

#[derive(Clone)]
pub struct OrderService {
    orders: Arc<dyn OrderStore>,
    cart: Arc<dyn CartStore>,
    addresses: Arc<dyn AddressStore>,
    pricing: PricingEngine,
    clock: Arc<dyn Clock>,
}

impl OrderService {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        cart: Arc<dyn CartStore>,
        addresses: Arc<dyn AddressStore>,
        pricing: PricingEngine,
        clock: Arc<dyn Clock>,
    ) -> Self {
        OrderService {
            orders,
            cart,
            addresses,
            pricing,
            clock,
        }
    }

    /// Turns the user's cart into a pending order and empties the cart.
    pub async fn place_order(&self, user_id: &str, request: OrderRequest) -> CoreResult<Order> {
        request.validate()?;

        if self
            .addresses
            .find(user_id, &request.delivery_address_id)
            .await?
            .is_none()
        {
            return Err(CoreError::not_found("Address", &request.delivery_address_id));
        }

        let lines = self.cart.lines(user_id).await?;
        let placed = build_order(user_id, &request, &lines, &self.pricing, self.clock.now())?;
        self.orders.place(&placed).await?;

        let order = placed.order;
        info!(
            user_id = %user_id,
            order_number = %order.order_number,
            lines = order.items.len(),
            total_paise = order.total_paise,
            "Order placed"
        );
        Ok(order)
    }

    /// Order headers, newest first.
    pub async fn list(
        &self,
        user_id: &str,
        status: Option<OrderStatus>,
        page: PageRequest,
    ) -> CoreResult<Page<Order>> {
        Ok(self.orders.list(user_id, status, page).await?)
    }

    pub async fn get(&self, user_id: &str, order_number: &str) -> CoreResult<OrderDetails> {
        let order = self.find(user_id, order_number).await?;
        let delivery_address = match &order.delivery_address_id {
            Some(id) => self.addresses.find(user_id, id).await?,
            None => None,
        };
        Ok(OrderDetails {
            order,
            delivery_address,
        })
    }

    /// Cancels a pending order.
    pub async fn cancel(&self, user_id: &str, order_number: &str) -> CoreResult<Order> {
        self.transition(user_id, order_number, OrderStatus::Cancelled)
            .await
    }

    /// Moves an order along the status machine. The store write is
    /// conditional on the status read here, so two racing changes cannot
    /// both apply.
    pub async fn transition(
        &self,
        user_id: &str,
        order_number: &str,
        next: OrderStatus,
    ) -> CoreResult<Order> {
        let order = self.find(user_id, order_number).await?;
        let rejected = |from| CoreError::InvalidStatusTransition {
            order_number: order_number.to_string(),
            from,
            to: next,
        };

        if !order.status.can_transition_to(next) {
            return Err(rejected(order.status));
        }

        let changed = self
            .orders
            .update_status(&order.id, order.status, next, self.clock.now())
            .await?;
        let current = self.find(user_id, order_number).await?;
        if !changed {
            return Err(rejected(current.status));
        }

        info!(order_number = %order_number, from = %order.status, to = %next, "Order status changed");
        Ok(current)
    }

    async fn find(&self, user_id: &str, order_number: &str) -> CoreResult<Order> {
        self.orders
            .find_by_number(user_id, order_number)
            .await?
            .ok_or_else(|| CoreError::not_found("Order", order_number))
    }
}
