//! # Order Repository
//!
//! Orders, their frozen lines and frozen add-ons.
//!
//! ## Placement Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │   1. DELETE cart_items WHERE id = ? AND user_id = ? AND revision = ?    │
//! │      (one per consumed line; 0 rows → Stale, ROLLBACK)                  │
//! │   2. INSERT orders SELECT … WHERE the address is the user's            │
//! │      (0 rows → NotFound, ROLLBACK; duplicate order_number → Conflict)  │
//! │   3. INSERT order_items         (position = cart order)                 │
//! │   4. INSERT order_item_variants                                         │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! The first statement is a write, so the SQLite write lock is held from
//! the start and no other request can slip a cart edit in between.

use async_trait::async_trait;
use chai_core::order::PlacedOrder;
use chai_core::ports::{OrderStore, StoreResult};
use chai_core::{Order, OrderLine, OrderLineVariant, OrderStatus, Page, PageRequest};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};

const ORDER_COLUMNS: &str = r#"
    id, user_id, order_number, subtotal_paise, tax_paise, delivery_fee_paise, total_paise,
    status, payment_method, payment_status, delivery_address_id, special_instructions,
    estimated_delivery_at, created_at, updated_at
"#;

/// Repository for `orders`, `order_items` and `order_item_variants`.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Persists a placed order and consumes its cart lines atomically.
    pub async fn place(&self, placed: &PlacedOrder) -> DbResult<()> {
        let order = &placed.order;
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        for consumed in &placed.consumed_lines {
            let deleted = sqlx::query(
                "DELETE FROM cart_items WHERE id = ?1 AND user_id = ?2 AND revision = ?3",
            )
            .bind(&consumed.id)
            .bind(&order.user_id)
            .bind(consumed.revision)
            .execute(&mut *tx)
            .await?
            .rows_affected();

            if deleted != 1 {
                warn!(
                    order_number = %order.order_number,
                    line_id = %consumed.id,
                    "Cart line changed during checkout"
                );
                return Err(DbError::Stale(format!("cart line {}", consumed.id)));
            }
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO orders (
                id, user_id, order_number,
                subtotal_paise, tax_paise, delivery_fee_paise, total_paise,
                status, payment_method, payment_status,
                delivery_address_id, special_instructions, estimated_delivery_at,
                created_at, updated_at
            )
            SELECT
                ?1, ?2, ?3,
                ?4, ?5, ?6, ?7,
                ?8, ?9, ?10,
                ?11, ?12, ?13,
                ?14, ?15
            WHERE EXISTS (SELECT 1 FROM addresses WHERE id = ?11 AND user_id = ?2)
            "#,
        )
        .bind(&order.id)
        .bind(&order.user_id)
        .bind(&order.order_number)
        .bind(order.subtotal_paise)
        .bind(order.tax_paise)
        .bind(order.delivery_fee_paise)
        .bind(order.total_paise)
        .bind(order.status)
        .bind(&order.payment_method)
        .bind(order.payment_status)
        .bind(&order.delivery_address_id)
        .bind(&order.special_instructions)
        .bind(order.estimated_delivery_at)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if inserted != 1 {
            let address_id = order.delivery_address_id.clone().unwrap_or_default();
            warn!(
                order_number = %order.order_number,
                address_id = %address_id,
                "Delivery address gone during checkout"
            );
            return Err(DbError::not_found("Address", address_id));
        }

        for (position, item) in order.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_items (
                    id, order_id, product_id, product_name, product_image,
                    size_name, size_price_paise, quantity, item_total_paise, position
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                "#,
            )
            .bind(&item.id)
            .bind(&order.id)
            .bind(&item.product_id)
            .bind(&item.product_name)
            .bind(&item.product_image)
            .bind(&item.size_name)
            .bind(item.size_price_paise)
            .bind(item.quantity)
            .bind(item.item_total_paise)
            .bind(position as i64)
            .execute(&mut *tx)
            .await?;

            for (variant_position, variant) in item.variants.iter().enumerate() {
                sqlx::query(
                    r#"
                    INSERT INTO order_item_variants (
                        id, order_item_id, variant_name, variant_price_paise, position
                    ) VALUES (?1, ?2, ?3, ?4, ?5)
                    "#,
                )
                .bind(&variant.id)
                .bind(&item.id)
                .bind(&variant.variant_name)
                .bind(variant.variant_price_paise)
                .bind(variant_position as i64)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        debug!(
            order_number = %order.order_number,
            lines = order.items.len(),
            "Order persisted"
        );
        Ok(())
    }

    /// Header, lines and add-ons of one of the user's orders.
    pub async fn get_by_number(&self, user_id: &str, order_number: &str) -> DbResult<Option<Order>> {
        let sql = format!(
            "SELECT {} FROM orders WHERE user_id = ?1 AND order_number = ?2",
            ORDER_COLUMNS
        );
        let Some(mut order) = sqlx::query_as::<_, Order>(&sql)
            .bind(user_id)
            .bind(order_number)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        order.items = self.lines_of(&order.id).await?;
        Ok(Some(order))
    }

    async fn lines_of(&self, order_id: &str) -> DbResult<Vec<OrderLine>> {
        let mut lines = sqlx::query_as::<_, OrderLine>(
            r#"
            SELECT id, order_id, product_id, product_name, product_image,
                   size_name, size_price_paise, quantity, item_total_paise
            FROM order_items
            WHERE order_id = ?1
            ORDER BY position
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        for line in &mut lines {
            line.variants = sqlx::query_as::<_, OrderLineVariant>(
                r#"
                SELECT id, order_item_id AS order_line_id, variant_name, variant_price_paise
                FROM order_item_variants
                WHERE order_item_id = ?1
                ORDER BY position
                "#,
            )
            .bind(&line.id)
            .fetch_all(&self.pool)
            .await?;
        }

        Ok(lines)
    }

    /// Order headers, newest first.
    pub async fn list(
        &self,
        user_id: &str,
        status: Option<OrderStatus>,
        page: PageRequest,
    ) -> DbResult<Page<Order>> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM orders WHERE user_id = ?1 AND (?2 IS NULL OR status = ?2)",
        )
        .bind(user_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        let sql = format!(
            r#"
            SELECT {}
            FROM orders
            WHERE user_id = ?1 AND (?2 IS NULL OR status = ?2)
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?3 OFFSET ?4
            "#,
            ORDER_COLUMNS
        );
        let orders = sqlx::query_as::<_, Order>(&sql)
            .bind(user_id)
            .bind(status)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::new(orders, total, page))
    }

    /// Compare-and-set on `status`.
    pub async fn update_status(
        &self,
        order_id: &str,
        from: OrderStatus,
        to: OrderStatus,
        at: DateTime<Utc>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE orders SET status = ?3, updated_at = ?4 WHERE id = ?1 AND status = ?2",
        )
        .bind(order_id)
        .bind(from)
        .bind(to)
        .bind(at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl OrderStore for OrderRepository {
    async fn place(&self, placed: &PlacedOrder) -> StoreResult<()> {
        Ok(OrderRepository::place(self, placed).await?)
    }

    async fn find_by_number(
        &self,
        user_id: &str,
        order_number: &str,
    ) -> StoreResult<Option<Order>> {
        Ok(self.get_by_number(user_id, order_number).await?)
    }

    async fn list(
        &self,
        user_id: &str,
        status: Option<OrderStatus>,
        page: PageRequest,
    ) -> StoreResult<Page<Order>> {
        Ok(OrderRepository::list(self, user_id, status, page).await?)
    }

    async fn update_status(
        &self,
        order_id: &str,
        from: OrderStatus,
        to: OrderStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        Ok(OrderRepository::update_status(self, order_id, from, to, at).await?)
    }
}
