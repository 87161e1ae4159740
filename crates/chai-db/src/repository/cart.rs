//! # Cart Repository
//!
//! One row per (user, product, size) in `cart_items`, selected add-ons in
//! `cart_item_variants`.
//!
//! ## Revisions
//! Every write to a line bumps `revision`. Order placement deletes the lines
//! it priced with `WHERE id = ? AND revision = ?`, so an edit that lands
//! after the snapshot makes the placement fail instead of being silently
//! charged at the old quantity.
//!
//! ## Upsert
//! ```text
//! INSERT INTO cart_items ... ON CONFLICT (user_id, product_id, size_id)
//! DO UPDATE SET quantity = quantity + excluded.quantity, revision + 1
//!           WHERE quantity + excluded.quantity <= max
//! RETURNING *
//! ```
//! Two concurrent adds of the same line both land on the unique index. The
//! merge is checked against the cap in the same statement, so the second
//! add gets no row back when the sum would pass it.

use async_trait::async_trait;
use chai_core::ports::{CartStore, StoreResult};
use chai_core::{CartAddition, CartLine, CartLineDetail, ProductVariant};
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::CatalogRepository;

const LINE_COLUMNS: &str =
    "id, user_id, product_id, size_id, quantity, revision, created_at, updated_at";

/// Repository for `cart_items` and `cart_item_variants`.
#[derive(Debug, Clone)]
pub struct CartRepository {
    pool: SqlitePool,
}

impl CartRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CartRepository { pool }
    }

    /// The user's lines, oldest first.
    pub async fn lines_of(&self, user_id: &str) -> DbResult<Vec<CartLine>> {
        let sql = format!(
            "SELECT {} FROM cart_items WHERE user_id = ?1 ORDER BY created_at, rowid",
            LINE_COLUMNS
        );
        let lines = sqlx::query_as::<_, CartLine>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(lines)
    }

    /// Lines joined with the catalog rows they price against.
    pub async fn details(&self, user_id: &str) -> DbResult<Vec<CartLineDetail>> {
        let catalog = CatalogRepository::new(self.pool.clone());
        let lines = self.lines_of(user_id).await?;
        let mut details = Vec::with_capacity(lines.len());

        for line in lines {
            let product = catalog
                .get_product(&line.product_id)
                .await?
                .ok_or_else(|| DbError::not_found("Product", &line.product_id))?;
            let size = catalog
                .sizes_of(&line.product_id)
                .await?
                .into_iter()
                .find(|s| s.id == line.size_id)
                .ok_or_else(|| DbError::not_found("Product size", &line.size_id))?;
            let variants = self.variants_of_line(&line.id).await?;

            details.push(CartLineDetail {
                line,
                product,
                size,
                variants,
            });
        }

        Ok(details)
    }

    async fn variants_of_line(&self, line_id: &str) -> DbResult<Vec<ProductVariant>> {
        let variants = sqlx::query_as::<_, ProductVariant>(
            r#"
            SELECT v.id, v.product_id, v.name, v.price_paise, v.image, v.is_available
            FROM cart_item_variants civ
            JOIN product_variants v ON v.id = civ.variant_id
            WHERE civ.cart_item_id = ?1
            ORDER BY v.price_paise, v.name
            "#,
        )
        .bind(line_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(variants)
    }

    /// Adds to the (user, product, size) line, creating it if needed. When
    /// `variant_ids` is set the line's variants are replaced.
    ///
    /// `None` when the merged quantity would exceed `max_quantity`; nothing
    /// is written in that case.
    pub async fn upsert(
        &self,
        user_id: &str,
        addition: &CartAddition,
        max_quantity: i64,
    ) -> DbResult<Option<CartLine>> {
        let now = Utc::now();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        let sql = format!(
            r#"
            INSERT INTO cart_items (
                id, user_id, product_id, size_id, quantity, revision, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6, ?6)
            ON CONFLICT (user_id, product_id, size_id) DO UPDATE SET
                quantity = cart_items.quantity + excluded.quantity,
                revision = cart_items.revision + 1,
                updated_at = excluded.updated_at
            WHERE cart_items.quantity + excluded.quantity <= ?7
            RETURNING {}
            "#,
            LINE_COLUMNS
        );
        let line = sqlx::query_as::<_, CartLine>(&sql)
            .bind(Uuid::new_v4().to_string())
            .bind(user_id)
            .bind(&addition.product_id)
            .bind(&addition.size_id)
            .bind(addition.quantity)
            .bind(now)
            .bind(max_quantity)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(line) = line else {
            debug!(
                user_id = %user_id,
                product_id = %addition.product_id,
                size_id = %addition.size_id,
                "Cart add rejected, merged quantity over limit"
            );
            return Ok(None);
        };

        if let Some(variant_ids) = &addition.variant_ids {
            sqlx::query("DELETE FROM cart_item_variants WHERE cart_item_id = ?1")
                .bind(&line.id)
                .execute(&mut *tx)
                .await?;

            for variant_id in variant_ids {
                sqlx::query(
                    r#"
                    INSERT INTO cart_item_variants (cart_item_id, variant_id)
                    VALUES (?1, ?2)
                    ON CONFLICT DO NOTHING
                    "#,
                )
                .bind(&line.id)
                .bind(variant_id)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        debug!(
            user_id = %user_id,
            line_id = %line.id,
            quantity = line.quantity,
            revision = line.revision,
            "Cart line upserted"
        );
        Ok(Some(line))
    }

    pub async fn set_quantity(
        &self,
        user_id: &str,
        line_id: &str,
        quantity: i64,
    ) -> DbResult<Option<CartLine>> {
        let sql = format!(
            r#"
            UPDATE cart_items
            SET quantity = ?3, revision = revision + 1, updated_at = ?4
            WHERE id = ?1 AND user_id = ?2
            RETURNING {}
            "#,
            LINE_COLUMNS
        );
        let line = sqlx::query_as::<_, CartLine>(&sql)
            .bind(line_id)
            .bind(user_id)
            .bind(quantity)
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await?;
        Ok(line)
    }

    pub async fn remove(&self, user_id: &str, line_id: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM cart_items WHERE id = ?1 AND user_id = ?2")
            .bind(line_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn clear(&self, user_id: &str) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM cart_items WHERE user_id = ?1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn item_count(&self, user_id: &str) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COALESCE(SUM(quantity), 0) FROM cart_items WHERE user_id = ?1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}

#[async_trait]
impl CartStore for CartRepository {
    async fn lines(&self, user_id: &str) -> StoreResult<Vec<CartLineDetail>> {
        Ok(self.details(user_id).await?)
    }

    async fn upsert(
        &self,
        user_id: &str,
        addition: &CartAddition,
        max_quantity: i64,
    ) -> StoreResult<Option<CartLine>> {
        Ok(CartRepository::upsert(self, user_id, addition, max_quantity).await?)
    }

    async fn set_quantity(
        &self,
        user_id: &str,
        line_id: &str,
        quantity: i64,
    ) -> StoreResult<Option<CartLine>> {
        Ok(CartRepository::set_quantity(self, user_id, line_id, quantity).await?)
    }

    async fn remove(&self, user_id: &str, line_id: &str) -> StoreResult<bool> {
        Ok(CartRepository::remove(self, user_id, line_id).await?)
    }

    async fn clear(&self, user_id: &str) -> StoreResult<u64> {
        Ok(CartRepository::clear(self, user_id).await?)
    }

    async fn item_count(&self, user_id: &str) -> StoreResult<i64> {
        Ok(CartRepository::item_count(self, user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chai_core::MAX_ITEM_QUANTITY;

    use crate::repository::test_support::{create_user, database, seed_catalog};
    use crate::{Database, DbConfig};

    fn addition(product: &str, size: &str, quantity: i64, variants: Option<Vec<&str>>) -> CartAddition {
        CartAddition {
            product_id: product.to_string(),
            size_id: size.to_string(),
            quantity,
            variant_ids: variants.map(|v| v.into_iter().map(str::to_string).collect()),
        }
    }

    async fn add(db: &Database, user_id: &str, addition: &CartAddition) -> CartLine {
        db.cart()
            .upsert(user_id, addition, MAX_ITEM_QUANTITY)
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn test_upsert_merges_quantity_and_bumps_revision() {
        let db = database().await;
        let ids = seed_catalog(&db).await;
        let user = create_user(&db, "9876543210").await;
        let repo = db.cart();

        let first = add(
            &db,
            &user.id,
            &addition(&ids.chai, &ids.medium, 2, Some(vec![&ids.ginger])),
        )
        .await;
        let second = add(&db, &user.id, &addition(&ids.chai, &ids.medium, 3, None)).await;

        assert_eq!(first.id, second.id);
        assert_eq!(second.quantity, 5);
        assert_eq!(second.revision, first.revision + 1);
        assert_eq!(repo.item_count(&user.id).await.unwrap(), 5);

        // Variants survive an add without variant_ids.
        let lines = repo.details(&user.id).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].variants.len(), 1);
        assert_eq!(lines[0].variants[0].id, ids.ginger);
    }

    #[tokio::test]
    async fn test_upsert_replaces_variants_when_given() {
        let db = database().await;
        let ids = seed_catalog(&db).await;
        let user = create_user(&db, "9876543210").await;

        add(
            &db,
            &user.id,
            &addition(&ids.chai, &ids.medium, 1, Some(vec![&ids.ginger])),
        )
        .await;
        add(
            &db,
            &user.id,
            &addition(&ids.chai, &ids.medium, 1, Some(vec![&ids.elaichi])),
        )
        .await;

        let lines = db.cart().details(&user.id).await.unwrap();
        let names: Vec<&str> = lines[0].variants.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["Elaichi"]);
        assert_eq!(lines[0].line_total().paise(), 2 * (7000 + 1000));
    }

    #[tokio::test]
    async fn test_upsert_over_limit_writes_nothing() {
        let db = database().await;
        let ids = seed_catalog(&db).await;
        let user = create_user(&db, "9876543210").await;
        let repo = db.cart();

        let line = add(
            &db,
            &user.id,
            &addition(&ids.chai, &ids.medium, 90, Some(vec![&ids.ginger])),
        )
        .await;
        let rejected = repo
            .upsert(
                &user.id,
                &addition(&ids.chai, &ids.medium, 10, Some(vec![&ids.elaichi])),
                MAX_ITEM_QUANTITY,
            )
            .await
            .unwrap();
        assert!(rejected.is_none());

        let lines = repo.details(&user.id).await.unwrap();
        assert_eq!(lines[0].line.quantity, 90);
        assert_eq!(lines[0].line.revision, line.revision);
        assert_eq!(lines[0].variants[0].id, ids.ginger);

        // Exactly at the limit is fine.
        let merged = add(&db, &user.id, &addition(&ids.chai, &ids.medium, 9, None)).await;
        assert_eq!(merged.quantity, MAX_ITEM_QUANTITY);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_adds_respect_limit() {
        let path = std::env::temp_dir().join(format!("chai-cart-{}.db", Uuid::new_v4()));
        let db = Database::new(DbConfig::new(&path).max_connections(2))
            .await
            .unwrap();
        let ids = seed_catalog(&db).await;
        let user = create_user(&db, "9876543210").await;
        let sixty = addition(&ids.chai, &ids.medium, 60, None);

        let (repo_a, repo_b) = (db.cart(), db.cart());
        let (a, b) = tokio::join!(
            repo_a.upsert(&user.id, &sixty, MAX_ITEM_QUANTITY),
            repo_b.upsert(&user.id, &sixty, MAX_ITEM_QUANTITY),
        );
        let landed = [a.unwrap(), b.unwrap()]
            .into_iter()
            .filter(Option::is_some)
            .count();

        assert_eq!(landed, 1);
        assert_eq!(db.cart().item_count(&user.id).await.unwrap(), 60);

        db.close().await;
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_different_sizes_are_separate_lines() {
        let db = database().await;
        let ids = seed_catalog(&db).await;
        let user = create_user(&db, "9876543210").await;

        add(&db, &user.id, &addition(&ids.chai, &ids.small, 1, None)).await;
        add(&db, &user.id, &addition(&ids.chai, &ids.large, 1, None)).await;

        let lines = db.cart().details(&user.id).await.unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].size.id, ids.small);
        assert_eq!(lines[1].size.id, ids.large);
    }

    #[tokio::test]
    async fn test_lines_are_private() {
        let db = database().await;
        let ids = seed_catalog(&db).await;
        let owner = create_user(&db, "9876543210").await;
        let other = create_user(&db, "9123456780").await;
        let repo = db.cart();

        let line = add(
            &db,
            &owner.id,
            &addition(&ids.samosa, &ids.samosa_plate, 1, None),
        )
        .await;

        assert!(repo.set_quantity(&other.id, &line.id, 4).await.unwrap().is_none());
        assert!(!repo.remove(&other.id, &line.id).await.unwrap());
        assert_eq!(repo.clear(&other.id).await.unwrap(), 0);

        let updated = repo.set_quantity(&owner.id, &line.id, 4).await.unwrap().unwrap();
        assert_eq!(updated.quantity, 4);
        assert_eq!(updated.revision, line.revision + 1);

        assert!(repo.remove(&owner.id, &line.id).await.unwrap());
        assert_eq!(repo.item_count(&owner.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unknown_size_is_foreign_key_violation() {
        let db = database().await;
        let ids = seed_catalog(&db).await;
        let user = create_user(&db, "9876543210").await;

        let err = db
            .cart()
            .upsert(
                &user.id,
                &addition(&ids.chai, "no-such-size", 1, None),
                MAX_ITEM_QUANTITY,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }
}
