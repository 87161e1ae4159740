//! # Address Repository
//!
//! Delivery addresses. At most one address per user has `is_default = 1`:
//! setting a default clears the others in the same transaction. The
//! clearing UPDATE runs first so the write lock is taken before any read.

use async_trait::async_trait;
use chai_core::ports::{AddressStore, StoreResult};
use chai_core::{Address, AddressInput, AddressPatch};
use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};

const ADDRESS_COLUMNS: &str = r#"
    id, user_id, label, address_line1, address_line2, city, state, pincode,
    is_default, created_at, updated_at
"#;

/// Repository for the `addresses` table.
#[derive(Debug, Clone)]
pub struct AddressRepository {
    pool: SqlitePool,
}

impl AddressRepository {
    pub fn new(pool: SqlitePool) -> Self {
        AddressRepository { pool }
    }

    /// Default first, then newest first.
    pub async fn list(&self, user_id: &str) -> DbResult<Vec<Address>> {
        let sql = format!(
            r#"
            SELECT {}
            FROM addresses
            WHERE user_id = ?1
            ORDER BY is_default DESC, created_at DESC, rowid DESC
            "#,
            ADDRESS_COLUMNS
        );
        let addresses = sqlx::query_as::<_, Address>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(addresses)
    }

    pub async fn get(&self, user_id: &str, id: &str) -> DbResult<Option<Address>> {
        let sql = format!(
            "SELECT {} FROM addresses WHERE id = ?1 AND user_id = ?2",
            ADDRESS_COLUMNS
        );
        let address = sqlx::query_as::<_, Address>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(address)
    }

    pub async fn create(&self, user_id: &str, input: &AddressInput) -> DbResult<Address> {
        let now = Utc::now();
        let address = Address {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            label: input.label.clone(),
            address_line1: input.address_line1.clone(),
            address_line2: input.address_line2.clone(),
            city: input.city.clone(),
            state: input.state.clone(),
            pincode: input.pincode.clone(),
            is_default: input.is_default,
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.begin().await?;
        if address.is_default {
            clear_default(&mut tx, user_id).await?;
        }

        sqlx::query(
            r#"
            INSERT INTO addresses (
                id, user_id, label, address_line1, address_line2, city, state, pincode,
                is_default, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&address.id)
        .bind(&address.user_id)
        .bind(&address.label)
        .bind(&address.address_line1)
        .bind(&address.address_line2)
        .bind(&address.city)
        .bind(&address.state)
        .bind(&address.pincode)
        .bind(address.is_default)
        .bind(address.created_at)
        .bind(address.updated_at)
        .execute(&mut *tx)
        .await?;

        commit(tx).await?;
        debug!(user_id = %user_id, id = %address.id, "Address inserted");
        Ok(address)
    }

    /// Applies the set fields of `patch`. `None` when the address does not
    /// belong to the user.
    pub async fn update(
        &self,
        user_id: &str,
        id: &str,
        patch: &AddressPatch,
    ) -> DbResult<Option<Address>> {
        let mut tx = self.begin().await?;

        if patch.is_default == Some(true) {
            // No-op unless the target belongs to the user.
            sqlx::query(
                r#"
                UPDATE addresses SET is_default = 0
                WHERE user_id = ?1 AND is_default = 1 AND id <> ?2
                  AND EXISTS (SELECT 1 FROM addresses WHERE id = ?2 AND user_id = ?1)
                "#,
            )
            .bind(user_id)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }

        let sql = format!(
            r#"
            UPDATE addresses SET
                label = COALESCE(?3, label),
                address_line1 = COALESCE(?4, address_line1),
                address_line2 = COALESCE(?5, address_line2),
                city = COALESCE(?6, city),
                state = COALESCE(?7, state),
                pincode = COALESCE(?8, pincode),
                is_default = COALESCE(?9, is_default),
                updated_at = ?10
            WHERE id = ?1 AND user_id = ?2
            RETURNING {}
            "#,
            ADDRESS_COLUMNS
        );
        let address = sqlx::query_as::<_, Address>(&sql)
            .bind(id)
            .bind(user_id)
            .bind(&patch.label)
            .bind(&patch.address_line1)
            .bind(&patch.address_line2)
            .bind(&patch.city)
            .bind(&patch.state)
            .bind(&patch.pincode)
            .bind(patch.is_default)
            .bind(Utc::now())
            .fetch_optional(&mut *tx)
            .await?;

        commit(tx).await?;
        Ok(address)
    }

    pub async fn delete(&self, user_id: &str, id: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM addresses WHERE id = ?1 AND user_id = ?2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn begin(&self) -> DbResult<Transaction<'static, Sqlite>> {
        self.pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))
    }
}

async fn clear_default(tx: &mut Transaction<'static, Sqlite>, user_id: &str) -> DbResult<()> {
    sqlx::query("UPDATE addresses SET is_default = 0 WHERE user_id = ?1 AND is_default = 1")
        .bind(user_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

async fn commit(tx: Transaction<'static, Sqlite>) -> DbResult<()> {
    tx.commit()
        .await
        .map_err(|e| DbError::TransactionFailed(e.to_string()))
}

#[async_trait]
impl AddressStore for AddressRepository {
    async fn list(&self, user_id: &str) -> StoreResult<Vec<Address>> {
        Ok(AddressRepository::list(self, user_id).await?)
    }

    async fn find(&self, user_id: &str, id: &str) -> StoreResult<Option<Address>> {
        Ok(self.get(user_id, id).await?)
    }

    async fn create(&self, user_id: &str, input: &AddressInput) -> StoreResult<Address> {
        Ok(AddressRepository::create(self, user_id, input).await?)
    }

    async fn update(
        &self,
        user_id: &str,
        id: &str,
        patch: &AddressPatch,
    ) -> StoreResult<Option<Address>> {
        Ok(AddressRepository::update(self, user_id, id, patch).await?)
    }

    async fn delete(&self, user_id: &str, id: &str) -> StoreResult<bool> {
        Ok(AddressRepository::delete(self, user_id, id).await?)
    }
}
