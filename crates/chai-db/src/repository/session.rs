//! # Session Repository
//!
//! Revoked bearer token ids. Rows past their token's own expiry are dead
//! weight and can be purged at any time.

use async_trait::async_trait;
use chai_core::ports::{SessionStore, StoreResult};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;

/// Repository for the `revoked_tokens` table.
#[derive(Debug, Clone)]
pub struct SessionRepository {
    pool: SqlitePool,
}

impl SessionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SessionRepository { pool }
    }

    pub async fn revoke(&self, token_id: &str, expires_at: DateTime<Utc>) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO revoked_tokens (token_id, expires_at, revoked_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT (token_id) DO NOTHING
            "#,
        )
        .bind(token_id)
        .bind(expires_at)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        debug!(token_id = %token_id, "Token revoked");
        Ok(())
    }

    pub async fn is_revoked(&self, token_id: &str) -> DbResult<bool> {
        let found: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM revoked_tokens WHERE token_id = ?1")
                .bind(token_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(found.is_some())
    }

    /// Deletes revocations whose tokens have expired on their own.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM revoked_tokens WHERE expires_at < ?1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl SessionStore for SessionRepository {
    async fn revoke(&self, token_id: &str, expires_at: DateTime<Utc>) -> StoreResult<()> {
        Ok(SessionRepository::revoke(self, token_id, expires_at).await?)
    }

    async fn is_revoked(&self, token_id: &str) -> StoreResult<bool> {
        Ok(SessionRepository::is_revoked(self, token_id).await?)
    }
}
