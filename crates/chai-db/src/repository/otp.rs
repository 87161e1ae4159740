//! # OTP Repository
//!
//! Storage for one-time passwords. Verification rules (expiry, single use)
//! live in `chai_core::services::OtpService`; this module only guarantees
//! that rotation and consumption are atomic.

use async_trait::async_trait;
use chai_core::ports::{OtpStore, StoreResult};
use chai_core::{OtpCode, OtpPurpose, OtpRecord};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};

/// Repository for the `otps` table.
#[derive(Debug, Clone)]
pub struct OtpRepository {
    pool: SqlitePool,
}

#[derive(Debug, sqlx::FromRow)]
struct OtpRow {
    id: String,
    phone: String,
    otp: String,
    #[sqlx(rename = "type")]
    purpose: OtpPurpose,
    expires_at: DateTime<Utc>,
    is_used: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<OtpRow> for OtpRecord {
    type Error = DbError;

    fn try_from(row: OtpRow) -> Result<Self, Self::Error> {
        let code = OtpCode::parse(&row.otp)
            .map_err(|e| DbError::Internal(format!("otp {}: {}", row.id, e)))?;
        Ok(OtpRecord {
            id: row.id,
            phone: row.phone,
            code,
            purpose: row.purpose,
            expires_at: row.expires_at,
            is_used: row.is_used,
            created_at: row.created_at,
        })
    }
}

impl OtpRepository {
    pub fn new(pool: SqlitePool) -> Self {
        OtpRepository { pool }
    }

    /// Invalidates the open codes for the phone and purpose, then inserts
    /// the new one. The UPDATE goes first so the write lock is held for the
    /// whole transaction.
    pub async fn rotate(&self, record: &OtpRecord) -> DbResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        let invalidated = sqlx::query(
            "UPDATE otps SET is_used = 1 WHERE phone = ?1 AND type = ?2 AND is_used = 0",
        )
        .bind(&record.phone)
        .bind(record.purpose)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        sqlx::query(
            r#"
            INSERT INTO otps (id, phone, otp, type, expires_at, is_used, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&record.id)
        .bind(&record.phone)
        .bind(record.code.as_str())
        .bind(record.purpose)
        .bind(record.expires_at)
        .bind(record.is_used)
        .bind(record.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        debug!(purpose = %record.purpose, invalidated, "OTP rotated");
        Ok(())
    }

    pub async fn find_latest_unused(
        &self,
        phone: &str,
        code: &str,
        purpose: OtpPurpose,
    ) -> DbResult<Option<OtpRecord>> {
        let row: Option<OtpRow> = sqlx::query_as(
            r#"
            SELECT id, phone, otp, type, expires_at, is_used, created_at
            FROM otps
            WHERE phone = ?1 AND otp = ?2 AND type = ?3 AND is_used = 0
            ORDER BY created_at DESC, rowid DESC
            LIMIT 1
            "#,
        )
        .bind(phone)
        .bind(code)
        .bind(purpose)
        .fetch_optional(&self.pool)
        .await?;

        row.map(OtpRecord::try_from).transpose()
    }

    /// Flips `is_used` if nobody else has. Returns whether this call won.
    pub async fn consume(&self, id: &str) -> DbResult<bool> {
        let result = sqlx::query("UPDATE otps SET is_used = 1 WHERE id = ?1 AND is_used = 0")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Loads a record by id regardless of state.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<OtpRecord>> {
        let row: Option<OtpRow> = sqlx::query_as(
            "SELECT id, phone, otp, type, expires_at, is_used, created_at FROM otps WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(OtpRecord::try_from).transpose()
    }
}

#[async_trait]
impl OtpStore for OtpRepository {
    async fn rotate(&self, record: &OtpRecord) -> StoreResult<()> {
        Ok(OtpRepository::rotate(self, record).await?)
    }

    async fn find_latest_unused(
        &self,
        phone: &str,
        code: &str,
        purpose: OtpPurpose,
    ) -> StoreResult<Option<OtpRecord>> {
        Ok(OtpRepository::find_latest_unused(self, phone, code, purpose).await?)
    }

    async fn consume(&self, id: &str) -> StoreResult<bool> {
        Ok(OtpRepository::consume(self, id).await?)
    }
}
