//! # User Repository
//!
//! Customer accounts. Phone and email are unique (`UNIQUE` columns), and a
//! social provider id is unique per provider (partial index).

use async_trait::async_trait;
use chai_core::ports::{StoreResult, UserStore};
use chai_core::{AuthProvider, NewUser, ProfilePatch, User};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};

const USER_COLUMNS: &str = r#"
    id, name, phone, email, password_hash, profile_image,
    is_verified, phone_verified_at, auth_provider, provider, provider_id,
    created_at, updated_at
"#;

/// Repository for the `users` table.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Inserts a user. Duplicate phone or email → `UniqueViolation`.
    pub async fn create(&self, new_user: &NewUser) -> DbResult<User> {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4().to_string(),
            name: new_user.name.clone(),
            phone: new_user.phone.clone(),
            email: new_user.email.clone(),
            password_hash: new_user.password_hash.clone(),
            profile_image: new_user.profile_image.clone(),
            is_verified: new_user.is_verified,
            phone_verified_at: None,
            auth_provider: new_user.auth_provider,
            provider: new_user.provider,
            provider_id: new_user.provider_id.clone(),
            created_at: now,
            updated_at: now,
        };

        debug!(id = %user.id, provider = user.auth_provider.as_str(), "Inserting user");

        sqlx::query(
            r#"
            INSERT INTO users (
                id, name, phone, email, password_hash, profile_image,
                is_verified, phone_verified_at, auth_provider, provider, provider_id,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.phone)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.profile_image)
        .bind(user.is_verified)
        .bind(user.phone_verified_at)
        .bind(user.auth_provider)
        .bind(user.provider)
        .bind(&user.provider_id)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<User>> {
        self.fetch_one_where("id = ?1", id).await
    }

    pub async fn get_by_phone(&self, phone: &str) -> DbResult<Option<User>> {
        self.fetch_one_where("phone = ?1", phone).await
    }

    pub async fn get_by_email(&self, email: &str) -> DbResult<Option<User>> {
        self.fetch_one_where("email = ?1", email).await
    }

    pub async fn get_by_provider(
        &self,
        provider: AuthProvider,
        provider_id: &str,
    ) -> DbResult<Option<User>> {
        let sql = format!(
            "SELECT {} FROM users WHERE provider = ?1 AND provider_id = ?2",
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(provider)
            .bind(provider_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn mark_verified(&self, id: &str, at: DateTime<Utc>) -> DbResult<User> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET is_verified = 1, phone_verified_at = ?2, updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(at)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        self.reload(id, result.rows_affected()).await
    }

    pub async fn set_password(&self, id: &str, password_hash: &str) -> DbResult<()> {
        let result =
            sqlx::query("UPDATE users SET password_hash = ?2, updated_at = ?3 WHERE id = ?1")
                .bind(id)
                .bind(password_hash)
                .bind(Utc::now())
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }
        Ok(())
    }

    pub async fn link_provider(
        &self,
        id: &str,
        provider: AuthProvider,
        provider_id: &str,
    ) -> DbResult<User> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET provider = ?2, provider_id = ?3, is_verified = 1, updated_at = ?4
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(provider)
        .bind(provider_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        self.reload(id, result.rows_affected()).await
    }

    /// Applies the set fields of `patch`; unset fields keep their value.
    pub async fn update_profile(&self, id: &str, patch: &ProfilePatch) -> DbResult<User> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET name = COALESCE(?2, name),
                email = COALESCE(?3, email),
                profile_image = COALESCE(?4, profile_image),
                updated_at = ?5
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&patch.name)
        .bind(&patch.email)
        .bind(&patch.profile_image)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        self.reload(id, result.rows_affected()).await
    }

    async fn fetch_one_where(&self, condition: &str, value: &str) -> DbResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE {}", USER_COLUMNS, condition);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn reload(&self, id: &str, rows_affected: u64) -> DbResult<User> {
        if rows_affected == 0 {
            return Err(DbError::not_found("User", id));
        }
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("User", id))
    }
}

#[async_trait]
impl UserStore for UserRepository {
    async fn create(&self, user: &NewUser) -> StoreResult<User> {
        Ok(UserRepository::create(self, user).await?)
    }

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<User>> {
        Ok(self.get_by_id(id).await?)
    }

    async fn find_by_phone(&self, phone: &str) -> StoreResult<Option<User>> {
        Ok(self.get_by_phone(phone).await?)
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.get_by_email(email).await?)
    }

    async fn find_by_provider(
        &self,
        provider: AuthProvider,
        provider_id: &str,
    ) -> StoreResult<Option<User>> {
        Ok(self.get_by_provider(provider, provider_id).await?)
    }

    async fn mark_verified(&self, id: &str, at: DateTime<Utc>) -> StoreResult<User> {
        Ok(UserRepository::mark_verified(self, id, at).await?)
    }

    async fn set_password(&self, id: &str, password_hash: &str) -> StoreResult<()> {
        Ok(UserRepository::set_password(self, id, password_hash).await?)
    }

    async fn link_provider(
        &self,
        id: &str,
        provider: AuthProvider,
        provider_id: &str,
    ) -> StoreResult<User> {
        Ok(UserRepository::link_provider(self, id, provider, provider_id).await?)
    }

    async fn update_profile(&self, id: &str, patch: &ProfilePatch) -> StoreResult<User> {
        Ok(UserRepository::update_profile(self, id, patch).await?)
    }
}
