/// Postgres-backed user and token stores.
///
/// Refresh-token and one-time-token writes that race (two consumers of the
/// same token) are settled here with conditional updates: the row is only
/// mutated while its precondition still holds, so exactly one caller wins.
/// One-time tokens are stored as SHA-256 digests; the plaintext leaves the
/// process only inside the notification email.
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rand::{distributions::Alphanumeric, Rng};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AuthError, Result};
use crate::models::{OneTimeTokenKind, RefreshTokenRecord, User};
use crate::store::{DurableTokenStore, UserStore};

/// Length of a one-time token (alphanumeric characters)
const ONE_TIME_TOKEN_LEN: usize = 32;

#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, password_hash, is_active, is_verified, role, created_at, updated_at)
            VALUES (gen_random_uuid(), $1, $2, false, false, 'user', CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
            RETURNING *
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if e.to_string().contains("unique constraint") {
                AuthError::EmailInUse
            } else {
                AuthError::Database(e.to_string())
            }
        })
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn mark_verified(&self, id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users SET is_verified = true, is_active = true, updated_at = CURRENT_TIMESTAMP WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users SET password_hash = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2
            "#,
        )
        .bind(password_hash)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_email(&self, id: Uuid, email: &str) -> Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET email = $1, is_verified = false, is_active = false, updated_at = CURRENT_TIMESTAMP
            WHERE id = $2
            RETURNING *
            "#,
        )
        .bind(email)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            if e.to_string().contains("unique constraint") {
                AuthError::EmailInUse
            } else {
                AuthError::Database(e.to_string())
            }
        })?;

        user.ok_or(AuthError::UserNotFound)
    }

    async fn update_role(&self, id: Uuid, role: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET role = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2
            RETURNING *
            "#,
        )
        .bind(role)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn list_users(&self, limit: i64, offset: i64) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users ORDER BY created_at DESC LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }
}

#[derive(Clone)]
pub struct PgTokenStore {
    pool: PgPool,
}

impl PgTokenStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DurableTokenStore for PgTokenStore {
    async fn record_refresh_token(
        &self,
        jti: Uuid,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (id, token_jti, user_id, expires_at, created_at)
            VALUES (gen_random_uuid(), $1, $2, $3, CURRENT_TIMESTAMP)
            "#,
        )
        .bind(jti)
        .bind(user_id)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_active_refresh_token(&self, jti: Uuid) -> Result<Option<RefreshTokenRecord>> {
        let record = sqlx::query_as::<_, RefreshTokenRecord>(
            r#"
            SELECT * FROM refresh_tokens
            WHERE token_jti = $1 AND revoked_at IS NULL AND expires_at > CURRENT_TIMESTAMP
            "#,
        )
        .bind(jti)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn revoke_refresh_token(&self, jti: Uuid) -> Result<bool> {
        // Conditional write: only an active row flips, and only once.
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked_at = CURRENT_TIMESTAMP
            WHERE token_jti = $1 AND revoked_at IS NULL AND expires_at > CURRENT_TIMESTAMP
            "#,
        )
        .bind(jti)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<Vec<Uuid>> {
        let revoked = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE refresh_tokens
            SET revoked_at = CURRENT_TIMESTAMP
            WHERE user_id = $1 AND revoked_at IS NULL
            RETURNING token_jti
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(revoked)
    }

    async fn create_one_time_token(
        &self,
        kind: OneTimeTokenKind,
        user_id: Uuid,
        ttl: Duration,
    ) -> Result<String> {
        let token = generate_one_time_token();
        let expires_at = Utc::now() + ttl;

        let sql = format!(
            r#"
            INSERT INTO {} (id, user_id, token_hash, expires_at, created_at)
            VALUES (gen_random_uuid(), $1, $2, $3, CURRENT_TIMESTAMP)
            "#,
            one_time_table(kind)
        );

        sqlx::query(&sql)
            .bind(user_id)
            .bind(hash_token(&token))
            .bind(expires_at)
            .execute(&self.pool)
            .await?;

        Ok(token)
    }

    async fn consume_one_time_token(
        &self,
        kind: OneTimeTokenKind,
        token: &str,
    ) -> Result<Option<Uuid>> {
        // Check-and-mark in one statement so concurrent consumers cannot
        // both succeed.
        let sql = format!(
            r#"
            UPDATE {}
            SET used_at = CURRENT_TIMESTAMP
            WHERE token_hash = $1 AND used_at IS NULL AND expires_at > CURRENT_TIMESTAMP
            RETURNING user_id
            "#,
            one_time_table(kind)
        );

        let user_id = sqlx::query_scalar::<_, Uuid>(&sql)
            .bind(hash_token(token))
            .fetch_optional(&self.pool)
            .await?;

        Ok(user_id)
    }
}

fn one_time_table(kind: OneTimeTokenKind) -> &'static str {
    match kind {
        OneTimeTokenKind::EmailVerification => "email_verification_tokens",
        OneTimeTokenKind::PasswordReset => "password_reset_tokens",
    }
}

fn generate_one_time_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ONE_TIME_TOKEN_LEN)
        .map(char::from)
        .collect()
}

fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
