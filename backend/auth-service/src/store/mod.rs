/// Storage abstractions for the credential lifecycle.
///
/// Two independently-failing backends sit behind these traits: Postgres as
/// the durable system of record and Redis as the volatile fast path. The
/// lifecycle manager is generic over them so the orchestration logic can be
/// exercised against in-memory fakes.
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{OneTimeTokenKind, RefreshTokenRecord, User};

pub mod postgres;
pub mod redis;

pub use postgres::{PgTokenStore, PgUserStore};
pub use redis::RedisRevocationCache;

/// User rows: created on registration, mutated on verification and
/// credential changes, never deleted here.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new unverified, inactive user. Fails `EmailInUse` when the
    /// email is already taken.
    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;

    /// Flip the user to verified and active after email confirmation.
    async fn mark_verified(&self, id: Uuid) -> Result<()>;

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<()>;

    /// Change the address and drop the user back to unverified/inactive
    /// until the new address is confirmed. Fails `EmailInUse` on conflict.
    async fn update_email(&self, id: Uuid, email: &str) -> Result<User>;

    /// Returns the updated user, or `None` when no such user exists.
    async fn update_role(&self, id: Uuid, role: &str) -> Result<Option<User>>;

    async fn list_users(&self, limit: i64, offset: i64) -> Result<Vec<User>>;
}

/// Durable record of issued refresh tokens and one-time tokens; the source
/// of truth for revocation.
#[async_trait]
pub trait DurableTokenStore: Send + Sync {
    async fn record_refresh_token(
        &self,
        jti: Uuid,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Look up a refresh token that is neither revoked nor expired.
    async fn find_active_refresh_token(&self, jti: Uuid) -> Result<Option<RefreshTokenRecord>>;

    /// Conditionally set `revoked_at` on an active record. Returns `true`
    /// only when this call performed the revocation, so two concurrent
    /// consumers of the same token cannot both win. Revoking an unknown or
    /// already-revoked token returns `false`, never an error.
    async fn revoke_refresh_token(&self, jti: Uuid) -> Result<bool>;

    /// Bulk-revoke every active refresh token of a user, returning the ids
    /// that were revoked so the cache can be purged to match.
    async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<Vec<Uuid>>;

    /// Mint a single-use token of the given kind and return the plaintext.
    /// Only a digest of the token is stored.
    async fn create_one_time_token(
        &self,
        kind: OneTimeTokenKind,
        user_id: Uuid,
        ttl: Duration,
    ) -> Result<String>;

    /// Atomically check unused-and-unexpired and mark used in one statement,
    /// returning the owning user. `None` means unknown, expired, or already
    /// consumed; under concurrent attempts exactly one caller gets the user.
    async fn consume_one_time_token(
        &self,
        kind: OneTimeTokenKind,
        token: &str,
    ) -> Result<Option<Uuid>>;
}

/// Volatile `jti -> user_id` mapping with a TTL matching the refresh token.
/// Absence means "not currently usable"; presence alone is not sufficient,
/// the durable record must agree.
#[async_trait]
pub trait RevocationCache: Send + Sync {
    async fn mark_usable(&self, jti: Uuid, user_id: Uuid, ttl_seconds: u64) -> Result<()>;

    /// Returns the owning user id while the entry is alive, `None` once it
    /// was revoked or aged out.
    async fn is_usable(&self, jti: Uuid) -> Result<Option<Uuid>>;

    /// Drop the entry; idempotent.
    async fn revoke(&self, jti: Uuid) -> Result<()>;
}
