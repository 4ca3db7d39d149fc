/// Redis-backed revocation cache.
///
/// Holds one entry per live refresh token, `jti -> user_id`, expiring with
/// the token itself. Deleting the entry is what makes revocation visible on
/// the fast path; the durable record stays behind for audit.
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use uuid::Uuid;

use crate::error::Result;
use crate::store::RevocationCache;

const REFRESH_KEY_PREFIX: &str = "aegis:refresh:";

#[derive(Clone)]
pub struct RedisRevocationCache {
    redis: ConnectionManager,
}

impl RedisRevocationCache {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }
}

fn refresh_key(jti: Uuid) -> String {
    format!("{REFRESH_KEY_PREFIX}{jti}")
}

#[async_trait]
impl RevocationCache for RedisRevocationCache {
    async fn mark_usable(&self, jti: Uuid, user_id: Uuid, ttl_seconds: u64) -> Result<()> {
        // ConnectionManager clones share the same underlying connection.
        let mut conn = self.redis.clone();
        redis::cmd("SET")
            .arg(refresh_key(jti))
            .arg(user_id.to_string())
            .arg("EX")
            .arg(ttl_seconds)
            .query_async::<_, ()>(&mut conn)
            .await?;

        Ok(())
    }

    async fn is_usable(&self, jti: Uuid) -> Result<Option<Uuid>> {
        let mut conn = self.redis.clone();
        let value: Option<String> = redis::cmd("GET")
            .arg(refresh_key(jti))
            .query_async(&mut conn)
            .await?;

        // An entry that does not parse back to a user id is treated as
        // absent, which fails closed.
        Ok(value.and_then(|v| Uuid::parse_str(&v).ok()))
    }

    async fn revoke(&self, jti: Uuid) -> Result<()> {
        let mut conn = self.redis.clone();
        redis::cmd("DEL")
            .arg(refresh_key(jti))
            .query_async::<_, ()>(&mut conn)
            .await?;

        Ok(())
    }
}
