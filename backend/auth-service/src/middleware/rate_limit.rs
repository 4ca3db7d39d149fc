//! Fixed-window rate limiting for credential-guessing endpoints.
//!
//! Counts hits per `(action, client)` key in Redis. The first hit of a
//! window sets the key's expiry; that companion call is best-effort, so
//! under a race a window can stretch by at most one window length. The
//! count itself never loses a hit.
//!
//! **Design:**
//! - Client identity is the first `X-Forwarded-For` entry (respects
//!   proxies), falling back to the connection's peer address
//! - Keys look like `rl:login:ip:203.0.113.9`

use std::net::{IpAddr, SocketAddr};

use axum::http::HeaderMap;
use redis::{aio::ConnectionManager, AsyncCommands};
use tracing::warn;

use crate::error::{AuthError, Result};

#[derive(Clone)]
pub struct RateLimiter {
    redis: ConnectionManager,
    window_seconds: u64,
}

impl RateLimiter {
    pub fn new(redis: ConnectionManager, window_seconds: u64) -> Self {
        Self {
            redis,
            window_seconds,
        }
    }

    /// Count one hit for `(action, client)`; fails `RateLimited` once the
    /// post-increment count exceeds `limit` within the current window.
    pub async fn hit(&self, action: &str, client: IpAddr, limit: u32) -> Result<()> {
        let key = rate_limit_key(action, client);
        let mut conn = self.redis.clone();

        let count: u32 = conn.incr(&key, 1).await?;

        if count == 1 {
            if let Err(e) = conn.expire::<_, ()>(&key, self.window_seconds as i64).await {
                warn!(key = %key, error = %e, "failed to set rate limit window expiry");
            }
        }

        if count > limit {
            warn!(action, client = %client, "rate limit exceeded");
            crate::metrics::inc_rate_limited();
            return Err(AuthError::RateLimited);
        }

        Ok(())
    }
}

fn rate_limit_key(action: &str, client: IpAddr) -> String {
    format!("rl:{action}:ip:{client}")
}

/// Client address for rate-limit keys.
///
/// `X-Forwarded-For` can contain multiple addresses; the first one is the
/// original client. Malformed or absent headers fall back to the peer.
pub fn extract_client_ip(headers: &HeaderMap, peer: SocketAddr) -> IpAddr {
    if let Some(forwarded) = headers.get("x-forwarded-for") {
        if let Ok(value) = forwarded.to_str() {
            if let Some(first) = value.split(',').next() {
                if let Ok(ip) = first.trim().parse::<IpAddr>() {
                    return ip;
                }
            }
        }
    }

    peer.ip()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer() -> SocketAddr {
        "10.1.2.3:55000".parse().unwrap()
    }

    #[test]
    fn test_rate_limit_key_format() {
        let ip: IpAddr = "203.0.113.9".parse().unwrap();
        assert_eq!(rate_limit_key("login", ip), "rl:login:ip:203.0.113.9");
        assert_eq!(rate_limit_key("register", ip), "rl:register:ip:203.0.113.9");
    }

    #[test]
    fn test_extract_ip_prefers_forwarded_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.9, 70.41.3.18".parse().unwrap());

        let ip = extract_client_ip(&headers, peer());
        assert_eq!(ip, "203.0.113.9".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_extract_ip_falls_back_to_peer() {
        let headers = HeaderMap::new();
        assert_eq!(extract_client_ip(&headers, peer()), peer().ip());
    }

    #[test]
    fn test_extract_ip_ignores_malformed_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "not-an-address".parse().unwrap());

        assert_eq!(extract_client_ip(&headers, peer()), peer().ip());
    }
}
