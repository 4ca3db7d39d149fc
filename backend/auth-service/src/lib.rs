// Aegis Auth Service Library

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod openapi;
pub mod security;
pub mod services;
pub mod store;

#[cfg(test)]
mod tests;

pub use error::{AuthError, Result};

// Re-export commonly used types
pub use models::{RefreshTokenRecord, TokenPair, User, UserPublic};

use std::sync::Arc;

use crate::config::Settings;
use crate::middleware::RateLimiter;
use crate::security::TokenCodec;
use crate::services::AuthService;
use crate::store::{PgTokenStore, PgUserStore, RedisRevocationCache};

/// Concrete service wiring used by the binary and the HTTP layer
pub type AuthServiceImpl = AuthService<PgUserStore, PgTokenStore, RedisRevocationCache>;

/// Shared application state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub codec: TokenCodec,
    pub auth: AuthServiceImpl,
    pub users: PgUserStore,
    pub rate_limiter: RateLimiter,
}
