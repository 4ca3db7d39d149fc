//! Configuration management for the auth service.
//!
//! Settings are read from environment variables, with a `.env` file loaded in
//! debug builds. Required values (`DATABASE_URL`, `REDIS_URL`, `JWT_SECRET`)
//! fail fast with context; everything else has a development default.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub redis: RedisSettings,
    pub jwt: JwtSettings,
    pub tokens: TokenSettings,
    pub rate_limit: RateLimitSettings,
    pub email: EmailSettings,
}

impl Settings {
    /// Load settings from environment variables (and `.env` in debug builds).
    pub fn load() -> Result<Self> {
        if cfg!(debug_assertions) {
            dotenvy::dotenv().ok();
        }

        Ok(Settings {
            server: ServerSettings::from_env()?,
            database: DatabaseSettings::from_env()?,
            redis: RedisSettings::from_env()?,
            jwt: JwtSettings::from_env()?,
            tokens: TokenSettings::from_env()?,
            rate_limit: RateLimitSettings::from_env()?,
            email: EmailSettings::from_env()?,
        })
    }
}

/// HTTP server bind address
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl ServerSettings {
    fn from_env() -> Result<Self> {
        Ok(Self {
            host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("Invalid SERVER_PORT")?,
        })
    }
}

/// PostgreSQL connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_seconds: u64,
}

impl DatabaseSettings {
    fn from_env() -> Result<Self> {
        Ok(Self {
            url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .context("Invalid DATABASE_MAX_CONNECTIONS")?,
            acquire_timeout_seconds: env::var("DATABASE_ACQUIRE_TIMEOUT")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .context("Invalid DATABASE_ACQUIRE_TIMEOUT")?,
        })
    }
}

/// Redis connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisSettings {
    pub url: String,
}

impl RedisSettings {
    fn from_env() -> Result<Self> {
        Ok(Self {
            url: env::var("REDIS_URL").context("REDIS_URL must be set")?,
        })
    }
}

/// JWT signing settings. The secret and algorithm are fixed at process start;
/// every token the process issues or accepts uses them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtSettings {
    pub secret: String,
    pub algorithm: String,
    pub access_ttl_minutes: i64,
    pub refresh_ttl_days: i64,
}

impl JwtSettings {
    fn from_env() -> Result<Self> {
        Ok(Self {
            secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            algorithm: env::var("JWT_ALGORITHM").unwrap_or_else(|_| "HS256".to_string()),
            access_ttl_minutes: env::var("ACCESS_TOKEN_TTL_MINUTES")
                .unwrap_or_else(|_| "15".to_string())
                .parse()
                .context("Invalid ACCESS_TOKEN_TTL_MINUTES")?,
            refresh_ttl_days: env::var("REFRESH_TOKEN_TTL_DAYS")
                .unwrap_or_else(|_| "7".to_string())
                .parse()
                .context("Invalid REFRESH_TOKEN_TTL_DAYS")?,
        })
    }
}

/// One-time token lifetimes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenSettings {
    pub verification_ttl_minutes: i64,
    pub reset_ttl_minutes: i64,
}

impl TokenSettings {
    fn from_env() -> Result<Self> {
        Ok(Self {
            verification_ttl_minutes: env::var("VERIFICATION_TOKEN_TTL_MINUTES")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .context("Invalid VERIFICATION_TOKEN_TTL_MINUTES")?,
            reset_ttl_minutes: env::var("RESET_TOKEN_TTL_MINUTES")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .context("Invalid RESET_TOKEN_TTL_MINUTES")?,
        })
    }
}

/// Fixed-window rate limit thresholds for credential-guessing endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitSettings {
    pub window_seconds: u64,
    pub login_limit: u32,
    pub register_limit: u32,
}

impl RateLimitSettings {
    fn from_env() -> Result<Self> {
        Ok(Self {
            window_seconds: env::var("RATE_LIMIT_WINDOW_SECONDS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .context("Invalid RATE_LIMIT_WINDOW_SECONDS")?,
            login_limit: env::var("RATE_LIMIT_LOGIN")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .context("Invalid RATE_LIMIT_LOGIN")?,
            register_limit: env::var("RATE_LIMIT_REGISTER")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .context("Invalid RATE_LIMIT_REGISTER")?,
        })
    }
}

/// SMTP settings. An empty `SMTP_HOST` puts the email service in no-op mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailSettings {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_from: String,
    pub use_starttls: bool,
    pub verification_base_url: Option<String>,
    pub password_reset_base_url: Option<String>,
}

impl EmailSettings {
    fn from_env() -> Result<Self> {
        Ok(Self {
            smtp_host: env::var("SMTP_HOST").unwrap_or_default(),
            smtp_port: env::var("SMTP_PORT")
                .unwrap_or_else(|_| "1025".to_string())
                .parse()
                .context("Invalid SMTP_PORT")?,
            smtp_username: env::var("SMTP_USERNAME").ok(),
            smtp_password: env::var("SMTP_PASSWORD").ok(),
            smtp_from: env::var("SMTP_FROM").unwrap_or_else(|_| "noreply@aegis.dev".to_string()),
            use_starttls: env::var("SMTP_USE_STARTTLS")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .unwrap_or(false),
            verification_base_url: env::var("EMAIL_VERIFICATION_BASE_URL").ok(),
            password_reset_base_url: env::var("EMAIL_PASSWORD_RESET_BASE_URL").ok(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jwt_settings_from_env() {
        env::set_var("JWT_SECRET", "test-secret-key");
        env::set_var("ACCESS_TOKEN_TTL_MINUTES", "30");

        let settings = JwtSettings::from_env().unwrap();

        assert_eq!(settings.secret, "test-secret-key");
        assert_eq!(settings.algorithm, "HS256"); // Default
        assert_eq!(settings.access_ttl_minutes, 30);
        assert_eq!(settings.refresh_ttl_days, 7); // Default

        env::remove_var("JWT_SECRET");
        env::remove_var("ACCESS_TOKEN_TTL_MINUTES");
    }

    #[test]
    fn test_rate_limit_defaults() {
        let settings = RateLimitSettings::from_env().unwrap();

        assert_eq!(settings.window_seconds, 60);
        assert_eq!(settings.login_limit, 5);
        assert_eq!(settings.register_limit, 3);
    }

    #[test]
    fn test_token_ttl_defaults() {
        let settings = TokenSettings::from_env().unwrap();

        assert_eq!(settings.verification_ttl_minutes, 60);
        assert_eq!(settings.reset_ttl_minutes, 30);
    }

    #[test]
    fn test_server_settings_defaults() {
        let settings = ServerSettings::from_env().unwrap();

        assert_eq!(settings.host, "0.0.0.0");
        assert_eq!(settings.port, 8080);
    }
}
