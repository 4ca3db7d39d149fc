use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Durable mirror of an issued refresh token. Rows are never deleted;
/// `revoked_at` is set at most once and never cleared.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RefreshTokenRecord {
    pub id: Uuid,
    pub token_jti: Uuid,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl RefreshTokenRecord {
    /// Check if the record still authorizes a refresh
    pub fn is_active(&self) -> bool {
        self.revoked_at.is_none() && self.expires_at > Utc::now()
    }
}

/// The two one-time token families. Each lives in its own table and has its
/// own TTL, but they share single-use consumption semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OneTimeTokenKind {
    EmailVerification,
    PasswordReset,
}

impl OneTimeTokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OneTimeTokenKind::EmailVerification => "email_verification",
            OneTimeTokenKind::PasswordReset => "password_reset",
        }
    }
}

/// Access/refresh token pair returned by login and refresh
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
}

impl TokenPair {
    pub fn new(access_token: String, refresh_token: String) -> Self {
        Self {
            access_token,
            refresh_token,
            token_type: "bearer".to_string(),
        }
    }
}
