use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Error taxonomy for the credential lifecycle.
///
/// The first group are expected, caller-recoverable outcomes with stable
/// meanings; the second group are infrastructure faults that surface as a
/// generic 500 without leaking internal detail.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Email not verified")]
    NotVerified,

    #[error("Email already in use")]
    EmailInUse,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Invalid or expired token")]
    InvalidOrExpiredToken,

    #[error("Token revoked or expired")]
    TokenRevokedOrExpired,

    #[error("Too many requests")]
    RateLimited,

    // Internal only: surfaced to callers as an invalid-token response so a
    // guessed token cannot probe which accounts exist.
    #[error("User not found")]
    UserNotFound,

    #[error("User not active")]
    UserNotActive,

    #[error("Admin access required")]
    AdminRequired,

    #[error("{0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, AuthError>;

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AuthError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "Invalid email or password".to_string(),
            ),
            AuthError::NotVerified => (
                StatusCode::FORBIDDEN,
                "Email not verified".to_string(),
            ),
            AuthError::EmailInUse => (
                StatusCode::CONFLICT,
                "Email already in use".to_string(),
            ),
            AuthError::InvalidToken | AuthError::UserNotFound => {
                (StatusCode::UNAUTHORIZED, "Invalid token".to_string())
            }
            AuthError::InvalidOrExpiredToken => (
                StatusCode::BAD_REQUEST,
                "Invalid or expired token".to_string(),
            ),
            AuthError::TokenRevokedOrExpired => (
                StatusCode::UNAUTHORIZED,
                "Token revoked or expired".to_string(),
            ),
            AuthError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "Too many requests".to_string(),
            ),
            AuthError::UserNotActive => (
                StatusCode::UNAUTHORIZED,
                "User not active".to_string(),
            ),
            AuthError::AdminRequired => (
                StatusCode::FORBIDDEN,
                "Admin access required".to_string(),
            ),
            AuthError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AuthError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            AuthError::Database(msg) | AuthError::Cache(msg) | AuthError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        AuthError::Database(err.to_string())
    }
}

impl From<redis::RedisError> for AuthError {
    fn from(err: redis::RedisError) -> Self {
        AuthError::Cache(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(_err: jsonwebtoken::errors::Error) -> Self {
        AuthError::InvalidToken
    }
}

impl From<validator::ValidationErrors> for AuthError {
    fn from(err: validator::ValidationErrors) -> Self {
        AuthError::Validation(err.to_string())
    }
}
