/// Authentication handlers
use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::Result,
    metrics,
    middleware::extract_client_ip,
    models::{
        LoginRequest, RefreshTokenRequest, RegisterRequest, RequestPasswordResetRequest,
        ResetPasswordRequest, TokenPair, UserPublic, VerifyEmailRequest,
    },
    AppState,
};

/// Generic acknowledgment body
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

/// Error body shape shared by every endpoint (mirrors `AuthError`)
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub status: u16,
}

/// Register endpoint handler
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered, verification email sent", body = UserPublic),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 409, description = "Email already in use", body = ErrorResponse),
        (status = 429, description = "Too many requests", body = ErrorResponse)
    )
)]
pub async fn register(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse> {
    metrics::inc_register_requests();
    payload.validate()?;

    let ip = extract_client_ip(&headers, peer);
    state
        .rate_limiter
        .hit("register", ip, state.settings.rate_limit.register_limit)
        .await?;

    let user = state
        .auth
        .register(payload.email.trim(), &payload.password)
        .await?;

    Ok((StatusCode::CREATED, Json(UserPublic::from(user))))
}

/// Email verification endpoint handler
#[utoipa::path(
    post,
    path = "/api/v1/auth/verify-email",
    tag = "Auth",
    request_body = VerifyEmailRequest,
    responses(
        (status = 200, description = "Email verified, account active", body = MessageResponse),
        (status = 400, description = "Invalid or expired token", body = ErrorResponse)
    )
)]
pub async fn verify_email(
    State(state): State<AppState>,
    Json(payload): Json<VerifyEmailRequest>,
) -> Result<Json<MessageResponse>> {
    payload.validate()?;

    state.auth.verify_email(&payload.token).await?;

    Ok(Json(MessageResponse::new("Email verified")))
}

/// Login endpoint handler
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token pair issued", body = TokenPair),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 403, description = "Email not verified", body = ErrorResponse),
        (status = 429, description = "Too many requests", body = ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenPair>> {
    metrics::inc_login_requests();
    payload.validate()?;

    let ip = extract_client_ip(&headers, peer);
    state
        .rate_limiter
        .hit("login", ip, state.settings.rate_limit.login_limit)
        .await?;

    let user = match state
        .auth
        .authenticate(payload.email.trim(), &payload.password)
        .await
    {
        Ok(user) => user,
        Err(e) => {
            metrics::inc_login_failures();
            return Err(e);
        }
    };

    let pair = state.auth.issue_token_pair(&user).await?;
    Ok(Json(pair))
}

/// Token refresh endpoint handler
#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    tag = "Auth",
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "Rotated token pair issued", body = TokenPair),
        (status = 401, description = "Token invalid, revoked or expired", body = ErrorResponse)
    )
)]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshTokenRequest>,
) -> Result<Json<TokenPair>> {
    payload.validate()?;

    match state.auth.refresh(&payload.refresh_token).await {
        Ok(pair) => {
            metrics::inc_token_refreshes();
            Ok(Json(pair))
        }
        Err(e) => {
            metrics::inc_token_refresh_failures();
            Err(e)
        }
    }
}

/// Logout endpoint handler
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    tag = "Auth",
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "Refresh token revoked", body = MessageResponse),
        (status = 401, description = "Malformed refresh token", body = ErrorResponse)
    )
)]
pub async fn logout(
    State(state): State<AppState>,
    Json(payload): Json<RefreshTokenRequest>,
) -> Result<Json<MessageResponse>> {
    payload.validate()?;

    state.auth.logout(&payload.refresh_token).await?;

    Ok(Json(MessageResponse::new("Logged out")))
}

/// Password reset request endpoint handler
#[utoipa::path(
    post,
    path = "/api/v1/auth/password-reset/request",
    tag = "Auth",
    request_body = RequestPasswordResetRequest,
    responses(
        (status = 200, description = "Acknowledged whether or not the email exists", body = MessageResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse)
    )
)]
pub async fn password_reset_request(
    State(state): State<AppState>,
    Json(payload): Json<RequestPasswordResetRequest>,
) -> Result<Json<MessageResponse>> {
    payload.validate()?;

    state
        .auth
        .request_password_reset(payload.email.trim())
        .await?;

    Ok(Json(MessageResponse::new(
        "If the email exists, a reset token was sent",
    )))
}

/// Password reset confirmation endpoint handler
#[utoipa::path(
    post,
    path = "/api/v1/auth/password-reset/confirm",
    tag = "Auth",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password updated, all sessions revoked", body = MessageResponse),
        (status = 400, description = "Invalid or expired token", body = ErrorResponse)
    )
)]
pub async fn password_reset_confirm(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>> {
    payload.validate()?;

    state
        .auth
        .confirm_password_reset(&payload.token, &payload.new_password)
        .await?;
    metrics::inc_password_resets();

    Ok(Json(MessageResponse::new("Password updated")))
}
