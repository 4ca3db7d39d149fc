//! Authentication guards that put the bearer-token check at the type level.
//!
//! Handlers take `CurrentUser` or `AdminUser` as an extractor parameter, so
//! a route cannot accidentally skip the check.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::error::AuthError;
use crate::models::User;
use crate::security::TokenKind;
use crate::store::UserStore;
use crate::AppState;

/// An authenticated, active user resolved from the `Authorization` header.
///
/// Only access tokens are accepted here; a refresh token presented as a
/// bearer credential is rejected outright.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or(AuthError::InvalidToken)?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::InvalidToken)?;

        let bearer = state.codec.decode(token)?;
        if bearer.kind != TokenKind::Access {
            return Err(AuthError::InvalidToken);
        }

        let user = state
            .users
            .find_by_id(bearer.subject)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if !user.is_activated() {
            return Err(AuthError::UserNotActive);
        }

        Ok(CurrentUser { user })
    }
}

/// A `CurrentUser` that must additionally hold the admin role.
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub user: User,
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let current = CurrentUser::from_request_parts(parts, state).await?;

        if !current.user.is_admin() {
            return Err(AuthError::AdminRequired);
        }

        Ok(AdminUser { user: current.user })
    }
}
