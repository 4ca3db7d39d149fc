/// Current-user profile handlers
use axum::{extract::State, Json};
use validator::Validate;

use crate::{
    error::Result,
    middleware::CurrentUser,
    models::{UpdateMeRequest, UserPublic},
    AppState,
};

/// Current user profile
#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    tag = "Users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Authenticated user profile", body = UserPublic),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorResponse)
    )
)]
pub async fn get_me(current: CurrentUser) -> Json<UserPublic> {
    Json(UserPublic::from(current.user))
}

/// Profile update handler
///
/// Changing the email drops the account back to unverified and inactive
/// until the address is confirmed again.
#[utoipa::path(
    patch,
    path = "/api/v1/users/me",
    tag = "Users",
    request_body = UpdateMeRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Updated profile", body = UserPublic),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorResponse),
        (status = 409, description = "Email already in use", body = ErrorResponse)
    )
)]
pub async fn update_me(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(payload): Json<UpdateMeRequest>,
) -> Result<Json<UserPublic>> {
    payload.validate()?;

    let user = match payload.email {
        Some(ref email) if email.trim() != current.user.email => {
            state
                .auth
                .change_email(current.user.id, email.trim())
                .await?
        }
        _ => current.user,
    };

    Ok(Json(UserPublic::from(user)))
}
