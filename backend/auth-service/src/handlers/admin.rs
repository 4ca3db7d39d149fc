/// Administrative user management handlers
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::{
    error::{AuthError, Result},
    middleware::AdminUser,
    models::{UpdateRoleRequest, UserPublic},
    store::UserStore,
    AppState,
};

/// Pagination bounds for the user listing
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListUsersQuery {
    /// Maximum number of rows to return (default 50)
    pub limit: Option<i64>,
    /// Number of rows to skip (default 0)
    pub offset: Option<i64>,
}

/// List registered users, newest first
#[utoipa::path(
    get,
    path = "/api/v1/admin/users",
    tag = "Admin",
    params(ListUsersQuery),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Users ordered by creation time", body = Vec<UserPublic>),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse)
    )
)]
pub async fn list_users(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<Vec<UserPublic>>> {
    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    let offset = query.offset.unwrap_or(0).max(0);

    let users = state.users.list_users(limit, offset).await?;
    Ok(Json(users.into_iter().map(UserPublic::from).collect()))
}

/// Change another user's role
#[utoipa::path(
    patch,
    path = "/api/v1/admin/users/{user_id}/role",
    tag = "Admin",
    request_body = UpdateRoleRequest,
    params(
        ("user_id" = Uuid, Path, description = "User to update")
    ),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Role updated", body = UserPublic),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 404, description = "No such user", body = ErrorResponse)
    )
)]
pub async fn update_user_role(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<UpdateRoleRequest>,
) -> Result<Json<UserPublic>> {
    let user = state
        .users
        .update_role(user_id, payload.role.as_str())
        .await?
        .ok_or_else(|| AuthError::NotFound("User not found".to_string()))?;

    Ok(Json(UserPublic::from(user)))
}
