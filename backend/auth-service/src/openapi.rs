use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::handlers::auth::{ErrorResponse, MessageResponse};
use crate::models::{
    LoginRequest, RefreshTokenRequest, RegisterRequest, RequestPasswordResetRequest,
    ResetPasswordRequest, RoleName, TokenPair, UpdateMeRequest, UpdateRoleRequest, UserPublic,
    VerifyEmailRequest,
};

/// OpenAPI document covering the REST endpoints exposed by the service
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::auth::register,
        crate::handlers::auth::verify_email,
        crate::handlers::auth::login,
        crate::handlers::auth::refresh,
        crate::handlers::auth::logout,
        crate::handlers::auth::password_reset_request,
        crate::handlers::auth::password_reset_confirm,
        crate::handlers::users::get_me,
        crate::handlers::users::update_me,
        crate::handlers::admin::list_users,
        crate::handlers::admin::update_user_role
    ),
    components(schemas(
        RegisterRequest,
        LoginRequest,
        RefreshTokenRequest,
        VerifyEmailRequest,
        RequestPasswordResetRequest,
        ResetPasswordRequest,
        UpdateMeRequest,
        UpdateRoleRequest,
        RoleName,
        UserPublic,
        TokenPair,
        MessageResponse,
        ErrorResponse
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Registration, login and token lifecycle APIs"),
        (name = "Users", description = "Current-user profile APIs"),
        (name = "Admin", description = "Administrative user management APIs")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
