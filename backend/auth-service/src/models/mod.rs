/// Data models for the credential lifecycle
pub mod token;
pub mod user;

pub use token::{OneTimeTokenKind, RefreshTokenRecord, TokenPair};
pub use user::{
    LoginRequest, RefreshTokenRequest, RegisterRequest, RequestPasswordResetRequest,
    ResetPasswordRequest, RoleName, UpdateMeRequest, UpdateRoleRequest, User, UserPublic,
    VerifyEmailRequest,
};
