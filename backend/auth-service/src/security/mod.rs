/// Security module for authentication
/// Provides password hashing and bearer token signing/verification

pub mod jwt;
pub mod password;

pub use jwt::{BearerToken, IssuedToken, TokenCodec, TokenKind};
pub use password::{hash_password, verify_password};
