/// HTTP request handlers (REST API)
pub mod admin;
pub mod auth;
pub mod users;

pub use auth::{ErrorResponse, MessageResponse};
