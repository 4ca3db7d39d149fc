/// Business logic services
pub mod auth_service;
pub mod email;

pub use auth_service::AuthService;
pub use email::EmailService;
