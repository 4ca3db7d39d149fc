pub mod auth;
pub mod rate_limit;

pub use auth::{AdminUser, CurrentUser};
pub use rate_limit::{extract_client_ip, RateLimiter};
