//! Customer authentication
//!
//! - [`JwtService`] - access token issue/verify
//! - [`CurrentUser`] - authenticated identity (extension + extractor)
//! - [`require_user`] / [`require_admin`] - route guards
//! - [`rate_limit`] - login/registration throttling

pub mod jwt;
pub mod middleware;
pub mod rate_limit;

pub use jwt::{ACCESS_TOKEN_COOKIE, Claims, JwtError, JwtService, TOKEN_TTL_DAYS, bearer_token};
pub use middleware::{CurrentUser, authenticate, require_admin, require_user};
pub use rate_limit::RateLimiter;
