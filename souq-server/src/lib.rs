//! souq-server: AromaSouq storefront API
//!
//! axum HTTP service over SQLite covering the catalog, user and guest carts,
//! checkout with transactional stock, cancellation, and Stripe payment
//! reconciliation.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod pricing;
pub mod services;
pub mod session;
pub mod state;
pub mod stripe;
pub mod util;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub use api::{build_app, build_router};
pub use config::Config;
pub use error::{ServiceError, ServiceResult};
pub use state::AppState;
