//! Data models
//!
//! Shared between souq-server and its clients (via API).
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are `i64` snowflakes, all amounts `i64` fils.

pub mod cart;
pub mod order;
pub mod payment;
pub mod product;
pub mod user;

// Re-exports
pub use cart::*;
pub use order::*;
pub use payment::*;
pub use product::*;
pub use user::*;
