//! Shared types for the AromaSouq storefront
//!
//! Error codes, response envelope, domain models and id/time helpers used by
//! the server and its tests.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use axum::Json;
pub use http;
pub use serde::{Deserialize, Serialize};
