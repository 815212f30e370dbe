//! Business operations over the database
//!
//! - [`cart`] - cart lines for users and guest sessions
//! - [`orders`] - placement, cancellation, lookups, back-office status
//! - [`payments`] - payment intents, confirmation and webhooks

pub mod cart;
pub mod orders;
pub mod payments;
