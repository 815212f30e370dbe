//! Errors as the storefront API reports them.
//!
//! A failed request answers with an [`ApiResponse`] envelope whose `code` is
//! an [`ErrorCode`]; the HTTP status is derived from that code, and the
//! thousand it falls in gives its [`ErrorCategory`].
//!
//! ```
//! use shared::error::{ApiResponse, AppError, ErrorCode};
//!
//! let short = AppError::insufficient_stock("Insufficient stock. Only 3 available", 3);
//! assert_eq!(short.code, ErrorCode::InsufficientStock);
//!
//! let body = ApiResponse::<()>::error(&short);
//! assert_eq!(body.code, Some(6003));
//! ```

mod category;
mod codes;
mod http;
mod types;

pub use category::ErrorCategory;
pub use codes::{ErrorCode, InvalidErrorCode};
pub use types::{ApiResponse, AppError};
