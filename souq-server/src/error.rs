//! Errors raised by the cart, order and payment services
//!
//! Services return [`ServiceResult`]. Storage failures carry the raw cause for
//! the log and reach the shopper only as a generic 9001; anything the shopper
//! can act on (empty cart, stock shortfall, already paid) is an [`AppError`]
//! and is returned unchanged.

use axum::response::IntoResponse;
use shared::error::{AppError, ErrorCode};

use crate::BoxError;
use crate::stripe::GatewayError;

#[derive(Debug)]
pub enum ServiceError {
    /// SQLite or other infrastructure failure; never shown to the client
    Storage(BoxError),
    /// Checkout, cart or payment rule the request broke
    Rejected(AppError),
}

impl From<sqlx::Error> for ServiceError {
    fn from(e: sqlx::Error) -> Self {
        Self::Storage(e.into())
    }
}

impl From<BoxError> for ServiceError {
    fn from(e: BoxError) -> Self {
        Self::Storage(e)
    }
}

impl From<AppError> for ServiceError {
    fn from(e: AppError) -> Self {
        Self::Rejected(e)
    }
}

/// Provider failures surface as 5003 with the provider's reason
impl From<GatewayError> for ServiceError {
    fn from(e: GatewayError) -> Self {
        tracing::error!(error = %e, "Payment provider call failed");
        Self::Rejected(AppError::with_message(ErrorCode::PaymentProviderError, e.to_string()))
    }
}

impl From<ServiceError> for AppError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::Rejected(err) => err,
            ServiceError::Storage(cause) => {
                tracing::error!(error = %cause, "Storage failure while serving request");
                AppError::new(ErrorCode::InternalError)
            }
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> axum::response::Response {
        AppError::from(self).into_response()
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
