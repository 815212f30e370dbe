//! Numeric error codes returned in every failed API reply
//!
//! The thousand a code falls in names its area (see [`super::ErrorCategory`]):
//! 0xxx general, 1xxx auth, 2xxx permission, 3xxx cart, 4xxx order,
//! 5xxx payment, 6xxx product, 9xxx system.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Serialized as a bare `u16` so the frontend can switch on it without
/// parsing messages. Values are part of the public API; never renumber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    Success = 0,
    ValidationFailed = 2,
    AlreadyExists = 4,
    InvalidRequest = 5,
    RequiredField = 7,
    TooManyRequests = 9,

    NotAuthenticated = 1001,
    InvalidCredentials = 1002,
    TokenExpired = 1003,
    TokenInvalid = 1004,
    /// Guest session cookie missing or malformed
    SessionRequired = 1005,
    /// Suspended or banned
    AccountDisabled = 1007,
    EmailAlreadyRegistered = 1008,
    PasswordTooShort = 1009,
    /// Only CUSTOMER and VENDOR may self-register
    RegistrationRoleNotAllowed = 1010,

    AdminRequired = 2003,

    /// Line missing from the caller's cart
    CartItemNotFound = 3001,
    QuantityOutOfRange = 3002,
    CartEmpty = 3003,

    OrderNotFound = 4001,
    OrderAlreadyPaid = 4002,
    OrderNotCancellable = 4003,
    InvalidStatusTransition = 4004,
    OrderNotOwned = 4005,
    OrderCancelled = 4006,

    PaymentNotSucceeded = 5001,
    WebhookSignatureInvalid = 5002,
    /// Provider replied with an error or could not be reached
    PaymentProviderError = 5003,
    /// Intent metadata has no usable `order_id`
    PaymentMetadataInvalid = 5004,

    ProductNotFound = 6001,
    /// Product or variant is inactive
    ProductUnavailable = 6002,
    InsufficientStock = 6003,
    ProductInvalidPrice = 6004,
    ProductSlugExists = 6005,
    VariantNotFound = 6101,

    InternalError = 9001,
    DatabaseError = 9002,
}

impl ErrorCode {
    /// Every code, in numeric order
    pub const ALL: &'static [ErrorCode] = &[
        Self::Success,
        Self::ValidationFailed,
        Self::AlreadyExists,
        Self::InvalidRequest,
        Self::RequiredField,
        Self::TooManyRequests,
        Self::NotAuthenticated,
        Self::InvalidCredentials,
        Self::TokenExpired,
        Self::TokenInvalid,
        Self::SessionRequired,
        Self::AccountDisabled,
        Self::EmailAlreadyRegistered,
        Self::PasswordTooShort,
        Self::RegistrationRoleNotAllowed,
        Self::AdminRequired,
        Self::CartItemNotFound,
        Self::QuantityOutOfRange,
        Self::CartEmpty,
        Self::OrderNotFound,
        Self::OrderAlreadyPaid,
        Self::OrderNotCancellable,
        Self::InvalidStatusTransition,
        Self::OrderNotOwned,
        Self::OrderCancelled,
        Self::PaymentNotSucceeded,
        Self::WebhookSignatureInvalid,
        Self::PaymentProviderError,
        Self::PaymentMetadataInvalid,
        Self::ProductNotFound,
        Self::ProductUnavailable,
        Self::InsufficientStock,
        Self::ProductInvalidPrice,
        Self::ProductSlugExists,
        Self::VariantNotFound,
        Self::InternalError,
        Self::DatabaseError,
    ];

    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Default message, used when the caller supplies none
    pub const fn message(&self) -> &'static str {
        match self {
            Self::Success => "OK",
            Self::ValidationFailed => "Validation failed",
            Self::AlreadyExists => "Resource already exists",
            Self::InvalidRequest => "Invalid request",
            Self::RequiredField => "Required field is missing",
            Self::TooManyRequests => "Too many requests, please try again later",

            Self::NotAuthenticated => "User is not authenticated",
            Self::InvalidCredentials => "Invalid email or password",
            Self::TokenExpired => "Session expired, please sign in again",
            Self::TokenInvalid => "Invalid access token",
            Self::SessionRequired => "Guest session is required",
            Self::AccountDisabled => "Account is disabled",
            Self::EmailAlreadyRegistered => "Email already registered",
            Self::PasswordTooShort => "Password must be at least 8 characters",
            Self::RegistrationRoleNotAllowed => "Registration with this role is not allowed",

            Self::AdminRequired => "Administrator role is required",

            Self::CartItemNotFound => "Cart item not found",
            Self::QuantityOutOfRange => "Quantity must be between 1 and 99",
            Self::CartEmpty => "Cart is empty",

            Self::OrderNotFound => "Order not found",
            Self::OrderAlreadyPaid => "Order already paid",
            Self::OrderNotCancellable => "Order cannot be cancelled at this stage",
            Self::InvalidStatusTransition => "Order status transition is not allowed",
            Self::OrderNotOwned => "Order does not belong to user",
            Self::OrderCancelled => "Order has been cancelled",

            Self::PaymentNotSucceeded => "Payment not successful",
            Self::WebhookSignatureInvalid => "Webhook signature verification failed",
            Self::PaymentProviderError => "Payment provider error",
            Self::PaymentMetadataInvalid => "Payment intent metadata is invalid",

            Self::ProductNotFound => "Product not found",
            Self::ProductUnavailable => "Product is not available",
            Self::InsufficientStock => "Insufficient stock",
            Self::ProductInvalidPrice => "Product has invalid price",
            Self::ProductSlugExists => "Product slug already exists",
            Self::VariantNotFound => "Variant not found",

            Self::InternalError => "Internal server error",
            Self::DatabaseError => "Database error",
        }
    }
}

impl From<ErrorCode> for u16 {
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Raw value that names no [`ErrorCode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown error code {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::ALL
            .iter()
            .copied()
            .find(|code| code.code() == value)
            .ok_or(InvalidErrorCode(value))
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
