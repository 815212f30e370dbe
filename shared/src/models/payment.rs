//! Payment DTOs

use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePaymentIntent {
    pub order_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ConfirmPayment {
    #[validate(length(min = 1))]
    pub payment_intent_id: String,
}

/// What the storefront needs to finish a card payment client-side
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntentResponse {
    pub client_secret: String,
    pub payment_intent_id: String,
    /// Amount in minor units
    pub amount: i64,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentConfirmation {
    pub success: bool,
    pub order_id: i64,
    pub order_number: String,
    pub is_guest_order: bool,
}
