//! Order Model
//!
//! User orders and guest orders share one shape; [`OrderKind`] tells them
//! apart. Amounts are in fils (1/100 AED) and timestamps in Unix millis.

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::product::ProductBrief;

/// Fulfilment status
///
/// `PENDING → CONFIRMED → PROCESSING → SHIPPED → DELIVERED`, or `CANCELLED`
/// from `PENDING`/`CONFIRMED`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Database string representation
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Confirmed => "CONFIRMED",
            Self::Processing => "PROCESSING",
            Self::Shipped => "SHIPPED",
            Self::Delivered => "DELIVERED",
            Self::Cancelled => "CANCELLED",
        }
    }

    pub fn can_cancel(&self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }

    /// Forward-only fulfilment chain; cancellation only before processing.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        match (self, next) {
            (from, Self::Cancelled) => from.can_cancel(),
            (Self::Pending, Self::Confirmed)
            | (Self::Confirmed, Self::Processing)
            | (Self::Processing, Self::Shipped)
            | (Self::Shipped, Self::Delivered) => true,
            _ => false,
        }
    }
}

/// Payment status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Paid => "PAID",
            Self::Failed => "FAILED",
            Self::Refunded => "REFUNDED",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum PaymentMethod {
    CashOnDelivery,
    OnlinePayment,
    BankTransfer,
}

/// Which table an order lives in
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum OrderKind {
    User,
    Guest,
}

impl OrderKind {
    pub fn is_guest(&self) -> bool {
        matches!(self, Self::Guest)
    }

    pub fn from_path(s: &str) -> Option<Self> {
        match s {
            "user" | "orders" => Some(Self::User),
            "guest" | "guest-orders" => Some(Self::Guest),
            _ => None,
        }
    }
}

/// Delivery address, stored as JSON on the order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ShippingAddress {
    #[validate(length(min = 1, max = 120))]
    pub full_name: String,
    #[validate(length(min = 5, max = 32))]
    pub phone: String,
    #[validate(length(min = 1, max = 200))]
    pub street: String,
    #[validate(length(min = 1, max = 120))]
    pub building: String,
    pub apartment: Option<String>,
    #[validate(length(min = 1, max = 120))]
    pub city: String,
    #[validate(length(min = 1, max = 120))]
    pub country: String,
    pub landmark: Option<String>,
    pub notes: Option<String>,
}

/// Checkout payload for signed-in customers
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateOrder {
    #[validate(nested)]
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
}

/// Checkout payload for guests
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateGuestOrder {
    #[validate(email)]
    pub guest_email: String,
    #[validate(length(min = 5, max = 32))]
    pub guest_phone: String,
    #[validate(nested)]
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
}

/// Public order tracking lookup
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TrackOrder {
    #[validate(length(min = 1))]
    pub order_number: String,
    #[validate(email)]
    pub email: String,
}

/// Admin status change
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderStatusUpdate {
    pub status: OrderStatus,
}

/// Order header
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub kind: OrderKind,
    pub order_number: String,
    pub user_id: Option<i64>,
    pub guest_email: Option<String>,
    pub guest_phone: Option<String>,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    /// Provider payment intent id, once one was created
    pub payment_intent_id: Option<String>,
    pub shipping_address: ShippingAddress,
    pub subtotal: i64,
    pub tax: i64,
    pub shipping_fee: i64,
    pub discount: i64,
    pub total: i64,
    pub coins_earned: i64,
    pub created_at: i64,
    pub updated_at: i64,
    pub confirmed_at: Option<i64>,
    pub cancelled_at: Option<i64>,
}

/// Line snapshot taken at placement time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub variant_id: Option<i64>,
    pub product_name: String,
    pub variant_name: Option<String>,
    pub quantity: i64,
    pub unit_price: i64,
    pub line_total: i64,
    /// Current catalog fields, absent if the product was removed
    pub product: Option<ProductBrief>,
}

/// Order with its items
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_early_orders_cancel() {
        assert!(OrderStatus::Pending.can_cancel());
        assert!(OrderStatus::Confirmed.can_cancel());
        assert!(!OrderStatus::Processing.can_cancel());
        assert!(!OrderStatus::Delivered.can_cancel());
        assert!(!OrderStatus::Cancelled.can_cancel());
    }

    #[test]
    fn test_status_chain_is_forward_only() {
        use OrderStatus::*;
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Confirmed.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Shipped));
        assert!(Shipped.can_transition_to(Delivered));
        assert!(!Pending.can_transition_to(Shipped));
        assert!(!Shipped.can_transition_to(Processing));
        assert!(!Delivered.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Pending));
        assert!(Confirmed.can_transition_to(Cancelled));
    }

    #[test]
    fn test_enum_wire_format() {
        assert_eq!(
            serde_json::to_string(&PaymentMethod::CashOnDelivery).unwrap(),
            "\"CASH_ON_DELIVERY\""
        );
        assert_eq!(
            serde_json::from_str::<OrderStatus>("\"SHIPPED\"").unwrap(),
            OrderStatus::Shipped
        );
        assert_eq!(PaymentStatus::Refunded.as_db(), "REFUNDED");
        assert_eq!(serde_json::to_string(&OrderKind::Guest).unwrap(), "\"guest\"");
    }

    #[test]
    fn test_guest_checkout_requires_valid_email() {
        let payload = CreateGuestOrder {
            guest_email: "not-an-email".into(),
            guest_phone: "+971500000000".into(),
            shipping_address: ShippingAddress {
                full_name: "Layla Haddad".into(),
                phone: "+971500000000".into(),
                street: "Sheikh Zayed Rd".into(),
                building: "Tower 3".into(),
                apartment: None,
                city: "Dubai".into(),
                country: "AE".into(),
                landmark: None,
                notes: None,
            },
            payment_method: PaymentMethod::OnlinePayment,
        };
        let err = payload.validate().unwrap_err();
        assert!(err.field_errors().contains_key("guest_email"));
    }
}
