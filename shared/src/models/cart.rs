//! Cart Model

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::product::ProductBrief;

/// Smallest and largest quantity a single cart line may hold
pub const MIN_LINE_QUANTITY: i64 = 1;
pub const MAX_LINE_QUANTITY: i64 = 99;

/// One cart line priced at current catalog prices
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLineView {
    pub id: i64,
    pub product_id: i64,
    pub variant_id: Option<i64>,
    pub variant_name: Option<String>,
    pub quantity: i64,
    /// Unit price in fils
    pub unit_price: i64,
    pub line_total: i64,
    /// Stock currently available for this line's product or variant
    pub available_stock: i64,
    pub product: ProductBrief,
}

/// Cart totals in fils
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartSummary {
    pub subtotal: i64,
    pub shipping: i64,
    pub tax: i64,
    pub discount: i64,
    pub total: i64,
    pub item_count: i64,
    pub coins_earnable: i64,
}

/// Cart with priced lines and totals
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartView {
    pub id: i64,
    pub items: Vec<CartLineView>,
    pub summary: CartSummary,
}

/// Add-to-cart payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AddCartItem {
    pub product_id: i64,
    pub variant_id: Option<i64>,
    #[validate(range(min = 1, max = 99))]
    pub quantity: i64,
}

/// Quantity update payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateCartItem {
    #[validate(range(min = 1, max = 99))]
    pub quantity: i64,
}

/// Result of folding a guest cart into a user cart
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CartMergeResult {
    pub merged_lines: u64,
}
