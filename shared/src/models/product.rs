//! Product Model

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Product entity
///
/// Prices are in fils (1/100 AED).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub brand: Option<String>,
    pub image: Option<String>,
    pub price: i64,
    pub sale_price: Option<i64>,
    pub stock: i64,
    pub sales_count: i64,
    pub is_featured: bool,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Product {
    /// Price a customer pays when no variant is selected
    pub fn effective_price(&self) -> i64 {
        effective_price(self.price, self.sale_price)
    }
}

/// Product variant (size / concentration) with its own price and stock
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct ProductVariant {
    pub id: i64,
    pub product_id: i64,
    pub name: String,
    pub size: Option<String>,
    pub sku: String,
    pub price: i64,
    pub sale_price: Option<i64>,
    pub stock: i64,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl ProductVariant {
    pub fn effective_price(&self) -> i64 {
        effective_price(self.price, self.sale_price)
    }
}

/// A positive sale price overrides the list price.
pub fn effective_price(price: i64, sale_price: Option<i64>) -> i64 {
    match sale_price {
        Some(sale) if sale > 0 => sale,
        _ => price,
    }
}

/// Product with its active variants
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub variants: Vec<ProductVariant>,
}

/// Limited product fields embedded in cart lines and order items
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct ProductBrief {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub image: Option<String>,
}

/// Create product payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ProductCreate {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1, max = 200))]
    pub slug: String,
    pub description: Option<String>,
    pub brand: Option<String>,
    pub image: Option<String>,
    #[validate(range(min = 0))]
    pub price: i64,
    #[validate(range(min = 0))]
    pub sale_price: Option<i64>,
    #[validate(range(min = 0))]
    pub stock: i64,
    pub is_featured: Option<bool>,
    pub is_active: Option<bool>,
}

/// Update product payload
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ProductUpdate {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub brand: Option<String>,
    pub image: Option<String>,
    #[validate(range(min = 0))]
    pub price: Option<i64>,
    #[validate(range(min = 0))]
    pub sale_price: Option<i64>,
    #[validate(range(min = 0))]
    pub stock: Option<i64>,
    pub is_featured: Option<bool>,
    pub is_active: Option<bool>,
}

/// Create variant payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct VariantCreate {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub size: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub sku: String,
    #[validate(range(min = 0))]
    pub price: i64,
    #[validate(range(min = 0))]
    pub sale_price: Option<i64>,
    #[validate(range(min = 0))]
    pub stock: i64,
}

/// Back-office variant edit; `None` fields keep their value.
/// Setting `is_active = false` retires the variant from sale.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct VariantUpdate {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(range(min = 0))]
    pub price: Option<i64>,
    #[validate(range(min = 0))]
    pub sale_price: Option<i64>,
    #[validate(range(min = 0))]
    pub stock: Option<i64>,
    pub is_active: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sale_price_overrides_list_price() {
        assert_eq!(effective_price(10_000, Some(8_000)), 8_000);
        assert_eq!(effective_price(10_000, None), 10_000);
        assert_eq!(effective_price(10_000, Some(0)), 10_000);
    }

    #[test]
    fn test_product_create_rejects_negative_stock() {
        let payload = ProductCreate {
            name: "Royal Oud".into(),
            slug: "royal-oud".into(),
            description: None,
            brand: None,
            image: None,
            price: 25_000,
            sale_price: None,
            stock: -1,
            is_featured: None,
            is_active: None,
        };
        let err = payload.validate().unwrap_err();
        assert!(err.field_errors().contains_key("stock"));
    }

    #[test]
    fn test_variant_update_is_partial() {
        let restock: VariantUpdate = serde_json::from_str(r#"{"stock":40}"#).unwrap();
        assert_eq!(restock.stock, Some(40));
        assert!(restock.price.is_none() && restock.is_active.is_none());
        assert!(restock.validate().is_ok());

        let negative = VariantUpdate {
            stock: Some(-3),
            ..Default::default()
        };
        assert!(negative.validate().unwrap_err().field_errors().contains_key("stock"));
    }
}
