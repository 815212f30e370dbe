//! Cart operations for signed-in users and guest sessions
//!
//! Stock is checked when lines are added or changed but not reserved; the
//! authoritative check happens again at order placement.

use shared::error::{AppError, ErrorCode};
use shared::models::{
    AddCartItem, CartLineView, CartView, MAX_LINE_QUANTITY, MIN_LINE_QUANTITY,
};
use sqlx::SqlitePool;

use crate::db::carts::{self, CartLineRow, CartOwner};
use crate::db::{self, products};
use crate::error::ServiceResult;
use crate::pricing;

fn check_quantity(quantity: i64) -> Result<(), AppError> {
    if !(MIN_LINE_QUANTITY..=MAX_LINE_QUANTITY).contains(&quantity) {
        return Err(AppError::with_message(
            ErrorCode::QuantityOutOfRange,
            format!("Quantity must be between {MIN_LINE_QUANTITY} and {MAX_LINE_QUANTITY}"),
        ));
    }
    Ok(())
}

fn insufficient(available: i64) -> AppError {
    AppError::insufficient_stock(
        format!("Insufficient stock. Only {available} available"),
        available,
    )
}

fn line_view(row: &CartLineRow) -> CartLineView {
    let unit_price = row.unit_price();
    CartLineView {
        id: row.id,
        product_id: row.product_id,
        variant_id: row.variant_id,
        variant_name: row.variant_name.clone(),
        quantity: row.quantity,
        unit_price,
        line_total: pricing::line_total(unit_price, row.quantity),
        available_stock: row.available_stock(),
        product: row.brief(),
    }
}

/// Price cart lines at current catalog prices
pub fn build_view(cart_id: i64, rows: &[CartLineRow]) -> CartView {
    let priced: Vec<pricing::PricedLine> = rows.iter().map(|r| (r.unit_price(), r.quantity)).collect();
    CartView {
        id: cart_id,
        items: rows.iter().map(line_view).collect(),
        summary: pricing::summarize(&priced),
    }
}

/// The owner's cart, created empty on first access
pub async fn view(pool: &SqlitePool, owner: &CartOwner) -> ServiceResult<CartView> {
    let mut conn = pool.acquire().await?;
    let cart_id = carts::get_or_create(&mut conn, owner).await?;
    let rows = carts::lines(&mut *conn, cart_id).await?;
    Ok(build_view(cart_id, &rows))
}

pub async fn add_item(pool: &SqlitePool, owner: &CartOwner, req: &AddCartItem) -> ServiceResult<CartView> {
    check_quantity(req.quantity)?;

    let mut tx = db::begin_write(pool).await?;

    let product = products::find_by_id(&mut *tx, req.product_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::ProductNotFound))?;
    if !product.is_active {
        return Err(AppError::with_message(
            ErrorCode::ProductUnavailable,
            format!("{} is no longer available", product.name),
        )
        .into());
    }

    let available = match req.variant_id {
        Some(variant_id) => {
            let variant = products::find_variant(&mut *tx, variant_id)
                .await?
                .filter(|v| v.product_id == product.id)
                .ok_or_else(|| AppError::new(ErrorCode::VariantNotFound))?;
            if !variant.is_active {
                return Err(AppError::with_message(
                    ErrorCode::ProductUnavailable,
                    format!("{} ({}) is no longer available", product.name, variant.name),
                )
                .into());
            }
            variant.stock
        }
        None => product.stock,
    };

    let cart_id = carts::get_or_create(&mut tx, owner).await?;
    match carts::find_line_for(&mut *tx, cart_id, product.id, req.variant_id).await? {
        Some((item_id, current)) => {
            let quantity = current + req.quantity;
            check_quantity(quantity)?;
            if quantity > available {
                return Err(insufficient(available).into());
            }
            carts::set_quantity(&mut *tx, item_id, quantity).await?;
        }
        None => {
            if req.quantity > available {
                return Err(insufficient(available).into());
            }
            carts::insert_line(&mut *tx, cart_id, product.id, req.variant_id, req.quantity).await?;
        }
    }

    let rows = carts::lines(&mut *tx, cart_id).await?;
    tx.commit().await?;

    tracing::debug!(cart_id, product_id = product.id, quantity = req.quantity, "Cart line added");
    Ok(build_view(cart_id, &rows))
}

pub async fn update_quantity(
    pool: &SqlitePool,
    owner: &CartOwner,
    item_id: i64,
    quantity: i64,
) -> ServiceResult<CartView> {
    check_quantity(quantity)?;

    let mut tx = db::begin_write(pool).await?;
    let cart_id = carts::find_id(&mut *tx, owner)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::CartItemNotFound))?;
    let line = carts::find_line(&mut *tx, cart_id, item_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::CartItemNotFound))?;

    let available = line.available_stock();
    if quantity > available {
        return Err(insufficient(available).into());
    }
    carts::set_quantity(&mut *tx, item_id, quantity).await?;

    let rows = carts::lines(&mut *tx, cart_id).await?;
    tx.commit().await?;
    Ok(build_view(cart_id, &rows))
}

pub async fn remove_item(pool: &SqlitePool, owner: &CartOwner, item_id: i64) -> ServiceResult<CartView> {
    let mut conn = pool.acquire().await?;
    let cart_id = carts::find_id(&mut *conn, owner)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::CartItemNotFound))?;
    if !carts::delete_line(&mut *conn, cart_id, item_id).await? {
        return Err(AppError::new(ErrorCode::CartItemNotFound).into());
    }
    let rows = carts::lines(&mut *conn, cart_id).await?;
    Ok(build_view(cart_id, &rows))
}

pub async fn clear(pool: &SqlitePool, owner: &CartOwner) -> ServiceResult<CartView> {
    let mut conn = pool.acquire().await?;
    let cart_id = carts::get_or_create(&mut conn, owner).await?;
    carts::clear(&mut *conn, cart_id).await?;
    Ok(build_view(cart_id, &[]))
}

/// Fold a guest cart into the user's cart after sign-in.
///
/// Lines present in both are summed and capped at the available stock (and
/// the per-line maximum); other lines are copied. Lines that can no longer be
/// bought are dropped. The guest cart is left empty. Returns the number of
/// guest lines carried over.
pub async fn merge_guest_into_user(
    pool: &SqlitePool,
    session_token: &str,
    user_id: i64,
) -> ServiceResult<u64> {
    let guest = CartOwner::Guest(session_token.to_string());

    let mut tx = db::begin_write(pool).await?;
    let Some(guest_cart) = carts::find_id(&mut *tx, &guest).await? else {
        return Ok(0);
    };
    let guest_lines = carts::lines(&mut *tx, guest_cart).await?;
    if guest_lines.is_empty() {
        return Ok(0);
    }

    let user_cart = carts::get_or_create(&mut tx, &CartOwner::User(user_id)).await?;
    let mut merged = 0u64;
    for line in &guest_lines {
        let cap = line.available_stock().min(MAX_LINE_QUANTITY);
        if !line.is_purchasable() || cap < MIN_LINE_QUANTITY {
            continue;
        }
        match carts::find_line_for(&mut *tx, user_cart, line.product_id, line.variant_id).await? {
            Some((item_id, current)) => {
                let quantity = (current + line.quantity).min(cap);
                carts::set_quantity(&mut *tx, item_id, quantity).await?;
            }
            None => {
                let quantity = line.quantity.min(cap);
                carts::insert_line(&mut *tx, user_cart, line.product_id, line.variant_id, quantity)
                    .await?;
            }
        }
        merged += 1;
    }

    carts::clear(&mut *tx, guest_cart).await?;
    tx.commit().await?;

    tracing::info!(user_id, merged, "Guest cart merged into user cart");
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(quantity: i64, price: i64, sale: Option<i64>, variant: Option<(i64, i64)>) -> CartLineRow {
        CartLineRow {
            id: 1,
            product_id: 10,
            variant_id: variant.map(|_| 20),
            quantity,
            product_name: "Oud Royal".into(),
            product_slug: "oud-royal".into(),
            product_image: None,
            product_price: price,
            product_sale_price: sale,
            product_stock: 7,
            product_is_active: true,
            variant_name: variant.map(|_| "100ml".into()),
            variant_price: variant.map(|(p, _)| p),
            variant_sale_price: None,
            variant_stock: variant.map(|(_, s)| s),
            variant_is_active: variant.map(|_| true),
        }
    }

    #[test]
    fn test_line_prices() {
        assert_eq!(row(1, 10_000, None, None).unit_price(), 10_000);
        assert_eq!(row(1, 10_000, Some(8_000), None).unit_price(), 8_000);
        assert_eq!(row(1, 10_000, Some(0), None).unit_price(), 10_000);
        assert_eq!(row(1, 10_000, Some(8_000), Some((15_000, 3))).unit_price(), 15_000);
    }

    #[test]
    fn test_available_stock_follows_variant() {
        assert_eq!(row(1, 100, None, None).available_stock(), 7);
        assert_eq!(row(1, 100, None, Some((100, 3))).available_stock(), 3);
    }

    #[test]
    fn test_view_totals() {
        let view = build_view(5, &[row(2, 4_550, None, None)]);
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].line_total, 9_100);
        assert_eq!(view.summary.subtotal, 9_100);
        assert_eq!(view.summary.total, 12_055);
    }

    #[test]
    fn test_quantity_bounds() {
        assert!(check_quantity(0).is_err());
        assert!(check_quantity(1).is_ok());
        assert!(check_quantity(99).is_ok());
        assert_eq!(check_quantity(100).unwrap_err().code, ErrorCode::QuantityOutOfRange);
    }
}
