//! Order placement, cancellation and lookups
//!
//! Placement and cancellation each run in a single transaction. Stock moves
//! through conditional updates, so a line that no longer fits makes the whole
//! transaction roll back with nothing changed.

use shared::error::{AppError, ErrorCode};
use shared::models::{
    Order, OrderDetail, OrderKind, OrderStatus, PaymentMethod, ShippingAddress,
};
use sqlx::{SqliteConnection, SqlitePool};

use crate::db::carts::{self, CartLineRow, CartOwner};
use crate::db::orders::{self, NewOrder, NewOrderItem, Placer};
use crate::db::{self, products};
use crate::error::ServiceResult;
use crate::pricing;
use crate::util::{generate_order_number, snowflake_id};

/// Contact details a guest gives at checkout
#[derive(Debug, Clone)]
pub struct GuestContact {
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone)]
pub struct Checkout {
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    /// Required for guest carts
    pub guest_contact: Option<GuestContact>,
}

/// Who may see or act on an order
#[derive(Debug, Clone)]
pub enum OrderScope {
    /// The user who placed it
    User(i64),
    /// Guest order, proven by its contact email (case-insensitive)
    GuestEmail(String),
    /// Guest order, held by the session that placed it
    GuestSession(String),
    /// Back office
    Admin,
}

impl OrderScope {
    fn allows(&self, order: &Order) -> bool {
        match self {
            Self::User(user_id) => !order.kind.is_guest() && order.user_id == Some(*user_id),
            Self::GuestEmail(email) => {
                order.kind.is_guest()
                    && order
                        .guest_email
                        .as_deref()
                        .is_some_and(|e| e.eq_ignore_ascii_case(email.trim()))
            }
            // checked by the session-scoped query
            Self::GuestSession(_) => order.kind.is_guest(),
            Self::Admin => true,
        }
    }
}

async fn load_detail(pool: &SqlitePool, kind: OrderKind, id: i64) -> ServiceResult<OrderDetail> {
    let order = orders::find(pool, kind, id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound))?;
    let items = orders::items(pool, kind, id).await?;
    Ok(OrderDetail { order, items })
}

async fn with_items(pool: &SqlitePool, order: Order) -> ServiceResult<OrderDetail> {
    let items = orders::items(pool, order.kind, order.id).await?;
    Ok(OrderDetail { order, items })
}

fn line_label(line: &CartLineRow) -> String {
    match &line.variant_name {
        Some(variant) => format!("{} ({variant})", line.product_name),
        None => line.product_name.clone(),
    }
}

/// Fail on the first line that cannot be sold as-is
fn check_line(line: &CartLineRow) -> Result<(), AppError> {
    if !line.is_purchasable() {
        return Err(AppError::with_message(
            ErrorCode::ProductUnavailable,
            format!("{} is no longer available", line_label(line)),
        ));
    }
    let available = line.available_stock();
    if line.quantity > available {
        return Err(AppError::insufficient_stock(
            format!("Insufficient stock for {}. Only {available} available", line_label(line)),
            available,
        ));
    }
    Ok(())
}

/// Turn the owner's cart into an order.
///
/// Empty carts are rejected before any transaction is opened. Inside the
/// transaction every line is re-read and checked, the order and its line
/// snapshots are written, stock is taken line by line and the cart is
/// cleared.
pub async fn place_order(
    pool: &SqlitePool,
    owner: &CartOwner,
    checkout: &Checkout,
) -> ServiceResult<OrderDetail> {
    let cart_id = carts::find_id(pool, owner).await?;
    let has_lines = match cart_id {
        Some(id) => !carts::lines(pool, id).await?.is_empty(),
        None => false,
    };
    let Some(cart_id) = cart_id.filter(|_| has_lines) else {
        return Err(AppError::with_message(ErrorCode::CartEmpty, "Cart is empty").into());
    };

    if matches!(owner, CartOwner::Guest(_)) && checkout.guest_contact.is_none() {
        return Err(AppError::validation("Guest email and phone are required").into());
    }

    let mut tx = db::begin_write(pool).await?;

    let lines = carts::lines(&mut *tx, cart_id).await?;
    if lines.is_empty() {
        return Err(AppError::with_message(ErrorCode::CartEmpty, "Cart is empty").into());
    }
    for line in &lines {
        check_line(line)?;
    }

    let priced: Vec<pricing::PricedLine> = lines.iter().map(|l| (l.unit_price(), l.quantity)).collect();
    let summary = pricing::summarize(&priced);

    let order_id = snowflake_id();
    let order_number = generate_order_number();
    let placer = match (owner, &checkout.guest_contact) {
        (CartOwner::User(user_id), _) => Placer::User {
            user_id: *user_id,
            coins_earned: summary.coins_earnable,
        },
        (CartOwner::Guest(token), Some(contact)) => Placer::Guest {
            session_token: token,
            email: &contact.email,
            phone: &contact.phone,
        },
        (CartOwner::Guest(_), None) => {
            return Err(AppError::validation("Guest email and phone are required").into());
        }
    };
    let kind = placer.kind();

    orders::insert(
        &mut tx,
        &NewOrder {
            id: order_id,
            order_number: &order_number,
            placer,
            payment_method: checkout.payment_method,
            shipping_address: &checkout.shipping_address,
            subtotal: summary.subtotal,
            tax: summary.tax,
            shipping_fee: summary.shipping,
            discount: summary.discount,
            total: summary.total,
        },
    )
    .await?;

    for line in &lines {
        orders::insert_item(
            &mut tx,
            kind,
            order_id,
            &NewOrderItem {
                product_id: line.product_id,
                variant_id: line.variant_id,
                product_name: &line.product_name,
                variant_name: line.variant_name.as_deref(),
                quantity: line.quantity,
                unit_price: line.unit_price(),
            },
        )
        .await?;

        if !products::take_stock(&mut tx, line.product_id, line.variant_id, line.quantity).await? {
            tracing::warn!(
                product_id = line.product_id,
                variant_id = ?line.variant_id,
                quantity = line.quantity,
                "Stock changed during checkout, rolling back"
            );
            return Err(AppError::insufficient_stock(
                format!("Insufficient stock for {}", line_label(line)),
                0,
            )
            .into());
        }
    }

    carts::clear(&mut *tx, cart_id).await?;
    tx.commit().await?;

    tracing::info!(
        order_id,
        order_number = %order_number,
        kind = ?kind,
        total = summary.total,
        lines = lines.len(),
        "Order placed"
    );

    load_detail(pool, kind, order_id).await
}

async fn restore_order_stock(conn: &mut SqliteConnection, kind: OrderKind, order_id: i64) -> ServiceResult<()> {
    for item in orders::items(&mut *conn, kind, order_id).await? {
        products::restore_stock(conn, item.product_id, item.variant_id, item.quantity).await?;
    }
    Ok(())
}

/// Cancel a `PENDING`/`CONFIRMED` order and put its stock back.
///
/// The payment status always becomes `REFUNDED`, whether or not a payment was
/// captured. A second cancel finds the order already `CANCELLED` and fails.
pub async fn cancel_order(
    pool: &SqlitePool,
    kind: OrderKind,
    id: i64,
    scope: &OrderScope,
) -> ServiceResult<OrderDetail> {
    let mut tx = db::begin_write(pool).await?;

    let order = orders::find(&mut *tx, kind, id)
        .await?
        .filter(|o| scope.allows(o))
        .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound))?;

    if !order.status.can_cancel() {
        return Err(AppError::with_message(
            ErrorCode::OrderNotCancellable,
            format!("Cannot cancel order with status {}", order.status.as_db()),
        )
        .into());
    }

    if orders::mark_cancelled(&mut tx, kind, id).await? == 0 {
        return Err(AppError::with_message(
            ErrorCode::OrderNotCancellable,
            "Order status changed, cannot cancel",
        )
        .into());
    }
    restore_order_stock(&mut tx, kind, id).await?;
    tx.commit().await?;

    tracing::info!(order_id = id, order_number = %order.order_number, kind = ?kind, "Order cancelled");
    load_detail(pool, kind, id).await
}

/// Back-office status change: forward steps only, `CANCELLED` runs the
/// cancellation transaction.
pub async fn update_status(
    pool: &SqlitePool,
    kind: OrderKind,
    id: i64,
    next: OrderStatus,
) -> ServiceResult<OrderDetail> {
    if next == OrderStatus::Cancelled {
        return cancel_order(pool, kind, id, &OrderScope::Admin).await;
    }

    let mut tx = db::begin_write(pool).await?;
    let order = orders::find(&mut *tx, kind, id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound))?;

    if !order.status.can_transition_to(next) {
        return Err(AppError::with_message(
            ErrorCode::InvalidStatusTransition,
            format!(
                "Cannot move order from {} to {}",
                order.status.as_db(),
                next.as_db()
            ),
        )
        .into());
    }
    if orders::set_status(&mut tx, kind, id, order.status, next).await? == 0 {
        return Err(AppError::with_message(
            ErrorCode::InvalidStatusTransition,
            "Order status changed concurrently",
        )
        .into());
    }
    tx.commit().await?;

    tracing::info!(order_id = id, from = order.status.as_db(), to = next.as_db(), "Order status updated");
    load_detail(pool, kind, id).await
}

pub async fn list_user_orders(pool: &SqlitePool, user_id: i64) -> ServiceResult<Vec<OrderDetail>> {
    let mut result = Vec::new();
    for order in orders::list_for_user(pool, user_id).await? {
        result.push(with_items(pool, order).await?);
    }
    Ok(result)
}

/// One order of the calling user; someone else's order is reported as missing
pub async fn get_user_order(pool: &SqlitePool, user_id: i64, id: i64) -> ServiceResult<OrderDetail> {
    let order = orders::find(pool, OrderKind::User, id)
        .await?
        .filter(|o| OrderScope::User(user_id).allows(o))
        .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound))?;
    with_items(pool, order).await
}

pub async fn get_guest_order(pool: &SqlitePool, id: i64, email: &str) -> ServiceResult<OrderDetail> {
    let order = orders::find(pool, OrderKind::Guest, id)
        .await?
        .filter(|o| OrderScope::GuestEmail(email.to_string()).allows(o))
        .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound))?;
    with_items(pool, order).await
}

pub async fn list_guest_orders(pool: &SqlitePool, email: &str) -> ServiceResult<Vec<OrderDetail>> {
    let mut result = Vec::new();
    for order in orders::list_for_guest_email(pool, email.trim()).await? {
        result.push(with_items(pool, order).await?);
    }
    Ok(result)
}

/// Public tracking by order number and contact email, across both tables
pub async fn track(pool: &SqlitePool, order_number: &str, email: &str) -> ServiceResult<OrderDetail> {
    let email = email.trim();
    for kind in [OrderKind::User, OrderKind::Guest] {
        if let Some(order) = orders::find_by_number_and_email(pool, kind, order_number.trim(), email).await? {
            return with_items(pool, order).await;
        }
    }
    Err(AppError::new(ErrorCode::OrderNotFound).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{OrderStatus, PaymentStatus};

    fn order(kind: OrderKind, user_id: Option<i64>, guest_email: Option<&str>) -> Order {
        Order {
            id: 1,
            kind,
            order_number: "ORD-1-ABCDEFGHI".into(),
            user_id,
            guest_email: guest_email.map(str::to_string),
            guest_phone: None,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            payment_method: PaymentMethod::CashOnDelivery,
            payment_intent_id: None,
            shipping_address: ShippingAddress {
                full_name: "Layla Hassan".into(),
                phone: "+971500000000".into(),
                street: "Sheikh Zayed Rd".into(),
                building: "Tower 2".into(),
                apartment: None,
                city: "Dubai".into(),
                country: "AE".into(),
                landmark: None,
                notes: None,
            },
            subtotal: 0,
            tax: 0,
            shipping_fee: 0,
            discount: 0,
            total: 0,
            coins_earned: 0,
            created_at: 0,
            updated_at: 0,
            confirmed_at: None,
            cancelled_at: None,
        }
    }

    #[test]
    fn test_user_scope() {
        let mine = order(OrderKind::User, Some(7), None);
        assert!(OrderScope::User(7).allows(&mine));
        assert!(!OrderScope::User(8).allows(&mine));
        assert!(!OrderScope::GuestEmail("a@b.co".into()).allows(&mine));
        assert!(OrderScope::Admin.allows(&mine));
    }

    #[test]
    fn test_guest_email_scope_ignores_case() {
        let guest = order(OrderKind::Guest, None, Some("Layla@Example.com"));
        assert!(OrderScope::GuestEmail("layla@example.com".into()).allows(&guest));
        assert!(OrderScope::GuestEmail(" LAYLA@EXAMPLE.COM ".into()).allows(&guest));
        assert!(!OrderScope::GuestEmail("other@example.com".into()).allows(&guest));
        assert!(!OrderScope::User(7).allows(&guest));
    }
}
