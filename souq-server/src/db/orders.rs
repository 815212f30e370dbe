//! Order queries for both order tables
//!
//! User orders live in `orders`/`order_items`, guest orders in
//! `guest_orders`/`guest_order_items`. Every function takes the
//! [`OrderKind`] and picks the tables from it; rows of both shapes decode into
//! the same [`OrderRow`].

use shared::models::{
    Order, OrderItem, OrderKind, OrderStatus, PaymentMethod, PaymentStatus, ProductBrief,
    ShippingAddress,
};
use sqlx::types::Json;
use sqlx::{SqliteConnection, SqliteExecutor, SqlitePool};

use super::RepoResult;
use crate::util::{now_millis, snowflake_id};

fn orders_table(kind: OrderKind) -> &'static str {
    match kind {
        OrderKind::User => "orders",
        OrderKind::Guest => "guest_orders",
    }
}

fn items_table(kind: OrderKind) -> &'static str {
    match kind {
        OrderKind::User => "order_items",
        OrderKind::Guest => "guest_order_items",
    }
}

const ORDER_COLUMNS: &str = "id, order_number, status, payment_status, payment_method, payment_intent_id, shipping_address, subtotal, tax, shipping_fee, discount, total, created_at, updated_at, confirmed_at, cancelled_at";

fn order_select(kind: OrderKind) -> String {
    match kind {
        OrderKind::User => format!(
            "SELECT {ORDER_COLUMNS}, user_id, NULL AS guest_email, NULL AS guest_phone, coins_earned FROM orders"
        ),
        OrderKind::Guest => format!(
            "SELECT {ORDER_COLUMNS}, NULL AS user_id, guest_email, guest_phone, 0 AS coins_earned FROM guest_orders"
        ),
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct OrderRow {
    pub id: i64,
    pub order_number: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub payment_intent_id: Option<String>,
    pub shipping_address: Json<ShippingAddress>,
    pub subtotal: i64,
    pub tax: i64,
    pub shipping_fee: i64,
    pub discount: i64,
    pub total: i64,
    pub created_at: i64,
    pub updated_at: i64,
    pub confirmed_at: Option<i64>,
    pub cancelled_at: Option<i64>,
    pub user_id: Option<i64>,
    pub guest_email: Option<String>,
    pub guest_phone: Option<String>,
    pub coins_earned: i64,
}

impl OrderRow {
    pub fn into_order(self, kind: OrderKind) -> Order {
        Order {
            id: self.id,
            kind,
            order_number: self.order_number,
            user_id: self.user_id,
            guest_email: self.guest_email,
            guest_phone: self.guest_phone,
            status: self.status,
            payment_status: self.payment_status,
            payment_method: self.payment_method,
            payment_intent_id: self.payment_intent_id,
            shipping_address: self.shipping_address.0,
            subtotal: self.subtotal,
            tax: self.tax,
            shipping_fee: self.shipping_fee,
            discount: self.discount,
            total: self.total,
            coins_earned: self.coins_earned,
            created_at: self.created_at,
            updated_at: self.updated_at,
            confirmed_at: self.confirmed_at,
            cancelled_at: self.cancelled_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    id: i64,
    order_id: i64,
    product_id: i64,
    variant_id: Option<i64>,
    product_name: String,
    variant_name: Option<String>,
    quantity: i64,
    unit_price: i64,
    line_total: i64,
    current_name: Option<String>,
    current_slug: Option<String>,
    current_image: Option<String>,
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        let product = match (row.current_name, row.current_slug) {
            (Some(name), Some(slug)) => Some(ProductBrief {
                id: row.product_id,
                name,
                slug,
                image: row.current_image,
            }),
            _ => None,
        };
        OrderItem {
            id: row.id,
            order_id: row.order_id,
            product_id: row.product_id,
            variant_id: row.variant_id,
            product_name: row.product_name,
            variant_name: row.variant_name,
            quantity: row.quantity,
            unit_price: row.unit_price,
            line_total: row.line_total,
            product,
        }
    }
}

/// Who placed a new order
pub enum Placer<'a> {
    User { user_id: i64, coins_earned: i64 },
    Guest { session_token: &'a str, email: &'a str, phone: &'a str },
}

impl Placer<'_> {
    pub fn kind(&self) -> OrderKind {
        match self {
            Self::User { .. } => OrderKind::User,
            Self::Guest { .. } => OrderKind::Guest,
        }
    }
}

pub struct NewOrder<'a> {
    pub id: i64,
    pub order_number: &'a str,
    pub placer: Placer<'a>,
    pub payment_method: PaymentMethod,
    pub shipping_address: &'a ShippingAddress,
    pub subtotal: i64,
    pub tax: i64,
    pub shipping_fee: i64,
    pub discount: i64,
    pub total: i64,
}

/// Line snapshot written at placement
pub struct NewOrderItem<'a> {
    pub product_id: i64,
    pub variant_id: Option<i64>,
    pub product_name: &'a str,
    pub variant_name: Option<&'a str>,
    pub quantity: i64,
    pub unit_price: i64,
}

pub async fn insert(conn: &mut SqliteConnection, order: &NewOrder<'_>) -> RepoResult<()> {
    let now = now_millis();
    let address = Json(order.shipping_address);
    let query = match &order.placer {
        Placer::User { user_id, coins_earned } => sqlx::query(
            "INSERT INTO orders (id, order_number, payment_method, shipping_address, subtotal, tax, shipping_fee, discount, total, created_at, updated_at, user_id, coins_earned) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10, ?11, ?12)",
        )
        .bind(order.id)
        .bind(order.order_number)
        .bind(order.payment_method)
        .bind(address)
        .bind(order.subtotal)
        .bind(order.tax)
        .bind(order.shipping_fee)
        .bind(order.discount)
        .bind(order.total)
        .bind(now)
        .bind(*user_id)
        .bind(*coins_earned),
        Placer::Guest { session_token, email, phone } => sqlx::query(
            "INSERT INTO guest_orders (id, order_number, payment_method, shipping_address, subtotal, tax, shipping_fee, discount, total, created_at, updated_at, session_token, guest_email, guest_phone) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10, ?11, ?12, ?13)",
        )
        .bind(order.id)
        .bind(order.order_number)
        .bind(order.payment_method)
        .bind(address)
        .bind(order.subtotal)
        .bind(order.tax)
        .bind(order.shipping_fee)
        .bind(order.discount)
        .bind(order.total)
        .bind(now)
        .bind(*session_token)
        .bind(*email)
        .bind(*phone),
    };
    query.execute(conn).await?;
    Ok(())
}

pub async fn insert_item(
    conn: &mut SqliteConnection,
    kind: OrderKind,
    order_id: i64,
    item: &NewOrderItem<'_>,
) -> RepoResult<()> {
    let sql = format!(
        "INSERT INTO {} (id, order_id, product_id, variant_id, product_name, variant_name, quantity, unit_price, line_total) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        items_table(kind)
    );
    sqlx::query(&sql)
        .bind(snowflake_id())
        .bind(order_id)
        .bind(item.product_id)
        .bind(item.variant_id)
        .bind(item.product_name)
        .bind(item.variant_name)
        .bind(item.quantity)
        .bind(item.unit_price)
        .bind(item.unit_price * item.quantity)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn find(e: impl SqliteExecutor<'_>, kind: OrderKind, id: i64) -> RepoResult<Option<Order>> {
    let sql = format!("{} WHERE id = ?", order_select(kind));
    let row = sqlx::query_as::<_, OrderRow>(&sql)
        .bind(id)
        .fetch_optional(e)
        .await?;
    Ok(row.map(|r| r.into_order(kind)))
}

/// Guest order visible to the holder of `session_token`
pub async fn find_guest_in_session(
    pool: &SqlitePool,
    id: i64,
    session_token: &str,
) -> RepoResult<Option<Order>> {
    let sql = format!("{} WHERE id = ? AND session_token = ?", order_select(OrderKind::Guest));
    let row = sqlx::query_as::<_, OrderRow>(&sql)
        .bind(id)
        .bind(session_token)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|r| r.into_order(OrderKind::Guest)))
}

/// Order currently holding this payment intent id
pub async fn find_by_payment_intent(
    e: impl SqliteExecutor<'_>,
    kind: OrderKind,
    payment_intent_id: &str,
) -> RepoResult<Option<Order>> {
    let sql = format!("{} WHERE payment_intent_id = ?", order_select(kind));
    let row = sqlx::query_as::<_, OrderRow>(&sql)
        .bind(payment_intent_id)
        .fetch_optional(e)
        .await?;
    Ok(row.map(|r| r.into_order(kind)))
}

/// Order by number whose contact email matches (account email for user orders)
pub async fn find_by_number_and_email(
    pool: &SqlitePool,
    kind: OrderKind,
    order_number: &str,
    email: &str,
) -> RepoResult<Option<Order>> {
    let sql = match kind {
        OrderKind::User => format!(
            "{} WHERE order_number = ? AND user_id IN (SELECT id FROM users WHERE email = ?)",
            order_select(kind)
        ),
        OrderKind::Guest => format!(
            "{} WHERE order_number = ? AND guest_email = ? COLLATE NOCASE",
            order_select(kind)
        ),
    };
    let row = sqlx::query_as::<_, OrderRow>(&sql)
        .bind(order_number)
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|r| r.into_order(kind)))
}

pub async fn list_for_user(pool: &SqlitePool, user_id: i64) -> RepoResult<Vec<Order>> {
    let sql = format!(
        "{} WHERE user_id = ? ORDER BY created_at DESC, id DESC",
        order_select(OrderKind::User)
    );
    let rows = sqlx::query_as::<_, OrderRow>(&sql)
        .bind(user_id)
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(|r| r.into_order(OrderKind::User)).collect())
}

pub async fn list_for_guest_email(pool: &SqlitePool, email: &str) -> RepoResult<Vec<Order>> {
    let sql = format!(
        "{} WHERE guest_email = ? COLLATE NOCASE ORDER BY created_at DESC, id DESC",
        order_select(OrderKind::Guest)
    );
    let rows = sqlx::query_as::<_, OrderRow>(&sql)
        .bind(email)
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(|r| r.into_order(OrderKind::Guest)).collect())
}

/// Item snapshots with the product's current name/slug/image
pub async fn items(e: impl SqliteExecutor<'_>, kind: OrderKind, order_id: i64) -> RepoResult<Vec<OrderItem>> {
    let sql = format!(
        "SELECT i.id, i.order_id, i.product_id, i.variant_id, i.product_name, i.variant_name, \
         i.quantity, i.unit_price, i.line_total, \
         p.name AS current_name, p.slug AS current_slug, p.image AS current_image \
         FROM {} i LEFT JOIN products p ON p.id = i.product_id \
         WHERE i.order_id = ? ORDER BY i.rowid",
        items_table(kind)
    );
    let rows = sqlx::query_as::<_, OrderItemRow>(&sql)
        .bind(order_id)
        .fetch_all(e)
        .await?;
    Ok(rows.into_iter().map(OrderItem::from).collect())
}

/// `CANCELLED` + `REFUNDED`, only from a cancellable status. Returns rows changed.
pub async fn mark_cancelled(conn: &mut SqliteConnection, kind: OrderKind, id: i64) -> RepoResult<u64> {
    let now = now_millis();
    let sql = format!(
        "UPDATE {} SET status = 'CANCELLED', payment_status = 'REFUNDED', cancelled_at = ?1, updated_at = ?1 \
         WHERE id = ?2 AND status IN ('PENDING', 'CONFIRMED')",
        orders_table(kind)
    );
    let rows = sqlx::query(&sql).bind(now).bind(id).execute(conn).await?;
    Ok(rows.rows_affected())
}

/// Move `from → to` if the order is still in `from`. Returns rows changed.
pub async fn set_status(
    conn: &mut SqliteConnection,
    kind: OrderKind,
    id: i64,
    from: OrderStatus,
    to: OrderStatus,
) -> RepoResult<u64> {
    let now = now_millis();
    let sql = format!(
        "UPDATE {} SET status = ?1, updated_at = ?2, \
         confirmed_at = CASE WHEN ?1 = 'CONFIRMED' THEN COALESCE(confirmed_at, ?2) ELSE confirmed_at END \
         WHERE id = ?3 AND status = ?4",
        orders_table(kind)
    );
    let rows = sqlx::query(&sql)
        .bind(to)
        .bind(now)
        .bind(id)
        .bind(from)
        .execute(conn)
        .await?;
    Ok(rows.rows_affected())
}

pub async fn set_payment_intent(
    pool: &SqlitePool,
    kind: OrderKind,
    id: i64,
    payment_intent_id: &str,
) -> RepoResult<()> {
    let sql = format!(
        "UPDATE {} SET payment_intent_id = ?, updated_at = ? WHERE id = ?",
        orders_table(kind)
    );
    sqlx::query(&sql)
        .bind(payment_intent_id)
        .bind(now_millis())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// `PAID` from `PENDING`/`FAILED` on a live order; a pending order becomes
/// `CONFIRMED`. Returns rows changed (0 when already paid or cancelled).
pub async fn mark_paid(
    conn: &mut SqliteConnection,
    kind: OrderKind,
    id: i64,
    payment_intent_id: &str,
) -> RepoResult<u64> {
    let now = now_millis();
    let sql = format!(
        "UPDATE {} SET payment_status = 'PAID', payment_intent_id = ?1, \
         status = CASE WHEN status = 'PENDING' THEN 'CONFIRMED' ELSE status END, \
         confirmed_at = COALESCE(confirmed_at, ?2), updated_at = ?2 \
         WHERE id = ?3 AND payment_status IN ('PENDING', 'FAILED') AND status <> 'CANCELLED'",
        orders_table(kind)
    );
    let rows = sqlx::query(&sql)
        .bind(payment_intent_id)
        .bind(now)
        .bind(id)
        .execute(conn)
        .await?;
    Ok(rows.rows_affected())
}

/// `FAILED` from `PENDING` only. Returns rows changed.
pub async fn mark_failed(conn: &mut SqliteConnection, kind: OrderKind, id: i64) -> RepoResult<u64> {
    let sql = format!(
        "UPDATE {} SET payment_status = 'FAILED', updated_at = ? \
         WHERE id = ? AND payment_status = 'PENDING' AND status <> 'CANCELLED'",
        orders_table(kind)
    );
    let rows = sqlx::query(&sql)
        .bind(now_millis())
        .bind(id)
        .execute(conn)
        .await?;
    Ok(rows.rows_affected())
}
