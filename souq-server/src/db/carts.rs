//! Cart and cart line queries
//!
//! One `carts` table serves both owners; a row holds either a `user_id` or a
//! guest `session_token`.

use shared::models::{ProductBrief, effective_price};
use sqlx::{SqliteConnection, SqliteExecutor};

use super::RepoResult;
use crate::util::{now_millis, snowflake_id};

/// Who a cart belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartOwner {
    User(i64),
    Guest(String),
}

impl CartOwner {
    fn column(&self) -> &'static str {
        match self {
            Self::User(_) => "user_id",
            Self::Guest(_) => "session_token",
        }
    }
}

/// A cart line joined with its product and optional variant
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CartLineRow {
    pub id: i64,
    pub product_id: i64,
    pub variant_id: Option<i64>,
    pub quantity: i64,
    pub product_name: String,
    pub product_slug: String,
    pub product_image: Option<String>,
    pub product_price: i64,
    pub product_sale_price: Option<i64>,
    pub product_stock: i64,
    pub product_is_active: bool,
    pub variant_name: Option<String>,
    pub variant_price: Option<i64>,
    pub variant_sale_price: Option<i64>,
    pub variant_stock: Option<i64>,
    pub variant_is_active: Option<bool>,
}

impl CartLineRow {
    /// Variant price when a variant is selected, else the product's effective price
    pub fn unit_price(&self) -> i64 {
        match self.variant_price {
            Some(price) if self.variant_id.is_some() => effective_price(price, self.variant_sale_price),
            _ => effective_price(self.product_price, self.product_sale_price),
        }
    }

    /// Stock of the variant if one is selected, else of the product
    pub fn available_stock(&self) -> i64 {
        if self.variant_id.is_some() {
            self.variant_stock.unwrap_or(0)
        } else {
            self.product_stock
        }
    }

    pub fn is_purchasable(&self) -> bool {
        self.product_is_active
            && (self.variant_id.is_none() || self.variant_is_active == Some(true))
    }

    pub fn brief(&self) -> ProductBrief {
        ProductBrief {
            id: self.product_id,
            name: self.product_name.clone(),
            slug: self.product_slug.clone(),
            image: self.product_image.clone(),
        }
    }
}

const LINE_SELECT: &str = "SELECT ci.id, ci.product_id, ci.variant_id, ci.quantity, \
     p.name AS product_name, p.slug AS product_slug, p.image AS product_image, \
     p.price AS product_price, p.sale_price AS product_sale_price, p.stock AS product_stock, \
     p.is_active AS product_is_active, \
     v.name AS variant_name, v.price AS variant_price, v.sale_price AS variant_sale_price, \
     v.stock AS variant_stock, v.is_active AS variant_is_active \
     FROM cart_items ci \
     JOIN products p ON p.id = ci.product_id \
     LEFT JOIN product_variants v ON v.id = ci.variant_id";

pub async fn find_id(e: impl SqliteExecutor<'_>, owner: &CartOwner) -> RepoResult<Option<i64>> {
    let sql = format!("SELECT id FROM carts WHERE {} = ?", owner.column());
    let query = sqlx::query_as::<_, (i64,)>(&sql);
    let query = match owner {
        CartOwner::User(user_id) => query.bind(*user_id),
        CartOwner::Guest(token) => query.bind(token.as_str()),
    };
    let row = query.fetch_optional(e).await?;
    Ok(row.map(|(id,)| id))
}

pub async fn get_or_create(conn: &mut SqliteConnection, owner: &CartOwner) -> RepoResult<i64> {
    let now = now_millis();
    let query = match owner {
        CartOwner::User(user_id) => sqlx::query(
            "INSERT INTO carts (id, user_id, created_at, updated_at) VALUES (?, ?, ?, ?) ON CONFLICT DO NOTHING",
        )
        .bind(snowflake_id())
        .bind(*user_id),
        CartOwner::Guest(token) => sqlx::query(
            "INSERT INTO carts (id, session_token, created_at, updated_at) VALUES (?, ?, ?, ?) ON CONFLICT DO NOTHING",
        )
        .bind(snowflake_id())
        .bind(token.clone()),
    };
    query.bind(now).bind(now).execute(&mut *conn).await?;

    find_id(&mut *conn, owner).await?.ok_or(sqlx::Error::RowNotFound)
}

pub async fn lines(e: impl SqliteExecutor<'_>, cart_id: i64) -> RepoResult<Vec<CartLineRow>> {
    let sql = format!("{LINE_SELECT} WHERE ci.cart_id = ? ORDER BY ci.created_at, ci.id");
    sqlx::query_as::<_, CartLineRow>(&sql)
        .bind(cart_id)
        .fetch_all(e)
        .await
}

pub async fn find_line(
    e: impl SqliteExecutor<'_>,
    cart_id: i64,
    item_id: i64,
) -> RepoResult<Option<CartLineRow>> {
    let sql = format!("{LINE_SELECT} WHERE ci.cart_id = ? AND ci.id = ?");
    sqlx::query_as::<_, CartLineRow>(&sql)
        .bind(cart_id)
        .bind(item_id)
        .fetch_optional(e)
        .await
}

/// Existing line for (product, variant): `(item id, quantity)`
pub async fn find_line_for(
    e: impl SqliteExecutor<'_>,
    cart_id: i64,
    product_id: i64,
    variant_id: Option<i64>,
) -> RepoResult<Option<(i64, i64)>> {
    sqlx::query_as::<_, (i64, i64)>(
        "SELECT id, quantity FROM cart_items WHERE cart_id = ? AND product_id = ? AND IFNULL(variant_id, 0) = IFNULL(?, 0)",
    )
    .bind(cart_id)
    .bind(product_id)
    .bind(variant_id)
    .fetch_optional(e)
    .await
}

pub async fn insert_line(
    e: impl SqliteExecutor<'_>,
    cart_id: i64,
    product_id: i64,
    variant_id: Option<i64>,
    quantity: i64,
) -> RepoResult<i64> {
    let now = now_millis();
    let id = snowflake_id();
    sqlx::query(
        "INSERT INTO cart_items (id, cart_id, product_id, variant_id, quantity, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
    )
    .bind(id)
    .bind(cart_id)
    .bind(product_id)
    .bind(variant_id)
    .bind(quantity)
    .bind(now)
    .execute(e)
    .await?;
    Ok(id)
}

pub async fn set_quantity(e: impl SqliteExecutor<'_>, item_id: i64, quantity: i64) -> RepoResult<()> {
    sqlx::query("UPDATE cart_items SET quantity = ?, updated_at = ? WHERE id = ?")
        .bind(quantity)
        .bind(now_millis())
        .bind(item_id)
        .execute(e)
        .await?;
    Ok(())
}

pub async fn delete_line(e: impl SqliteExecutor<'_>, cart_id: i64, item_id: i64) -> RepoResult<bool> {
    let rows = sqlx::query("DELETE FROM cart_items WHERE cart_id = ? AND id = ?")
        .bind(cart_id)
        .bind(item_id)
        .execute(e)
        .await?;
    Ok(rows.rows_affected() > 0)
}

/// Remove every line; returns the number removed
pub async fn clear(e: impl SqliteExecutor<'_>, cart_id: i64) -> RepoResult<u64> {
    let rows = sqlx::query("DELETE FROM cart_items WHERE cart_id = ?")
        .bind(cart_id)
        .execute(e)
        .await?;
    Ok(rows.rows_affected())
}
