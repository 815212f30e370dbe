//! Product and variant queries, including the stock counters

use shared::models::{
    Product, ProductCreate, ProductUpdate, ProductVariant, VariantCreate, VariantUpdate,
};
use sqlx::{SqliteConnection, SqliteExecutor, SqlitePool};

use super::RepoResult;
use crate::util::{now_millis, snowflake_id};

const PRODUCT_SELECT: &str = "SELECT id, name, slug, description, brand, image, price, sale_price, stock, sales_count, is_featured, is_active, created_at, updated_at FROM products";
const VARIANT_SELECT: &str = "SELECT id, product_id, name, size, sku, price, sale_price, stock, is_active, created_at, updated_at FROM product_variants";

/// Active products, newest first, optionally filtered by name/brand
pub async fn list_active(
    pool: &SqlitePool,
    search: Option<&str>,
    limit: i64,
    offset: i64,
) -> RepoResult<(Vec<Product>, i64)> {
    let pattern = search.map(|q| format!("%{}%", q.trim()));
    let filter = "is_active = 1 AND (?1 IS NULL OR name LIKE ?1 OR brand LIKE ?1)";

    let sql = format!("{PRODUCT_SELECT} WHERE {filter} ORDER BY created_at DESC, id DESC LIMIT ?2 OFFSET ?3");
    let rows = sqlx::query_as::<_, Product>(&sql)
        .bind(&pattern)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

    let (total,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM products WHERE {filter}"))
        .bind(&pattern)
        .fetch_one(pool)
        .await?;

    Ok((rows, total))
}

/// Active featured products, best sellers first
pub async fn list_featured(pool: &SqlitePool, limit: i64) -> RepoResult<Vec<Product>> {
    let sql = format!(
        "{PRODUCT_SELECT} WHERE is_active = 1 AND is_featured = 1 \
         ORDER BY sales_count DESC, created_at DESC, id DESC LIMIT ?"
    );
    sqlx::query_as::<_, Product>(&sql)
        .bind(limit)
        .fetch_all(pool)
        .await
}

pub async fn find_by_id(e: impl SqliteExecutor<'_>, id: i64) -> RepoResult<Option<Product>> {
    let sql = format!("{PRODUCT_SELECT} WHERE id = ?");
    sqlx::query_as::<_, Product>(&sql)
        .bind(id)
        .fetch_optional(e)
        .await
}

pub async fn find_active_by_slug(pool: &SqlitePool, slug: &str) -> RepoResult<Option<Product>> {
    let sql = format!("{PRODUCT_SELECT} WHERE slug = ? AND is_active = 1");
    sqlx::query_as::<_, Product>(&sql)
        .bind(slug)
        .fetch_optional(pool)
        .await
}

pub async fn variants_for(
    pool: &SqlitePool,
    product_id: i64,
    active_only: bool,
) -> RepoResult<Vec<ProductVariant>> {
    let sql = format!(
        "{VARIANT_SELECT} WHERE product_id = ? AND (? = 0 OR is_active = 1) ORDER BY price, id"
    );
    sqlx::query_as::<_, ProductVariant>(&sql)
        .bind(product_id)
        .bind(active_only)
        .fetch_all(pool)
        .await
}

pub async fn find_variant(e: impl SqliteExecutor<'_>, id: i64) -> RepoResult<Option<ProductVariant>> {
    let sql = format!("{VARIANT_SELECT} WHERE id = ?");
    sqlx::query_as::<_, ProductVariant>(&sql)
        .bind(id)
        .fetch_optional(e)
        .await
}

pub async fn create(pool: &SqlitePool, data: &ProductCreate) -> RepoResult<Product> {
    let now = now_millis();
    let id = snowflake_id();
    sqlx::query(
        "INSERT INTO products (id, name, slug, description, brand, image, price, sale_price, stock, sales_count, is_featured, is_active, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0, ?10, ?11, ?12, ?12)",
    )
    .bind(id)
    .bind(&data.name)
    .bind(&data.slug)
    .bind(&data.description)
    .bind(&data.brand)
    .bind(&data.image)
    .bind(data.price)
    .bind(data.sale_price)
    .bind(data.stock)
    .bind(data.is_featured.unwrap_or(false))
    .bind(data.is_active.unwrap_or(true))
    .bind(now)
    .execute(pool)
    .await?;

    find_by_id(pool, id).await?.ok_or(sqlx::Error::RowNotFound)
}

/// Partial update; `None` fields keep their value
pub async fn update(pool: &SqlitePool, id: i64, data: &ProductUpdate) -> RepoResult<Option<Product>> {
    let now = now_millis();
    let rows = sqlx::query(
        "UPDATE products SET name = COALESCE(?1, name), description = COALESCE(?2, description), \
         brand = COALESCE(?3, brand), image = COALESCE(?4, image), price = COALESCE(?5, price), \
         sale_price = COALESCE(?6, sale_price), stock = COALESCE(?7, stock), \
         is_featured = COALESCE(?8, is_featured), is_active = COALESCE(?9, is_active), updated_at = ?10 \
         WHERE id = ?11",
    )
    .bind(&data.name)
    .bind(&data.description)
    .bind(&data.brand)
    .bind(&data.image)
    .bind(data.price)
    .bind(data.sale_price)
    .bind(data.stock)
    .bind(data.is_featured)
    .bind(data.is_active)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;

    if rows.rows_affected() == 0 {
        return Ok(None);
    }
    find_by_id(pool, id).await
}

pub async fn create_variant(
    pool: &SqlitePool,
    product_id: i64,
    data: &VariantCreate,
) -> RepoResult<ProductVariant> {
    let now = now_millis();
    let id = snowflake_id();
    sqlx::query(
        "INSERT INTO product_variants (id, product_id, name, size, sku, price, sale_price, stock, is_active, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 1, ?9, ?9)",
    )
    .bind(id)
    .bind(product_id)
    .bind(&data.name)
    .bind(&data.size)
    .bind(&data.sku)
    .bind(data.price)
    .bind(data.sale_price)
    .bind(data.stock)
    .bind(now)
    .execute(pool)
    .await?;

    find_variant(pool, id).await?.ok_or(sqlx::Error::RowNotFound)
}

pub async fn update_variant(
    pool: &SqlitePool,
    id: i64,
    data: &VariantUpdate,
) -> RepoResult<Option<ProductVariant>> {
    let rows = sqlx::query(
        "UPDATE product_variants SET name = COALESCE(?1, name), price = COALESCE(?2, price), \
         sale_price = COALESCE(?3, sale_price), stock = COALESCE(?4, stock), \
         is_active = COALESCE(?5, is_active), updated_at = ?6 WHERE id = ?7",
    )
    .bind(&data.name)
    .bind(data.price)
    .bind(data.sale_price)
    .bind(data.stock)
    .bind(data.is_active)
    .bind(now_millis())
    .bind(id)
    .execute(pool)
    .await?;

    if rows.rows_affected() == 0 {
        return Ok(None);
    }
    find_variant(pool, id).await
}

/// Take `quantity` units for a sold line.
///
/// The decrement only applies while enough stock remains and the product (and
/// variant) is active; `false` means nothing was changed. `sales_count` is
/// always tracked on the product.
pub async fn take_stock(
    conn: &mut SqliteConnection,
    product_id: i64,
    variant_id: Option<i64>,
    quantity: i64,
) -> RepoResult<bool> {
    let now = now_millis();
    match variant_id {
        None => {
            let rows = sqlx::query(
                "UPDATE products SET stock = stock - ?1, sales_count = sales_count + ?1, updated_at = ?2 \
                 WHERE id = ?3 AND is_active = 1 AND stock >= ?1",
            )
            .bind(quantity)
            .bind(now)
            .bind(product_id)
            .execute(&mut *conn)
            .await?;
            Ok(rows.rows_affected() == 1)
        }
        Some(variant_id) => {
            let taken = sqlx::query(
                "UPDATE product_variants SET stock = stock - ?1, updated_at = ?2 \
                 WHERE id = ?3 AND product_id = ?4 AND is_active = 1 AND stock >= ?1",
            )
            .bind(quantity)
            .bind(now)
            .bind(variant_id)
            .bind(product_id)
            .execute(&mut *conn)
            .await?;
            if taken.rows_affected() != 1 {
                return Ok(false);
            }
            let counted = sqlx::query(
                "UPDATE products SET sales_count = sales_count + ?1, updated_at = ?2 WHERE id = ?3 AND is_active = 1",
            )
            .bind(quantity)
            .bind(now)
            .bind(product_id)
            .execute(&mut *conn)
            .await?;
            Ok(counted.rows_affected() == 1)
        }
    }
}

/// Put back `quantity` units of a cancelled line (inverse of [`take_stock`])
pub async fn restore_stock(
    conn: &mut SqliteConnection,
    product_id: i64,
    variant_id: Option<i64>,
    quantity: i64,
) -> RepoResult<()> {
    let now = now_millis();
    if let Some(variant_id) = variant_id {
        sqlx::query("UPDATE product_variants SET stock = stock + ?1, updated_at = ?2 WHERE id = ?3")
            .bind(quantity)
            .bind(now)
            .bind(variant_id)
            .execute(&mut *conn)
            .await?;
        sqlx::query(
            "UPDATE products SET sales_count = MAX(sales_count - ?1, 0), updated_at = ?2 WHERE id = ?3",
        )
        .bind(quantity)
        .bind(now)
        .bind(product_id)
        .execute(&mut *conn)
        .await?;
    } else {
        sqlx::query(
            "UPDATE products SET stock = stock + ?1, sales_count = MAX(sales_count - ?1, 0), updated_at = ?2 WHERE id = ?3",
        )
        .bind(quantity)
        .bind(now)
        .bind(product_id)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}
