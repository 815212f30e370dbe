//! Public catalog routes

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use shared::error::{AppError, ErrorCode};
use shared::models::{Product, ProductDetail};

use crate::db::products;
use crate::error::ServiceError;
use crate::state::AppState;

pub const DEFAULT_PER_PAGE: i64 = 20;
pub const MAX_PER_PAGE: i64 = 100;
pub const DEFAULT_FEATURED: i64 = 8;
pub const MAX_FEATURED: i64 = 50;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/products", get(list))
        .route("/api/products/featured", get(featured))
        .route("/api/products/{slug}", get(get_by_slug))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProductPage {
    pub items: Vec<Product>,
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
}

async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ProductPage>, AppError> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE);
    let search = query.q.as_deref().map(str::trim).filter(|q| !q.is_empty());

    let (items, total) = products::list_active(&state.pool, search, per_page, (page - 1) * per_page)
        .await
        .map_err(ServiceError::from)?;

    Ok(Json(ProductPage {
        items,
        page,
        per_page,
        total,
    }))
}

#[derive(Debug, Deserialize)]
pub struct FeaturedQuery {
    pub limit: Option<i64>,
}

async fn featured(
    State(state): State<AppState>,
    Query(query): Query<FeaturedQuery>,
) -> Result<Json<Vec<Product>>, AppError> {
    let limit = query.limit.unwrap_or(DEFAULT_FEATURED).clamp(1, MAX_FEATURED);
    let items = products::list_featured(&state.pool, limit)
        .await
        .map_err(ServiceError::from)?;
    Ok(Json(items))
}

async fn get_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ProductDetail>, AppError> {
    let product = products::find_active_by_slug(&state.pool, &slug)
        .await
        .map_err(ServiceError::from)?
        .ok_or_else(|| AppError::new(ErrorCode::ProductNotFound))?;
    let variants = products::variants_for(&state.pool, product.id, true)
        .await
        .map_err(ServiceError::from)?;
    Ok(Json(ProductDetail { product, variants }))
}
