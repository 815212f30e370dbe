//! Back-office routes (ADMIN only)

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{patch, post};
use axum::{Json, Router, middleware};
use shared::error::{AppError, ErrorCode};
use shared::models::{
    OrderDetail, OrderKind, OrderStatusUpdate, Product, ProductCreate, ProductUpdate,
    ProductVariant, VariantCreate, VariantUpdate,
};

use super::validate;
use crate::auth::{require_admin, require_user};
use crate::db::{self, products};
use crate::error::ServiceError;
use crate::services::orders;
use crate::state::AppState;

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/api/admin/products", post(create_product))
        .route("/api/admin/products/{id}", patch(update_product))
        .route("/api/admin/products/{id}/variants", post(create_variant))
        .route(
            "/api/admin/variants/{id}",
            patch(update_variant).delete(retire_variant),
        )
        .route("/api/admin/orders/{kind}/{id}/status", patch(update_order_status))
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_user))
}

fn check_sale_price(price: i64, sale_price: Option<i64>) -> Result<(), AppError> {
    if let Some(sale) = sale_price
        && sale > price
    {
        return Err(AppError::with_message(
            ErrorCode::ProductInvalidPrice,
            "Sale price cannot exceed the regular price",
        ));
    }
    Ok(())
}

async fn create_product(
    State(state): State<AppState>,
    Json(req): Json<ProductCreate>,
) -> Result<(StatusCode, Json<Product>), AppError> {
    validate(&req)?;
    check_sale_price(req.price, req.sale_price)?;

    let product = products::create(&state.pool, &req).await.map_err(|e| {
        if db::is_unique_violation(&e) {
            AppError::new(ErrorCode::ProductSlugExists)
        } else {
            ServiceError::from(e).into()
        }
    })?;
    tracing::info!(product_id = product.id, slug = %product.slug, "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}

async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<ProductUpdate>,
) -> Result<Json<Product>, AppError> {
    validate(&req)?;
    let current = products::find_by_id(&state.pool, id)
        .await
        .map_err(ServiceError::from)?
        .ok_or_else(|| AppError::new(ErrorCode::ProductNotFound))?;
    check_sale_price(
        req.price.unwrap_or(current.price),
        req.sale_price.or(current.sale_price),
    )?;

    let product = products::update(&state.pool, id, &req)
        .await
        .map_err(ServiceError::from)?
        .ok_or_else(|| AppError::new(ErrorCode::ProductNotFound))?;
    tracing::info!(product_id = id, "Product updated");
    Ok(Json(product))
}

async fn create_variant(
    State(state): State<AppState>,
    Path(product_id): Path<i64>,
    Json(req): Json<VariantCreate>,
) -> Result<(StatusCode, Json<ProductVariant>), AppError> {
    validate(&req)?;
    check_sale_price(req.price, req.sale_price)?;
    products::find_by_id(&state.pool, product_id)
        .await
        .map_err(ServiceError::from)?
        .ok_or_else(|| AppError::new(ErrorCode::ProductNotFound))?;

    let variant = products::create_variant(&state.pool, product_id, &req)
        .await
        .map_err(|e| {
            if db::is_unique_violation(&e) {
                AppError::already_exists(format!("SKU {}", req.sku))
            } else {
                ServiceError::from(e).into()
            }
        })?;
    tracing::info!(product_id, variant_id = variant.id, "Variant created");
    Ok((StatusCode::CREATED, Json(variant)))
}

async fn update_variant(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<VariantUpdate>,
) -> Result<Json<ProductVariant>, AppError> {
    validate(&req)?;
    let current = products::find_variant(&state.pool, id)
        .await
        .map_err(ServiceError::from)?
        .ok_or_else(|| AppError::new(ErrorCode::VariantNotFound))?;
    check_sale_price(
        req.price.unwrap_or(current.price),
        req.sale_price.or(current.sale_price),
    )?;

    let variant = products::update_variant(&state.pool, id, &req)
        .await
        .map_err(ServiceError::from)?
        .ok_or_else(|| AppError::new(ErrorCode::VariantNotFound))?;
    tracing::info!(
        variant_id = id,
        stock = variant.stock,
        is_active = variant.is_active,
        "Variant updated"
    );
    Ok(Json(variant))
}

/// Variants stay referenced by past orders, so removal only deactivates
async fn retire_variant(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let retire = VariantUpdate {
        is_active: Some(false),
        ..Default::default()
    };
    products::update_variant(&state.pool, id, &retire)
        .await
        .map_err(ServiceError::from)?
        .ok_or_else(|| AppError::new(ErrorCode::VariantNotFound))?;
    tracing::info!(variant_id = id, "Variant retired");
    Ok(StatusCode::NO_CONTENT)
}

async fn update_order_status(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, i64)>,
    Json(req): Json<OrderStatusUpdate>,
) -> Result<Json<OrderDetail>, AppError> {
    let kind = OrderKind::from_path(&kind).ok_or_else(|| {
        AppError::invalid_request(format!("Unknown order kind '{kind}', expected 'user' or 'guest'"))
    })?;
    Ok(Json(orders::update_status(&state.pool, kind, id, req.status).await?))
}
