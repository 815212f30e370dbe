//! User order routes (checkout, history, cancel) and public tracking

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router, middleware};
use shared::error::AppError;
use shared::models::{CreateOrder, OrderDetail, OrderKind, TrackOrder};

use super::validate;
use crate::auth::{CurrentUser, require_user};
use crate::db::carts::CartOwner;
use crate::services::orders::{self, Checkout, OrderScope};
use crate::state::AppState;

pub fn router(state: &AppState) -> Router<AppState> {
    let user = Router::new()
        .route("/api/orders", post(create).get(list))
        .route("/api/orders/{id}", get(get_by_id))
        .route("/api/orders/{id}/cancel", post(cancel))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_user));

    user.route("/api/orders/track", post(track))
}

async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CreateOrder>,
) -> Result<(StatusCode, Json<OrderDetail>), AppError> {
    validate(&req)?;
    let checkout = Checkout {
        shipping_address: req.shipping_address,
        payment_method: req.payment_method,
        guest_contact: None,
    };
    let order = orders::place_order(&state.pool, &CartOwner::User(user.id), &checkout).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

async fn list(State(state): State<AppState>, user: CurrentUser) -> Result<Json<Vec<OrderDetail>>, AppError> {
    Ok(Json(orders::list_user_orders(&state.pool, user.id).await?))
}

async fn get_by_id(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<OrderDetail>, AppError> {
    Ok(Json(orders::get_user_order(&state.pool, user.id, id).await?))
}

async fn cancel(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<OrderDetail>, AppError> {
    let order = orders::cancel_order(&state.pool, OrderKind::User, id, &OrderScope::User(user.id)).await?;
    Ok(Json(order))
}

async fn track(
    State(state): State<AppState>,
    Json(req): Json<TrackOrder>,
) -> Result<Json<OrderDetail>, AppError> {
    validate(&req)?;
    Ok(Json(orders::track(&state.pool, &req.order_number, &req.email).await?))
}
