//! Cart routes
//!
//! `/api/cart` serves the signed-in user, `/api/guest-cart` the guest
//! session (the cookie is issued on first use). Every mutation answers with
//! the refreshed cart.

use axum::extract::{Path, State};
use axum::routing::{get, patch, post};
use axum::{Json, Router, middleware};
use axum_extra::extract::cookie::CookieJar;
use shared::error::AppError;
use shared::models::{AddCartItem, CartView, UpdateCartItem};

use super::validate;
use crate::auth::{CurrentUser, require_user};
use crate::db::carts::CartOwner;
use crate::services::cart;
use crate::session;
use crate::state::AppState;

pub fn router(state: &AppState) -> Router<AppState> {
    let user = Router::new()
        .route("/api/cart", get(user_view).delete(user_clear))
        .route("/api/cart/items", post(user_add))
        .route(
            "/api/cart/items/{item_id}",
            patch(user_update).delete(user_remove),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_user));

    let guest = Router::new()
        .route("/api/guest-cart", get(guest_view).delete(guest_clear))
        .route("/api/guest-cart/items", post(guest_add))
        .route(
            "/api/guest-cart/items/{item_id}",
            patch(guest_update).delete(guest_remove),
        );

    user.merge(guest)
}

// ========== Signed-in user ==========

async fn user_view(State(state): State<AppState>, user: CurrentUser) -> Result<Json<CartView>, AppError> {
    Ok(Json(cart::view(&state.pool, &CartOwner::User(user.id)).await?))
}

async fn user_add(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<AddCartItem>,
) -> Result<Json<CartView>, AppError> {
    validate(&req)?;
    Ok(Json(cart::add_item(&state.pool, &CartOwner::User(user.id), &req).await?))
}

async fn user_update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(item_id): Path<i64>,
    Json(req): Json<UpdateCartItem>,
) -> Result<Json<CartView>, AppError> {
    validate(&req)?;
    let view = cart::update_quantity(&state.pool, &CartOwner::User(user.id), item_id, req.quantity).await?;
    Ok(Json(view))
}

async fn user_remove(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(item_id): Path<i64>,
) -> Result<Json<CartView>, AppError> {
    Ok(Json(cart::remove_item(&state.pool, &CartOwner::User(user.id), item_id).await?))
}

async fn user_clear(State(state): State<AppState>, user: CurrentUser) -> Result<Json<CartView>, AppError> {
    Ok(Json(cart::clear(&state.pool, &CartOwner::User(user.id)).await?))
}

// ========== Guest session ==========

fn guest_owner(state: &AppState, jar: CookieJar) -> (CookieJar, CartOwner) {
    let (jar, token) = session::get_or_create(jar, state.cookie_policy);
    (jar, CartOwner::Guest(token))
}

async fn guest_view(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<CartView>), AppError> {
    let (jar, owner) = guest_owner(&state, jar);
    Ok((jar, Json(cart::view(&state.pool, &owner).await?)))
}

async fn guest_add(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<AddCartItem>,
) -> Result<(CookieJar, Json<CartView>), AppError> {
    validate(&req)?;
    let (jar, owner) = guest_owner(&state, jar);
    Ok((jar, Json(cart::add_item(&state.pool, &owner, &req).await?)))
}

async fn guest_update(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(item_id): Path<i64>,
    Json(req): Json<UpdateCartItem>,
) -> Result<(CookieJar, Json<CartView>), AppError> {
    validate(&req)?;
    let (jar, owner) = guest_owner(&state, jar);
    let view = cart::update_quantity(&state.pool, &owner, item_id, req.quantity).await?;
    Ok((jar, Json(view)))
}

async fn guest_remove(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(item_id): Path<i64>,
) -> Result<(CookieJar, Json<CartView>), AppError> {
    let (jar, owner) = guest_owner(&state, jar);
    Ok((jar, Json(cart::remove_item(&state.pool, &owner, item_id).await?)))
}

async fn guest_clear(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<CartView>), AppError> {
    let (jar, owner) = guest_owner(&state, jar);
    Ok((jar, Json(cart::clear(&state.pool, &owner).await?)))
}
