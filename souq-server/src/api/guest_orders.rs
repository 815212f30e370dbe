//! Guest checkout and email-scoped guest order routes

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use shared::error::{AppError, ErrorCode};
use shared::models::{CreateGuestOrder, OrderDetail, OrderKind};

use super::validate;
use crate::db::carts::CartOwner;
use crate::services::orders::{self, Checkout, GuestContact, OrderScope};
use crate::session;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/guest-orders", post(create).get(list_by_email))
        .route("/api/guest-orders/{id}", get(get_by_id))
        .route("/api/guest-orders/{id}/cancel", post(cancel))
}

#[derive(Debug, Deserialize)]
pub struct EmailQuery {
    pub email: Option<String>,
}

impl EmailQuery {
    fn require(self) -> Result<String, AppError> {
        self.email
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty())
            .ok_or_else(|| {
                AppError::with_message(ErrorCode::RequiredField, "Email is required")
                    .with_detail("field", "email")
            })
    }
}

async fn create(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<CreateGuestOrder>,
) -> Result<(StatusCode, CookieJar, Json<OrderDetail>), AppError> {
    validate(&req)?;
    let (jar, token) = session::get_or_create(jar, state.cookie_policy);
    let checkout = Checkout {
        shipping_address: req.shipping_address,
        payment_method: req.payment_method,
        guest_contact: Some(GuestContact {
            email: req.guest_email.trim().to_string(),
            phone: req.guest_phone,
        }),
    };
    let order = orders::place_order(&state.pool, &CartOwner::Guest(token), &checkout).await?;
    Ok((StatusCode::CREATED, jar, Json(order)))
}

async fn list_by_email(
    State(state): State<AppState>,
    Query(query): Query<EmailQuery>,
) -> Result<Json<Vec<OrderDetail>>, AppError> {
    let email = query.require()?;
    Ok(Json(orders::list_guest_orders(&state.pool, &email).await?))
}

async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<EmailQuery>,
) -> Result<Json<OrderDetail>, AppError> {
    let email = query.require()?;
    Ok(Json(orders::get_guest_order(&state.pool, id, &email).await?))
}

async fn cancel(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<EmailQuery>,
) -> Result<Json<OrderDetail>, AppError> {
    let email = query.require()?;
    let order = orders::cancel_order(&state.pool, OrderKind::Guest, id, &OrderScope::GuestEmail(email)).await?;
    Ok(Json(order))
}
