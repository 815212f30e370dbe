//! Payment routes
//!
//! | path | method | auth |
//! |------|--------|------|
//! | /api/payments/create-intent | POST | user |
//! | /api/payments/create-intent-guest | POST | guest session |
//! | /api/payments/confirm | POST | none |
//! | /api/payments/webhook | POST | provider signature |

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router, middleware};
use serde::Serialize;
use shared::error::AppError;
use shared::models::{
    ConfirmPayment, CreatePaymentIntent, OrderKind, PaymentConfirmation, PaymentIntentResponse,
};

use super::validate;
use crate::auth::{CurrentUser, require_user};
use crate::services::orders::OrderScope;
use crate::services::payments;
use crate::session::GuestSession;
use crate::state::AppState;

pub const SIGNATURE_HEADER: &str = "stripe-signature";

pub fn router(state: &AppState) -> Router<AppState> {
    let user = Router::new()
        .route("/api/payments/create-intent", post(create_intent))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_user));

    user.route("/api/payments/create-intent-guest", post(create_intent_guest))
        .route("/api/payments/confirm", post(confirm))
        .route("/api/payments/webhook", post(webhook))
}

async fn create_intent(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CreatePaymentIntent>,
) -> Result<Json<PaymentIntentResponse>, AppError> {
    let intent =
        payments::create_intent(&state, OrderKind::User, req.order_id, &OrderScope::User(user.id)).await?;
    Ok(Json(intent))
}

/// Only the session that placed a guest order may pay for it
async fn create_intent_guest(
    State(state): State<AppState>,
    GuestSession(token): GuestSession,
    Json(req): Json<CreatePaymentIntent>,
) -> Result<Json<PaymentIntentResponse>, AppError> {
    let intent = payments::create_intent(
        &state,
        OrderKind::Guest,
        req.order_id,
        &OrderScope::GuestSession(token),
    )
    .await?;
    Ok(Json(intent))
}

async fn confirm(
    State(state): State<AppState>,
    Json(req): Json<ConfirmPayment>,
) -> Result<Json<PaymentConfirmation>, AppError> {
    validate(&req)?;
    Ok(Json(payments::confirm(&state, &req.payment_intent_id).await?))
}

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

/// Raw body: the signature covers the exact bytes sent
async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, AppError> {
    let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
    payments::handle_webhook(&state, &body, signature).await?;
    Ok(Json(WebhookAck { received: true }))
}
