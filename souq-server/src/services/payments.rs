//! Payment reconciliation
//!
//! Keeps the order's payment status in step with the provider's payment
//! intent. Success and failure are conditional updates, so replays of the
//! same outcome (manual confirm, webhook retries) change nothing.

use shared::error::{AppError, ErrorCode};
use shared::models::{
    Order, OrderKind, OrderStatus, PaymentConfirmation, PaymentIntentResponse, PaymentStatus,
};
use sqlx::SqliteConnection;

use crate::db::{self, orders, users, webhook_events};
use crate::error::ServiceResult;
use crate::services::orders::OrderScope;
use crate::state::AppState;
use crate::stripe::{CreateIntentRequest, PaymentIntent, WebhookEvent, verify_webhook_signature};

/// Load the order the caller wants to pay for
async fn payable_order(state: &AppState, kind: OrderKind, order_id: i64, scope: &OrderScope) -> ServiceResult<Order> {
    let order = match scope {
        OrderScope::GuestSession(token) => {
            orders::find_guest_in_session(&state.pool, order_id, token).await?
        }
        _ => orders::find(&state.pool, kind, order_id).await?,
    };
    let order = order.ok_or_else(|| match kind {
        OrderKind::User => AppError::with_message(ErrorCode::OrderNotFound, "Order not found"),
        OrderKind::Guest => AppError::with_message(ErrorCode::OrderNotFound, "Guest order not found"),
    })?;

    if let OrderScope::User(user_id) = scope
        && order.user_id != Some(*user_id)
    {
        return Err(AppError::with_message(ErrorCode::OrderNotOwned, "Order does not belong to user").into());
    }
    if order.payment_status == PaymentStatus::Paid {
        return Err(AppError::with_message(ErrorCode::OrderAlreadyPaid, "Order already paid").into());
    }
    if order.status == OrderStatus::Cancelled {
        return Err(AppError::with_message(ErrorCode::OrderCancelled, "Order has been cancelled").into());
    }
    Ok(order)
}

/// Create (or reuse) the payment intent for an order.
///
/// An intent already stored on the order is reused while it still waits for
/// a payment method or confirmation; otherwise a new one is created for the
/// order total and its id saved on the order.
pub async fn create_intent(
    state: &AppState,
    kind: OrderKind,
    order_id: i64,
    scope: &OrderScope,
) -> ServiceResult<PaymentIntentResponse> {
    let order = payable_order(state, kind, order_id, scope).await?;

    if let Some(existing_id) = &order.payment_intent_id {
        match state.payments.retrieve_intent(existing_id).await {
            Ok(intent) if intent.is_reusable() => {
                if let Some(client_secret) = intent.client_secret.clone() {
                    tracing::debug!(order_id, intent = %intent.id, "Reusing payment intent");
                    return Ok(response(intent, client_secret));
                }
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(order_id, intent = %existing_id, error = %e, "Stored payment intent unusable, creating a new one");
            }
        }
    }

    let item_count = orders::items(&state.pool, kind, order.id).await?.len();
    let receipt_email = match kind {
        OrderKind::User => match order.user_id {
            Some(user_id) => users::find_profile(&state.pool, user_id).await?.map(|u| u.email),
            None => None,
        },
        OrderKind::Guest => order.guest_email.clone(),
    };

    let mut metadata = vec![
        ("orderId".to_string(), order.id.to_string()),
        ("orderNumber".to_string(), order.order_number.clone()),
        ("isGuestOrder".to_string(), kind.is_guest().to_string()),
    ];
    match kind {
        OrderKind::User => {
            if let Some(user_id) = order.user_id {
                metadata.push(("userId".into(), user_id.to_string()));
            }
            if let Some(email) = &receipt_email {
                metadata.push(("customerEmail".into(), email.clone()));
            }
        }
        OrderKind::Guest => {
            if let Some(email) = &order.guest_email {
                metadata.push(("guestEmail".into(), email.clone()));
            }
        }
    }

    let prefix = if kind.is_guest() { "Guest Order" } else { "Order" };
    let request = CreateIntentRequest {
        amount: order.total,
        currency: state.currency.clone(),
        description: format!("{prefix} #{} - {item_count} item(s)", order.order_number),
        receipt_email,
        metadata,
    };

    let intent = state.payments.create_intent(&request).await?;
    orders::set_payment_intent(&state.pool, kind, order.id, &intent.id).await?;
    tracing::info!(order_id, intent = %intent.id, amount = intent.amount, "Payment intent created");

    let client_secret = intent
        .client_secret
        .clone()
        .ok_or_else(|| AppError::with_message(ErrorCode::PaymentProviderError, "Payment intent has no client secret"))?;
    Ok(response(intent, client_secret))
}

fn response(intent: PaymentIntent, client_secret: String) -> PaymentIntentResponse {
    PaymentIntentResponse {
        client_secret,
        payment_intent_id: intent.id,
        amount: intent.amount,
        currency: intent.currency,
    }
}

/// Mark the order paid. Coins of a user order are credited only by the call
/// that actually moved it to `PAID`. Returns whether anything changed.
pub async fn apply_success(
    conn: &mut SqliteConnection,
    kind: OrderKind,
    order_id: i64,
    payment_intent_id: &str,
) -> ServiceResult<bool> {
    if orders::mark_paid(conn, kind, order_id, payment_intent_id).await? == 0 {
        tracing::debug!(order_id, kind = ?kind, "Payment success already applied or order not payable");
        return Ok(false);
    }

    if kind == OrderKind::User
        && let Some(order) = orders::find(&mut *conn, kind, order_id).await?
        && let Some(user_id) = order.user_id
        && order.coins_earned > 0
    {
        users::add_coins(conn, user_id, order.coins_earned).await?;
        tracing::info!(order_id, user_id, coins = order.coins_earned, "Coins awarded");
    }

    tracing::info!(order_id, kind = ?kind, "Order paid");
    Ok(true)
}

/// `PENDING → FAILED`. Returns whether anything changed.
pub async fn apply_failure(conn: &mut SqliteConnection, kind: OrderKind, order_id: i64) -> ServiceResult<bool> {
    let changed = orders::mark_failed(conn, kind, order_id).await? > 0;
    if changed {
        tracing::info!(order_id, kind = ?kind, "Order payment failed");
    }
    Ok(changed)
}

fn order_ref(intent: &PaymentIntent) -> Result<(OrderKind, i64), AppError> {
    intent.order_ref().ok_or_else(|| {
        AppError::with_message(
            ErrorCode::PaymentMetadataInvalid,
            format!("Payment intent {} carries no order reference", intent.id),
        )
    })
}

/// `false` when the intent id is stored on another order than the one its
/// metadata names. An intent stored nowhere (replaced by a newer one) still
/// matches.
async fn intent_belongs_to(
    conn: &mut SqliteConnection,
    kind: OrderKind,
    order_id: i64,
    payment_intent_id: &str,
) -> ServiceResult<bool> {
    match orders::find_by_payment_intent(&mut *conn, kind, payment_intent_id).await? {
        Some(holder) if holder.id != order_id => {
            tracing::warn!(
                order_id,
                holder_id = holder.id,
                intent = payment_intent_id,
                "Payment intent metadata points at a different order"
            );
            Ok(false)
        }
        _ => Ok(true),
    }
}

/// Manual confirmation after the client finished the payment
pub async fn confirm(state: &AppState, payment_intent_id: &str) -> ServiceResult<PaymentConfirmation> {
    let intent = state.payments.retrieve_intent(payment_intent_id).await?;
    if !intent.succeeded() {
        return Err(AppError::with_message(
            ErrorCode::PaymentNotSucceeded,
            format!("Payment not successful. Status: {}", intent.status),
        )
        .into());
    }

    let (kind, order_id) = order_ref(&intent)?;

    let mut tx = db::begin_write(&state.pool).await?;
    let order = orders::find(&mut *tx, kind, order_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound))?;
    if order.status == OrderStatus::Cancelled {
        return Err(AppError::with_message(ErrorCode::OrderCancelled, "Order has been cancelled").into());
    }
    if !intent_belongs_to(&mut tx, kind, order_id, &intent.id).await? {
        return Err(AppError::with_message(
            ErrorCode::PaymentMetadataInvalid,
            "Payment intent is attached to a different order",
        )
        .into());
    }
    apply_success(&mut tx, kind, order_id, &intent.id).await?;
    tx.commit().await?;

    Ok(PaymentConfirmation {
        success: true,
        order_id,
        order_number: order.order_number,
        is_guest_order: kind.is_guest(),
    })
}

/// Verify and apply a provider webhook delivery.
///
/// The event id is recorded in the same transaction as its effect, so a
/// redelivered event is acknowledged without touching the order again.
pub async fn handle_webhook(state: &AppState, payload: &[u8], signature: Option<&str>) -> ServiceResult<()> {
    let signature = signature.ok_or_else(|| {
        AppError::with_message(ErrorCode::WebhookSignatureInvalid, "Missing stripe-signature header")
    })?;
    verify_webhook_signature(payload, signature, &state.stripe_webhook_secret).map_err(|reason| {
        tracing::warn!(reason, "Webhook signature rejected");
        AppError::with_message(ErrorCode::WebhookSignatureInvalid, format!("Webhook Error: {reason}"))
    })?;

    let event: WebhookEvent = serde_json::from_slice(payload)
        .map_err(|e| AppError::invalid_request(format!("Malformed webhook event: {e}")))?;

    let handled = matches!(
        event.event_type.as_str(),
        "payment_intent.succeeded" | "payment_intent.payment_failed"
    );
    if !handled {
        tracing::debug!(event_id = %event.id, event_type = %event.event_type, "Ignoring webhook event");
        return Ok(());
    }

    // Events without an order reference are acknowledged and dropped
    let Some((intent, (kind, order_id))) = event
        .payment_intent()
        .and_then(|intent| intent.order_ref().map(|r| (intent, r)))
    else {
        tracing::warn!(event_id = %event.id, "Webhook payment intent has no order reference");
        return Ok(());
    };

    let mut tx = db::begin_write(&state.pool).await?;
    if !webhook_events::record(&mut tx, &event.id, &event.event_type).await? {
        tracing::info!(event_id = %event.id, "Duplicate webhook event ignored");
        return Ok(());
    }

    // mismatched events are recorded and acknowledged without effect
    let changed = if !intent_belongs_to(&mut tx, kind, order_id, &intent.id).await? {
        false
    } else if event.event_type == "payment_intent.succeeded" {
        apply_success(&mut tx, kind, order_id, &intent.id).await?
    } else {
        apply_failure(&mut tx, kind, order_id).await?
    };
    tx.commit().await?;

    tracing::info!(
        event_id = %event.id,
        event_type = %event.event_type,
        order_id,
        changed,
        "Webhook event processed"
    );
    Ok(())
}
