//! Cart → order → cancel flows against an in-memory database

mod common;

use common::*;
use shared::error::ErrorCode;
use shared::models::{
    AddCartItem, OrderKind, OrderStatus, PaymentMethod, PaymentStatus, ProductUpdate,
};
use souq_server::db::carts::CartOwner;
use souq_server::db::products;
use souq_server::services::cart;
use souq_server::services::orders::{self, OrderScope};
use souq_server::session::generate_guest_session;

fn add(product_id: i64, variant_id: Option<i64>, quantity: i64) -> AddCartItem {
    AddCartItem {
        product_id,
        variant_id,
        quantity,
    }
}

#[tokio::test]
async fn test_place_and_cancel_moves_stock_both_ways() {
    let (state, _) = test_state().await;
    let pool = &state.pool;
    let oud = seed_product(pool, "royal-oud", 10_000, 5).await;
    let user = seed_user(pool, "layla@example.com").await;
    let owner = CartOwner::User(user.id);

    cart::add_item(pool, &owner, &add(oud.id, None, 2)).await.unwrap();
    let detail = orders::place_order(pool, &owner, &user_checkout(PaymentMethod::CashOnDelivery))
        .await
        .unwrap();

    let order = &detail.order;
    assert_eq!(order.kind, OrderKind::User);
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.payment_status, PaymentStatus::Pending);
    assert!(order.order_number.starts_with("ORD-"));
    // 200 AED is not above the free-shipping threshold
    assert_eq!(order.subtotal, 20_000);
    assert_eq!(order.tax, 1_000);
    assert_eq!(order.shipping_fee, 2_500);
    assert_eq!(order.total, 23_500);
    assert_eq!(order.coins_earned, 23);
    assert_eq!(detail.items.len(), 1);
    assert_eq!(detail.items[0].unit_price, 10_000);
    assert_eq!(detail.items[0].line_total, 20_000);
    assert_eq!(detail.items[0].product_name, oud.name);

    let after_place = product(pool, oud.id).await;
    assert_eq!(after_place.stock, 3);
    assert_eq!(after_place.sales_count, 2);
    assert!(cart::view(pool, &owner).await.unwrap().items.is_empty());

    let cancelled = orders::cancel_order(pool, OrderKind::User, order.id, &OrderScope::User(user.id))
        .await
        .unwrap();
    assert_eq!(cancelled.order.status, OrderStatus::Cancelled);
    assert_eq!(cancelled.order.payment_status, PaymentStatus::Refunded);
    assert!(cancelled.order.cancelled_at.is_some());

    let after_cancel = product(pool, oud.id).await;
    assert_eq!(after_cancel.stock, 5);
    assert_eq!(after_cancel.sales_count, 0);

    // second cancel changes nothing
    let err = orders::cancel_order(pool, OrderKind::User, order.id, &OrderScope::User(user.id))
        .await
        .unwrap_err();
    assert_eq!(code(err), ErrorCode::OrderNotCancellable);
    assert_eq!(product(pool, oud.id).await.stock, 5);
}

#[tokio::test]
async fn test_empty_cart_rejected() {
    let (state, _) = test_state().await;
    let user = seed_user(&state.pool, "empty@example.com").await;
    let owner = CartOwner::User(user.id);

    let err = orders::place_order(&state.pool, &owner, &user_checkout(PaymentMethod::CashOnDelivery))
        .await
        .unwrap_err();
    assert_eq!(code(err), ErrorCode::CartEmpty);

    // an existing but empty cart is just as empty
    cart::view(&state.pool, &owner).await.unwrap();
    let err = orders::place_order(&state.pool, &owner, &user_checkout(PaymentMethod::CashOnDelivery))
        .await
        .unwrap_err();
    assert_eq!(code(err), ErrorCode::CartEmpty);
}

#[tokio::test]
async fn test_stock_shortfall_at_checkout_changes_nothing() {
    let (state, _) = test_state().await;
    let pool = &state.pool;
    let musk = seed_product(pool, "white-musk", 4_000, 3).await;
    let amber = seed_product(pool, "amber-night", 6_000, 10).await;
    let user = seed_user(pool, "short@example.com").await;
    let owner = CartOwner::User(user.id);

    cart::add_item(pool, &owner, &add(amber.id, None, 2)).await.unwrap();
    cart::add_item(pool, &owner, &add(musk.id, None, 3)).await.unwrap();

    // another buyer took most of the musk in the meantime
    products::update(
        pool,
        musk.id,
        &ProductUpdate {
            stock: Some(1),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let err = orders::place_order(pool, &owner, &user_checkout(PaymentMethod::CashOnDelivery))
        .await
        .unwrap_err();
    assert_eq!(code(err), ErrorCode::InsufficientStock);

    assert_eq!(product(pool, musk.id).await.stock, 1);
    let amber_after = product(pool, amber.id).await;
    assert_eq!(amber_after.stock, 10);
    assert_eq!(amber_after.sales_count, 0);
    assert_eq!(cart::view(pool, &owner).await.unwrap().items.len(), 2);
    assert!(orders::list_user_orders(pool, user.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_conditional_stock_decrement() {
    let (state, _) = test_state().await;
    let pool = &state.pool;
    let rose = seed_product(pool, "taif-rose", 9_000, 1).await;

    let mut conn = pool.acquire().await.unwrap();
    assert!(!products::take_stock(&mut conn, rose.id, None, 2).await.unwrap());
    assert!(products::take_stock(&mut conn, rose.id, None, 1).await.unwrap());
    assert!(!products::take_stock(&mut conn, rose.id, None, 1).await.unwrap());
    drop(conn);

    let after = product(pool, rose.id).await;
    assert_eq!(after.stock, 0);
    assert_eq!(after.sales_count, 1);
}

#[tokio::test]
async fn test_variant_lines_use_variant_stock_and_price() {
    let (state, _) = test_state().await;
    let pool = &state.pool;
    let oud = seed_product(pool, "cambodi-oud", 10_000, 10).await;
    let large = seed_variant(pool, oud.id, "OUD-100", 15_000, 4).await;
    let user = seed_user(pool, "variant@example.com").await;
    let owner = CartOwner::User(user.id);

    let view = cart::add_item(pool, &owner, &add(oud.id, Some(large.id), 3)).await.unwrap();
    assert_eq!(view.items[0].unit_price, 15_000);
    assert_eq!(view.items[0].available_stock, 4);
    assert_eq!(view.summary.subtotal, 45_000);
    assert_eq!(view.summary.shipping, 0);

    let detail = orders::place_order(pool, &owner, &user_checkout(PaymentMethod::CashOnDelivery))
        .await
        .unwrap();
    assert_eq!(detail.items[0].variant_id, Some(large.id));
    assert_eq!(detail.items[0].variant_name.as_deref(), Some("100ml"));

    assert_eq!(variant(pool, large.id).await.stock, 1);
    let parent = product(pool, oud.id).await;
    assert_eq!(parent.stock, 10);
    assert_eq!(parent.sales_count, 3);

    orders::cancel_order(pool, OrderKind::User, detail.order.id, &OrderScope::User(user.id))
        .await
        .unwrap();
    assert_eq!(variant(pool, large.id).await.stock, 4);
    assert_eq!(product(pool, oud.id).await.sales_count, 0);
}

#[tokio::test]
async fn test_cart_rejects_more_than_available() {
    let (state, _) = test_state().await;
    let pool = &state.pool;
    let saffron = seed_product(pool, "saffron-attar", 12_000, 2).await;
    let owner = CartOwner::Guest(generate_guest_session());

    let err = cart::add_item(pool, &owner, &add(saffron.id, None, 3)).await.unwrap_err();
    let err = shared::error::AppError::from(err);
    assert_eq!(err.code, ErrorCode::InsufficientStock);
    assert_eq!(err.message, "Insufficient stock. Only 2 available");

    // adding to an existing line counts what is already there
    cart::add_item(pool, &owner, &add(saffron.id, None, 2)).await.unwrap();
    let err = cart::add_item(pool, &owner, &add(saffron.id, None, 1)).await.unwrap_err();
    assert_eq!(code(err), ErrorCode::InsufficientStock);

    let err = cart::add_item(pool, &owner, &add(999, None, 1)).await.unwrap_err();
    assert_eq!(code(err), ErrorCode::ProductNotFound);
}

#[tokio::test]
async fn test_guest_order_lookup_and_cancel_by_email() {
    let (state, _) = test_state().await;
    let pool = &state.pool;
    let musk = seed_product(pool, "black-musk", 25_000, 3).await;
    let owner = CartOwner::Guest(generate_guest_session());

    cart::add_item(pool, &owner, &add(musk.id, None, 1)).await.unwrap();
    let detail = orders::place_order(pool, &owner, &guest_checkout("Guest@Example.com"))
        .await
        .unwrap();
    let order = &detail.order;
    assert_eq!(order.kind, OrderKind::Guest);
    assert_eq!(order.user_id, None);
    assert_eq!(order.coins_earned, 0);
    assert!(order.order_number.starts_with("ORD-"));
    assert_eq!(product(pool, musk.id).await.stock, 2);

    let listed = orders::list_guest_orders(pool, "guest@example.com").await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].items.len(), 1);

    let tracked = orders::track(pool, &order.order_number, "GUEST@example.com").await.unwrap();
    assert_eq!(tracked.order.id, order.id);
    let err = orders::track(pool, &order.order_number, "someone@example.com").await.unwrap_err();
    assert_eq!(code(err), ErrorCode::OrderNotFound);

    let err = orders::get_guest_order(pool, order.id, "someone@example.com").await.unwrap_err();
    assert_eq!(code(err), ErrorCode::OrderNotFound);

    let err = orders::cancel_order(
        pool,
        OrderKind::Guest,
        order.id,
        &OrderScope::GuestEmail("someone@example.com".into()),
    )
    .await
    .unwrap_err();
    assert_eq!(code(err), ErrorCode::OrderNotFound);

    let cancelled = orders::cancel_order(
        pool,
        OrderKind::Guest,
        order.id,
        &OrderScope::GuestEmail("guest@example.com".into()),
    )
    .await
    .unwrap();
    assert_eq!(cancelled.order.status, OrderStatus::Cancelled);
    assert_eq!(product(pool, musk.id).await.stock, 3);
}

#[tokio::test]
async fn test_other_users_order_is_hidden() {
    let (state, _) = test_state().await;
    let pool = &state.pool;
    let oud = seed_product(pool, "hidden-oud", 10_000, 5).await;
    let owner_user = seed_user(pool, "owner@example.com").await;
    let other = seed_user(pool, "other@example.com").await;

    let owner = CartOwner::User(owner_user.id);
    cart::add_item(pool, &owner, &add(oud.id, None, 1)).await.unwrap();
    let detail = orders::place_order(pool, &owner, &user_checkout(PaymentMethod::CashOnDelivery))
        .await
        .unwrap();

    let err = orders::get_user_order(pool, other.id, detail.order.id).await.unwrap_err();
    assert_eq!(code(err), ErrorCode::OrderNotFound);
    let err = orders::cancel_order(pool, OrderKind::User, detail.order.id, &OrderScope::User(other.id))
        .await
        .unwrap_err();
    assert_eq!(code(err), ErrorCode::OrderNotFound);
    assert_eq!(product(pool, oud.id).await.stock, 4);
}

#[tokio::test]
async fn test_guest_cart_merges_into_user_cart() {
    let (state, _) = test_state().await;
    let pool = &state.pool;
    let oud = seed_product(pool, "merge-oud", 10_000, 4).await;
    let rose = seed_product(pool, "merge-rose", 5_000, 10).await;
    let user = seed_user(pool, "merge@example.com").await;
    let token = generate_guest_session();
    let guest = CartOwner::Guest(token.clone());
    let account = CartOwner::User(user.id);

    cart::add_item(pool, &account, &add(oud.id, None, 2)).await.unwrap();
    cart::add_item(pool, &guest, &add(oud.id, None, 3)).await.unwrap();
    cart::add_item(pool, &guest, &add(rose.id, None, 1)).await.unwrap();

    let merged = cart::merge_guest_into_user(pool, &token, user.id).await.unwrap();
    assert_eq!(merged, 2);

    let view = cart::view(pool, &account).await.unwrap();
    let qty = |product_id: i64| {
        view.items
            .iter()
            .find(|l| l.product_id == product_id)
            .map(|l| l.quantity)
    };
    // 2 + 3 capped at the 4 in stock
    assert_eq!(qty(oud.id), Some(4));
    assert_eq!(qty(rose.id), Some(1));
    assert!(cart::view(pool, &guest).await.unwrap().items.is_empty());

    // nothing left to merge
    assert_eq!(cart::merge_guest_into_user(pool, &token, user.id).await.unwrap(), 0);
}

#[tokio::test]
async fn test_admin_status_chain() {
    let (state, _) = test_state().await;
    let pool = &state.pool;
    let oud = seed_product(pool, "chain-oud", 10_000, 5).await;
    let user = seed_user(pool, "chain@example.com").await;
    let owner = CartOwner::User(user.id);

    cart::add_item(pool, &owner, &add(oud.id, None, 1)).await.unwrap();
    let id = orders::place_order(pool, &owner, &user_checkout(PaymentMethod::CashOnDelivery))
        .await
        .unwrap()
        .order
        .id;

    let err = orders::update_status(pool, OrderKind::User, id, OrderStatus::Shipped)
        .await
        .unwrap_err();
    assert_eq!(code(err), ErrorCode::InvalidStatusTransition);

    let confirmed = orders::update_status(pool, OrderKind::User, id, OrderStatus::Confirmed)
        .await
        .unwrap();
    assert_eq!(confirmed.order.status, OrderStatus::Confirmed);
    assert!(confirmed.order.confirmed_at.is_some());

    orders::update_status(pool, OrderKind::User, id, OrderStatus::Processing)
        .await
        .unwrap();
    let err = orders::update_status(pool, OrderKind::User, id, OrderStatus::Cancelled)
        .await
        .unwrap_err();
    assert_eq!(code(err), ErrorCode::OrderNotCancellable);
    assert_eq!(product(pool, oud.id).await.stock, 4);
}
