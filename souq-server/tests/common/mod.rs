//! Shared fixtures: in-memory database, seeded catalog and a scripted
//! payment gateway.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use shared::error::{AppError, ErrorCode};
use shared::models::{
    PaymentMethod, Product, ProductCreate, ProductVariant, ShippingAddress, UserProfile, UserRole,
    VariantCreate,
};
use souq_server::db::{self, products, users};
use souq_server::services::orders::{Checkout, GuestContact};
use souq_server::stripe::{CreateIntentRequest, GatewayError, PaymentGateway, PaymentIntent};
use souq_server::{AppState, Config, ServiceError};
use sqlx::SqlitePool;

pub const PASSWORD: &str = "correct-horse-battery";

/// Payment provider double: intents live in memory and tests move them
/// between statuses.
#[derive(Default)]
pub struct MockGateway {
    intents: Mutex<HashMap<String, PaymentIntent>>,
    next_id: AtomicU64,
    created: AtomicU64,
}

impl MockGateway {
    pub fn set_status(&self, id: &str, status: &str) {
        let mut intents = self.intents.lock().unwrap();
        intents.get_mut(id).expect("unknown intent").status = status.to_string();
    }

    pub fn intent(&self, id: &str) -> PaymentIntent {
        self.intents.lock().unwrap().get(id).cloned().expect("unknown intent")
    }

    /// Number of intents created so far
    pub fn created(&self) -> u64 {
        self.created.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_intent(&self, req: &CreateIntentRequest) -> Result<PaymentIntent, GatewayError> {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let id = format!("pi_test_{n}");
        let intent = PaymentIntent {
            id: id.clone(),
            status: "requires_payment_method".into(),
            client_secret: Some(format!("{id}_secret_abc")),
            amount: req.amount,
            currency: req.currency.clone(),
            metadata: req.metadata.iter().cloned().collect(),
        };
        self.intents.lock().unwrap().insert(id, intent.clone());
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(intent)
    }

    async fn retrieve_intent(&self, id: &str) -> Result<PaymentIntent, GatewayError> {
        self.intents
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| GatewayError::Api(format!("No such payment_intent: '{id}'")))
    }
}

pub async fn test_state() -> (AppState, Arc<MockGateway>) {
    let pool = db::connect_in_memory().await.expect("in-memory database");
    let gateway = Arc::new(MockGateway::default());
    let state = AppState::with_parts(pool, &Config::development(), gateway.clone());
    (state, gateway)
}

/// State over a WAL database file with a real multi-connection pool, for
/// tests that race writers. Keep the directory alive for the test's length.
pub async fn file_state() -> (AppState, Arc<MockGateway>, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("temp dir");
    let url = format!("sqlite:{}/souq.db", dir.path().display());
    let pool = db::connect(&url).await.expect("file database");
    let gateway = Arc::new(MockGateway::default());
    let state = AppState::with_parts(pool, &Config::development(), gateway.clone());
    (state, gateway, dir)
}

pub async fn seed_product(pool: &SqlitePool, slug: &str, price: i64, stock: i64) -> Product {
    products::create(
        pool,
        &ProductCreate {
            name: slug.replace('-', " "),
            slug: slug.into(),
            description: None,
            brand: Some("Souq House".into()),
            image: None,
            price,
            sale_price: None,
            stock,
            is_featured: None,
            is_active: None,
        },
    )
    .await
    .expect("seed product")
}

pub async fn seed_variant(
    pool: &SqlitePool,
    product_id: i64,
    sku: &str,
    price: i64,
    stock: i64,
) -> ProductVariant {
    products::create_variant(
        pool,
        product_id,
        &VariantCreate {
            name: "100ml".into(),
            size: Some("100ml".into()),
            sku: sku.into(),
            price,
            sale_price: None,
            stock,
        },
    )
    .await
    .expect("seed variant")
}

pub async fn seed_user(pool: &SqlitePool, email: &str) -> UserProfile {
    let hash = souq_server::util::hash_password(PASSWORD).expect("hash");
    users::create(
        pool,
        users::NewUser {
            email,
            password_hash: &hash,
            first_name: "Layla",
            last_name: "Haddad",
            phone: None,
            role: UserRole::Customer,
        },
    )
    .await
    .expect("seed user")
}

pub async fn product(pool: &SqlitePool, id: i64) -> Product {
    products::find_by_id(pool, id).await.unwrap().expect("product exists")
}

pub async fn variant(pool: &SqlitePool, id: i64) -> ProductVariant {
    products::find_variant(pool, id).await.unwrap().expect("variant exists")
}

pub async fn coins(pool: &SqlitePool, user_id: i64) -> i64 {
    users::find_profile(pool, user_id)
        .await
        .unwrap()
        .expect("user exists")
        .coins_balance
}

pub fn address() -> ShippingAddress {
    ShippingAddress {
        full_name: "Layla Haddad".into(),
        phone: "+971501234567".into(),
        street: "Al Wasl Rd".into(),
        building: "Villa 12".into(),
        apartment: None,
        city: "Dubai".into(),
        country: "AE".into(),
        landmark: Some("Near Safa Park".into()),
        notes: None,
    }
}

pub fn user_checkout(payment_method: PaymentMethod) -> Checkout {
    Checkout {
        shipping_address: address(),
        payment_method,
        guest_contact: None,
    }
}

pub fn guest_checkout(email: &str) -> Checkout {
    Checkout {
        shipping_address: address(),
        payment_method: PaymentMethod::OnlinePayment,
        guest_contact: Some(GuestContact {
            email: email.into(),
            phone: "+971501234567".into(),
        }),
    }
}

/// Error code carried by a failed service call
pub fn code(err: ServiceError) -> ErrorCode {
    AppError::from(err).code
}
