//! Application state shared by every handler

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::BoxError;
use crate::auth::{JwtService, RateLimiter};
use crate::config::Config;
use crate::db;
use crate::session::CookiePolicy;
use crate::stripe::{PaymentGateway, StripeGateway};

#[derive(Clone)]
pub struct AppState {
    /// SQLite connection pool
    pub pool: SqlitePool,
    /// Access token issuer/validator
    pub jwt: Arc<JwtService>,
    /// Payment provider client
    pub payments: Arc<dyn PaymentGateway>,
    /// Stripe webhook signing secret
    pub stripe_webhook_secret: String,
    /// Currency sent to the payment provider
    pub currency: String,
    /// Attributes for auth and guest session cookies
    pub cookie_policy: CookiePolicy,
    /// Storefront origin (CORS)
    pub frontend_url: String,
    /// Allow VENDOR self-registration
    pub enable_multi_vendor: bool,
    /// Login/registration throttling
    pub rate_limiter: RateLimiter,
}

impl AppState {
    /// Open the database, apply migrations and build the Stripe client
    pub async fn new(config: &Config) -> Result<Self, BoxError> {
        let pool = db::connect(&config.database_url).await?;
        let gateway = StripeGateway::new(&config.stripe_secret_key, &config.stripe_api_base);
        Ok(Self::with_parts(pool, config, Arc::new(gateway)))
    }

    /// Assemble state around an existing pool and gateway
    pub fn with_parts(pool: SqlitePool, config: &Config, payments: Arc<dyn PaymentGateway>) -> Self {
        Self {
            pool,
            jwt: Arc::new(JwtService::new(&config.jwt_secret)),
            payments,
            stripe_webhook_secret: config.stripe_webhook_secret.clone(),
            currency: config.currency.clone(),
            cookie_policy: CookiePolicy {
                cross_origin: config.cross_origin_cookies(),
            },
            frontend_url: config.frontend_url.clone(),
            enable_multi_vendor: config.enable_multi_vendor,
            rate_limiter: RateLimiter::new(),
        }
    }
}
