//! Server configuration

use crate::BoxError;

/// Storefront server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite database URL (`sqlite:path/to/file.db`)
    pub database_url: String,
    /// HTTP port
    pub http_port: u16,
    /// Environment: development | staging | production
    pub environment: String,
    /// Storefront origin, used for CORS and cookie policy
    pub frontend_url: String,
    /// JWT secret for customer authentication
    pub jwt_secret: String,
    /// Stripe secret key
    pub stripe_secret_key: String,
    /// Stripe webhook signing secret
    pub stripe_webhook_secret: String,
    /// Stripe REST base URL
    pub stripe_api_base: String,
    /// ISO currency of all catalog prices (lowercase)
    pub currency: String,
    /// Allow VENDOR self-registration
    pub enable_multi_vendor: bool,
}

impl Config {
    /// Require a secret env var: must be set and non-empty in non-development environments.
    fn require_secret(name: &str, environment: &str) -> Result<String, BoxError> {
        let val = match std::env::var(name) {
            Ok(v) => v,
            Err(_) => {
                if environment != "development" {
                    return Err(format!("{name} must be set in {environment} environment").into());
                }
                format!("dev-{name}-not-for-production")
            }
        };
        if val.is_empty() && environment != "development" {
            return Err(format!("{name} must not be empty in {environment} environment").into());
        }
        Ok(val)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());

        Ok(Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:data/aromasouq.db".into()),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3001),
            environment: environment.clone(),
            frontend_url: std::env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into()),
            jwt_secret: Self::require_secret("JWT_SECRET", &environment)?,
            stripe_secret_key: Self::require_secret("STRIPE_SECRET_KEY", &environment)?,
            stripe_webhook_secret: Self::require_secret("STRIPE_WEBHOOK_SECRET", &environment)?,
            stripe_api_base: std::env::var("STRIPE_API_BASE")
                .unwrap_or_else(|_| "https://api.stripe.com".into()),
            currency: std::env::var("CURRENCY")
                .map(|c| c.to_lowercase())
                .unwrap_or_else(|_| "aed".into()),
            enable_multi_vendor: std::env::var("ENABLE_MULTI_VENDOR")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        })
    }

    /// Development defaults, for tests and local tooling
    pub fn development() -> Self {
        Self {
            database_url: "sqlite::memory:".into(),
            http_port: 3001,
            environment: "development".into(),
            frontend_url: "http://localhost:3000".into(),
            jwt_secret: "dev-JWT_SECRET-not-for-production".into(),
            stripe_secret_key: "dev-STRIPE_SECRET_KEY-not-for-production".into(),
            stripe_webhook_secret: "dev-STRIPE_WEBHOOK_SECRET-not-for-production".into(),
            stripe_api_base: "https://api.stripe.com".into(),
            currency: "aed".into(),
            enable_multi_vendor: false,
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Cookies must be `Secure; SameSite=None` when a production API serves a
    /// storefront on another origin.
    pub fn cross_origin_cookies(&self) -> bool {
        self.is_production() && !self.frontend_url.contains("localhost")
    }
}
