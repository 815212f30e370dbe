//! HTTP API
//!
//! - [`health`] - liveness
//! - [`auth`] - register/login/logout/me
//! - [`products`] - public catalog
//! - [`cart`] - user and guest carts
//! - [`orders`] - user checkout, order history, tracking
//! - [`guest_orders`] - guest checkout and email-scoped lookups
//! - [`payments`] - payment intents, confirmation, provider webhook
//! - [`admin`] - catalog and order back office

pub mod admin;
pub mod auth;
pub mod cart;
pub mod guest_orders;
pub mod health;
pub mod orders;
pub mod payments;
pub mod products;

use axum::Router;
use axum::http::{HeaderValue, Method, header};
use shared::error::AppError;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use validator::Validate;

use crate::state::AppState;

/// All routes, without middleware or state
pub fn build_router(state: &AppState) -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(auth::router(state))
        .merge(products::router())
        .merge(cart::router(state))
        .merge(orders::router(state))
        .merge(guest_orders::router())
        .merge(payments::router(state))
        .merge(admin::router(state))
}

/// Fully configured application: routes, tower-http middleware and state
pub fn build_app(state: AppState) -> Router {
    let origin = match HeaderValue::from_str(&state.frontend_url) {
        Ok(origin) => AllowOrigin::exact(origin),
        Err(e) => {
            tracing::warn!(frontend_url = %state.frontend_url, error = %e, "Invalid FRONTEND_URL, CORS disabled");
            AllowOrigin::list(Vec::<HeaderValue>::new())
        }
    };
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    build_router(&state)
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}

/// Run `validator` rules on a request body
pub(crate) fn validate<T: Validate>(payload: &T) -> Result<(), AppError> {
    payload.validate().map_err(|errors| {
        let fields: Vec<String> = errors
            .field_errors()
            .keys()
            .map(|field| field.to_string())
            .collect();
        AppError::validation(format!("Invalid request: {errors}"))
            .with_detail("fields", fields)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::error::ErrorCode;
    use shared::models::LoginRequest;

    #[test]
    fn test_validate_reports_fields() {
        let bad = LoginRequest {
            email: "not-an-email".into(),
            password: String::new(),
        };
        let err = validate(&bad).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
        let fields = err.details.unwrap()["fields"].clone();
        let fields: Vec<String> = serde_json::from_value(fields).unwrap();
        assert!(fields.contains(&"email".to_string()));
        assert!(fields.contains(&"password".to_string()));
    }
}
