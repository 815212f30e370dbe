//! Customer authentication routes
//!
//! | path | method | auth |
//! |------|--------|------|
//! | /api/auth/register | POST | rate limited |
//! | /api/auth/login | POST | rate limited |
//! | /api/auth/logout | POST | none |
//! | /api/auth/me | GET | user |
//!
//! Register and login set the `access_token` cookie and fold any guest cart
//! into the account cart.

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router, middleware};
use axum_extra::extract::cookie::CookieJar;
use shared::error::{ApiResponse, AppError, ErrorCode};
use shared::models::{AuthResponse, LoginRequest, RegisterRequest, UserProfile, UserRole};

use super::validate;
use crate::auth::rate_limit::{login_rate_limit, register_rate_limit};
use crate::auth::{ACCESS_TOKEN_COOKIE, CurrentUser, TOKEN_TTL_DAYS};
use crate::db::users::{self, NewUser};
use crate::error::ServiceError;
use crate::services;
use crate::session::{self, GUEST_SESSION_COOKIE};
use crate::state::AppState;
use crate::util::{hash_password, verify_password};

pub const MIN_PASSWORD_LEN: usize = 8;

pub fn router(state: &AppState) -> Router<AppState> {
    let register = Router::new()
        .route("/api/auth/register", post(register))
        .route_layer(middleware::from_fn_with_state(state.clone(), register_rate_limit));
    let login = Router::new()
        .route("/api/auth/login", post(login))
        .route_layer(middleware::from_fn_with_state(state.clone(), login_rate_limit));

    Router::new()
        .merge(register)
        .merge(login)
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/me", get(me))
}

/// Issue the access cookie and merge the guest cart, if any
async fn sign_in(
    state: &AppState,
    jar: CookieJar,
    profile: UserProfile,
) -> Result<(CookieJar, Json<AuthResponse>), AppError> {
    let token = state
        .jwt
        .issue(&profile)
        .map_err(|e| AppError::internal(format!("Failed to issue token: {e}")))?;

    let mut jar = jar.add(state.cookie_policy.build(
        ACCESS_TOKEN_COOKIE,
        token,
        time::Duration::days(TOKEN_TTL_DAYS),
    ));

    let mut merged_cart_lines = 0;
    if let Some(guest_token) = session::guest_token(&jar) {
        match services::cart::merge_guest_into_user(&state.pool, &guest_token, profile.id).await {
            Ok(merged) => merged_cart_lines = merged,
            // sign-in still succeeds; the guest cart stays where it was
            Err(e) => {
                let err: AppError = e.into();
                tracing::warn!(user_id = profile.id, error = %err, "Guest cart merge failed");
            }
        }
        jar = jar.add(state.cookie_policy.removal(GUEST_SESSION_COOKIE));
    }

    Ok((
        jar,
        Json(AuthResponse {
            user: profile,
            merged_cart_lines,
        }),
    ))
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<RegisterRequest>,
) -> Result<(CookieJar, Json<AuthResponse>), AppError> {
    validate(&req)?;
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::with_message(
            ErrorCode::PasswordTooShort,
            format!("Password must be at least {MIN_PASSWORD_LEN} characters"),
        ));
    }

    let role = match req.role.unwrap_or_default() {
        UserRole::Customer => UserRole::Customer,
        UserRole::Vendor if state.enable_multi_vendor => UserRole::Vendor,
        UserRole::Vendor => {
            return Err(AppError::with_message(
                ErrorCode::RegistrationRoleNotAllowed,
                "Vendor registration is not available",
            ));
        }
        UserRole::Admin => return Err(AppError::new(ErrorCode::RegistrationRoleNotAllowed)),
    };

    let email = normalize_email(&req.email);
    if users::email_exists(&state.pool, &email).await.map_err(ServiceError::from)? {
        return Err(AppError::new(ErrorCode::EmailAlreadyRegistered));
    }

    let password_hash =
        hash_password(&req.password).map_err(|e| AppError::internal(format!("Password hashing failed: {e}")))?;

    let profile = users::create(
        &state.pool,
        NewUser {
            email: &email,
            password_hash: &password_hash,
            first_name: req.first_name.trim(),
            last_name: req.last_name.trim(),
            phone: req.phone.as_deref(),
            role,
        },
    )
    .await
    .map_err(|e| {
        if crate::db::is_unique_violation(&e) {
            AppError::new(ErrorCode::EmailAlreadyRegistered)
        } else {
            ServiceError::from(e).into()
        }
    })?;

    tracing::info!(user_id = profile.id, role = role.as_db(), "Account registered");
    sign_in(&state, jar, profile).await
}

async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, Json<AuthResponse>), AppError> {
    validate(&req)?;
    let email = normalize_email(&req.email);

    let Some((user_id, password_hash)) = users::find_credentials(&state.pool, &email)
        .await
        .map_err(ServiceError::from)?
    else {
        tracing::warn!("Login failed: unknown email");
        return Err(AppError::invalid_credentials());
    };
    if !verify_password(&req.password, &password_hash) {
        tracing::warn!(user_id, "Login failed: wrong password");
        return Err(AppError::invalid_credentials());
    }

    let profile = users::find_profile(&state.pool, user_id)
        .await
        .map_err(ServiceError::from)?
        .ok_or_else(AppError::invalid_credentials)?;
    if !profile.status.can_login() {
        return Err(AppError::new(ErrorCode::AccountDisabled));
    }

    tracing::info!(user_id, "User logged in");
    sign_in(&state, jar, profile).await
}

async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, ApiResponse<()>) {
    (
        jar.add(state.cookie_policy.removal(ACCESS_TOKEN_COOKIE)),
        ApiResponse::ok(),
    )
}

async fn me(State(state): State<AppState>, user: CurrentUser) -> Result<Json<UserProfile>, AppError> {
    let profile = users::find_profile(&state.pool, user.id)
        .await
        .map_err(ServiceError::from)?
        .ok_or_else(AppError::not_authenticated)?;
    Ok(Json(profile))
}
