//! Authentication middleware
//!
//! The access token is read from the `access_token` cookie, falling back to
//! `Authorization: Bearer <token>`. On success a [`CurrentUser`] is inserted
//! into the request extensions.

use axum::extract::{FromRequestParts, Request, State};
use axum::http::HeaderMap;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use axum_extra::extract::cookie::CookieJar;
use shared::error::{AppError, ErrorCode};
use shared::models::{UserRole, UserStatus};

use super::jwt::{ACCESS_TOKEN_COOKIE, JwtError, bearer_token};
use crate::db::users;
use crate::state::AppState;

/// Authenticated customer identity
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i64,
    pub email: String,
    pub role: UserRole,
    pub status: UserStatus,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

fn bearer_or_cookie(headers: &HeaderMap) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    if let Some(cookie) = jar.get(ACCESS_TOKEN_COOKIE)
        && !cookie.value().is_empty()
    {
        return Some(cookie.value().to_string());
    }
    headers
        .get(http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(bearer_token)
        .map(str::to_string)
}

/// Validate the token and re-read the account so suspended users lose access
/// before their token expires.
pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<CurrentUser, AppError> {
    let token = bearer_or_cookie(headers).ok_or_else(AppError::not_authenticated)?;

    let claims = state.jwt.verify(&token).map_err(|e| {
        tracing::warn!(error = %e, "Token validation failed");
        match e {
            JwtError::Expired => AppError::token_expired(),
            _ => AppError::invalid_token("Invalid token"),
        }
    })?;

    let user_id = claims
        .user_id()
        .ok_or_else(|| AppError::invalid_token("Malformed token subject"))?;

    let profile = users::find_profile(&state.pool, user_id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, user_id, "Failed to load account for token");
            AppError::new(ErrorCode::DatabaseError)
        })?
        .ok_or_else(|| AppError::invalid_token("Account no longer exists"))?;

    if !profile.status.can_login() {
        tracing::warn!(user_id, status = profile.status.as_db(), "Inactive account rejected");
        return Err(AppError::new(ErrorCode::AccountDisabled));
    }

    Ok(CurrentUser {
        id: profile.id,
        email: profile.email,
        role: profile.role,
        status: profile.status,
    })
}

/// Require a signed-in, active account
pub async fn require_user(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if req.method() == http::Method::OPTIONS {
        return Ok(next.run(req).await);
    }

    let user = authenticate(&state, req.headers()).await?;
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// Require an ADMIN account. Must run after [`require_user`].
pub async fn require_admin(req: Request, next: Next) -> Result<Response, AppError> {
    let user = req
        .extensions()
        .get::<CurrentUser>()
        .ok_or_else(AppError::not_authenticated)?;

    if !user.is_admin() {
        tracing::warn!(user_id = user.id, "Admin route denied");
        return Err(AppError::new(ErrorCode::AdminRequired));
    }

    Ok(next.run(req).await)
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<CurrentUser>() {
            return Ok(user.clone());
        }

        let user = authenticate(state, &parts.headers).await?;
        parts.extensions.insert(user.clone());
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn test_cookie_preferred_over_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(
            http::header::COOKIE,
            HeaderValue::from_static("access_token=from-cookie"),
        );
        headers.insert(
            http::header::AUTHORIZATION,
            HeaderValue::from_static("Bearer from-header"),
        );
        assert_eq!(bearer_or_cookie(&headers).as_deref(), Some("from-cookie"));
    }

    #[test]
    fn test_bearer_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert(
            http::header::AUTHORIZATION,
            HeaderValue::from_static("Bearer from-header"),
        );
        assert_eq!(bearer_or_cookie(&headers).as_deref(), Some("from-header"));

        headers.insert(
            http::header::AUTHORIZATION,
            HeaderValue::from_static("Basic abc"),
        );
        assert_eq!(bearer_or_cookie(&headers), None);
    }
}
