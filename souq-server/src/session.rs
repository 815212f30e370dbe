//! Guest session identity and cookie policy
//!
//! Guests are tracked by an opaque `guest_<millis>_<hex>` token carried in
//! the httpOnly `guest_session` cookie.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use shared::error::{AppError, ErrorCode};

use crate::state::AppState;
use crate::util::now_millis;

pub const GUEST_SESSION_COOKIE: &str = "guest_session";
pub const GUEST_SESSION_DAYS: i64 = 30;

/// `guest_<millis>_<13 lowercase hex>`
pub fn generate_guest_session() -> String {
    use rand::Rng;
    let bytes: [u8; 7] = rand::thread_rng().r#gen();
    let hex = hex::encode(bytes);
    format!("guest_{}_{}", now_millis(), &hex[..13])
}

/// Matches `^guest_\d+_[a-f0-9]+$`
pub fn is_valid_guest_session(token: &str) -> bool {
    let Some(rest) = token.strip_prefix("guest_") else {
        return false;
    };
    let Some((millis, hex)) = rest.split_once('_') else {
        return false;
    };
    !millis.is_empty()
        && millis.bytes().all(|b| b.is_ascii_digit())
        && !hex.is_empty()
        && hex.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Cookie attributes shared by the session and auth cookies
#[derive(Debug, Clone, Copy)]
pub struct CookiePolicy {
    /// `Secure; SameSite=None` instead of `SameSite=Lax`
    pub cross_origin: bool,
}

impl CookiePolicy {
    pub fn build(&self, name: &'static str, value: String, max_age: time::Duration) -> Cookie<'static> {
        let mut cookie = Cookie::new(name, value);
        cookie.set_http_only(true);
        cookie.set_path("/");
        cookie.set_max_age(max_age);
        if self.cross_origin {
            cookie.set_secure(true);
            cookie.set_same_site(SameSite::None);
        } else {
            cookie.set_same_site(SameSite::Lax);
        }
        cookie
    }

    /// A cookie that, added to a jar, clears `name` on the client
    pub fn removal(&self, name: &'static str) -> Cookie<'static> {
        let mut cookie = self.build(name, String::new(), time::Duration::ZERO);
        cookie.make_removal();
        cookie
    }
}

/// Existing valid guest token from the jar, or a fresh one added to it
pub fn get_or_create(jar: CookieJar, policy: CookiePolicy) -> (CookieJar, String) {
    if let Some(token) = guest_token(&jar) {
        return (jar, token);
    }
    let token = generate_guest_session();
    tracing::debug!(session = %token, "Issued guest session");
    let cookie = policy.build(
        GUEST_SESSION_COOKIE,
        token.clone(),
        time::Duration::days(GUEST_SESSION_DAYS),
    );
    (jar.add(cookie), token)
}

pub fn guest_token(jar: &CookieJar) -> Option<String> {
    jar.get(GUEST_SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|t| is_valid_guest_session(t))
}

/// Extractor for routes that need an existing guest session
#[derive(Debug, Clone)]
pub struct GuestSession(pub String);

impl FromRequestParts<AppState> for GuestSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &AppState) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        guest_token(&jar)
            .map(GuestSession)
            .ok_or_else(|| AppError::new(ErrorCode::SessionRequired))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_tokens_are_valid() {
        for _ in 0..50 {
            let token = generate_guest_session();
            assert!(is_valid_guest_session(&token), "{token}");
            assert_eq!(token.rsplit('_').next().unwrap().len(), 13);
        }
    }

    #[test]
    fn test_rejects_malformed_tokens() {
        assert!(!is_valid_guest_session(""));
        assert!(!is_valid_guest_session("guest_"));
        assert!(!is_valid_guest_session("guest_123"));
        assert!(!is_valid_guest_session("guest_123_"));
        assert!(!is_valid_guest_session("guest_abc_ff"));
        assert!(!is_valid_guest_session("guest_123_FF"));
        assert!(!is_valid_guest_session("user_123_ff"));
        assert!(is_valid_guest_session("guest_1700000000000_0a1b2c3d4e5f6"));
    }

    #[test]
    fn test_cookie_policy_attributes() {
        let lax = CookiePolicy { cross_origin: false }.build(
            GUEST_SESSION_COOKIE,
            "guest_1_ab".into(),
            time::Duration::days(GUEST_SESSION_DAYS),
        );
        assert_eq!(lax.http_only(), Some(true));
        assert_eq!(lax.same_site(), Some(SameSite::Lax));
        assert_eq!(lax.secure(), None);
        assert_eq!(lax.path(), Some("/"));
        assert_eq!(lax.max_age(), Some(time::Duration::days(30)));

        let cross = CookiePolicy { cross_origin: true }.build(
            GUEST_SESSION_COOKIE,
            "guest_1_ab".into(),
            time::Duration::days(GUEST_SESSION_DAYS),
        );
        assert_eq!(cross.same_site(), Some(SameSite::None));
        assert_eq!(cross.secure(), Some(true));
    }

    #[test]
    fn test_get_or_create_keeps_existing_token() {
        let jar = CookieJar::new().add(Cookie::new(GUEST_SESSION_COOKIE, "guest_5_abc"));
        let (_, token) = get_or_create(jar, CookiePolicy { cross_origin: false });
        assert_eq!(token, "guest_5_abc");

        let (jar, fresh) = get_or_create(CookieJar::new(), CookiePolicy { cross_origin: false });
        assert!(is_valid_guest_session(&fresh));
        assert_eq!(jar.get(GUEST_SESSION_COOKIE).unwrap().value(), fresh);
    }
}
