use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, HeaderMap, HeaderValue},
};
use tracing::warn;
use uuid::Uuid;

use super::jwt::JwtKeys;
use crate::{config::CookieConfig, error::AppError};

pub const SESSION_COOKIE: &str = "access_token";

/// Session middleware: resolves the session token to the user ID, or rejects
/// the request with 401.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers)
            .ok_or_else(|| AppError::Auth("Access denied".into()))?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify(&token).map_err(|e| {
            warn!(error = %e, "invalid or expired token");
            AppError::Auth("Invalid token".into())
        })?;

        Ok(AuthUser(claims.sub))
    }
}

/// Cookie first, then `Authorization: Bearer`.
fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
        .or_else(|| {
            headers
                .get(header::AUTHORIZATION)
                .and_then(|h| h.to_str().ok())
                .and_then(|h| h.strip_prefix("Bearer ").or_else(|| h.strip_prefix("bearer ")))
                .map(|t| t.trim().to_string())
        })
}

fn cookie_header(cfg: &CookieConfig, value: &str, max_age_secs: u64) -> HeaderValue {
    let mut cookie = format!(
        "{SESSION_COOKIE}={value}; HttpOnly; Path=/; Max-Age={max_age_secs}; SameSite={}",
        cfg.same_site
    );
    if cfg.secure {
        cookie.push_str("; Secure");
    }
    // JWTs and the fixed attributes above are plain ASCII
    HeaderValue::from_str(&cookie).unwrap_or_else(|_| HeaderValue::from_static(""))
}

pub fn session_cookie(cfg: &CookieConfig, token: &str, max_age_secs: u64) -> HeaderValue {
    cookie_header(cfg, token, max_age_secs)
}

/// Expires the session cookie with the attributes it was set with.
pub fn cleared_session_cookie(cfg: &CookieConfig) -> HeaderValue {
    cookie_header(cfg, "", 0)
}
