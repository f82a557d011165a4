//! Authenticated principal extraction and authorization helpers.
//!
//! Flow Overview: read the bearer credential (cookie or Authorization
//! header), verify and decode it, resolve the subject against the users
//! table, and return a principal downstream handlers can use. Validity is
//! re-derived on every request; nothing is stored server-side.

use axum::http::{header::AUTHORIZATION, HeaderMap};
use sqlx::PgPool;
use tracing::error;

use super::{state::AuthState, storage, token, AUTH_COOKIE_NAME};
use crate::api::error::ApiError;

/// Authenticated user context derived from the bearer credential.
#[derive(Clone, Debug)]
pub struct Principal {
    pub user: storage::User,
}

impl Principal {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.user.is_admin()
    }
}

/// Resolve the request credential into a principal.
///
/// # Errors
/// 401 "invalid token" for a missing or unverifiable credential, 401
/// "user not found" when the subject no longer exists.
pub async fn resolve_user(
    headers: &HeaderMap,
    pool: &PgPool,
    auth_state: &AuthState,
) -> Result<Principal, ApiError> {
    let Some(credential) = extract_credential(headers) else {
        return Err(ApiError::Unauthorized("invalid token"));
    };

    let claims = token::decode(
        &credential,
        auth_state.config().session_secret(),
        auth_state.config().session_ttl_seconds(),
    )
    .map_err(|_| ApiError::Unauthorized("invalid token"))?;

    let user = storage::fetch_user_by_id(pool, claims.user_id)
        .await
        .map_err(|err| {
            error!("Failed to resolve credential subject: {err}");
            ApiError::Database(err)
        })?
        .ok_or(ApiError::Unauthorized("user not found"))?;

    Ok(Principal { user })
}

/// Require the admin role on a resolved principal.
///
/// # Errors
/// 403 "admin access required" for non-admin subjects.
pub fn ensure_admin(principal: &Principal) -> Result<(), ApiError> {
    if principal.is_admin() {
        Ok(())
    } else {
        Err(ApiError::Forbidden("admin access required"))
    }
}

/// Pull the credential from the auth cookie or a bearer header.
#[must_use]
pub fn extract_credential(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = extract_bearer_token(headers) {
        return Some(token);
    }
    let header = headers.get(axum::http::header::COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        // Browsers may send nameless pairs; skip anything without a '='.
        let Some((key, val)) = pair.trim().split_once('=') else {
            continue;
        };
        if key.trim() == AUTH_COOKIE_NAME {
            return Some(val.trim().to_string());
        }
    }
    None
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_header_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        headers.insert(
            axum::http::header::COOKIE,
            HeaderValue::from_static("auth-token=from-cookie"),
        );
        assert_eq!(extract_credential(&headers), Some("from-header".to_string()));
    }

    #[test]
    fn cookie_is_parsed_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::COOKIE,
            HeaderValue::from_static("theme=dark; auth-token=abc123; lang=en"),
        );
        assert_eq!(extract_credential(&headers), Some("abc123".to_string()));
    }

    #[test]
    fn nameless_cookie_pairs_are_skipped() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::COOKIE,
            HeaderValue::from_static("flag; auth-token=abc123"),
        );
        assert_eq!(extract_credential(&headers), Some("abc123".to_string()));
    }

    #[test]
    fn empty_bearer_is_none() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(extract_credential(&headers), None);
    }

    #[test]
    fn missing_credential_is_none() {
        assert_eq!(extract_credential(&HeaderMap::new()), None);
    }
}
