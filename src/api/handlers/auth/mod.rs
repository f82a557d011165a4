//! Login, logout, and credential validation endpoints.
//!
//! Flow Overview:
//! 1) `POST /auth/login` verifies the password hash and mints a signed
//!    credential, returned in the body and as cookies.
//! 2) Subsequent requests carry the credential; the guard middleware and
//!    `principal` helpers re-derive validity on every request.
//! 3) `POST /auth/logout` clears both cookies; there is no server-side
//!    session to revoke.

pub mod password;
pub mod principal;
pub mod state;
pub mod storage;
pub mod token;

pub use principal::Principal;
pub use state::{AuthConfig, AuthState};
pub use storage::User;

use axum::{
    extract::Extension,
    http::{
        header::{InvalidHeaderValue, SET_COOKIE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;

use crate::api::error::ApiError;

/// HttpOnly cookie carrying the signed credential.
pub const AUTH_COOKIE_NAME: &str = "auth-token";
/// Readable cookie mirroring the sanitized user object for the frontend.
pub const SESSION_COOKIE_NAME: &str = "user-session";

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub message: String,
    pub user: User,
    pub token: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ValidateResponse {
    pub valid: bool,
    pub user: User,
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful, cookies set.", body = LoginResponse),
        (status = 401, description = "Invalid username or password."),
    ),
    tag = "auth"
)]
pub async fn login(
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = payload.username.trim();

    let record = storage::fetch_user_for_login(&pool, username)
        .await
        .map_err(ApiError::Database)?;

    // Unknown username and wrong password are indistinguishable.
    let Some((user, stored_hash)) = record else {
        return Err(ApiError::Unauthorized("Invalid username or password"));
    };
    if !password::verify_password(&payload.password, &stored_hash) {
        return Err(ApiError::Unauthorized("Invalid username or password"));
    }

    let credential = token::encode(user.id, &user.role, auth_state.config().session_secret());

    let mut headers = HeaderMap::new();
    match login_cookies(auth_state.config(), &credential, &user) {
        Ok((auth_cookie, session_cookie)) => {
            headers.append(SET_COOKIE, auth_cookie);
            headers.append(SET_COOKIE, session_cookie);
        }
        Err(err) => {
            error!("Failed to build login cookies: {err}");
        }
    }

    info!(username = %user.username, "login succeeded");

    let body = LoginResponse {
        message: "Login successful".to_string(),
        token: credential,
        user,
    };

    Ok((StatusCode::OK, headers, Json(body)))
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Cookies cleared."),
    ),
    tag = "auth"
)]
pub async fn logout(auth_state: Extension<Arc<AuthState>>) -> impl IntoResponse {
    let mut headers = HeaderMap::new();
    if let Ok((auth_cookie, session_cookie)) = clear_cookies(auth_state.config()) {
        headers.append(SET_COOKIE, auth_cookie);
        headers.append(SET_COOKIE, session_cookie);
    }
    (
        StatusCode::OK,
        headers,
        Json(json!({ "message": "Logout successful" })),
    )
}

#[utoipa::path(
    get,
    path = "/auth/validate",
    responses(
        (status = 200, description = "Credential is valid.", body = ValidateResponse),
        (status = 401, description = "Missing or invalid credential."),
    ),
    tag = "auth"
)]
pub async fn validate(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> Result<impl IntoResponse, ApiError> {
    let principal = principal::resolve_user(&headers, &pool, &auth_state).await?;
    Ok(Json(ValidateResponse {
        valid: true,
        user: principal.user,
    }))
}

/// Build the credential and user-mirror cookies set on login.
fn login_cookies(
    config: &AuthConfig,
    credential: &str,
    user: &User,
) -> Result<(HeaderValue, HeaderValue), InvalidHeaderValue> {
    let max_age = config.session_ttl_seconds();
    let secure = if config.secure_cookies() { "; Secure" } else { "" };

    let auth_cookie = format!(
        "{AUTH_COOKIE_NAME}={credential}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}{secure}"
    );

    // The frontend reads this one, so it is intentionally not HttpOnly.
    let user_json =
        serde_json::to_string(user).unwrap_or_else(|_| "{}".to_string());
    let encoded_user = urlencode(&user_json);
    let session_cookie = format!(
        "{SESSION_COOKIE_NAME}={encoded_user}; Path=/; SameSite=Lax; Max-Age={max_age}{secure}"
    );

    Ok((
        HeaderValue::from_str(&auth_cookie)?,
        HeaderValue::from_str(&session_cookie)?,
    ))
}

fn clear_cookies(config: &AuthConfig) -> Result<(HeaderValue, HeaderValue), InvalidHeaderValue> {
    let secure = if config.secure_cookies() { "; Secure" } else { "" };
    let auth_cookie =
        format!("{AUTH_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0{secure}");
    let session_cookie =
        format!("{SESSION_COOKIE_NAME}=; Path=/; SameSite=Lax; Max-Age=0{secure}");
    Ok((
        HeaderValue::from_str(&auth_cookie)?,
        HeaderValue::from_str(&session_cookie)?,
    ))
}

/// Percent-encode the JSON user mirror so it is cookie-safe.
fn urlencode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char);
            }
            other => out.push_str(&format!("%{other:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use secrecy::SecretString;
    use uuid::Uuid;

    fn test_user() -> User {
        User {
            id: Uuid::new_v4(),
            username: "frontdesk".to_string(),
            role: "user".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn config() -> AuthConfig {
        AuthConfig::new(SecretString::from("secret".to_string()))
    }

    #[test]
    fn login_cookies_carry_expected_attributes() {
        let user = test_user();
        let (auth_cookie, session_cookie) =
            login_cookies(&config(), "tok", &user).unwrap();

        let auth_cookie = auth_cookie.to_str().unwrap();
        assert!(auth_cookie.starts_with("auth-token=tok;"));
        assert!(auth_cookie.contains("HttpOnly"));
        assert!(auth_cookie.contains("Path=/"));
        assert!(auth_cookie.contains("SameSite=Lax"));
        assert!(auth_cookie.contains("Max-Age=604800"));
        assert!(!auth_cookie.contains("Secure"));

        let session_cookie = session_cookie.to_str().unwrap();
        assert!(session_cookie.starts_with("user-session="));
        assert!(!session_cookie.contains("HttpOnly"));
        assert!(session_cookie.contains("Max-Age=604800"));
    }

    #[test]
    fn secure_flag_follows_config() {
        let user = test_user();
        let config = config().with_secure_cookies(true);
        let (auth_cookie, _) = login_cookies(&config, "tok", &user).unwrap();
        assert!(auth_cookie.to_str().unwrap().contains("Secure"));
    }

    #[test]
    fn clear_cookies_expire_immediately() {
        let (auth_cookie, session_cookie) = clear_cookies(&config()).unwrap();
        assert!(auth_cookie.to_str().unwrap().contains("Max-Age=0"));
        assert!(session_cookie.to_str().unwrap().contains("Max-Age=0"));
    }

    #[test]
    fn urlencode_escapes_json() {
        assert_eq!(urlencode(r#"{"a":"b c"}"#), "%7B%22a%22%3A%22b%20c%22%7D");
    }
}
