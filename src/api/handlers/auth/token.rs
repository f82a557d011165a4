//! Signed bearer credential codec.
//!
//! The credential is `<userId>:<role>:<issuedAtMillis>:<signature>` where the
//! signature is an HMAC-SHA256 over the first three parts, base64url encoded.
//! Decoding fails closed: empty or short input, missing parts, a bad
//! signature, or an expired issued-at all reject the credential. Nothing is
//! stored server-side; validity is re-derived from the claims on every
//! request.

use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::Utc;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use thiserror::Error;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

const MIN_TOKEN_LENGTH: usize = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("invalid token")]
    Malformed,
    #[error("invalid token signature")]
    BadSignature,
    #[error("token expired")]
    Expired,
}

/// Claims carried by a decoded credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    pub user_id: Uuid,
    pub role: String,
    pub issued_at_ms: i64,
}

/// Mint a credential for a user.
#[must_use]
pub fn encode(user_id: Uuid, role: &str, secret: &SecretString) -> String {
    let issued_at_ms = Utc::now().timestamp_millis();
    let payload = format!("{user_id}:{role}:{issued_at_ms}");
    let signature = sign(&payload, secret);
    format!("{payload}:{signature}")
}

/// Verify and decode a credential.
///
/// # Errors
/// Fails closed on any structural, signature, or expiry problem.
pub fn decode(
    token: &str,
    secret: &SecretString,
    ttl_seconds: i64,
) -> Result<TokenClaims, TokenError> {
    if token.is_empty() || token.len() < MIN_TOKEN_LENGTH {
        return Err(TokenError::Malformed);
    }

    let (payload, signature) = token.rsplit_once(':').ok_or(TokenError::Malformed)?;

    let mut parts = payload.splitn(3, ':');
    let user_id = parts.next().ok_or(TokenError::Malformed)?;
    let role = parts.next().ok_or(TokenError::Malformed)?;
    let issued_at = parts.next().ok_or(TokenError::Malformed)?;

    let user_id = Uuid::parse_str(user_id).map_err(|_| TokenError::Malformed)?;
    let issued_at_ms: i64 = issued_at.parse().map_err(|_| TokenError::Malformed)?;

    verify(payload, signature, secret)?;

    let age_ms = Utc::now().timestamp_millis().saturating_sub(issued_at_ms);
    if age_ms < 0 || age_ms > ttl_seconds.saturating_mul(1000) {
        return Err(TokenError::Expired);
    }

    // An empty role claim falls back to the least-privileged role.
    let role = if role.is_empty() { "user" } else { role };

    Ok(TokenClaims {
        user_id,
        role: role.to_string(),
        issued_at_ms,
    })
}

fn sign(payload: &str, secret: &SecretString) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.expose_secret().as_bytes())
        .expect("HMAC accepts any key length");
    mac.update(payload.as_bytes());
    Base64UrlUnpadded::encode_string(&mac.finalize().into_bytes())
}

fn verify(payload: &str, signature: &str, secret: &SecretString) -> Result<(), TokenError> {
    let expected = Base64UrlUnpadded::decode_vec(signature).map_err(|_| TokenError::Malformed)?;
    let mut mac = HmacSha256::new_from_slice(secret.expose_secret().as_bytes())
        .expect("HMAC accepts any key length");
    mac.update(payload.as_bytes());
    mac.verify_slice(&expected)
        .map_err(|_| TokenError::BadSignature)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: i64 = 7 * 24 * 60 * 60;

    fn secret() -> SecretString {
        SecretString::from("test-signing-secret".to_string())
    }

    #[test]
    fn round_trip_preserves_claims() {
        let user_id = Uuid::new_v4();
        let token = encode(user_id, "admin", &secret());
        let claims = decode(&token, &secret(), TTL).unwrap();
        assert_eq!(claims.user_id, user_id);
        assert_eq!(claims.role, "admin");
    }

    #[test]
    fn empty_role_defaults_to_user() {
        let user_id = Uuid::new_v4();
        let token = encode(user_id, "", &secret());
        let claims = decode(&token, &secret(), TTL).unwrap();
        assert_eq!(claims.role, "user");
    }

    #[test]
    fn empty_and_short_tokens_fail_closed() {
        assert_eq!(decode("", &secret(), TTL), Err(TokenError::Malformed));
        assert_eq!(decode("short", &secret(), TTL), Err(TokenError::Malformed));
    }

    #[test]
    fn token_without_parts_fails_closed() {
        assert_eq!(
            decode("justonelongfield", &secret(), TTL),
            Err(TokenError::Malformed)
        );
    }

    #[test]
    fn unsigned_plaintext_tuple_is_rejected() {
        // A structurally well-formed tuple with no MAC must never pass.
        let result = decode("user1:admin:123456", &secret(), TTL);
        assert!(result.is_err());
    }

    #[test]
    fn tampered_payload_fails_signature_check() {
        let token = encode(Uuid::new_v4(), "user", &secret());
        let tampered = token.replacen(":user:", ":admin:", 1);
        assert_eq!(
            decode(&tampered, &secret(), TTL),
            Err(TokenError::BadSignature)
        );
    }

    #[test]
    fn wrong_secret_fails_signature_check() {
        let token = encode(Uuid::new_v4(), "user", &secret());
        let other = SecretString::from("other-secret".to_string());
        assert_eq!(decode(&token, &other, TTL), Err(TokenError::BadSignature));
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = encode(Uuid::new_v4(), "user", &secret());
        assert_eq!(decode(&token, &secret(), -1), Err(TokenError::Expired));
    }
}
