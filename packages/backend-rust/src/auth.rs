#![allow(dead_code)]

use axum::http::{header, HeaderMap};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;
use thiserror::Error;

/// Authenticated caller, inserted as a request extension by `require_auth`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub id: String,
    pub role: String,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role.eq_ignore_ascii_case("admin")
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing token")]
    MissingToken,
    #[error("invalid token")]
    InvalidToken,
    #[error("missing JWT_SECRET")]
    MissingSecret,
}

pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())?;

    auth_header
        .strip_prefix("Bearer ")
        .map(|value| value.to_string())
}

/// Verify an HS256 JWT against `JWT_SECRET` and extract the caller identity.
///
/// Session issuance lives upstream; this side only validates signature and
/// registered claims.
pub fn verify_request_token(token: &str) -> Result<AuthUser, AuthError> {
    let secret = std::env::var("JWT_SECRET").map_err(|_| AuthError::MissingSecret)?;
    verify_jwt_hs256(token, &secret)
}

fn verify_jwt_hs256(token: &str, secret: &str) -> Result<AuthUser, AuthError> {
    let mut parts = token.split('.');
    let header_b64 = parts.next().ok_or(AuthError::InvalidToken)?;
    let payload_b64 = parts.next().ok_or(AuthError::InvalidToken)?;
    let sig_b64 = parts.next().ok_or(AuthError::InvalidToken)?;
    if parts.next().is_some() {
        return Err(AuthError::InvalidToken);
    }

    let header_bytes = URL_SAFE_NO_PAD
        .decode(header_b64.as_bytes())
        .map_err(|_| AuthError::InvalidToken)?;
    let payload_bytes = URL_SAFE_NO_PAD
        .decode(payload_b64.as_bytes())
        .map_err(|_| AuthError::InvalidToken)?;
    let sig_bytes = URL_SAFE_NO_PAD
        .decode(sig_b64.as_bytes())
        .map_err(|_| AuthError::InvalidToken)?;

    let header_json: serde_json::Value =
        serde_json::from_slice(&header_bytes).map_err(|_| AuthError::InvalidToken)?;
    let alg = header_json
        .get("alg")
        .and_then(|value| value.as_str())
        .ok_or(AuthError::InvalidToken)?;
    if alg != "HS256" {
        return Err(AuthError::InvalidToken);
    }

    type HmacSha256 = Hmac<Sha256>;
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| AuthError::InvalidToken)?;
    mac.update(format!("{header_b64}.{payload_b64}").as_bytes());
    mac.verify_slice(&sig_bytes)
        .map_err(|_| AuthError::InvalidToken)?;

    let payload_json: serde_json::Value =
        serde_json::from_slice(&payload_bytes).map_err(|_| AuthError::InvalidToken)?;

    validate_registered_claims(&payload_json)?;

    let user_id = payload_json
        .get("userId")
        .and_then(|value| value.as_str())
        .ok_or(AuthError::InvalidToken)?
        .to_string();

    let role = payload_json
        .get("role")
        .and_then(|value| value.as_str())
        .unwrap_or("user")
        .to_string();

    Ok(AuthUser { id: user_id, role })
}

fn validate_registered_claims(payload: &serde_json::Value) -> Result<(), AuthError> {
    let now = Utc::now().timestamp();

    if let Some(exp) = payload.get("exp").and_then(|value| value.as_i64()) {
        if now >= exp {
            return Err(AuthError::InvalidToken);
        }
    }

    if let Some(nbf) = payload.get("nbf").and_then(|value| value.as_i64()) {
        if now < nbf {
            return Err(AuthError::InvalidToken);
        }
    }

    Ok(())
}

/// Sign an HS256 token for a user. Used by tests and local tooling.
pub fn sign_jwt_for_user(user_id: &str, role: &str) -> Result<String, AuthError> {
    let secret = std::env::var("JWT_SECRET").map_err(|_| AuthError::MissingSecret)?;

    let issued_at = Utc::now();
    let exp = issued_at + chrono::Duration::hours(24);

    let header_json = serde_json::json!({
        "alg": "HS256",
        "typ": "JWT",
    });

    let payload_json = serde_json::json!({
        "userId": user_id,
        "role": role,
        "iat": issued_at.timestamp(),
        "exp": exp.timestamp(),
    });

    let header_b64 = URL_SAFE_NO_PAD
        .encode(serde_json::to_vec(&header_json).map_err(|_| AuthError::InvalidToken)?);
    let payload_b64 = URL_SAFE_NO_PAD
        .encode(serde_json::to_vec(&payload_json).map_err(|_| AuthError::InvalidToken)?);
    let signing_input = format!("{header_b64}.{payload_b64}");

    type HmacSha256 = Hmac<Sha256>;
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| AuthError::InvalidToken)?;
    mac.update(signing_input.as_bytes());
    let signature = mac.finalize().into_bytes();
    let sig_b64 = URL_SAFE_NO_PAD.encode(signature);

    Ok(format!("{signing_input}.{sig_b64}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify_roundtrip() {
        std::env::set_var("JWT_SECRET", "test-secret");
        let token = sign_jwt_for_user("user-1", "admin").unwrap();
        let user = verify_request_token(&token).unwrap();
        assert_eq!(user.id, "user-1");
        assert!(user.is_admin());
    }

    #[test]
    fn test_tampered_token_rejected() {
        std::env::set_var("JWT_SECRET", "test-secret");
        let token = sign_jwt_for_user("user-1", "user").unwrap();
        let mut tampered = token.clone();
        tampered.pop();
        tampered.push('x');
        assert!(verify_request_token(&tampered).is_err());
    }
}
