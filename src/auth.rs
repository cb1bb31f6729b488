//! Password hashing and signed-token primitives.
//!
//! Passwords are stored as Argon2 PHC strings. Tokens are HMAC-SHA256
//! over a small JSON payload, encoded as
//! `base64url(payload).base64url(signature)`. The same construction backs
//! both session tokens (`purpose: "auth"`) and one-time registration
//! links (`purpose: "register"`).

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const AUTH_TOKEN_TTL_SECS: i64 = 7 * 24 * 60 * 60;
const REGISTRATION_TTL_SECS: i64 = 30 * 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenPurpose {
    Auth,
    Register,
}

impl TokenPurpose {
    fn as_str(self) -> &'static str {
        match self {
            TokenPurpose::Auth => "auth",
            TokenPurpose::Register => "register",
        }
    }
}

pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    PasswordHash::new(stored_hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

pub fn sign_token(secret: &str, user_id: &str, purpose: TokenPurpose) -> String {
    let ttl = match purpose {
        TokenPurpose::Auth => AUTH_TOKEN_TTL_SECS,
        TokenPurpose::Register => REGISTRATION_TTL_SECS,
    };
    let now = Utc::now().timestamp();
    let payload = json!({
        "user": { "id": user_id },
        "purpose": purpose.as_str(),
        "iat": now,
        "exp": now + ttl,
    });
    let body = URL_SAFE_NO_PAD.encode(payload.to_string().as_bytes());
    let mut mac = mac(secret);
    mac.update(body.as_bytes());
    let sig = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
    format!("{}.{}", body, sig)
}

/// Verifies signature, expiry and purpose; returns the user id.
pub fn verify_token(secret: &str, token: &str, purpose: TokenPurpose) -> Option<String> {
    let (body, sig) = token.split_once('.')?;
    let mut mac = mac(secret);
    mac.update(body.as_bytes());
    let sig = URL_SAFE_NO_PAD.decode(sig).ok()?;
    mac.verify_slice(&sig).ok()?;

    let payload: serde_json::Value =
        serde_json::from_slice(&URL_SAFE_NO_PAD.decode(body).ok()?).ok()?;
    if payload.get("purpose").and_then(|v| v.as_str()) != Some(purpose.as_str()) {
        return None;
    }
    let exp = payload.get("exp").and_then(|v| v.as_i64())?;
    if exp <= Utc::now().timestamp() {
        return None;
    }
    payload
        .get("user")
        .and_then(|u| u.get("id"))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

fn mac(secret: &str) -> HmacSha256 {
    // HMAC accepts keys of any length.
    HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC key")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hashes_verify_and_are_phc_strings() {
        let hash = hash_password("hunter2").expect("hash");
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("hunter2", &hash));
        assert!(!verify_password("hunter3", &hash));
        assert!(!verify_password("hunter2", "not-a-phc-string"));
    }

    #[test]
    fn rehashing_the_same_password_salts_differently() {
        let a = hash_password("hunter2").expect("hash");
        let b = hash_password("hunter2").expect("hash");
        assert_ne!(a, b);
        assert!(verify_password("hunter2", &a));
        assert!(verify_password("hunter2", &b));
    }

    #[test]
    fn token_roundtrip() {
        let token = sign_token("secret", "user-1", TokenPurpose::Auth);
        assert_eq!(
            verify_token("secret", &token, TokenPurpose::Auth).as_deref(),
            Some("user-1")
        );
    }

    #[test]
    fn token_rejects_wrong_secret_purpose_or_tampering() {
        let token = sign_token("secret", "user-1", TokenPurpose::Auth);
        assert!(verify_token("other", &token, TokenPurpose::Auth).is_none());
        assert!(verify_token("secret", &token, TokenPurpose::Register).is_none());

        let mut tampered = token.clone();
        tampered.insert(2, 'x');
        assert!(verify_token("secret", &tampered, TokenPurpose::Auth).is_none());
        assert!(verify_token("secret", "not-a-token", TokenPurpose::Auth).is_none());
    }
}
