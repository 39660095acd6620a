// [apps/guardian/src/auth/mod.rs]
//! Credential verification, bearer-token issuance, and login rate limiting
//! (`spec.md` §4.6). No server-side session table: a token is signed and
//! self-contained, validated purely cryptographically.

pub mod rate_limit;

use crate::config::AuthConfig;
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("invalid or expired token")]
    InvalidToken,
    #[error("too many login attempts")]
    RateLimited,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
}

/// Verifies a username/password pair against the single static credential.
///
/// Per `spec.md` §4.6's timing discipline: the bcrypt hash is verified on
/// *every* attempt regardless of whether the username matches, usernames
/// are compared with a constant-time primitive, and there is no early
/// return — an attacker who can only observe latency cannot distinguish
/// "wrong username" from "wrong password".
pub fn verify_credentials(config: &AuthConfig, username: &str, password: &str) -> bool {
    let username_matches: bool = config.username.as_bytes().ct_eq(username.as_bytes()).into();
    let password_matches = bcrypt::verify(password, &config.password_hash).unwrap_or(false);
    username_matches && password_matches
}

/// Issues a signed bearer token for the configured subject. Returns the
/// token and its time-to-live in seconds (mirrors the `/token` response's
/// `expires_in` field).
pub fn issue_token(config: &AuthConfig) -> Result<(String, i64), AuthError> {
    let ttl_seconds = config.token_ttl.as_secs() as i64;
    let exp = (Utc::now() + ChronoDuration::seconds(ttl_seconds)).timestamp();
    let claims = Claims { sub: config.username.clone(), exp };

    let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(config.secret_key.as_bytes())).map_err(|_| AuthError::InvalidToken)?;
    Ok((token, ttl_seconds))
}

/// Validates a bearer token's signature and expiry. There is no
/// server-side revocation list — expiry is the only way a token stops
/// being valid before the process restarts.
pub fn verify_token(config: &AuthConfig, token: &str) -> Result<Claims, AuthError> {
    let validation = Validation::new(jsonwebtoken::Algorithm::HS256);
    decode::<Claims>(token, &DecodingKey::from_secret(config.secret_key.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|_| AuthError::InvalidToken)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn test_config() -> AuthConfig {
        AuthConfig {
            username: "admin".to_string(),
            password_hash: bcrypt::hash("correct-horse", bcrypt::DEFAULT_COST).unwrap(),
            secret_key: "test-secret-key-at-least-this-long".to_string(),
            token_ttl: Duration::from_secs(1800),
        }
    }

    #[test]
    fn correct_credentials_pass() {
        let config = test_config();
        assert!(verify_credentials(&config, "admin", "correct-horse"));
    }

    #[test]
    fn wrong_password_fails() {
        let config = test_config();
        assert!(!verify_credentials(&config, "admin", "wrong"));
    }

    #[test]
    fn wrong_username_fails_even_with_correct_password() {
        let config = test_config();
        assert!(!verify_credentials(&config, "someone-else", "correct-horse"));
    }

    #[test]
    fn empty_password_fails() {
        let config = test_config();
        assert!(!verify_credentials(&config, "admin", ""));
    }

    #[test]
    fn issued_token_round_trips_through_verify() {
        let config = test_config();
        let (token, ttl) = issue_token(&config).unwrap();
        assert_eq!(ttl, 1800);
        let claims = verify_token(&config, &token).unwrap();
        assert_eq!(claims.sub, "admin");
    }

    #[test]
    fn tampered_token_is_rejected() {
        let config = test_config();
        let (token, _) = issue_token(&config).unwrap();
        let mut tampered = token.clone();
        tampered.push('x');
        assert!(verify_token(&config, &tampered).is_err());
    }

    #[test]
    fn token_signed_with_a_different_secret_is_rejected() {
        let config = test_config();
        let (token, _) = issue_token(&config).unwrap();
        let mut other = config.clone();
        other.secret_key = "a-completely-different-secret-key".to_string();
        assert!(verify_token(&other, &token).is_err());
    }
}
