//! Access and refresh tokens
//!
//! Access tokens are short-lived HS256 JWTs naming the user and the session
//! they were issued for. Refresh tokens are opaque random strings; only
//! their SHA-256 digest is stored in `sessions`.

use anyhow::Result;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::{AuthConfig, MAX_ACCESS_TOKEN_MINUTES, MAX_REFRESH_TOKEN_DAYS};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: i64,
    /// Session id backing this token
    pub sid: i64,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

/// Signs and verifies access tokens.
#[derive(Clone)]
pub struct TokenService {
    secret: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            secret: config.jwt_secret.clone(),
            access_ttl: Duration::minutes(
                config.access_token_minutes.clamp(1, MAX_ACCESS_TOKEN_MINUTES),
            ),
            refresh_ttl: Duration::days(config.refresh_token_days.clamp(1, MAX_REFRESH_TOKEN_DAYS)),
        }
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    pub fn issue(&self, user_id: i64, session_id: i64, role: &str) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id,
            sid: session_id,
            role: role.to_string(),
            iat: now.timestamp(),
            exp: (now + self.access_ttl).timestamp(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )?;
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> Result<Claims> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )?;
        Ok(data.claims)
    }
}

/// A fresh opaque refresh token.
pub fn generate_refresh_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

/// Hex SHA-256 digest of a refresh token, as stored in `sessions.token_hash`.
pub fn hash_refresh_token(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new(&AuthConfig {
            jwt_secret: "test-secret-for-unit-tests-only".to_string(),
            access_token_minutes: 30,
            refresh_token_days: 7,
        })
    }

    #[test]
    fn test_issue_and_verify() {
        let svc = service();
        let token = svc.issue(42, 7, "moderator").expect("Should issue token");
        let claims = svc.verify(&token).expect("Should verify token");
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.sid, 7);
        assert_eq!(claims.role, "moderator");
        assert_eq!(claims.exp - claims.iat, 30 * 60);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = service().issue(1, 1, "member").expect("Should issue token");
        let other = TokenService::new(&AuthConfig {
            jwt_secret: "another-secret".to_string(),
            access_token_minutes: 30,
            refresh_token_days: 7,
        });
        assert!(other.verify(&token).is_err());
    }

    #[test]
    fn test_lifetimes_are_capped() {
        let svc = TokenService::new(&AuthConfig {
            jwt_secret: "secret".to_string(),
            access_token_minutes: i64::MAX,
            refresh_token_days: -4,
        });
        assert_eq!(svc.access_ttl(), Duration::minutes(MAX_ACCESS_TOKEN_MINUTES));
        assert_eq!(svc.refresh_ttl(), Duration::days(1));
        assert!(svc.issue(1, 1, "member").is_ok());
    }

    #[test]
    fn test_malformed_token_rejected() {
        assert!(service().verify("not.a.jwt").is_err());
        assert!(service().verify("").is_err());
    }

    #[test]
    fn test_refresh_tokens() {
        let a = generate_refresh_token();
        let b = generate_refresh_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 64);

        let digest = hash_refresh_token(&a);
        assert_eq!(digest.len(), 64);
        assert_eq!(digest, hash_refresh_token(&a));
        assert_ne!(digest, hash_refresh_token(&b));
    }
}
