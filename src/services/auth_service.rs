use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::{User, UserRole};
use crate::repository::UserRepository;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    #[error("Invalid token format")]
    Malformed,
    #[error("Invalid token signature")]
    BadSignature,
    #[error("Token has expired")]
    Expired,
    #[error("Account is deactivated")]
    Revoked,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub role: UserRole,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and checks HS256 bearer tokens.
#[derive(Clone)]
pub struct AuthService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl AuthService {
    pub fn new(config: &Config) -> Self {
        Self::from_secret(&config.jwt_secret, config.jwt_expires_in)
    }

    pub fn from_secret(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn generate_token(&self, user: &User) -> AppResult<String> {
        self.issue(user.id, &user.email, user.role, Utc::now())
    }

    pub fn issue(
        &self,
        user_id: Uuid,
        email: &str,
        role: UserRole,
        issued_at: DateTime<Utc>,
    ) -> AppResult<String> {
        let ttl = chrono::Duration::from_std(self.ttl)
            .map_err(|e| AppError::Internal(format!("Token lifetime out of range: {}", e)))?;

        let claims = Claims {
            sub: user_id,
            email: email.to_string(),
            role,
            iat: issued_at.timestamp(),
            exp: (issued_at + ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, TokenError> {
        let validation = Validation::new(Algorithm::HS256);

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidSignature => TokenError::BadSignature,
                _ => TokenError::Malformed,
            })
    }

    /// Resolves the token subject to a live, active account.
    pub async fn authenticate(&self, pool: &PgPool, token: &str) -> AppResult<User> {
        let claims = self.verify_token(token)?;

        let user = UserRepository::find_by_id(pool, claims.sub)
            .await?
            .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;

        if !user.is_active {
            return Err(TokenError::Revoked.into());
        }

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> AuthService {
        AuthService::from_secret("test-secret", Duration::from_secs(24 * 3600))
    }

    #[test]
    fn token_round_trip_keeps_identity() {
        let tokens = service();
        let user_id = Uuid::new_v4();
        let now = Utc::now();

        let token = tokens.issue(user_id, "a@x", UserRole::Tenant, now).unwrap();
        let claims = tokens.verify_token(&token).unwrap();

        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.email, "a@x");
        assert_eq!(claims.role, UserRole::Tenant);
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        let tokens = AuthService::from_secret("test-secret", Duration::from_secs(60));
        let issued = Utc::now() - chrono::Duration::hours(3);
        let token = tokens
            .issue(Uuid::new_v4(), "a@x", UserRole::Admin, issued)
            .unwrap();

        assert_eq!(tokens.verify_token(&token), Err(TokenError::Expired));
    }

    #[test]
    fn foreign_signature_is_rejected() {
        let other = AuthService::from_secret("other-secret", Duration::from_secs(3600));
        let token = other
            .issue(Uuid::new_v4(), "a@x", UserRole::Landlord, Utc::now())
            .unwrap();

        assert_eq!(service().verify_token(&token), Err(TokenError::BadSignature));
    }

    #[test]
    fn garbage_is_malformed() {
        assert_eq!(service().verify_token("not.a.jwt"), Err(TokenError::Malformed));
        assert_eq!(service().verify_token(""), Err(TokenError::Malformed));
    }
}
