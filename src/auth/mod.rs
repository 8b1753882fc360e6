pub mod oauth;

use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::database::models::User;

pub use oauth::{IdentityProvider, OAuthProvider, StateSigner};

/// Session token payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn new(user_id: Uuid, email: String, name: Option<String>, expiry_hours: u64) -> Self {
        let now = Utc::now();
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            sub: user_id,
            email,
            name,
            iat: now.timestamp(),
            exp,
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Not signed in")]
    MissingToken,

    #[error("Invalid session token: {0}")]
    InvalidToken(String),

    #[error("Session expired")]
    Expired,

    #[error("Session user no longer exists")]
    UnknownUser,

    #[error("Token generation error: {0}")]
    TokenGeneration(String),

    #[error("Sign-in state did not verify")]
    InvalidState,

    #[error("Sign-in callback is missing the authorization code")]
    MissingCode,

    #[error("Identity provider error: {0}")]
    Provider(String),
}

/// HS256 signing and verification of session tokens.
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    expiry_hours: u64,
}

impl SessionKeys {
    pub fn new(secret: &str, expiry_hours: u64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            expiry_hours,
        }
    }

    pub fn expiry_hours(&self) -> u64 {
        self.expiry_hours
    }

    pub fn issue(&self, user: &User) -> Result<String, AuthError> {
        let claims = Claims::new(user.id, user.email.clone(), user.name.clone(), self.expiry_hours);
        self.sign(&claims)
    }

    pub fn sign(&self, claims: &Claims) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| AuthError::TokenGeneration(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let validation = Validation::new(Algorithm::HS256);

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::InvalidToken(e.to_string()),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-0123456789";

    #[test]
    fn issued_token_verifies() {
        let keys = SessionKeys::new(SECRET, 1);
        let claims = Claims::new(Uuid::new_v4(), "a@example.com".into(), None, 1);
        let token = keys.sign(&claims).unwrap();
        assert_eq!(keys.verify(&token).unwrap(), claims);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = SessionKeys::new(SECRET, 1)
            .sign(&Claims::new(Uuid::new_v4(), "a@example.com".into(), None, 1))
            .unwrap();
        let other = SessionKeys::new("another-secret-0123456789", 1);
        assert!(matches!(other.verify(&token), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn expired_token_is_rejected() {
        let keys = SessionKeys::new(SECRET, 1);
        let mut claims = Claims::new(Uuid::new_v4(), "a@example.com".into(), None, 1);
        claims.iat -= 7200;
        claims.exp = claims.iat + 60;
        let token = keys.sign(&claims).unwrap();
        assert!(matches!(keys.verify(&token), Err(AuthError::Expired)));
    }
}
