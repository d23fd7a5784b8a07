pub mod password;
pub mod role;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config;

pub use password::{hash_password, verify_password, PasswordError};
pub use role::{Area, Role, RoleSet};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub roles: RoleSet,
    pub permissions: Vec<String>,
    pub program_studi_id: Option<Uuid>,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(user_id: Uuid, email: String, roles: RoleSet, program_studi_id: Option<Uuid>) -> Self {
        let expiry_hours = config::config().security.jwt_expiry_hours;
        Self::with_expiry(user_id, email, roles, program_studi_id, expiry_hours)
    }

    pub fn with_expiry(
        user_id: Uuid,
        email: String,
        roles: RoleSet,
        program_studi_id: Option<Uuid>,
        expiry_hours: u64,
    ) -> Self {
        let now = Utc::now();
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();
        let permissions = roles.permissions();

        Self {
            sub: user_id,
            email,
            roles,
            permissions,
            program_studi_id,
            exp,
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),
    #[error("Invalid JWT secret")]
    InvalidSecret,
    #[error("Invalid JWT token: {0}")]
    InvalidToken(String),
}

pub fn generate_jwt(claims: &Claims) -> Result<String, JwtError> {
    encode_with_secret(claims, &config::config().security.jwt_secret)
}

pub fn validate_jwt(token: &str) -> Result<Claims, JwtError> {
    decode_with_secret(token, &config::config().security.jwt_secret)
}

pub fn encode_with_secret(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), claims, &encoding_key).map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

pub fn decode_with_secret(token: &str, secret: &str) -> Result<Claims, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    decode::<Claims>(token, &decoding_key, &Validation::default())
        .map(|data| data.claims)
        .map_err(|e| JwtError::InvalidToken(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_claims(hours: u64) -> Claims {
        let roles: RoleSet = [Role::Prodi].into_iter().collect();
        Claims::with_expiry(Uuid::new_v4(), "prodi@example.ac.id".into(), roles, Some(Uuid::new_v4()), hours)
    }

    #[test]
    fn token_round_trip_keeps_roles_and_tenant() {
        let claims = sample_claims(1);
        let token = encode_with_secret(&claims, "s3cret").unwrap();
        let decoded = decode_with_secret(&token, "s3cret").unwrap();

        assert_eq!(decoded.sub, claims.sub);
        assert_eq!(decoded.roles, claims.roles);
        assert_eq!(decoded.program_studi_id, claims.program_studi_id);
        assert!(decoded.permissions.contains(&"obe.manage".to_string()));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = encode_with_secret(&sample_claims(1), "s3cret").unwrap();
        assert!(matches!(decode_with_secret(&token, "other"), Err(JwtError::InvalidToken(_))));
    }

    #[test]
    fn empty_secret_is_refused() {
        assert!(matches!(encode_with_secret(&sample_claims(1), ""), Err(JwtError::InvalidSecret)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let mut claims = sample_claims(1);
        claims.exp = Utc::now().timestamp() - 3600;
        let token = encode_with_secret(&claims, "s3cret").unwrap();
        assert!(decode_with_secret(&token, "s3cret").is_err());
    }
}
