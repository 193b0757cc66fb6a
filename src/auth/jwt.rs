use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Serialize};
use sha2::{Digest, Sha256};

use crate::{
    auth::claims::{Claims, RefreshClaims, REFRESH_TOKEN_TYPE},
    errors::{AppError, AppResult},
    models::domain::User,
};

/// Issues and verifies the HS256 access and refresh tokens. Both kinds share
/// one secret; refresh tokens are told apart by their `token_type` claim.
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_ttl_hours: i64,
    refresh_ttl_hours: i64,
}

impl JwtService {
    pub fn new(secret: &SecretString, access_ttl_hours: i64, refresh_ttl_hours: i64) -> Self {
        let key = secret.expose_secret().as_bytes();
        Self {
            encoding_key: EncodingKey::from_secret(key),
            decoding_key: DecodingKey::from_secret(key),
            validation: Validation::default(),
            access_ttl_hours,
            refresh_ttl_hours,
        }
    }

    fn sign<T: Serialize>(&self, claims: &T, kind: &str) -> AppResult<String> {
        encode(&Header::default(), claims, &self.encoding_key)
            .map_err(|e| AppError::InternalError(format!("could not sign {}: {}", kind, e)))
    }

    fn verify<T: DeserializeOwned>(&self, token: &str, kind: &str) -> AppResult<T> {
        decode::<T>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                let reason = match e.kind() {
                    ErrorKind::ExpiredSignature => "has expired".to_string(),
                    ErrorKind::InvalidSignature => "has an invalid signature".to_string(),
                    ErrorKind::InvalidToken => "is malformed".to_string(),
                    _ => format!("is invalid ({})", e),
                };
                AppError::Unauthorized(format!("{} {}", kind, reason))
            })
    }

    pub fn create_token(&self, user: &User) -> AppResult<String> {
        self.sign(&Claims::new(user, self.access_ttl_hours), "access token")
    }

    pub fn validate_token(&self, token: &str) -> AppResult<Claims> {
        self.verify(token, "Access token")
    }

    pub fn create_refresh_token(&self, user_id: &str) -> AppResult<String> {
        self.sign(&RefreshClaims::new(user_id, self.refresh_ttl_hours), "refresh token")
    }

    pub fn validate_refresh_token(&self, token: &str) -> AppResult<RefreshClaims> {
        let claims: RefreshClaims = self.verify(token, "Refresh token")?;
        if claims.token_type != REFRESH_TOKEN_TYPE {
            return Err(AppError::Unauthorized(
                "Refresh token is required here".to_string(),
            ));
        }
        Ok(claims)
    }
}

/// Refresh tokens are persisted as their SHA-256 digest, never in clear.
pub fn hash_token(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}
