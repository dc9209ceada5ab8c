//! Token service for signing and decoding session tokens
//!
//! Tokens are HS256 JWTs naming the account and the session row they belong
//! to. A token on its own proves nothing: the session row decides whether it
//! is still usable, and only the SHA-256 digest of the token is stored there.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::MIN_SECRET_LEN;
use crate::error::{AuthError, AuthResult};

/// JWT claims structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Account ID
    pub sub: Uuid,
    /// Session ID
    pub sid: Uuid,
    /// Unique token ID, so two tokens for one session never collide
    pub jti: Uuid,
    /// Issued at time
    pub iat: i64,
    /// Expiration time
    pub exp: i64,
}

/// JWT service
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenService {
    /// Initialize a new token service from a shared secret
    pub fn new(secret: &str) -> AuthResult<Self> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(AuthError::Configuration(format!(
                "token secret must be at least {MIN_SECRET_LEN} bytes"
            )));
        }

        // Expiry is enforced against the session row, which can be extended
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;

        Ok(TokenService {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }

    /// Sign a token for the given session
    pub fn issue(
        &self,
        account_id: Uuid,
        session_id: Uuid,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> AuthResult<String> {
        let claims = Claims {
            sub: account_id,
            sid: session_id,
            jti: Uuid::new_v4(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };

        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding_key,
        )?)
    }

    /// Check the signature and return the claims
    pub fn decode(&self, token: &str) -> AuthResult<Claims> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|_| AuthError::TokenInvalid)
    }
}

/// Digest stored in place of the raw token
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
