//! Error type for authentication operations

use common::DatabaseError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Account is locked")]
    AccountLocked,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token has been revoked")]
    TokenRevoked,

    #[error("Token is invalid")]
    TokenInvalid,

    #[error("Too many login attempts")]
    RateLimited,

    /// Rejected input, with the offending field
    #[error("{message}")]
    Validation { field: &'static str, message: String },

    #[error("Account not found")]
    AccountNotFound,

    #[error("Auth configuration error: {0}")]
    Configuration(String),

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Token signing failed: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl AuthError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        AuthError::Validation {
            field,
            message: message.into(),
        }
    }
}

pub type AuthResult<T> = Result<T, AuthError>;
