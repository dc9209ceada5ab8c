//! Argon2id password hashing
//!
//! Hashing is CPU bound, so both operations run on the blocking thread pool.

use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version,
    password_hash::SaltString,
};
use tracing::error;

use crate::error::{AuthError, AuthResult};

/// Password hasher with configurable cost
#[derive(Debug, Clone)]
pub struct PasswordService {
    params: Params,
}

impl PasswordService {
    pub fn new(memory_kib: u32, iterations: u32) -> AuthResult<Self> {
        let params = Params::new(memory_kib, iterations, Params::DEFAULT_P_COST, None)
            .map_err(|e| AuthError::Configuration(format!("Invalid hashing cost: {}", e)))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a password into a PHC string
    pub async fn hash(&self, password: &str) -> AuthResult<String> {
        let argon2 = self.argon2();
        let password = password.to_owned();

        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut rand::thread_rng());
            argon2
                .hash_password(password.as_bytes(), &salt)
                .map(|hash| hash.to_string())
                .map_err(|e| AuthError::Hashing(e.to_string()))
        })
        .await
        .map_err(|e| AuthError::Hashing(e.to_string()))?
    }

    /// Check a password against a stored PHC string
    ///
    /// The cost parameters are read from the stored hash, so hashes made
    /// under older settings keep verifying.
    pub async fn verify(&self, password: &str, stored_hash: &str) -> AuthResult<bool> {
        let argon2 = self.argon2();
        let password = password.to_owned();
        let stored_hash = stored_hash.to_owned();

        tokio::task::spawn_blocking(move || {
            let parsed = match PasswordHash::new(&stored_hash) {
                Ok(parsed) => parsed,
                Err(e) => {
                    error!("Stored password hash is unreadable: {}", e);
                    return false;
                }
            };
            argon2.verify_password(password.as_bytes(), &parsed).is_ok()
        })
        .await
        .map_err(|e| AuthError::Hashing(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap() -> PasswordService {
        PasswordService::new(1024, 1).unwrap()
    }

    #[tokio::test]
    async fn test_hash_and_verify() {
        let passwords = cheap();
        let hash = passwords.hash("delacruz123!").await.unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(passwords.verify("delacruz123!", &hash).await.unwrap());
        assert!(!passwords.verify("wrong", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_same_password_gets_distinct_salts() {
        let passwords = cheap();
        let a = passwords.hash("secret99").await.unwrap();
        let b = passwords.hash("secret99").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_garbage_hash_does_not_verify() {
        assert!(!cheap().verify("anything", "not-a-phc-string").await.unwrap());
    }

    #[test]
    fn test_invalid_cost_is_rejected() {
        assert!(PasswordService::new(1, 1).is_err());
    }
}
