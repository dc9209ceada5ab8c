//! Authentication settings read from the environment

use serde::Deserialize;

use crate::error::AuthError;
use crate::rate_limiter::RateLimiterConfig;

/// Minimum accepted length of the token signing secret, in bytes
pub const MIN_SECRET_LEN: usize = 32;

/// Authentication configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret used to sign session tokens
    pub jwt_secret: String,
    /// Lifetime of a regular session in seconds (default: 24 hours)
    pub session_ttl_seconds: i64,
    /// Lifetime of a remember-me session in seconds (default: 30 days)
    pub remember_me_ttl_seconds: i64,
    /// Refresh is honored only when less than this much lifetime remains
    pub refresh_window_seconds: i64,
    /// Argon2 memory cost in KiB
    pub password_hash_memory_kib: u32,
    /// Argon2 iteration count
    pub password_hash_iterations: u32,
    /// Failed logins before the account is locked
    pub login_max_failed_attempts: i32,
    /// How long a lock lasts in seconds
    pub login_lock_seconds: i64,
    pub login_rate_limit_attempts: u32,
    pub login_rate_limit_window_seconds: u64,
    pub login_rate_limit_ban_seconds: u64,
}

impl AuthConfig {
    /// Create a new AuthConfig from environment variables
    ///
    /// # Environment Variables
    /// - `JWT_SECRET`: token signing secret, at least 32 bytes (required)
    /// - `SESSION_TTL_SECONDS` (default: 86400)
    /// - `REMEMBER_ME_TTL_SECONDS` (default: 2592000)
    /// - `REFRESH_WINDOW_SECONDS` (default: 7200)
    /// - `PASSWORD_HASH_MEMORY_KIB` (default: 19456)
    /// - `PASSWORD_HASH_ITERATIONS` (default: 2)
    /// - `LOGIN_MAX_FAILED_ATTEMPTS` (default: 5)
    /// - `LOGIN_LOCK_SECONDS` (default: 900)
    /// - `LOGIN_RATE_LIMIT_ATTEMPTS` (default: 20)
    /// - `LOGIN_RATE_LIMIT_WINDOW_SECONDS` (default: 300)
    /// - `LOGIN_RATE_LIMIT_BAN_SECONDS` (default: 900)
    pub fn from_env() -> Result<Self, AuthError> {
        let defaults: [(&str, i64); 10] = [
            ("session_ttl_seconds", 86_400),
            ("remember_me_ttl_seconds", 2_592_000),
            ("refresh_window_seconds", 7_200),
            ("password_hash_memory_kib", 19_456),
            ("password_hash_iterations", 2),
            ("login_max_failed_attempts", 5),
            ("login_lock_seconds", 900),
            ("login_rate_limit_attempts", 20),
            ("login_rate_limit_window_seconds", 300),
            ("login_rate_limit_ban_seconds", 900),
        ];

        let mut builder = config::Config::builder();
        for (key, value) in defaults {
            builder = builder
                .set_default(key, value)
                .map_err(|e| AuthError::Configuration(e.to_string()))?;
        }

        let config: AuthConfig = builder
            .add_source(config::Environment::default().try_parsing(true))
            .build()
            .and_then(|settings| settings.try_deserialize())
            .map_err(|e| AuthError::Configuration(format!("Invalid auth settings: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the services cannot run with
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.jwt_secret.len() < MIN_SECRET_LEN {
            return Err(AuthError::Configuration(format!(
                "JWT_SECRET must be at least {MIN_SECRET_LEN} bytes"
            )));
        }
        if self.session_ttl_seconds <= 0 || self.remember_me_ttl_seconds <= 0 {
            return Err(AuthError::Configuration(
                "session lifetimes must be positive".to_string(),
            ));
        }
        if self.login_max_failed_attempts <= 0 {
            return Err(AuthError::Configuration(
                "LOGIN_MAX_FAILED_ATTEMPTS must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn rate_limiter(&self) -> RateLimiterConfig {
        RateLimiterConfig {
            max_attempts: self.login_rate_limit_attempts,
            window_seconds: self.login_rate_limit_window_seconds,
            ban_duration_seconds: self.login_rate_limit_ban_seconds,
        }
    }

    /// Settings suitable for tests: a fixed secret and cheap hashing
    pub fn for_tests() -> Self {
        Self {
            jwt_secret: "test-secret-that-is-long-enough-for-hs256".to_string(),
            session_ttl_seconds: 86_400,
            remember_me_ttl_seconds: 2_592_000,
            refresh_window_seconds: 7_200,
            password_hash_memory_kib: 1_024,
            password_hash_iterations: 1,
            login_max_failed_attempts: 5,
            login_lock_seconds: 900,
            login_rate_limit_attempts: 1_000,
            login_rate_limit_window_seconds: 300,
            login_rate_limit_ban_seconds: 900,
        }
    }
}
