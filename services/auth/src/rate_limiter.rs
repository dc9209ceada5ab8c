//! Rate limiter for login attempts
//!
//! Keys are chosen by the caller (client address plus username for logins).
//! Counting happens in process memory, so limits are per instance.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::warn;

use crate::error::{AuthError, AuthResult};

/// Rate limiter configuration
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Maximum number of attempts allowed per window
    pub max_attempts: u32,
    /// Time window in seconds
    pub window_seconds: u64,
    /// Ban duration in seconds
    pub ban_duration_seconds: u64,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            max_attempts: 20,
            window_seconds: 300,
            ban_duration_seconds: 900,
        }
    }
}

#[derive(Debug)]
struct Entry {
    attempts: u32,
    window_start: Instant,
    ban_expires: Option<Instant>,
}

/// Rate limiter
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimiterConfig,
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

impl RateLimiter {
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Count one attempt for `key`, failing with `RateLimited` when over budget
    pub async fn check(&self, key: &str) -> AuthResult<()> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        let window = Duration::from_secs(self.config.window_seconds);

        let entry = entries.entry(key.to_string()).or_insert(Entry {
            attempts: 0,
            window_start: now,
            ban_expires: None,
        });

        match entry.ban_expires {
            Some(until) if now < until => return Err(AuthError::RateLimited),
            Some(_) => {
                entry.attempts = 0;
                entry.window_start = now;
                entry.ban_expires = None;
            }
            None => {}
        }

        if now.duration_since(entry.window_start) >= window {
            entry.attempts = 0;
            entry.window_start = now;
        }

        if entry.attempts >= self.config.max_attempts {
            entry.ban_expires = Some(now + Duration::from_secs(self.config.ban_duration_seconds));
            warn!(
                "Rate limited {} for {} seconds",
                key, self.config.ban_duration_seconds
            );
            return Err(AuthError::RateLimited);
        }

        entry.attempts += 1;
        Ok(())
    }

    /// Forget the attempts recorded for `key`
    pub async fn reset(&self, key: &str) {
        self.entries.lock().await.remove(key);
    }

    /// Drop entries whose window and ban have both elapsed
    pub async fn purge_idle(&self) -> usize {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        let window = Duration::from_secs(self.config.window_seconds);
        let before = entries.len();
        entries.retain(|_, entry| {
            entry.ban_expires.is_some_and(|until| now < until)
                || now.duration_since(entry.window_start) < window
        });
        before - entries.len()
    }

    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }
}
