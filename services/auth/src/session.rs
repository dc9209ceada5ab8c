//! Session lifecycle on top of the shared store
//!
//! A session row is the source of truth for a token. It is created on login,
//! touched on every verified request, rotated on refresh and made inactive
//! on logout, password change or account deactivation.

use chrono::{DateTime, Duration, Utc};
use common::DynStore;
use common::models::{NewSession, Session};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{AuthError, AuthResult};
use crate::jwt::{Claims, TokenService, hash_token};

/// Request metadata recorded with a session
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl ClientInfo {
    /// Key used to rate limit login attempts from this client
    pub fn rate_key(&self, username: &str) -> String {
        format!(
            "{}:{}",
            self.ip_address.as_deref().unwrap_or("unknown"),
            username
        )
    }
}

/// A freshly signed token and the expiry of its session
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub session_id: Uuid,
    pub expires_at: DateTime<Utc>,
    /// Seconds until `expires_at` at the time of issue
    pub expires_in: i64,
}

/// Session manager for handling account sessions
#[derive(Clone)]
pub struct SessionManager {
    store: DynStore,
    tokens: TokenService,
    session_ttl: Duration,
    remember_me_ttl: Duration,
    refresh_window: Duration,
}

impl SessionManager {
    pub fn new(
        store: DynStore,
        tokens: TokenService,
        session_ttl: Duration,
        remember_me_ttl: Duration,
        refresh_window: Duration,
    ) -> Self {
        Self {
            store,
            tokens,
            session_ttl,
            remember_me_ttl,
            refresh_window,
        }
    }

    fn ttl(&self, remember_me: bool) -> Duration {
        if remember_me {
            self.remember_me_ttl
        } else {
            self.session_ttl
        }
    }

    /// Create a new session for an account and sign its token
    pub async fn create_session(
        &self,
        account_id: Uuid,
        remember_me: bool,
        client: &ClientInfo,
        now: DateTime<Utc>,
    ) -> AuthResult<IssuedToken> {
        let session_id = Uuid::new_v4();
        let expires_at = now + self.ttl(remember_me);
        let token = self.tokens.issue(account_id, session_id, now, expires_at)?;

        self.store
            .insert_session(&NewSession {
                id: session_id,
                account_id,
                token_hash: hash_token(&token),
                remember_me,
                ip_address: client.ip_address.clone(),
                user_agent: client.user_agent.clone(),
                created_at: now,
                expires_at,
            })
            .await?;

        info!("Created session {} for account {}", session_id, account_id);

        Ok(IssuedToken {
            token,
            session_id,
            expires_at,
            expires_in: (expires_at - now).num_seconds(),
        })
    }

    /// Resolve a token to its claims and live session
    ///
    /// A token whose hash no longer matches its session was rotated away and
    /// counts as revoked, even when the session itself is still valid.
    pub async fn authenticate(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> AuthResult<(Claims, Session)> {
        let claims = self.tokens.decode(token)?;

        let session = self
            .store
            .find_session(claims.sid)
            .await?
            .filter(|s| s.account_id == claims.sub)
            .ok_or(AuthError::TokenInvalid)?;

        if session.token_hash != hash_token(token) {
            return Err(AuthError::TokenRevoked);
        }
        if session.is_expired_at(now) {
            return Err(AuthError::TokenExpired);
        }
        if !session.is_active {
            return Err(AuthError::TokenRevoked);
        }

        Ok((claims, session))
    }

    /// Record activity on a verified session
    pub async fn touch(&self, session_id: Uuid, now: DateTime<Utc>) -> AuthResult<()> {
        self.store.touch_session(session_id, now).await?;
        Ok(())
    }

    /// Rotate the token of a verified session when it is close to expiry
    ///
    /// Returns `None` while more than the refresh window remains. The new
    /// expiry keeps the session's lifetime class.
    pub async fn refresh(
        &self,
        session: &Session,
        token: &str,
        now: DateTime<Utc>,
    ) -> AuthResult<Option<IssuedToken>> {
        if session.remaining_at(now) > self.refresh_window {
            debug!("Session {} not yet in its refresh window", session.id);
            return Ok(None);
        }

        let expires_at = now + self.ttl(session.remember_me);
        let new_token = self
            .tokens
            .issue(session.account_id, session.id, now, expires_at)?;

        let rotated = self
            .store
            .rotate_session(
                session.id,
                &hash_token(token),
                &hash_token(&new_token),
                expires_at,
                now,
            )
            .await?;

        if !rotated {
            return Err(AuthError::TokenRevoked);
        }

        info!("Rotated token for session {}", session.id);

        Ok(Some(IssuedToken {
            token: new_token,
            session_id: session.id,
            expires_at,
            expires_in: (expires_at - now).num_seconds(),
        }))
    }

    /// Deactivate the session a token belongs to
    ///
    /// Unreadable, expired and already revoked tokens are accepted and
    /// reported as `false`.
    pub async fn end_session(&self, token: &str) -> AuthResult<bool> {
        let Ok(claims) = self.tokens.decode(token) else {
            return Ok(false);
        };

        let Some(session) = self.store.find_session(claims.sid).await? else {
            return Ok(false);
        };

        if session.account_id != claims.sub || session.token_hash != hash_token(token) {
            return Ok(false);
        }

        let ended = self.store.deactivate_session(session.id).await?;
        if ended {
            info!("Ended session {} for account {}", session.id, session.account_id);
        }
        Ok(ended)
    }

    /// Deactivate every session of an account (logout from all devices)
    pub async fn end_all_sessions(&self, account_id: Uuid) -> AuthResult<u64> {
        let count = self.store.deactivate_account_sessions(account_id).await?;
        info!("Ended {} sessions for account {}", count, account_id);
        Ok(count)
    }

    pub async fn list_sessions(&self, account_id: Uuid) -> AuthResult<Vec<Session>> {
        Ok(self.store.list_account_sessions(account_id).await?)
    }
}
