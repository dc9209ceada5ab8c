//! Authentication service
//!
//! Owns the login policy (lockout and rate limiting), token verification and
//! password management. Every operation takes `now` explicitly so callers
//! and tests control the clock.

use chrono::{DateTime, Duration, Utc};
use common::DynStore;
use common::models::{Account, Employee, Session};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::{AuthError, AuthResult};
use crate::jwt::TokenService;
use crate::password::PasswordService;
use crate::rate_limiter::RateLimiter;
use crate::session::{ClientInfo, IssuedToken, SessionManager};
use crate::validation::validate_password;

/// Credentials submitted to [`AuthService::login`]
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub remember_me: bool,
}

/// Result of a successful login
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub issued: IssuedToken,
    pub account: Account,
    pub employee: Employee,
}

/// The identity behind a verified token
#[derive(Debug, Clone)]
pub struct AuthenticatedAccount {
    pub account: Account,
    pub employee: Employee,
    pub session: Session,
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    store: DynStore,
    sessions: SessionManager,
    passwords: PasswordService,
    limiter: RateLimiter,
    max_failed_attempts: i32,
    lock_duration: Duration,
}

impl AuthService {
    pub fn new(store: DynStore, config: &AuthConfig) -> AuthResult<Self> {
        config.validate()?;

        let tokens = TokenService::new(&config.jwt_secret)?;
        let sessions = SessionManager::new(
            store.clone(),
            tokens,
            Duration::seconds(config.session_ttl_seconds),
            Duration::seconds(config.remember_me_ttl_seconds),
            Duration::seconds(config.refresh_window_seconds),
        );
        let passwords = PasswordService::new(
            config.password_hash_memory_kib,
            config.password_hash_iterations,
        )?;

        Ok(Self {
            store,
            sessions,
            passwords,
            limiter: RateLimiter::new(config.rate_limiter()),
            max_failed_attempts: config.login_max_failed_attempts,
            lock_duration: Duration::seconds(config.login_lock_seconds),
        })
    }

    /// Authenticate a username and password and open a session
    pub async fn login(
        &self,
        request: &LoginRequest,
        client: &ClientInfo,
        now: DateTime<Utc>,
    ) -> AuthResult<LoginOutcome> {
        let username = request.username.trim().to_lowercase();
        if username.is_empty() {
            return Err(AuthError::validation("username", "Username is required"));
        }
        if request.password.is_empty() {
            return Err(AuthError::validation("password", "Password is required"));
        }

        let rate_key = client.rate_key(&username);
        self.limiter.check(&rate_key).await?;

        let Some(mut account) = self.store.find_account_by_username(&username).await? else {
            warn!("Login attempt for unknown user {}", username);
            return Err(AuthError::InvalidCredentials);
        };
        if !account.is_active {
            warn!("Login attempt for inactive account {}", account.id);
            return Err(AuthError::InvalidCredentials);
        }

        if account.locked_until.is_some() {
            if account.is_locked_at(now) {
                warn!("Login attempt for locked account {}", account.id);
                return Err(AuthError::AccountLocked);
            }
            self.store.reset_failed_logins(account.id, now).await?;
            account.failed_login_attempts = 0;
            account.locked_until = None;
        }

        if !self
            .passwords
            .verify(&request.password, &account.password_hash)
            .await?
        {
            let attempts = self.store.record_failed_login(account.id, now).await?;
            if attempts >= self.max_failed_attempts {
                self.store
                    .lock_account(account.id, now + self.lock_duration, now)
                    .await?;
                warn!(
                    "Locked account {} after {} failed logins",
                    account.id, attempts
                );
            } else {
                warn!("Failed login {} for account {}", attempts, account.id);
            }
            return Err(AuthError::InvalidCredentials);
        }

        let employee = self
            .store
            .find_employee(&account.employee_id)
            .await?
            .filter(Employee::is_active)
            .ok_or(AuthError::InvalidCredentials)?;

        self.store.record_successful_login(account.id, now).await?;
        self.limiter.reset(&rate_key).await;

        let issued = self
            .sessions
            .create_session(account.id, request.remember_me, client, now)
            .await?;

        account.failed_login_attempts = 0;
        account.last_login = Some(now);
        info!("Account {} logged in", account.id);

        Ok(LoginOutcome {
            issued,
            account,
            employee,
        })
    }

    /// Resolve a bearer token to its account, employee and session
    pub async fn verify(&self, token: &str, now: DateTime<Utc>) -> AuthResult<AuthenticatedAccount> {
        let (claims, session) = self.sessions.authenticate(token, now).await?;

        let account = self
            .store
            .find_account(claims.sub)
            .await?
            .ok_or(AuthError::TokenInvalid)?;
        if !account.is_active {
            return Err(AuthError::TokenRevoked);
        }

        let employee = self
            .store
            .find_employee(&account.employee_id)
            .await?
            .ok_or(AuthError::TokenInvalid)?;

        self.sessions.touch(session.id, now).await?;

        Ok(AuthenticatedAccount {
            account,
            employee,
            session,
        })
    }

    /// Rotate a token that is within its refresh window
    pub async fn refresh(&self, token: &str, now: DateTime<Utc>) -> AuthResult<Option<IssuedToken>> {
        let authenticated = self.verify(token, now).await?;
        self.sessions
            .refresh(&authenticated.session, token, now)
            .await
    }

    /// End the session behind a token; safe to repeat
    pub async fn logout(&self, token: &str) -> AuthResult<bool> {
        self.sessions.end_session(token).await
    }

    /// Change a password after checking the current one
    pub async fn change_password(
        &self,
        account_id: Uuid,
        current_password: &str,
        new_password: &str,
        now: DateTime<Utc>,
    ) -> AuthResult<()> {
        let account = self
            .store
            .find_account(account_id)
            .await?
            .ok_or(AuthError::AccountNotFound)?;

        if !self
            .passwords
            .verify(current_password, &account.password_hash)
            .await?
        {
            warn!("Password change with wrong current password for {}", account_id);
            return Err(AuthError::InvalidCredentials);
        }
        if current_password == new_password {
            return Err(AuthError::validation(
                "new_password",
                "New password must differ from the current one",
            ));
        }

        self.store_new_password(account_id, new_password, now).await
    }

    /// Administrative reset without the current password
    pub async fn reset_password(
        &self,
        account_id: Uuid,
        new_password: &str,
        now: DateTime<Utc>,
    ) -> AuthResult<()> {
        self.store_new_password(account_id, new_password, now).await
    }

    async fn store_new_password(
        &self,
        account_id: Uuid,
        new_password: &str,
        now: DateTime<Utc>,
    ) -> AuthResult<()> {
        validate_password(new_password).map_err(|e| match e {
            AuthError::Validation { message, .. } => AuthError::validation("new_password", message),
            other => other,
        })?;

        let hash = self.passwords.hash(new_password).await?;
        if !self.store.update_password(account_id, &hash, now).await? {
            return Err(AuthError::AccountNotFound);
        }

        self.sessions.end_all_sessions(account_id).await?;
        info!("Password updated for account {}", account_id);
        Ok(())
    }

    /// Hash a password with the configured cost
    pub async fn hash_password(&self, password: &str) -> AuthResult<String> {
        self.passwords.hash(password).await
    }

    pub async fn sessions_of(&self, account_id: Uuid) -> AuthResult<Vec<Session>> {
        self.sessions.list_sessions(account_id).await
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.limiter
    }
}
