//! Authentication middleware for bearer tokens

use axum::{
    extract::State,
    http::{HeaderMap, Request, header},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use common::models::{EmployeeId, Role};
use tracing::debug;
use uuid::Uuid;

use crate::{error::ApiError, state::AppState};

/// Authenticated user information
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub account_id: Uuid,
    pub employee_id: EmployeeId,
    pub username: String,
    pub role: Role,
    pub session_id: Uuid,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::forbidden())
        }
    }

    /// Admins and managers
    pub fn require_staff(&self) -> Result<(), ApiError> {
        if self.role.is_staff() {
            Ok(())
        } else {
            Err(ApiError::forbidden())
        }
    }

    /// Staff may act on anyone; employees only on themselves
    pub fn can_access(&self, employee_id: &EmployeeId) -> bool {
        self.role.is_staff() || &self.employee_id == employee_id
    }

    pub fn require_access(&self, employee_id: &EmployeeId) -> Result<(), ApiError> {
        if self.can_access(employee_id) {
            Ok(())
        } else {
            Err(ApiError::forbidden())
        }
    }
}

/// The token of a `Bearer` Authorization header, if any
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Authentication middleware
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(req.headers()).ok_or(ApiError::TokenMissing)?;

    let authenticated = state.auth.verify(token, Utc::now()).await.map_err(|e| {
        debug!("Rejected bearer token: {}", e);
        ApiError::from(e)
    })?;

    let user = AuthUser {
        account_id: authenticated.account.id,
        employee_id: authenticated.account.employee_id.clone(),
        username: authenticated.account.username.clone(),
        role: authenticated.account.role,
        session_id: authenticated.session.id,
    };

    // Insert the user into the request extensions
    req.extensions_mut().insert(user);
    req.extensions_mut().insert(authenticated);

    Ok(next.run(req).await)
}
