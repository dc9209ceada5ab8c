//! Authentication payloads

use auth::IssuedToken;
use chrono::{DateTime, Utc};
use common::models::{Account, Employee, EmployeeId, Role, Session};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Public view of an account and its employee
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: Uuid,
    pub employee_id: EmployeeId,
    pub username: String,
    pub role: Role,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub email: String,
    pub department: Option<String>,
    pub position: Option<String>,
    pub last_login: Option<DateTime<Utc>>,
}

impl UserView {
    pub fn new(account: &Account, employee: &Employee) -> Self {
        Self {
            id: account.id,
            employee_id: account.employee_id.clone(),
            username: account.username.clone(),
            role: account.role,
            first_name: employee.first_name.clone(),
            last_name: employee.last_name.clone(),
            full_name: employee.full_name(),
            email: employee.email.clone(),
            department: employee.department.clone(),
            position: employee.position.clone(),
            last_login: account.last_login,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: UserView,
    pub token: String,
    pub expires_in: i64,
    pub expires_at: DateTime<Utc>,
}

impl LoginResponse {
    pub fn new(user: UserView, issued: IssuedToken) -> Self {
        Self {
            user,
            token: issued.token,
            expires_in: issued.expires_in,
            expires_at: issued.expires_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutResponse {
    pub logged_out: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub refreshed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<Option<IssuedToken>> for RefreshResponse {
    fn from(issued: Option<IssuedToken>) -> Self {
        match issued {
            Some(issued) => Self {
                refreshed: true,
                token: Some(issued.token),
                expires_at: Some(issued.expires_at),
            },
            None => Self {
                refreshed: false,
                token: None,
                expires_at: None,
            },
        }
    }
}

/// Current user with the session that authenticated the request
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub user: UserView,
    pub session_id: Uuid,
    pub remember_me: bool,
    pub expires_at: DateTime<Utc>,
}

impl MeResponse {
    pub fn new(account: &Account, employee: &Employee, session: &Session) -> Self {
        Self {
            user: UserView::new(account, employee),
            session_id: session.id,
            remember_me: session.remember_me,
            expires_at: session.expires_at,
        }
    }
}

/// One login session of the current account
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub id: Uuid,
    pub current: bool,
    pub is_active: bool,
    pub remember_me: bool,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl SessionView {
    pub fn new(session: Session, current: Uuid) -> Self {
        Self {
            id: session.id,
            current: session.id == current,
            is_active: session.is_active,
            remember_me: session.remember_me,
            ip_address: session.ip_address,
            user_agent: session.user_agent,
            created_at: session.created_at,
            expires_at: session.expires_at,
            last_activity: session.last_activity,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    #[serde(alias = "currentPassword")]
    pub current_password: String,
    #[serde(alias = "newPassword")]
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    #[serde(alias = "newPassword")]
    pub new_password: String,
}
