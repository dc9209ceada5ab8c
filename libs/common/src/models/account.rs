//! Account model: the login identity linked to an employee

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{EmployeeId, text_enum};

text_enum! {
    /// Access role of an account
    Role, "role" {
        Admin => "admin",
        Manager => "manager",
        Employee => "employee",
    }
}

impl Role {
    /// Admins and managers may manage other employees' data
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Admin | Role::Manager)
    }
}

/// Account entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub employee_id: EmployeeId,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub is_active: bool,
    pub failed_login_attempts: i32,
    pub locked_until: Option<DateTime<Utc>>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Build a fresh, active account
    pub fn new(
        employee_id: EmployeeId,
        username: String,
        password_hash: String,
        role: Role,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            employee_id,
            username,
            password_hash,
            role,
            is_active: true,
            failed_login_attempts: 0,
            locked_until: None,
            last_login: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether a lock is still in force at `now`
    pub fn is_locked_at(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| until > now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_lock_window() {
        let now = Utc::now();
        let mut account = Account::new(
            EmployeeId::from_number(1),
            "jdoe".into(),
            "hash".into(),
            Role::Employee,
            now,
        );
        assert!(!account.is_locked_at(now));
        account.locked_until = Some(now + Duration::minutes(15));
        assert!(account.is_locked_at(now));
        assert!(!account.is_locked_at(now + Duration::minutes(15)));
    }

    #[test]
    fn test_password_hash_is_never_serialized() {
        let account = Account::new(
            EmployeeId::from_number(1),
            "jdoe".into(),
            "secret-hash".into(),
            Role::Admin,
            Utc::now(),
        );
        let json = serde_json::to_string(&account).unwrap();
        assert!(!json.contains("secret-hash"));
        assert!(json.contains("\"role\":\"admin\""));
    }
}
