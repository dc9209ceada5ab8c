//! Employee records and their login accounts

use auth::AuthService;
use auth::validation::{
    PASSWORD_MIN_LEN, validate_email, validate_name, validate_password, validate_username,
};
use chrono::{DateTime, NaiveDate, Utc};
use common::DynStore;
use common::models::{
    Account, Employee, EmployeeFilter, EmployeeId, EmployeeStatus, EmployeeUpdate, Role,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::services::username::{derive_base, first_available};

/// Password stem for last names without ASCII letters or digits
const FALLBACK_STEM: &str = "user";

/// Attempts at a derived username before giving up on a race
const USERNAME_ATTEMPTS: usize = 3;
/// Explicit ids can shadow sequence values; skip at most this many
const SEQUENCE_ATTEMPTS: usize = 100;

/// Profile submitted to create an employee
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewEmployee {
    pub employee_id: Option<String>,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub department: Option<String>,
    pub position: Option<String>,
    pub hire_date: Option<NaiveDate>,
    #[serde(default)]
    pub hourly_rate: f64,
    pub username: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
}

/// Login details of a freshly created account
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    /// Present only when the password was generated; shown once
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatedEmployee {
    pub employee: Employee,
    pub credentials: Credentials,
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn validate_rate(rate: f64) -> ApiResult<()> {
    if !rate.is_finite() || rate < 0.0 {
        return Err(ApiError::invalid_field(
            "hourly_rate",
            "Hourly rate must be a non-negative number",
        ));
    }
    Ok(())
}

/// Employee data service
#[derive(Clone)]
pub struct EmployeeService {
    store: DynStore,
    auth: AuthService,
    default_password_suffix: String,
}

impl EmployeeService {
    pub fn new(store: DynStore, auth: AuthService, default_password_suffix: String) -> Self {
        Self {
            store,
            auth,
            default_password_suffix,
        }
    }

    /// Default password: the last name's letters and digits, lower-cased,
    /// followed by the configured suffix
    ///
    /// Short names are repeated until the result reaches the minimum
    /// password length, so `Api` gives `apiapi123!`.
    pub fn default_password(&self, last_name: &str) -> String {
        let stem: String = last_name
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .map(|c| c.to_ascii_lowercase())
            .collect();
        let stem = if stem.is_empty() { FALLBACK_STEM.to_string() } else { stem };

        let suffix = &self.default_password_suffix;
        let mut head = stem.clone();
        while head.len() + suffix.chars().count() < PASSWORD_MIN_LEN {
            head.push_str(&stem);
        }
        format!("{head}{suffix}")
    }

    /// Create an employee together with its account
    pub async fn create_employee(
        &self,
        input: NewEmployee,
        now: DateTime<Utc>,
    ) -> ApiResult<CreatedEmployee> {
        let first_name = input.first_name.trim().to_string();
        let last_name = input.last_name.trim().to_string();
        let middle_name = clean(input.middle_name);
        let email = input.email.trim().to_lowercase();

        validate_name("first_name", &first_name)?;
        validate_name("last_name", &last_name)?;
        if let Some(middle) = &middle_name {
            validate_name("middle_name", middle)?;
        }
        validate_email(&email)?;
        validate_rate(input.hourly_rate)?;

        if self.store.find_employee_by_email(&email).await?.is_some() {
            return Err(ApiError::conflict(
                "CONFLICT",
                "An employee with this email already exists",
                Some("email"),
            ));
        }

        let employee_id = match input.employee_id.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => {
                let id = EmployeeId::parse(raw)?;
                if self.store.find_employee(&id).await?.is_some() {
                    return Err(ApiError::conflict(
                        "CONFLICT",
                        format!("Employee {id} already exists"),
                        Some("employee_id"),
                    ));
                }
                id
            }
            _ => self.next_free_id().await?,
        };

        let (password, generated) = match clean(input.password) {
            Some(password) => {
                validate_password(&password)?;
                (password, false)
            }
            None => (self.default_password(&last_name), true),
        };
        let password_hash = self.auth.hash_password(&password).await?;
        let role = input.role.unwrap_or(Role::Employee);

        let employee = Employee {
            employee_id,
            first_name,
            middle_name,
            last_name,
            email,
            phone: clean(input.phone),
            address: clean(input.address),
            department: clean(input.department),
            position: clean(input.position),
            hire_date: input.hire_date.unwrap_or_else(|| now.date_naive()),
            hourly_rate: input.hourly_rate,
            status: EmployeeStatus::Active,
            created_at: now,
            updated_at: now,
        };

        let account = match clean(input.username) {
            Some(username) => {
                let username = username.to_lowercase();
                validate_username(&username)?;
                let account = Account::new(
                    employee.employee_id.clone(),
                    username,
                    password_hash,
                    role,
                    now,
                );
                self.store
                    .create_employee_with_account(&employee, &account)
                    .await?;
                account
            }
            None => self.insert_with_derived_username(&employee, password_hash, role, now).await?,
        };

        info!(
            "Created employee {} with account {}",
            employee.employee_id, account.username
        );

        Ok(CreatedEmployee {
            employee,
            credentials: Credentials {
                username: account.username,
                password: generated.then_some(password),
                role,
            },
        })
    }

    async fn next_free_id(&self) -> ApiResult<EmployeeId> {
        for _ in 0..SEQUENCE_ATTEMPTS {
            let id = EmployeeId::from_number(self.store.next_employee_number().await?);
            if self.store.find_employee(&id).await?.is_none() {
                return Ok(id);
            }
        }
        Err(ApiError::Internal(
            "employee number sequence is exhausted by explicit ids".to_string(),
        ))
    }

    async fn insert_with_derived_username(
        &self,
        employee: &Employee,
        password_hash: String,
        role: Role,
        now: DateTime<Utc>,
    ) -> ApiResult<Account> {
        let base = derive_base(
            &employee.first_name,
            employee.middle_name.as_deref(),
            &employee.last_name,
        );
        let taken = self.store.usernames_with_prefix(&base).await?;

        for attempt in 0..USERNAME_ATTEMPTS {
            let account = Account::new(
                employee.employee_id.clone(),
                first_available(&base, &taken, attempt),
                password_hash.clone(),
                role,
                now,
            );

            match self
                .store
                .create_employee_with_account(employee, &account)
                .await
            {
                Ok(()) => return Ok(account),
                Err(e) if e.is_conflict_on("username") => {
                    warn!(
                        "Username {} was taken concurrently, retrying",
                        account.username
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(ApiError::conflict(
            "CONFLICT",
            "Could not allocate a unique username",
            Some("username"),
        ))
    }

    pub async fn get_employee(&self, id: &EmployeeId) -> ApiResult<Employee> {
        self.store
            .find_employee(id)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("Employee {id}")))
    }

    pub async fn list_employees(&self, filter: &EmployeeFilter) -> ApiResult<Vec<Employee>> {
        Ok(self.store.list_employees(filter).await?)
    }

    /// Apply a partial update to the profile
    pub async fn update_employee(
        &self,
        id: &EmployeeId,
        mut patch: EmployeeUpdate,
        now: DateTime<Utc>,
    ) -> ApiResult<Employee> {
        if patch.is_empty() {
            return Err(ApiError::validation("No fields to update"));
        }

        if let Some(first) = &patch.first_name {
            validate_name("first_name", first)?;
            patch.first_name = Some(first.trim().to_string());
        }
        if let Some(last) = &patch.last_name {
            validate_name("last_name", last)?;
            patch.last_name = Some(last.trim().to_string());
        }
        if let Some(middle) = patch.middle_name.as_deref().map(str::trim) {
            if !middle.is_empty() {
                validate_name("middle_name", middle)?;
            }
        }
        if let Some(rate) = patch.hourly_rate {
            validate_rate(rate)?;
        }

        let mut employee = self.get_employee(id).await?;

        if let Some(email) = &patch.email {
            let email = email.trim().to_lowercase();
            validate_email(&email)?;
            if let Some(other) = self.store.find_employee_by_email(&email).await? {
                if &other.employee_id != id {
                    return Err(ApiError::conflict(
                        "CONFLICT",
                        "An employee with this email already exists",
                        Some("email"),
                    ));
                }
            }
            patch.email = Some(email);
        }

        patch.apply(&mut employee, now);
        if !self.store.update_employee(&employee).await? {
            return Err(ApiError::not_found(format!("Employee {id}")));
        }

        info!("Updated employee {}", id);
        Ok(employee)
    }

    /// Mark an employee inactive or terminated and shut their account
    pub async fn soft_delete_employee(
        &self,
        id: &EmployeeId,
        status: Option<EmployeeStatus>,
        now: DateTime<Utc>,
    ) -> ApiResult<Employee> {
        let status = status.unwrap_or(EmployeeStatus::Inactive);
        if status == EmployeeStatus::Active {
            return Err(ApiError::invalid_field(
                "status",
                "Status must be inactive or terminated",
            ));
        }

        if !self.store.deactivate_employee(id, status, now).await? {
            return Err(ApiError::not_found(format!("Employee {id}")));
        }

        info!("Employee {} set to {}", id, status);
        self.get_employee(id).await
    }

    /// Administrative password reset for an employee's account
    pub async fn reset_password(
        &self,
        id: &EmployeeId,
        new_password: &str,
        now: DateTime<Utc>,
    ) -> ApiResult<()> {
        let account = self
            .store
            .find_account_by_employee(id)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("Account for employee {id}")))?;

        self.auth
            .reset_password(account.id, new_password, now)
            .await?;
        Ok(())
    }

    pub async fn account_of(&self, id: &EmployeeId) -> ApiResult<Option<Account>> {
        Ok(self.store.find_account_by_employee(id).await?)
    }
}
