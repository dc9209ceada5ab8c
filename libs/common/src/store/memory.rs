//! In-memory implementation of [`Store`]
//!
//! All tables live behind a single `tokio::sync::RwLock`, so each trait
//! method is atomic exactly like a single statement or transaction in the
//! PostgreSQL store. Data is lost when the store is dropped.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::Store;
use crate::error::{DatabaseError, DatabaseResult};
use crate::models::{
    Account, AttendanceFilter, AttendanceRecord, Employee, EmployeeFilter, EmployeeId,
    EmployeeStatus, NewSession, PayrollFilter, PayrollRecord, PayrollStatus, Session, Setting,
};

#[derive(Debug, Default)]
struct Tables {
    employee_seq: u64,
    employees: HashMap<EmployeeId, Employee>,
    accounts: HashMap<Uuid, Account>,
    sessions: HashMap<Uuid, Session>,
    attendance: HashMap<Uuid, AttendanceRecord>,
    payroll: HashMap<Uuid, PayrollRecord>,
    settings: HashMap<String, Setting>,
}

impl Tables {
    fn department_of(&self, id: &EmployeeId) -> Option<&str> {
        self.employees.get(id).and_then(|e| e.department.as_deref())
    }

    fn email_taken(&self, email: &str, except: Option<&EmployeeId>) -> bool {
        self.employees
            .values()
            .any(|e| e.email.eq_ignore_ascii_case(email) && Some(&e.employee_id) != except)
    }

    fn attendance_taken(&self, record: &AttendanceRecord) -> bool {
        self.attendance.values().any(|r| {
            r.id != record.id
                && r.employee_id == record.employee_id
                && r.work_date == record.work_date
        })
    }

    /// Overwrite the stored record in place when `guard` accepts it
    fn replace_attendance(
        &mut self,
        record: &AttendanceRecord,
        guard: impl Fn(&AttendanceRecord) -> bool,
    ) -> bool {
        match self.attendance.get_mut(&record.id) {
            Some(stored) if guard(&*stored) => {
                let employee_id = stored.employee_id.clone();
                let created_at = stored.created_at;
                *stored = record.clone();
                stored.employee_id = employee_id;
                stored.created_at = created_at;
                true
            }
            _ => false,
        }
    }
}

/// Store keeping every table in process memory
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of attendance rows, across all employees
    pub async fn attendance_count(&self) -> usize {
        self.tables.read().await.attendance.len()
    }

    /// Number of employee rows
    pub async fn employee_count(&self) -> usize {
        self.tables.read().await.employees.len()
    }
}

fn sorted<T, K: Ord>(mut items: Vec<T>, key: impl Fn(&T) -> K) -> Vec<T> {
    items.sort_by_key(key);
    items
}

#[async_trait]
impl Store for MemoryStore {
    async fn health_check(&self) -> DatabaseResult<bool> {
        Ok(true)
    }

    async fn next_employee_number(&self) -> DatabaseResult<u64> {
        let mut tables = self.tables.write().await;
        tables.employee_seq += 1;
        Ok(tables.employee_seq)
    }

    async fn create_employee_with_account(
        &self,
        employee: &Employee,
        account: &Account,
    ) -> DatabaseResult<()> {
        let mut tables = self.tables.write().await;

        // Validate every constraint before touching any table
        if tables.employees.contains_key(&employee.employee_id) {
            return Err(DatabaseError::conflict("employee_id"));
        }
        if tables.email_taken(&employee.email, None) {
            return Err(DatabaseError::conflict("email"));
        }
        if account.employee_id != employee.employee_id {
            return Err(DatabaseError::Configuration(
                "account must reference the employee being created".to_string(),
            ));
        }
        if tables.accounts.values().any(|a| a.username == account.username) {
            return Err(DatabaseError::conflict("username"));
        }

        tables
            .employees
            .insert(employee.employee_id.clone(), employee.clone());
        tables.accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn find_employee(&self, id: &EmployeeId) -> DatabaseResult<Option<Employee>> {
        Ok(self.tables.read().await.employees.get(id).cloned())
    }

    async fn find_employee_by_email(&self, email: &str) -> DatabaseResult<Option<Employee>> {
        Ok(self
            .tables
            .read()
            .await
            .employees
            .values()
            .find(|e| e.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn list_employees(&self, filter: &EmployeeFilter) -> DatabaseResult<Vec<Employee>> {
        let tables = self.tables.read().await;
        let items = tables
            .employees
            .values()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        Ok(sorted(items, |e: &Employee| e.employee_id.clone()))
    }

    async fn update_employee(&self, employee: &Employee) -> DatabaseResult<bool> {
        let mut tables = self.tables.write().await;
        if !tables.employees.contains_key(&employee.employee_id) {
            return Ok(false);
        }
        if tables.email_taken(&employee.email, Some(&employee.employee_id)) {
            return Err(DatabaseError::conflict("email"));
        }

        if let Some(stored) = tables.employees.get_mut(&employee.employee_id) {
            let status = stored.status;
            let created_at = stored.created_at;
            *stored = employee.clone();
            stored.status = status;
            stored.created_at = created_at;
        }
        Ok(true)
    }

    async fn deactivate_employee(
        &self,
        id: &EmployeeId,
        status: EmployeeStatus,
        now: DateTime<Utc>,
    ) -> DatabaseResult<bool> {
        let mut tables = self.tables.write().await;
        let Some(employee) = tables.employees.get_mut(id) else {
            return Ok(false);
        };
        employee.status = status;
        employee.updated_at = now;

        let mut account_ids = Vec::new();
        for account in tables.accounts.values_mut().filter(|a| &a.employee_id == id) {
            account.is_active = false;
            account.updated_at = now;
            account_ids.push(account.id);
        }
        for session in tables
            .sessions
            .values_mut()
            .filter(|s| account_ids.contains(&s.account_id))
        {
            session.is_active = false;
        }
        Ok(true)
    }

    async fn find_account(&self, id: Uuid) -> DatabaseResult<Option<Account>> {
        Ok(self.tables.read().await.accounts.get(&id).cloned())
    }

    async fn find_account_by_username(&self, username: &str) -> DatabaseResult<Option<Account>> {
        Ok(self
            .tables
            .read()
            .await
            .accounts
            .values()
            .find(|a| a.username == username)
            .cloned())
    }

    async fn find_account_by_employee(&self, id: &EmployeeId) -> DatabaseResult<Option<Account>> {
        Ok(self
            .tables
            .read()
            .await
            .accounts
            .values()
            .find(|a| &a.employee_id == id)
            .cloned())
    }

    async fn usernames_with_prefix(&self, base: &str) -> DatabaseResult<Vec<String>> {
        Ok(self
            .tables
            .read()
            .await
            .accounts
            .values()
            .filter(|a| a.username.starts_with(base))
            .map(|a| a.username.clone())
            .collect())
    }

    async fn record_failed_login(
        &self,
        account_id: Uuid,
        now: DateTime<Utc>,
    ) -> DatabaseResult<i32> {
        let mut tables = self.tables.write().await;
        let account = tables
            .accounts
            .get_mut(&account_id)
            .ok_or(DatabaseError::Query(sqlx::Error::RowNotFound))?;
        account.failed_login_attempts += 1;
        account.updated_at = now;
        Ok(account.failed_login_attempts)
    }

    async fn lock_account(
        &self,
        account_id: Uuid,
        until: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> DatabaseResult<()> {
        if let Some(account) = self.tables.write().await.accounts.get_mut(&account_id) {
            account.locked_until = Some(until);
            account.updated_at = now;
        }
        Ok(())
    }

    async fn reset_failed_logins(
        &self,
        account_id: Uuid,
        now: DateTime<Utc>,
    ) -> DatabaseResult<()> {
        if let Some(account) = self.tables.write().await.accounts.get_mut(&account_id) {
            account.failed_login_attempts = 0;
            account.locked_until = None;
            account.updated_at = now;
        }
        Ok(())
    }

    async fn record_successful_login(
        &self,
        account_id: Uuid,
        now: DateTime<Utc>,
    ) -> DatabaseResult<()> {
        if let Some(account) = self.tables.write().await.accounts.get_mut(&account_id) {
            account.failed_login_attempts = 0;
            account.locked_until = None;
            account.last_login = Some(now);
            account.updated_at = now;
        }
        Ok(())
    }

    async fn release_expired_locks(&self, now: DateTime<Utc>) -> DatabaseResult<u64> {
        let mut released = 0;
        for account in self.tables.write().await.accounts.values_mut() {
            if account.locked_until.is_some_and(|until| until <= now) {
                account.locked_until = None;
                account.failed_login_attempts = 0;
                account.updated_at = now;
                released += 1;
            }
        }
        Ok(released)
    }

    async fn update_password(
        &self,
        account_id: Uuid,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> DatabaseResult<bool> {
        match self.tables.write().await.accounts.get_mut(&account_id) {
            Some(account) => {
                account.password_hash = password_hash.to_string();
                account.updated_at = now;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_session(&self, session: &NewSession) -> DatabaseResult<Session> {
        let mut tables = self.tables.write().await;
        if !tables.accounts.contains_key(&session.account_id) {
            return Err(DatabaseError::Query(sqlx::Error::RowNotFound));
        }
        if tables
            .sessions
            .values()
            .any(|s| s.token_hash == session.token_hash)
        {
            return Err(DatabaseError::conflict("token_hash"));
        }
        let stored = session.clone().into_session();
        tables.sessions.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn find_session(&self, id: Uuid) -> DatabaseResult<Option<Session>> {
        Ok(self.tables.read().await.sessions.get(&id).cloned())
    }

    async fn touch_session(&self, id: Uuid, now: DateTime<Utc>) -> DatabaseResult<()> {
        if let Some(session) = self.tables.write().await.sessions.get_mut(&id) {
            if session.is_active {
                session.last_activity = now;
            }
        }
        Ok(())
    }

    async fn rotate_session(
        &self,
        id: Uuid,
        old_hash: &str,
        new_hash: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> DatabaseResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.sessions.get_mut(&id) {
            Some(session)
                if session.is_active && session.token_hash == old_hash && session.expires_at > now =>
            {
                session.token_hash = new_hash.to_string();
                session.expires_at = expires_at;
                session.last_activity = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn deactivate_session(&self, id: Uuid) -> DatabaseResult<bool> {
        match self.tables.write().await.sessions.get_mut(&id) {
            Some(session) if session.is_active => {
                session.is_active = false;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn deactivate_account_sessions(&self, account_id: Uuid) -> DatabaseResult<u64> {
        let mut count = 0;
        for session in self
            .tables
            .write()
            .await
            .sessions
            .values_mut()
            .filter(|s| s.account_id == account_id && s.is_active)
        {
            session.is_active = false;
            count += 1;
        }
        Ok(count)
    }

    async fn list_account_sessions(&self, account_id: Uuid) -> DatabaseResult<Vec<Session>> {
        let tables = self.tables.read().await;
        let mut items: Vec<Session> = tables
            .sessions
            .values()
            .filter(|s| s.account_id == account_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }

    async fn expire_sessions(&self, now: DateTime<Utc>) -> DatabaseResult<u64> {
        let mut count = 0;
        for session in self
            .tables
            .write()
            .await
            .sessions
            .values_mut()
            .filter(|s| s.is_active && s.expires_at <= now)
        {
            session.is_active = false;
            count += 1;
        }
        Ok(count)
    }

    async fn purge_sessions(&self, before: DateTime<Utc>) -> DatabaseResult<u64> {
        let mut tables = self.tables.write().await;
        let initial = tables.sessions.len();
        tables
            .sessions
            .retain(|_, s| !((!s.is_active || s.expires_at <= before) && s.created_at < before));
        Ok((initial - tables.sessions.len()) as u64)
    }

    async fn insert_attendance(&self, record: &AttendanceRecord) -> DatabaseResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.employees.contains_key(&record.employee_id) {
            return Err(DatabaseError::Query(sqlx::Error::RowNotFound));
        }
        if tables.attendance_taken(record) {
            return Err(DatabaseError::conflict("work_date"));
        }
        tables.attendance.insert(record.id, record.clone());
        Ok(())
    }

    async fn update_attendance(&self, record: &AttendanceRecord) -> DatabaseResult<bool> {
        let mut tables = self.tables.write().await;
        if !tables.attendance.contains_key(&record.id) {
            return Ok(false);
        }
        if tables.attendance_taken(record) {
            return Err(DatabaseError::conflict("work_date"));
        }
        Ok(tables.replace_attendance(record, |_| true))
    }

    async fn start_attendance(&self, record: &AttendanceRecord) -> DatabaseResult<bool> {
        let mut tables = self.tables.write().await;
        Ok(tables.replace_attendance(record, |stored| stored.time_in.is_none()))
    }

    async fn finish_attendance(&self, record: &AttendanceRecord) -> DatabaseResult<bool> {
        let mut tables = self.tables.write().await;
        Ok(tables.replace_attendance(record, |stored| {
            stored.time_in.is_some() && stored.time_out.is_none()
        }))
    }

    async fn find_attendance(&self, id: Uuid) -> DatabaseResult<Option<AttendanceRecord>> {
        Ok(self.tables.read().await.attendance.get(&id).cloned())
    }

    async fn find_attendance_for_date(
        &self,
        employee_id: &EmployeeId,
        date: NaiveDate,
    ) -> DatabaseResult<Option<AttendanceRecord>> {
        Ok(self
            .tables
            .read()
            .await
            .attendance
            .values()
            .find(|r| &r.employee_id == employee_id && r.work_date == date)
            .cloned())
    }

    async fn list_attendance(
        &self,
        filter: &AttendanceFilter,
    ) -> DatabaseResult<Vec<AttendanceRecord>> {
        let tables = self.tables.read().await;
        let mut items: Vec<AttendanceRecord> = tables
            .attendance
            .values()
            .filter(|r| filter.matches(r, tables.department_of(&r.employee_id)))
            .cloned()
            .collect();
        items.sort_by(|a, b| {
            b.work_date
                .cmp(&a.work_date)
                .then_with(|| a.employee_id.cmp(&b.employee_id))
        });
        Ok(items)
    }

    async fn delete_attendance(&self, id: Uuid) -> DatabaseResult<bool> {
        Ok(self.tables.write().await.attendance.remove(&id).is_some())
    }

    async fn save_payroll_draft(&self, record: &PayrollRecord) -> DatabaseResult<PayrollRecord> {
        let mut tables = self.tables.write().await;
        if !tables.employees.contains_key(&record.employee_id) {
            return Err(DatabaseError::Query(sqlx::Error::RowNotFound));
        }

        let existing = tables.payroll.values_mut().find(|p| {
            p.employee_id == record.employee_id
                && p.pay_period_start == record.pay_period_start
                && p.pay_period_end == record.pay_period_end
        });

        match existing {
            Some(stored) if stored.status != PayrollStatus::Draft => {
                Err(DatabaseError::conflict("pay_period"))
            }
            Some(stored) => {
                let id = stored.id;
                let created_at = stored.created_at;
                *stored = record.clone();
                stored.id = id;
                stored.created_at = created_at;
                stored.status = PayrollStatus::Draft;
                Ok(stored.clone())
            }
            None => {
                let mut stored = record.clone();
                stored.status = PayrollStatus::Draft;
                tables.payroll.insert(stored.id, stored.clone());
                Ok(stored)
            }
        }
    }

    async fn find_payroll(&self, id: Uuid) -> DatabaseResult<Option<PayrollRecord>> {
        Ok(self.tables.read().await.payroll.get(&id).cloned())
    }

    async fn list_payroll(&self, filter: &PayrollFilter) -> DatabaseResult<Vec<PayrollRecord>> {
        let tables = self.tables.read().await;
        let mut items: Vec<PayrollRecord> = tables
            .payroll
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        items.sort_by(|a, b| {
            b.pay_period_start
                .cmp(&a.pay_period_start)
                .then_with(|| a.employee_id.cmp(&b.employee_id))
        });
        Ok(items)
    }

    async fn update_payroll_status(
        &self,
        id: Uuid,
        expected: PayrollStatus,
        status: PayrollStatus,
        now: DateTime<Utc>,
    ) -> DatabaseResult<bool> {
        match self.tables.write().await.payroll.get_mut(&id) {
            Some(record) if record.status == expected => {
                record.status = status;
                record.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_settings(&self) -> DatabaseResult<Vec<Setting>> {
        let tables = self.tables.read().await;
        let items = tables.settings.values().cloned().collect();
        Ok(sorted(items, |s: &Setting| s.key.clone()))
    }

    async fn put_setting(
        &self,
        key: &str,
        value: &str,
        now: DateTime<Utc>,
    ) -> DatabaseResult<Setting> {
        let setting = Setting {
            key: key.to_string(),
            value: value.to_string(),
            updated_at: now,
        };
        self.tables
            .write()
            .await
            .settings
            .insert(key.to_string(), setting.clone());
        Ok(setting)
    }
}
