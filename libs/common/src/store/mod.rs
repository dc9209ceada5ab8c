//! Persistence boundary shared by the auth and api services
//!
//! [`Store`] is the single interface every service talks to. Two
//! implementations exist: [`PgStore`] over a PostgreSQL pool and
//! [`MemoryStore`], a lock-guarded in-process copy used by tests and local
//! tooling. Both enforce the same uniqueness and transactional guarantees.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::error::DatabaseResult;
use crate::models::{
    Account, AttendanceFilter, AttendanceRecord, Employee, EmployeeFilter, EmployeeId,
    EmployeeStatus, NewSession, PayrollFilter, PayrollRecord, PayrollStatus, Session, Setting,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Shared handle to a store implementation
pub type DynStore = Arc<dyn Store>;

#[async_trait]
pub trait Store: Send + Sync {
    /// Whether the backing store answers
    async fn health_check(&self) -> DatabaseResult<bool>;

    // ----- employees -----

    /// Next value of the employee number sequence
    async fn next_employee_number(&self) -> DatabaseResult<u64>;

    /// Insert an employee and its account atomically
    ///
    /// Fails with `Conflict` on duplicate employee id, email or username; in
    /// that case neither row is persisted.
    async fn create_employee_with_account(
        &self,
        employee: &Employee,
        account: &Account,
    ) -> DatabaseResult<()>;

    async fn find_employee(&self, id: &EmployeeId) -> DatabaseResult<Option<Employee>>;

    async fn find_employee_by_email(&self, email: &str) -> DatabaseResult<Option<Employee>>;

    async fn list_employees(&self, filter: &EmployeeFilter) -> DatabaseResult<Vec<Employee>>;

    /// Overwrite the mutable profile fields; false when the id is unknown
    async fn update_employee(&self, employee: &Employee) -> DatabaseResult<bool>;

    /// Set a non-active status and deactivate the account and its sessions
    async fn deactivate_employee(
        &self,
        id: &EmployeeId,
        status: EmployeeStatus,
        now: DateTime<Utc>,
    ) -> DatabaseResult<bool>;

    // ----- accounts -----

    async fn find_account(&self, id: Uuid) -> DatabaseResult<Option<Account>>;

    async fn find_account_by_username(&self, username: &str) -> DatabaseResult<Option<Account>>;

    async fn find_account_by_employee(&self, id: &EmployeeId) -> DatabaseResult<Option<Account>>;

    /// Usernames equal to `base` or starting with it
    async fn usernames_with_prefix(&self, base: &str) -> DatabaseResult<Vec<String>>;

    /// Atomically bump the failed-login counter, returning the new value
    async fn record_failed_login(&self, account_id: Uuid, now: DateTime<Utc>)
    -> DatabaseResult<i32>;

    async fn lock_account(
        &self,
        account_id: Uuid,
        until: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> DatabaseResult<()>;

    /// Clear the counter and any lock
    async fn reset_failed_logins(&self, account_id: Uuid, now: DateTime<Utc>)
    -> DatabaseResult<()>;

    /// Clear the counter and lock and stamp `last_login`
    async fn record_successful_login(
        &self,
        account_id: Uuid,
        now: DateTime<Utc>,
    ) -> DatabaseResult<()>;

    /// Clear every lock that has elapsed; returns the number released
    async fn release_expired_locks(&self, now: DateTime<Utc>) -> DatabaseResult<u64>;

    async fn update_password(
        &self,
        account_id: Uuid,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> DatabaseResult<bool>;

    // ----- sessions -----

    async fn insert_session(&self, session: &NewSession) -> DatabaseResult<Session>;

    async fn find_session(&self, id: Uuid) -> DatabaseResult<Option<Session>>;

    async fn touch_session(&self, id: Uuid, now: DateTime<Utc>) -> DatabaseResult<()>;

    /// Swap the token hash and expiry of an active session
    ///
    /// Only applies when the stored hash still equals `old_hash`, so two
    /// concurrent refreshes of the same token cannot both win.
    async fn rotate_session(
        &self,
        id: Uuid,
        old_hash: &str,
        new_hash: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> DatabaseResult<bool>;

    /// Mark one session inactive; false if it was already inactive or unknown
    async fn deactivate_session(&self, id: Uuid) -> DatabaseResult<bool>;

    async fn deactivate_account_sessions(&self, account_id: Uuid) -> DatabaseResult<u64>;

    async fn list_account_sessions(&self, account_id: Uuid) -> DatabaseResult<Vec<Session>>;

    /// Mark active sessions past their expiry inactive
    async fn expire_sessions(&self, now: DateTime<Utc>) -> DatabaseResult<u64>;

    /// Delete inactive or expired sessions created before `before`
    async fn purge_sessions(&self, before: DateTime<Utc>) -> DatabaseResult<u64>;

    // ----- attendance -----

    /// Insert a record; `Conflict { field: "work_date" }` if one exists
    async fn insert_attendance(&self, record: &AttendanceRecord) -> DatabaseResult<()>;

    async fn update_attendance(&self, record: &AttendanceRecord) -> DatabaseResult<bool>;

    /// Update a record that has no `time_in` yet; `false` otherwise
    async fn start_attendance(&self, record: &AttendanceRecord) -> DatabaseResult<bool>;

    /// Update a record that is clocked in but not out; `false` otherwise
    async fn finish_attendance(&self, record: &AttendanceRecord) -> DatabaseResult<bool>;

    async fn find_attendance(&self, id: Uuid) -> DatabaseResult<Option<AttendanceRecord>>;

    async fn find_attendance_for_date(
        &self,
        employee_id: &EmployeeId,
        date: NaiveDate,
    ) -> DatabaseResult<Option<AttendanceRecord>>;

    async fn list_attendance(
        &self,
        filter: &AttendanceFilter,
    ) -> DatabaseResult<Vec<AttendanceRecord>>;

    async fn delete_attendance(&self, id: Uuid) -> DatabaseResult<bool>;

    // ----- payroll -----

    /// Insert or overwrite the draft for (employee, period)
    ///
    /// Returns the stored record (keeping the original id when a draft is
    /// overwritten). Fails with `Conflict { field: "pay_period" }` when the
    /// period already has a processed or paid record.
    async fn save_payroll_draft(&self, record: &PayrollRecord) -> DatabaseResult<PayrollRecord>;

    async fn find_payroll(&self, id: Uuid) -> DatabaseResult<Option<PayrollRecord>>;

    async fn list_payroll(&self, filter: &PayrollFilter) -> DatabaseResult<Vec<PayrollRecord>>;

    /// Moves a record from `expected` to `status`; `false` when the record is
    /// missing or no longer in `expected`.
    async fn update_payroll_status(
        &self,
        id: Uuid,
        expected: PayrollStatus,
        status: PayrollStatus,
        now: DateTime<Utc>,
    ) -> DatabaseResult<bool>;

    // ----- settings -----

    async fn list_settings(&self) -> DatabaseResult<Vec<Setting>>;

    async fn put_setting(
        &self,
        key: &str,
        value: &str,
        now: DateTime<Utc>,
    ) -> DatabaseResult<Setting>;
}
