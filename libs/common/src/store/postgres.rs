//! PostgreSQL implementation of [`Store`]

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder, Row, postgres::PgRow};
use tracing::{error, info};
use uuid::Uuid;

use super::Store;
use crate::error::{DatabaseError, DatabaseResult};
use crate::models::{
    Account, AttendanceFilter, AttendanceRecord, Employee, EmployeeFilter, EmployeeId,
    EmployeeStatus, NewSession, PayrollFilter, PayrollRecord, PayrollStatus, Session, Setting,
};

const EMPLOYEE_COLUMNS: &str = "employee_id, first_name, middle_name, last_name, email, phone, \
     address, department, position, hire_date, hourly_rate, status, created_at, updated_at";

const ACCOUNT_COLUMNS: &str = "id, employee_id, username, password_hash, role, is_active, \
     failed_login_attempts, locked_until, last_login, created_at, updated_at";

const SESSION_COLUMNS: &str = "id, account_id, token_hash, remember_me, is_active, ip_address, \
     user_agent, created_at, expires_at, last_activity";

const ATTENDANCE_COLUMNS: &str = "a.id, a.employee_id, a.work_date, a.time_in, a.time_out, \
     a.break_minutes, a.hours_worked, a.overtime_hours, a.status, a.notes, a.created_at, a.updated_at";

const PAYROLL_COLUMNS: &str = "id, employee_id, pay_period_start, pay_period_end, days_worked, \
     regular_hours, overtime_hours, hourly_rate, regular_pay, overtime_pay, bonuses, allowances, \
     gross_pay, deductions, tax, net_pay, status, created_at, updated_at";

/// Store backed by a PostgreSQL connection pool
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a new store over an existing pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Write every mutable attendance column when `guard` also holds
    async fn write_attendance(
        &self,
        record: &AttendanceRecord,
        guard: &str,
    ) -> DatabaseResult<bool> {
        let result = sqlx::query(&format!(
            r#"
            UPDATE attendance_records
            SET work_date = $2, time_in = $3, time_out = $4, break_minutes = $5,
                hours_worked = $6, overtime_hours = $7, status = $8, notes = $9, updated_at = $10
            WHERE id = $1 {guard}
            "#
        ))
        .bind(record.id)
        .bind(record.work_date)
        .bind(record.time_in)
        .bind(record.time_out)
        .bind(record.break_minutes)
        .bind(record.hours_worked)
        .bind(record.overtime_hours)
        .bind(record.status.as_str())
        .bind(&record.notes)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from_query)?;

        Ok(result.rows_affected() > 0)
    }
}

fn parse_text<T>(row: &PgRow, column: &str) -> DatabaseResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw: String = row.try_get(column).map_err(DatabaseError::Query)?;
    raw.parse::<T>()
        .map_err(|e| DatabaseError::Decode(format!("{column}: {e}")))
}

fn employee_from_row(row: &PgRow) -> DatabaseResult<Employee> {
    Ok(Employee {
        employee_id: row.try_get("employee_id").map_err(DatabaseError::Query)?,
        first_name: row.try_get("first_name").map_err(DatabaseError::Query)?,
        middle_name: row.try_get("middle_name").map_err(DatabaseError::Query)?,
        last_name: row.try_get("last_name").map_err(DatabaseError::Query)?,
        email: row.try_get("email").map_err(DatabaseError::Query)?,
        phone: row.try_get("phone").map_err(DatabaseError::Query)?,
        address: row.try_get("address").map_err(DatabaseError::Query)?,
        department: row.try_get("department").map_err(DatabaseError::Query)?,
        position: row.try_get("position").map_err(DatabaseError::Query)?,
        hire_date: row.try_get("hire_date").map_err(DatabaseError::Query)?,
        hourly_rate: row.try_get("hourly_rate").map_err(DatabaseError::Query)?,
        status: parse_text(row, "status")?,
        created_at: row.try_get("created_at").map_err(DatabaseError::Query)?,
        updated_at: row.try_get("updated_at").map_err(DatabaseError::Query)?,
    })
}

fn account_from_row(row: &PgRow) -> DatabaseResult<Account> {
    Ok(Account {
        id: row.try_get("id").map_err(DatabaseError::Query)?,
        employee_id: row.try_get("employee_id").map_err(DatabaseError::Query)?,
        username: row.try_get("username").map_err(DatabaseError::Query)?,
        password_hash: row.try_get("password_hash").map_err(DatabaseError::Query)?,
        role: parse_text(row, "role")?,
        is_active: row.try_get("is_active").map_err(DatabaseError::Query)?,
        failed_login_attempts: row
            .try_get("failed_login_attempts")
            .map_err(DatabaseError::Query)?,
        locked_until: row.try_get("locked_until").map_err(DatabaseError::Query)?,
        last_login: row.try_get("last_login").map_err(DatabaseError::Query)?,
        created_at: row.try_get("created_at").map_err(DatabaseError::Query)?,
        updated_at: row.try_get("updated_at").map_err(DatabaseError::Query)?,
    })
}

fn session_from_row(row: &PgRow) -> DatabaseResult<Session> {
    Ok(Session {
        id: row.try_get("id").map_err(DatabaseError::Query)?,
        account_id: row.try_get("account_id").map_err(DatabaseError::Query)?,
        token_hash: row.try_get("token_hash").map_err(DatabaseError::Query)?,
        remember_me: row.try_get("remember_me").map_err(DatabaseError::Query)?,
        is_active: row.try_get("is_active").map_err(DatabaseError::Query)?,
        ip_address: row.try_get("ip_address").map_err(DatabaseError::Query)?,
        user_agent: row.try_get("user_agent").map_err(DatabaseError::Query)?,
        created_at: row.try_get("created_at").map_err(DatabaseError::Query)?,
        expires_at: row.try_get("expires_at").map_err(DatabaseError::Query)?,
        last_activity: row.try_get("last_activity").map_err(DatabaseError::Query)?,
    })
}

fn attendance_from_row(row: &PgRow) -> DatabaseResult<AttendanceRecord> {
    Ok(AttendanceRecord {
        id: row.try_get("id").map_err(DatabaseError::Query)?,
        employee_id: row.try_get("employee_id").map_err(DatabaseError::Query)?,
        work_date: row.try_get("work_date").map_err(DatabaseError::Query)?,
        time_in: row.try_get("time_in").map_err(DatabaseError::Query)?,
        time_out: row.try_get("time_out").map_err(DatabaseError::Query)?,
        break_minutes: row.try_get("break_minutes").map_err(DatabaseError::Query)?,
        hours_worked: row.try_get("hours_worked").map_err(DatabaseError::Query)?,
        overtime_hours: row.try_get("overtime_hours").map_err(DatabaseError::Query)?,
        status: parse_text(row, "status")?,
        notes: row.try_get("notes").map_err(DatabaseError::Query)?,
        created_at: row.try_get("created_at").map_err(DatabaseError::Query)?,
        updated_at: row.try_get("updated_at").map_err(DatabaseError::Query)?,
    })
}

fn payroll_from_row(row: &PgRow) -> DatabaseResult<PayrollRecord> {
    Ok(PayrollRecord {
        id: row.try_get("id").map_err(DatabaseError::Query)?,
        employee_id: row.try_get("employee_id").map_err(DatabaseError::Query)?,
        pay_period_start: row.try_get("pay_period_start").map_err(DatabaseError::Query)?,
        pay_period_end: row.try_get("pay_period_end").map_err(DatabaseError::Query)?,
        days_worked: row.try_get("days_worked").map_err(DatabaseError::Query)?,
        regular_hours: row.try_get("regular_hours").map_err(DatabaseError::Query)?,
        overtime_hours: row.try_get("overtime_hours").map_err(DatabaseError::Query)?,
        hourly_rate: row.try_get("hourly_rate").map_err(DatabaseError::Query)?,
        regular_pay: row.try_get("regular_pay").map_err(DatabaseError::Query)?,
        overtime_pay: row.try_get("overtime_pay").map_err(DatabaseError::Query)?,
        bonuses: row.try_get("bonuses").map_err(DatabaseError::Query)?,
        allowances: row.try_get("allowances").map_err(DatabaseError::Query)?,
        gross_pay: row.try_get("gross_pay").map_err(DatabaseError::Query)?,
        deductions: row.try_get("deductions").map_err(DatabaseError::Query)?,
        tax: row.try_get("tax").map_err(DatabaseError::Query)?,
        net_pay: row.try_get("net_pay").map_err(DatabaseError::Query)?,
        status: parse_text(row, "status")?,
        created_at: row.try_get("created_at").map_err(DatabaseError::Query)?,
        updated_at: row.try_get("updated_at").map_err(DatabaseError::Query)?,
    })
}

#[async_trait]
impl Store for PgStore {
    async fn health_check(&self) -> DatabaseResult<bool> {
        crate::database::health_check(&self.pool).await
    }

    async fn next_employee_number(&self) -> DatabaseResult<u64> {
        let value: i64 = sqlx::query_scalar("SELECT nextval('employee_number_seq')")
            .fetch_one(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        u64::try_from(value).map_err(|_| DatabaseError::Decode(format!("sequence value {value}")))
    }

    async fn create_employee_with_account(
        &self,
        employee: &Employee,
        account: &Account,
    ) -> DatabaseResult<()> {
        let mut tx = self.pool.begin().await.map_err(DatabaseError::Connection)?;

        sqlx::query(
            r#"
            INSERT INTO employees (employee_id, first_name, middle_name, last_name, email, phone,
                                   address, department, position, hire_date, hourly_rate, status,
                                   created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(&employee.employee_id)
        .bind(&employee.first_name)
        .bind(&employee.middle_name)
        .bind(&employee.last_name)
        .bind(&employee.email)
        .bind(&employee.phone)
        .bind(&employee.address)
        .bind(&employee.department)
        .bind(&employee.position)
        .bind(employee.hire_date)
        .bind(employee.hourly_rate)
        .bind(employee.status.as_str())
        .bind(employee.created_at)
        .bind(employee.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(DatabaseError::from_query)?;

        sqlx::query(
            r#"
            INSERT INTO accounts (id, employee_id, username, password_hash, role, is_active,
                                  failed_login_attempts, locked_until, last_login,
                                  created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(account.id)
        .bind(&account.employee_id)
        .bind(&account.username)
        .bind(&account.password_hash)
        .bind(account.role.as_str())
        .bind(account.is_active)
        .bind(account.failed_login_attempts)
        .bind(account.locked_until)
        .bind(account.last_login)
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(DatabaseError::from_query)?;

        // Dropping `tx` on any early return above rolls both inserts back
        tx.commit().await.map_err(DatabaseError::Query)?;

        info!(
            "Created employee {} with account {}",
            employee.employee_id, account.username
        );
        Ok(())
    }

    async fn find_employee(&self, id: &EmployeeId) -> DatabaseResult<Option<Employee>> {
        let row = sqlx::query(&format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE employee_id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        row.as_ref().map(employee_from_row).transpose()
    }

    async fn find_employee_by_email(&self, email: &str) -> DatabaseResult<Option<Employee>> {
        let row = sqlx::query(&format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE LOWER(email) = LOWER($1)"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        row.as_ref().map(employee_from_row).transpose()
    }

    async fn list_employees(&self, filter: &EmployeeFilter) -> DatabaseResult<Vec<Employee>> {
        let mut query: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE TRUE"));

        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(department) = &filter.department {
            query
                .push(" AND LOWER(department) = LOWER(")
                .push_bind(department.clone())
                .push(")");
        }
        if let Some(search) = &filter.search {
            let pattern = format!("%{}%", search.to_lowercase());
            query
                .push(" AND LOWER(CONCAT_WS(' ', first_name, middle_name, last_name, email, employee_id)) LIKE ")
                .push_bind(pattern);
        }
        query.push(" ORDER BY employee_id");

        let rows = query
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        rows.iter().map(employee_from_row).collect()
    }

    async fn update_employee(&self, employee: &Employee) -> DatabaseResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE employees
            SET first_name = $2, middle_name = $3, last_name = $4, email = $5, phone = $6,
                address = $7, department = $8, position = $9, hire_date = $10,
                hourly_rate = $11, updated_at = $12
            WHERE employee_id = $1
            "#,
        )
        .bind(&employee.employee_id)
        .bind(&employee.first_name)
        .bind(&employee.middle_name)
        .bind(&employee.last_name)
        .bind(&employee.email)
        .bind(&employee.phone)
        .bind(&employee.address)
        .bind(&employee.department)
        .bind(&employee.position)
        .bind(employee.hire_date)
        .bind(employee.hourly_rate)
        .bind(employee.updated_at)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from_query)?;

        Ok(result.rows_affected() > 0)
    }

    async fn deactivate_employee(
        &self,
        id: &EmployeeId,
        status: EmployeeStatus,
        now: DateTime<Utc>,
    ) -> DatabaseResult<bool> {
        let mut tx = self.pool.begin().await.map_err(DatabaseError::Connection)?;

        let updated = sqlx::query(
            "UPDATE employees SET status = $2, updated_at = $3 WHERE employee_id = $1",
        )
        .bind(id)
        .bind(status.as_str())
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(DatabaseError::Query)?;

        if updated.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query("UPDATE accounts SET is_active = FALSE, updated_at = $2 WHERE employee_id = $1")
            .bind(id)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(DatabaseError::Query)?;

        let sessions = sqlx::query(
            r#"
            UPDATE sessions SET is_active = FALSE
            WHERE is_active AND account_id IN (SELECT id FROM accounts WHERE employee_id = $1)
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(DatabaseError::Query)?;

        tx.commit().await.map_err(DatabaseError::Query)?;

        info!(
            "Employee {} set to {}, {} session(s) revoked",
            id,
            status,
            sessions.rows_affected()
        );
        Ok(true)
    }

    async fn find_account(&self, id: Uuid) -> DatabaseResult<Option<Account>> {
        let row = sqlx::query(&format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        row.as_ref().map(account_from_row).transpose()
    }

    async fn find_account_by_username(&self, username: &str) -> DatabaseResult<Option<Account>> {
        let row = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        row.as_ref().map(account_from_row).transpose()
    }

    async fn find_account_by_employee(&self, id: &EmployeeId) -> DatabaseResult<Option<Account>> {
        let row = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE employee_id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        row.as_ref().map(account_from_row).transpose()
    }

    async fn usernames_with_prefix(&self, base: &str) -> DatabaseResult<Vec<String>> {
        // `base` only ever holds [a-z0-9_], but `_` is a LIKE wildcard
        let pattern = format!("{}%", base.replace('_', "\\_"));
        sqlx::query_scalar("SELECT username FROM accounts WHERE username LIKE $1")
            .bind(pattern)
            .fetch_all(&self.pool)
            .await
            .map_err(DatabaseError::Query)
    }

    async fn record_failed_login(
        &self,
        account_id: Uuid,
        now: DateTime<Utc>,
    ) -> DatabaseResult<i32> {
        sqlx::query_scalar(
            r#"
            UPDATE accounts
            SET failed_login_attempts = failed_login_attempts + 1, updated_at = $2
            WHERE id = $1
            RETURNING failed_login_attempts
            "#,
        )
        .bind(account_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::Query)
    }

    async fn lock_account(
        &self,
        account_id: Uuid,
        until: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> DatabaseResult<()> {
        sqlx::query("UPDATE accounts SET locked_until = $2, updated_at = $3 WHERE id = $1")
            .bind(account_id)
            .bind(until)
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;
        Ok(())
    }

    async fn reset_failed_logins(
        &self,
        account_id: Uuid,
        now: DateTime<Utc>,
    ) -> DatabaseResult<()> {
        sqlx::query(
            r#"
            UPDATE accounts
            SET failed_login_attempts = 0, locked_until = NULL, updated_at = $2
            WHERE id = $1
            "#,
        )
        .bind(account_id)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;
        Ok(())
    }

    async fn record_successful_login(
        &self,
        account_id: Uuid,
        now: DateTime<Utc>,
    ) -> DatabaseResult<()> {
        sqlx::query(
            r#"
            UPDATE accounts
            SET failed_login_attempts = 0, locked_until = NULL, last_login = $2, updated_at = $2
            WHERE id = $1
            "#,
        )
        .bind(account_id)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;
        Ok(())
    }

    async fn release_expired_locks(&self, now: DateTime<Utc>) -> DatabaseResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET failed_login_attempts = 0, locked_until = NULL, updated_at = $1
            WHERE locked_until IS NOT NULL AND locked_until <= $1
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        Ok(result.rows_affected())
    }

    async fn update_password(
        &self,
        account_id: Uuid,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> DatabaseResult<bool> {
        let result =
            sqlx::query("UPDATE accounts SET password_hash = $2, updated_at = $3 WHERE id = $1")
                .bind(account_id)
                .bind(password_hash)
                .bind(now)
                .execute(&self.pool)
                .await
                .map_err(DatabaseError::Query)?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_session(&self, session: &NewSession) -> DatabaseResult<Session> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO sessions (id, account_id, token_hash, remember_me, is_active, ip_address,
                                  user_agent, created_at, expires_at, last_activity)
            VALUES ($1, $2, $3, $4, TRUE, $5, $6, $7, $8, $7)
            RETURNING {SESSION_COLUMNS}
            "#
        ))
        .bind(session.id)
        .bind(session.account_id)
        .bind(&session.token_hash)
        .bind(session.remember_me)
        .bind(&session.ip_address)
        .bind(&session.user_agent)
        .bind(session.created_at)
        .bind(session.expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from_query)?;

        session_from_row(&row)
    }

    async fn find_session(&self, id: Uuid) -> DatabaseResult<Option<Session>> {
        let row = sqlx::query(&format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        row.as_ref().map(session_from_row).transpose()
    }

    async fn touch_session(&self, id: Uuid, now: DateTime<Utc>) -> DatabaseResult<()> {
        sqlx::query("UPDATE sessions SET last_activity = $2 WHERE id = $1 AND is_active")
            .bind(id)
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;
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
        let result = sqlx::query(
            r#"
            UPDATE sessions
            SET token_hash = $3, expires_at = $4, last_activity = $5
            WHERE id = $1 AND token_hash = $2 AND is_active AND expires_at > $5
            "#,
        )
        .bind(id)
        .bind(old_hash)
        .bind(new_hash)
        .bind(expires_at)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from_query)?;

        Ok(result.rows_affected() > 0)
    }

    async fn deactivate_session(&self, id: Uuid) -> DatabaseResult<bool> {
        let result = sqlx::query("UPDATE sessions SET is_active = FALSE WHERE id = $1 AND is_active")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        Ok(result.rows_affected() > 0)
    }

    async fn deactivate_account_sessions(&self, account_id: Uuid) -> DatabaseResult<u64> {
        let result = sqlx::query(
            "UPDATE sessions SET is_active = FALSE WHERE account_id = $1 AND is_active",
        )
        .bind(account_id)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        Ok(result.rows_affected())
    }

    async fn list_account_sessions(&self, account_id: Uuid) -> DatabaseResult<Vec<Session>> {
        let rows = sqlx::query(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE account_id = $1 ORDER BY created_at DESC"
        ))
        .bind(account_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        rows.iter().map(session_from_row).collect()
    }

    async fn expire_sessions(&self, now: DateTime<Utc>) -> DatabaseResult<u64> {
        let result =
            sqlx::query("UPDATE sessions SET is_active = FALSE WHERE is_active AND expires_at <= $1")
                .bind(now)
                .execute(&self.pool)
                .await
                .map_err(DatabaseError::Query)?;

        Ok(result.rows_affected())
    }

    async fn purge_sessions(&self, before: DateTime<Utc>) -> DatabaseResult<u64> {
        let result = sqlx::query(
            "DELETE FROM sessions WHERE (NOT is_active OR expires_at <= $1) AND created_at < $1",
        )
        .bind(before)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        Ok(result.rows_affected())
    }

    async fn insert_attendance(&self, record: &AttendanceRecord) -> DatabaseResult<()> {
        sqlx::query(
            r#"
            INSERT INTO attendance_records (id, employee_id, work_date, time_in, time_out,
                                            break_minutes, hours_worked, overtime_hours, status,
                                            notes, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(record.id)
        .bind(&record.employee_id)
        .bind(record.work_date)
        .bind(record.time_in)
        .bind(record.time_out)
        .bind(record.break_minutes)
        .bind(record.hours_worked)
        .bind(record.overtime_hours)
        .bind(record.status.as_str())
        .bind(&record.notes)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            let err = DatabaseError::from_query(e);
            if !matches!(err, DatabaseError::Conflict { .. }) {
                error!("Failed to insert attendance record: {}", err);
            }
            err
        })?;

        Ok(())
    }

    async fn update_attendance(&self, record: &AttendanceRecord) -> DatabaseResult<bool> {
        self.write_attendance(record, "").await
    }

    async fn start_attendance(&self, record: &AttendanceRecord) -> DatabaseResult<bool> {
        self.write_attendance(record, "AND time_in IS NULL").await
    }

    async fn finish_attendance(&self, record: &AttendanceRecord) -> DatabaseResult<bool> {
        self.write_attendance(record, "AND time_in IS NOT NULL AND time_out IS NULL")
            .await
    }

    async fn find_attendance(&self, id: Uuid) -> DatabaseResult<Option<AttendanceRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance_records a WHERE a.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        row.as_ref().map(attendance_from_row).transpose()
    }

    async fn find_attendance_for_date(
        &self,
        employee_id: &EmployeeId,
        date: NaiveDate,
    ) -> DatabaseResult<Option<AttendanceRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance_records a \
             WHERE a.employee_id = $1 AND a.work_date = $2"
        ))
        .bind(employee_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        row.as_ref().map(attendance_from_row).transpose()
    }

    async fn list_attendance(
        &self,
        filter: &AttendanceFilter,
    ) -> DatabaseResult<Vec<AttendanceRecord>> {
        let mut query: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance_records a \
             JOIN employees e ON e.employee_id = a.employee_id WHERE TRUE"
        ));

        if let Some(id) = &filter.employee_id {
            query.push(" AND a.employee_id = ").push_bind(id.clone());
        }
        if let Some(from) = filter.from {
            query.push(" AND a.work_date >= ").push_bind(from);
        }
        if let Some(to) = filter.to {
            query.push(" AND a.work_date <= ").push_bind(to);
        }
        if let Some(status) = filter.status {
            query.push(" AND a.status = ").push_bind(status.as_str());
        }
        if let Some(department) = &filter.department {
            query
                .push(" AND LOWER(e.department) = LOWER(")
                .push_bind(department.clone())
                .push(")");
        }
        query.push(" ORDER BY a.work_date DESC, a.employee_id");

        let rows = query
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        rows.iter().map(attendance_from_row).collect()
    }

    async fn delete_attendance(&self, id: Uuid) -> DatabaseResult<bool> {
        let result = sqlx::query("DELETE FROM attendance_records WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        Ok(result.rows_affected() > 0)
    }

    async fn save_payroll_draft(&self, record: &PayrollRecord) -> DatabaseResult<PayrollRecord> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO payroll_records (id, employee_id, pay_period_start, pay_period_end,
                                         days_worked, regular_hours, overtime_hours, hourly_rate,
                                         regular_pay, overtime_pay, bonuses, allowances, gross_pay,
                                         deductions, tax, net_pay, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                    'draft', $17, $18)
            ON CONFLICT ON CONSTRAINT payroll_records_employee_period_key DO UPDATE SET
                days_worked = EXCLUDED.days_worked,
                regular_hours = EXCLUDED.regular_hours,
                overtime_hours = EXCLUDED.overtime_hours,
                hourly_rate = EXCLUDED.hourly_rate,
                regular_pay = EXCLUDED.regular_pay,
                overtime_pay = EXCLUDED.overtime_pay,
                bonuses = EXCLUDED.bonuses,
                allowances = EXCLUDED.allowances,
                gross_pay = EXCLUDED.gross_pay,
                deductions = EXCLUDED.deductions,
                tax = EXCLUDED.tax,
                net_pay = EXCLUDED.net_pay,
                updated_at = EXCLUDED.updated_at
            WHERE payroll_records.status = 'draft'
            RETURNING {PAYROLL_COLUMNS}
            "#
        ))
        .bind(record.id)
        .bind(&record.employee_id)
        .bind(record.pay_period_start)
        .bind(record.pay_period_end)
        .bind(record.days_worked)
        .bind(record.regular_hours)
        .bind(record.overtime_hours)
        .bind(record.hourly_rate)
        .bind(record.regular_pay)
        .bind(record.overtime_pay)
        .bind(record.bonuses)
        .bind(record.allowances)
        .bind(record.gross_pay)
        .bind(record.deductions)
        .bind(record.tax)
        .bind(record.net_pay)
        .bind(record.created_at)
        .bind(record.updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_query)?;

        match row {
            Some(row) => payroll_from_row(&row),
            // The conflicting row exists but is no longer a draft
            None => Err(DatabaseError::conflict("pay_period")),
        }
    }

    async fn find_payroll(&self, id: Uuid) -> DatabaseResult<Option<PayrollRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {PAYROLL_COLUMNS} FROM payroll_records WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        row.as_ref().map(payroll_from_row).transpose()
    }

    async fn list_payroll(&self, filter: &PayrollFilter) -> DatabaseResult<Vec<PayrollRecord>> {
        let mut query: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {PAYROLL_COLUMNS} FROM payroll_records WHERE TRUE"
        ));

        if let Some(id) = &filter.employee_id {
            query.push(" AND employee_id = ").push_bind(id.clone());
        }
        if let Some(from) = filter.from {
            query.push(" AND pay_period_end >= ").push_bind(from);
        }
        if let Some(to) = filter.to {
            query.push(" AND pay_period_start <= ").push_bind(to);
        }
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status.as_str());
        }
        query.push(" ORDER BY pay_period_start DESC, employee_id");

        let rows = query
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        rows.iter().map(payroll_from_row).collect()
    }

    async fn update_payroll_status(
        &self,
        id: Uuid,
        expected: PayrollStatus,
        status: PayrollStatus,
        now: DateTime<Utc>,
    ) -> DatabaseResult<bool> {
        let result = sqlx::query(
            "UPDATE payroll_records SET status = $2, updated_at = $3 WHERE id = $1 AND status = $4",
        )
        .bind(id)
        .bind(status.as_str())
        .bind(now)
        .bind(expected.as_str())
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_settings(&self) -> DatabaseResult<Vec<Setting>> {
        let rows = sqlx::query("SELECT key, value, updated_at FROM settings ORDER BY key")
            .fetch_all(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        rows.iter()
            .map(|row| {
                Ok(Setting {
                    key: row.try_get("key").map_err(DatabaseError::Query)?,
                    value: row.try_get("value").map_err(DatabaseError::Query)?,
                    updated_at: row.try_get("updated_at").map_err(DatabaseError::Query)?,
                })
            })
            .collect()
    }

    async fn put_setting(
        &self,
        key: &str,
        value: &str,
        now: DateTime<Utc>,
    ) -> DatabaseResult<Setting> {
        sqlx::query(
            r#"
            INSERT INTO settings (key, value, updated_at) VALUES ($1, $2, $3)
            ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::Query)?;

        Ok(Setting {
            key: key.to_string(),
            value: value.to_string(),
            updated_at: now,
        })
    }
}
