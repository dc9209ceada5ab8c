//! Behavioral tests for the in-memory store
//!
//! These pin down the uniqueness and atomicity guarantees the services rely
//! on, which the PostgreSQL store enforces through constraints.

use chrono::{Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use common::models::{
    Account, AttendanceFilter, AttendanceRecord, AttendanceStatus, Employee, EmployeeFilter,
    EmployeeId, EmployeeStatus, NewSession, PayrollFilter, PayrollRecord, PayrollStatus,
    Role,
};
use common::{DatabaseError, MemoryStore, Store};
use uuid::Uuid;

fn now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap()
}

fn employee(number: u64, email: &str, department: &str) -> Employee {
    Employee {
        employee_id: EmployeeId::from_number(number),
        first_name: "Juan".into(),
        middle_name: None,
        last_name: "Dela Cruz".into(),
        email: email.into(),
        phone: None,
        address: None,
        department: Some(department.into()),
        position: None,
        hire_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        hourly_rate: 100.0,
        status: EmployeeStatus::Active,
        created_at: now(),
        updated_at: now(),
    }
}

fn account_for(employee: &Employee, username: &str) -> Account {
    Account::new(
        employee.employee_id.clone(),
        username.into(),
        "hash".into(),
        Role::Employee,
        now(),
    )
}

async fn seeded() -> (MemoryStore, Employee, Account) {
    let store = MemoryStore::new();
    let e = employee(1, "juan@example.com", "Ops");
    let a = account_for(&e, "juandelacruz");
    store.create_employee_with_account(&e, &a).await.unwrap();
    (store, e, a)
}

fn attendance(employee_id: &EmployeeId, date: NaiveDate) -> AttendanceRecord {
    AttendanceRecord {
        id: Uuid::new_v4(),
        employee_id: employee_id.clone(),
        work_date: date,
        time_in: NaiveTime::from_hms_opt(8, 0, 0),
        time_out: None,
        break_minutes: 60,
        hours_worked: 0.0,
        overtime_hours: 0.0,
        status: AttendanceStatus::Present,
        notes: None,
        created_at: now(),
        updated_at: now(),
    }
}

fn payroll(employee_id: &EmployeeId, net: f64) -> PayrollRecord {
    PayrollRecord {
        id: Uuid::new_v4(),
        employee_id: employee_id.clone(),
        pay_period_start: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        pay_period_end: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
        days_worked: 1,
        regular_hours: 8.0,
        overtime_hours: 0.0,
        hourly_rate: 100.0,
        regular_pay: 800.0,
        overtime_pay: 0.0,
        bonuses: 0.0,
        allowances: 0.0,
        gross_pay: 800.0,
        deductions: 0.0,
        tax: 0.0,
        net_pay: net,
        status: PayrollStatus::Draft,
        created_at: now(),
        updated_at: now(),
    }
}

#[tokio::test]
async fn test_employee_sequence_is_monotonic() {
    let store = MemoryStore::new();
    assert_eq!(store.next_employee_number().await.unwrap(), 1);
    assert_eq!(store.next_employee_number().await.unwrap(), 2);
}

#[tokio::test]
async fn test_duplicate_username_persists_nothing() {
    let (store, _, _) = seeded().await;

    let other = employee(2, "other@example.com", "Ops");
    let clash = account_for(&other, "juandelacruz");
    let err = store
        .create_employee_with_account(&other, &clash)
        .await
        .unwrap_err();

    assert!(err.is_conflict_on("username"));
    assert_eq!(store.employee_count().await, 1);
    assert!(store.find_employee(&other.employee_id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_duplicate_email_is_case_insensitive() {
    let (store, _, _) = seeded().await;

    let other = employee(2, "JUAN@example.com", "Ops");
    let err = store
        .create_employee_with_account(&other, &account_for(&other, "other"))
        .await
        .unwrap_err();
    assert!(matches!(err, DatabaseError::Conflict { ref field } if field == "email"));
}

#[tokio::test]
async fn test_deactivate_employee_cascades_to_sessions() {
    let (store, e, a) = seeded().await;
    let session = store
        .insert_session(&NewSession {
            id: Uuid::new_v4(),
            account_id: a.id,
            token_hash: "abc".into(),
            remember_me: false,
            ip_address: None,
            user_agent: None,
            created_at: now(),
            expires_at: now() + Duration::hours(24),
        })
        .await
        .unwrap();

    assert!(
        store
            .deactivate_employee(&e.employee_id, EmployeeStatus::Inactive, now())
            .await
            .unwrap()
    );

    let account = store.find_account(a.id).await.unwrap().unwrap();
    assert!(!account.is_active);
    let session = store.find_session(session.id).await.unwrap().unwrap();
    assert!(!session.is_active);

    let active = store
        .list_employees(&EmployeeFilter {
            status: Some(EmployeeStatus::Active),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(active.is_empty());
}

#[tokio::test]
async fn test_failed_logins_accumulate_and_locks_release() {
    let (store, _, a) = seeded().await;
    assert_eq!(store.record_failed_login(a.id, now()).await.unwrap(), 1);
    assert_eq!(store.record_failed_login(a.id, now()).await.unwrap(), 2);

    store
        .lock_account(a.id, now() + Duration::minutes(15), now())
        .await
        .unwrap();
    assert_eq!(store.release_expired_locks(now()).await.unwrap(), 0);
    assert_eq!(
        store
            .release_expired_locks(now() + Duration::minutes(15))
            .await
            .unwrap(),
        1
    );

    let account = store.find_account(a.id).await.unwrap().unwrap();
    assert_eq!(account.failed_login_attempts, 0);
    assert!(account.locked_until.is_none());
}

#[tokio::test]
async fn test_rotate_session_requires_current_hash() {
    let (store, _, a) = seeded().await;
    let session = store
        .insert_session(&NewSession {
            id: Uuid::new_v4(),
            account_id: a.id,
            token_hash: "first".into(),
            remember_me: false,
            ip_address: None,
            user_agent: None,
            created_at: now(),
            expires_at: now() + Duration::hours(24),
        })
        .await
        .unwrap();

    let later = now() + Duration::hours(23);
    let new_expiry = later + Duration::hours(24);
    assert!(
        store
            .rotate_session(session.id, "first", "second", new_expiry, later)
            .await
            .unwrap()
    );
    assert!(
        !store
            .rotate_session(session.id, "first", "third", new_expiry, later)
            .await
            .unwrap()
    );

    let stored = store.find_session(session.id).await.unwrap().unwrap();
    assert_eq!(stored.token_hash, "second");
    assert_eq!(stored.expires_at, new_expiry);
}

#[tokio::test]
async fn test_expire_and_purge_sessions() {
    let (store, _, a) = seeded().await;
    for (hash, hours) in [("short", 1), ("long", 48)] {
        store
            .insert_session(&NewSession {
                id: Uuid::new_v4(),
                account_id: a.id,
                token_hash: hash.into(),
                remember_me: false,
                ip_address: None,
                user_agent: None,
                created_at: now(),
                expires_at: now() + Duration::hours(hours),
            })
            .await
            .unwrap();
    }

    let later = now() + Duration::hours(2);
    assert_eq!(store.expire_sessions(later).await.unwrap(), 1);
    assert_eq!(store.purge_sessions(later).await.unwrap(), 1);
    assert_eq!(store.list_account_sessions(a.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_one_attendance_record_per_day() {
    let (store, e, _) = seeded().await;
    let day = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();

    store
        .insert_attendance(&attendance(&e.employee_id, day))
        .await
        .unwrap();
    let err = store
        .insert_attendance(&attendance(&e.employee_id, day))
        .await
        .unwrap_err();
    assert!(err.is_conflict_on("work_date"));
    assert_eq!(store.attendance_count().await, 1);
}

#[tokio::test]
async fn test_attendance_filter_joins_department() {
    let (store, e, _) = seeded().await;
    let other = employee(2, "ana@example.com", "Finance");
    store
        .create_employee_with_account(&other, &account_for(&other, "ana"))
        .await
        .unwrap();

    let day = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
    store
        .insert_attendance(&attendance(&e.employee_id, day))
        .await
        .unwrap();
    store
        .insert_attendance(&attendance(&other.employee_id, day))
        .await
        .unwrap();

    let filter = AttendanceFilter {
        department: Some("finance".into()),
        ..AttendanceFilter::on(day)
    };
    let records = store.list_attendance(&filter).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].employee_id, other.employee_id);
}

#[tokio::test]
async fn test_guarded_attendance_writes_see_current_times() {
    let (store, e, _) = seeded().await;
    let date = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
    let mut absent = attendance(&e.employee_id, date);
    absent.time_in = None;
    absent.status = AttendanceStatus::Absent;
    store.insert_attendance(&absent).await.unwrap();

    let mut first = absent.clone();
    first.time_in = NaiveTime::from_hms_opt(8, 0, 0);
    let mut second = absent.clone();
    second.time_in = NaiveTime::from_hms_opt(8, 30, 0);

    assert!(store.start_attendance(&first).await.unwrap());
    assert!(!store.start_attendance(&second).await.unwrap());

    let mut closed = first.clone();
    closed.time_out = NaiveTime::from_hms_opt(17, 0, 0);
    assert!(store.finish_attendance(&closed).await.unwrap());
    assert!(!store.finish_attendance(&closed).await.unwrap());

    let stored = store.find_attendance(absent.id).await.unwrap().unwrap();
    assert_eq!(stored.time_in, NaiveTime::from_hms_opt(8, 0, 0));
    assert_eq!(stored.time_out, NaiveTime::from_hms_opt(17, 0, 0));
}

#[tokio::test]
async fn test_payroll_draft_is_overwritten_until_processed() {
    let (store, e, _) = seeded().await;

    let first = store.save_payroll_draft(&payroll(&e.employee_id, 800.0)).await.unwrap();
    let second = store.save_payroll_draft(&payroll(&e.employee_id, 900.0)).await.unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(second.net_pay, 900.0);

    assert!(
        store
            .update_payroll_status(first.id, PayrollStatus::Draft, PayrollStatus::Processed, now())
            .await
            .unwrap()
    );
    let err = store
        .save_payroll_draft(&payroll(&e.employee_id, 1000.0))
        .await
        .unwrap_err();
    assert!(err.is_conflict_on("pay_period"));
}

#[tokio::test]
async fn test_payroll_status_write_requires_expected_status() {
    let (store, e, _) = seeded().await;
    let draft = store.save_payroll_draft(&payroll(&e.employee_id, 800.0)).await.unwrap();

    for (expected, next) in [
        (PayrollStatus::Draft, PayrollStatus::Processed),
        (PayrollStatus::Processed, PayrollStatus::Paid),
    ] {
        assert!(
            store
                .update_payroll_status(draft.id, expected, next, now())
                .await
                .unwrap()
        );
    }

    // A writer that still believes the record is a draft must not move it back.
    let stale = store
        .update_payroll_status(draft.id, PayrollStatus::Draft, PayrollStatus::Processed, now())
        .await
        .unwrap();
    assert!(!stale);

    let filter = PayrollFilter {
        employee_id: Some(e.employee_id.clone()),
        ..Default::default()
    };
    let records = store.list_payroll(&filter).await.unwrap();
    assert_eq!(records[0].status, PayrollStatus::Paid);
}

#[tokio::test]
async fn test_settings_are_upserted() {
    let store = MemoryStore::new();
    store.put_setting("tax_rate", "0.1", now()).await.unwrap();
    store.put_setting("tax_rate", "0.12", now()).await.unwrap();
    let settings = store.list_settings().await.unwrap();
    assert_eq!(settings.len(), 1);
    assert_eq!(settings[0].value, "0.12");
}
