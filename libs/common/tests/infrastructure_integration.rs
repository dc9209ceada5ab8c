//! Integration tests for the PostgreSQL infrastructure
//!
//! These need a reachable database named by `DATABASE_URL` and are ignored
//! by default. Run them with `cargo test -- --ignored`.

use chrono::{NaiveDate, Utc};
use common::database::{DatabaseConfig, health_check, init_pool, run_migrations};
use common::models::{Account, Employee, EmployeeId, EmployeeStatus, Role};
use common::{PgStore, Store};
use sqlx::Row;

#[tokio::test]
#[ignore = "requires a running PostgreSQL instance"]
async fn test_infrastructure_integration() -> Result<(), Box<dyn std::error::Error>> {
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    assert!(health_check(&pool).await?, "Database health check failed");

    let row = sqlx::query("SELECT 1 as result").fetch_one(&pool).await?;
    let result: i32 = row.get("result");
    assert_eq!(result, 1, "PostgreSQL simple query test failed");

    run_migrations(&pool).await?;

    let store = PgStore::new(pool);
    let number = store.next_employee_number().await?;
    let now = Utc::now();
    let employee = Employee {
        employee_id: EmployeeId::from_number(number),
        first_name: "Integration".into(),
        middle_name: None,
        last_name: "Test".into(),
        email: format!("integration-{number}@example.com"),
        phone: None,
        address: None,
        department: None,
        position: None,
        hire_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        hourly_rate: 10.0,
        status: EmployeeStatus::Active,
        created_at: now,
        updated_at: now,
    };
    let account = Account::new(
        employee.employee_id.clone(),
        format!("integration{number}"),
        "hash".into(),
        Role::Employee,
        now,
    );
    store.create_employee_with_account(&employee, &account).await?;

    let duplicate = Account::new(
        employee.employee_id.clone(),
        "someoneelse".into(),
        "hash".into(),
        Role::Employee,
        now,
    );
    let err = store
        .create_employee_with_account(&employee, &duplicate)
        .await
        .unwrap_err();
    assert!(err.is_conflict_on("employee_id"));

    let found = store.find_account_by_username(&account.username).await?;
    assert_eq!(found.map(|a| a.id), Some(account.id));

    assert!(
        store
            .deactivate_employee(&employee.employee_id, EmployeeStatus::Terminated, now)
            .await?
    );

    Ok(())
}
