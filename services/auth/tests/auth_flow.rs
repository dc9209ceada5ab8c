//! End-to-end authentication flows against the in-memory store

use std::sync::Arc;

use auth::{AuthConfig, AuthError, AuthService, ClientInfo, LoginRequest};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use common::models::{Account, Employee, EmployeeId, EmployeeStatus, Role};
use common::{DynStore, MemoryStore, Store};

const PASSWORD: &str = "delacruz123!";

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 4, 8, 0, 0).unwrap()
}

struct Fixture {
    store: DynStore,
    auth: AuthService,
    account: Account,
}

async fn fixture() -> Fixture {
    let store: DynStore = Arc::new(MemoryStore::new());
    let auth = AuthService::new(store.clone(), &AuthConfig::for_tests()).unwrap();

    let employee = Employee {
        employee_id: EmployeeId::from_number(1),
        first_name: "Juan".into(),
        middle_name: None,
        last_name: "Dela Cruz".into(),
        email: "juan@example.com".into(),
        phone: None,
        address: None,
        department: Some("Operations".into()),
        position: None,
        hire_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        hourly_rate: 25.0,
        status: EmployeeStatus::Active,
        created_at: now(),
        updated_at: now(),
    };
    let hash = auth.hash_password(PASSWORD).await.unwrap();
    let account = Account::new(
        employee.employee_id.clone(),
        "juandelacruz".into(),
        hash,
        Role::Employee,
        now(),
    );
    store
        .create_employee_with_account(&employee, &account)
        .await
        .unwrap();

    Fixture {
        store,
        auth,
        account,
    }
}

fn login_request(password: &str, remember_me: bool) -> LoginRequest {
    LoginRequest {
        username: "juandelacruz".into(),
        password: password.into(),
        remember_me,
    }
}

#[tokio::test]
async fn test_login_then_verify_returns_same_account() {
    let f = fixture().await;
    let outcome = f
        .auth
        .login(&login_request(PASSWORD, false), &ClientInfo::default(), now())
        .await
        .unwrap();

    assert_eq!(outcome.issued.expires_in, 86_400);
    assert_eq!(outcome.account.id, f.account.id);

    let verified = f
        .auth
        .verify(&outcome.issued.token, now() + Duration::minutes(5))
        .await
        .unwrap();
    assert_eq!(verified.account.id, f.account.id);
    assert_eq!(verified.employee.employee_id, EmployeeId::from_number(1));
    assert_eq!(verified.session.id, outcome.issued.session_id);

    let session = f
        .store
        .find_session(outcome.issued.session_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(session.last_activity, now() + Duration::minutes(5));
}

#[tokio::test]
async fn test_username_lookup_ignores_case_and_whitespace() {
    let f = fixture().await;
    let request = LoginRequest {
        username: "  JuanDelaCruz ".into(),
        password: PASSWORD.into(),
        remember_me: false,
    };
    assert!(
        f.auth
            .login(&request, &ClientInfo::default(), now())
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn test_remember_me_extends_expiry() {
    let f = fixture().await;
    let outcome = f
        .auth
        .login(&login_request(PASSWORD, true), &ClientInfo::default(), now())
        .await
        .unwrap();
    assert_eq!(outcome.issued.expires_at, now() + Duration::days(30));
}

#[tokio::test]
async fn test_expired_token_fails_verify() {
    let f = fixture().await;
    let outcome = f
        .auth
        .login(&login_request(PASSWORD, false), &ClientInfo::default(), now())
        .await
        .unwrap();

    let result = f
        .auth
        .verify(&outcome.issued.token, now() + Duration::hours(24))
        .await;
    assert!(matches!(result, Err(AuthError::TokenExpired)));
}

#[tokio::test]
async fn test_logout_revokes_and_is_idempotent() {
    let f = fixture().await;
    let token = f
        .auth
        .login(&login_request(PASSWORD, false), &ClientInfo::default(), now())
        .await
        .unwrap()
        .issued
        .token;

    assert!(f.auth.logout(&token).await.unwrap());
    assert!(!f.auth.logout(&token).await.unwrap());
    assert!(!f.auth.logout("garbage").await.unwrap());

    let result = f.auth.verify(&token, now()).await;
    assert!(matches!(result, Err(AuthError::TokenRevoked)));
}

#[tokio::test]
async fn test_wrong_password_and_unknown_user_look_the_same() {
    let f = fixture().await;
    let wrong = f
        .auth
        .login(&login_request("nope12345", false), &ClientInfo::default(), now())
        .await;
    assert!(matches!(wrong, Err(AuthError::InvalidCredentials)));

    let unknown = LoginRequest {
        username: "nobody".into(),
        password: PASSWORD.into(),
        remember_me: false,
    };
    let result = f.auth.login(&unknown, &ClientInfo::default(), now()).await;
    assert!(matches!(result, Err(AuthError::InvalidCredentials)));
}

#[tokio::test]
async fn test_five_failures_lock_the_account_until_window_elapses() {
    let f = fixture().await;
    let client = ClientInfo::default();

    for _ in 0..5 {
        let result = f
            .auth
            .login(&login_request("wrongpass1", false), &client, now())
            .await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    let locked = f
        .auth
        .login(&login_request(PASSWORD, false), &client, now() + Duration::minutes(1))
        .await;
    assert!(matches!(locked, Err(AuthError::AccountLocked)));

    let after = now() + Duration::seconds(900);
    let outcome = f
        .auth
        .login(&login_request(PASSWORD, false), &client, after)
        .await
        .unwrap();
    assert_eq!(outcome.account.failed_login_attempts, 0);

    let account = f.store.find_account(f.account.id).await.unwrap().unwrap();
    assert!(account.locked_until.is_none());
    assert_eq!(account.last_login, Some(after));
}

#[tokio::test]
async fn test_refresh_only_inside_window() {
    let f = fixture().await;
    let issued = f
        .auth
        .login(&login_request(PASSWORD, false), &ClientInfo::default(), now())
        .await
        .unwrap()
        .issued;

    let early = f.auth.refresh(&issued.token, now() + Duration::hours(1)).await.unwrap();
    assert!(early.is_none());

    let late = now() + Duration::hours(23);
    let refreshed = f.auth.refresh(&issued.token, late).await.unwrap().unwrap();
    assert_eq!(refreshed.session_id, issued.session_id);
    assert_eq!(refreshed.expires_at, late + Duration::hours(24));

    assert!(f.auth.verify(&refreshed.token, late).await.is_ok());
    let old = f.auth.verify(&issued.token, late).await;
    assert!(matches!(old, Err(AuthError::TokenRevoked)));
}

#[tokio::test]
async fn test_change_password_revokes_sessions() {
    let f = fixture().await;
    let token = f
        .auth
        .login(&login_request(PASSWORD, false), &ClientInfo::default(), now())
        .await
        .unwrap()
        .issued
        .token;

    let wrong = f
        .auth
        .change_password(f.account.id, "notmine123", "brandnew42", now())
        .await;
    assert!(matches!(wrong, Err(AuthError::InvalidCredentials)));

    let weak = f
        .auth
        .change_password(f.account.id, PASSWORD, "short", now())
        .await;
    assert!(matches!(
        weak,
        Err(AuthError::Validation { field: "new_password", .. })
    ));

    f.auth
        .change_password(f.account.id, PASSWORD, "brandnew42", now())
        .await
        .unwrap();

    assert!(matches!(
        f.auth.verify(&token, now()).await,
        Err(AuthError::TokenRevoked)
    ));
    assert!(
        f.auth
            .login(&login_request("brandnew42", false), &ClientInfo::default(), now())
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn test_admin_reset_skips_current_password() {
    let f = fixture().await;
    f.auth
        .reset_password(f.account.id, "resetpass9", now())
        .await
        .unwrap();

    assert!(
        f.auth
            .login(&login_request("resetpass9", false), &ClientInfo::default(), now())
            .await
            .is_ok()
    );

    let missing = f
        .auth
        .reset_password(uuid::Uuid::new_v4(), "resetpass9", now())
        .await;
    assert!(matches!(missing, Err(AuthError::AccountNotFound)));
}

#[tokio::test]
async fn test_deactivated_employee_cannot_log_in_or_verify() {
    let f = fixture().await;
    let token = f
        .auth
        .login(&login_request(PASSWORD, false), &ClientInfo::default(), now())
        .await
        .unwrap()
        .issued
        .token;

    f.store
        .deactivate_employee(&EmployeeId::from_number(1), EmployeeStatus::Inactive, now())
        .await
        .unwrap();

    assert!(matches!(
        f.auth.verify(&token, now()).await,
        Err(AuthError::TokenRevoked)
    ));
    assert!(matches!(
        f.auth
            .login(&login_request(PASSWORD, false), &ClientInfo::default(), now())
            .await,
        Err(AuthError::InvalidCredentials)
    ));
}
