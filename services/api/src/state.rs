//! Application state shared across handlers

use auth::{AuthConfig, AuthService};
use common::DynStore;

use crate::config::ApiConfig;
use crate::services::{AttendanceService, EmployeeService, PayrollService, SettingsService};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: DynStore,
    pub auth: AuthService,
    pub employees: EmployeeService,
    pub attendance: AttendanceService,
    pub payroll: PayrollService,
    pub settings: SettingsService,
}

impl AppState {
    /// Wire every service over one store
    pub fn new(store: DynStore, auth_config: &AuthConfig, config: &ApiConfig) -> anyhow::Result<Self> {
        let auth = AuthService::new(store.clone(), auth_config)?;
        let settings = SettingsService::new(store.clone(), config.policy()?);

        Ok(Self {
            employees: EmployeeService::new(
                store.clone(),
                auth.clone(),
                config.default_password_suffix.clone(),
            ),
            attendance: AttendanceService::new(store.clone(), settings.clone()),
            payroll: PayrollService::new(store.clone(), settings.clone()),
            settings,
            auth,
            store,
        })
    }
}
