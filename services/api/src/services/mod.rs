//! Domain services behind the HTTP handlers

pub mod attendance;
pub mod employees;
pub mod payroll;
pub mod settings;
pub mod username;

pub use attendance::AttendanceService;
pub use employees::EmployeeService;
pub use payroll::PayrollService;
pub use settings::SettingsService;
