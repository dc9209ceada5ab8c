//! API service settings read from the environment

use chrono::NaiveTime;
use serde::Deserialize;

use crate::services::settings::Policy;

/// API service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub server_host: String,
    pub server_port: u16,
    /// Per-request timeout in seconds
    pub request_timeout_seconds: u64,
    /// Appended to the lower-cased last name to form a default password
    pub default_password_suffix: String,
    /// Cron expression (with seconds) for the session maintenance job
    pub session_maintenance_schedule: String,
    /// Inactive sessions older than this are deleted
    pub session_retention_days: i64,

    // Attendance and payroll defaults, overridable through stored settings
    pub standard_daily_hours: f64,
    pub half_day_hours: f64,
    pub overtime_multiplier: f64,
    pub tax_rate: f64,
    pub work_start_time: String,
    pub late_grace_minutes: i64,
    pub default_break_minutes: i32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            server_host: "0.0.0.0".to_string(),
            server_port: 3000,
            request_timeout_seconds: 30,
            default_password_suffix: "123!".to_string(),
            session_maintenance_schedule: "0 */15 * * * *".to_string(),
            session_retention_days: 30,
            standard_daily_hours: 8.0,
            half_day_hours: 4.0,
            overtime_multiplier: 1.5,
            tax_rate: 0.0,
            work_start_time: "08:00".to_string(),
            late_grace_minutes: 15,
            default_break_minutes: 0,
        }
    }
}

impl ApiConfig {
    /// Create a new ApiConfig from environment variables
    ///
    /// Every field falls back to [`ApiConfig::default`]; the variable name is
    /// the upper-cased field name, e.g. `SERVER_PORT` or `TAX_RATE`.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let defaults = ApiConfig::default();

        let config: ApiConfig = config::Config::builder()
            .set_default("server_host", defaults.server_host)?
            .set_default("server_port", i64::from(defaults.server_port))?
            .set_default("request_timeout_seconds", defaults.request_timeout_seconds)?
            .set_default("default_password_suffix", defaults.default_password_suffix)?
            .set_default(
                "session_maintenance_schedule",
                defaults.session_maintenance_schedule,
            )?
            .set_default("session_retention_days", defaults.session_retention_days)?
            .set_default("standard_daily_hours", defaults.standard_daily_hours)?
            .set_default("half_day_hours", defaults.half_day_hours)?
            .set_default("overtime_multiplier", defaults.overtime_multiplier)?
            .set_default("tax_rate", defaults.tax_rate)?
            .set_default("work_start_time", defaults.work_start_time)?
            .set_default("late_grace_minutes", defaults.late_grace_minutes)?
            .set_default("default_break_minutes", i64::from(defaults.default_break_minutes))?
            .add_source(config::Environment::default().try_parsing(true))
            .build()?
            .try_deserialize()?;

        config.policy()?;
        Ok(config)
    }

    /// Address the HTTP server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    /// Attendance and payroll defaults
    pub fn policy(&self) -> Result<Policy, config::ConfigError> {
        let work_start_time = NaiveTime::parse_from_str(&self.work_start_time, "%H:%M")
            .map_err(|e| {
                config::ConfigError::Message(format!(
                    "WORK_START_TIME must be HH:MM, got {:?}: {}",
                    self.work_start_time, e
                ))
            })?;

        let policy = Policy {
            standard_daily_hours: self.standard_daily_hours,
            half_day_hours: self.half_day_hours,
            overtime_multiplier: self.overtime_multiplier,
            tax_rate: self.tax_rate,
            work_start_time,
            late_grace_minutes: self.late_grace_minutes,
            default_break_minutes: self.default_break_minutes,
        };
        policy
            .validate()
            .map_err(|(key, message)| config::ConfigError::Message(format!("{key}: {message}")))?;
        Ok(policy)
    }
}
