//! Attendance and payroll policy
//!
//! The effective policy is the environment defaults overridden by rows in
//! the `settings` table. It is resolved on every operation that needs it, so
//! a changed setting applies to the next request without a restart.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveTime, Utc};
use common::DynStore;
use common::models::Setting;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};

pub const OVERTIME_MULTIPLIER: &str = "overtime_multiplier";
pub const STANDARD_DAILY_HOURS: &str = "standard_daily_hours";
pub const HALF_DAY_HOURS: &str = "half_day_hours";
pub const TAX_RATE: &str = "tax_rate";
pub const WORK_START_TIME: &str = "work_start_time";
pub const LATE_GRACE_MINUTES: &str = "late_grace_minutes";
pub const DEFAULT_BREAK_MINUTES: &str = "default_break_minutes";

const TIME_FORMAT: &str = "%H:%M";

/// Rules for classifying attendance and pricing hours
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Policy {
    pub standard_daily_hours: f64,
    pub half_day_hours: f64,
    pub overtime_multiplier: f64,
    pub tax_rate: f64,
    #[serde(serialize_with = "serialize_hhmm")]
    pub work_start_time: NaiveTime,
    pub late_grace_minutes: i64,
    pub default_break_minutes: i32,
}

fn serialize_hhmm<S: serde::Serializer>(time: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&time.format(TIME_FORMAT).to_string())
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            standard_daily_hours: 8.0,
            half_day_hours: 4.0,
            overtime_multiplier: 1.5,
            tax_rate: 0.0,
            work_start_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or(NaiveTime::MIN),
            late_grace_minutes: 15,
            default_break_minutes: 0,
        }
    }
}

impl Policy {
    /// Clock-in time after which an arrival counts as late
    pub fn late_after(&self) -> NaiveTime {
        self.work_start_time + chrono::Duration::minutes(self.late_grace_minutes)
    }

    /// Check ranges, returning the offending key and a message
    pub fn validate(&self) -> Result<(), (&'static str, String)> {
        if !(self.standard_daily_hours > 0.0 && self.standard_daily_hours <= 24.0) {
            return Err((STANDARD_DAILY_HOURS, "must be between 0 and 24".into()));
        }
        if !(self.half_day_hours >= 0.0 && self.half_day_hours <= self.standard_daily_hours) {
            return Err((
                HALF_DAY_HOURS,
                "must be between 0 and the standard daily hours".into(),
            ));
        }
        if !(self.overtime_multiplier >= 1.0 && self.overtime_multiplier <= 10.0) {
            return Err((OVERTIME_MULTIPLIER, "must be between 1 and 10".into()));
        }
        if !(self.tax_rate >= 0.0 && self.tax_rate < 1.0) {
            return Err((TAX_RATE, "must be at least 0 and below 1".into()));
        }
        if !(0..=720).contains(&self.late_grace_minutes) {
            return Err((LATE_GRACE_MINUTES, "must be between 0 and 720".into()));
        }
        if !(0..=720).contains(&self.default_break_minutes) {
            return Err((DEFAULT_BREAK_MINUTES, "must be between 0 and 720".into()));
        }
        Ok(())
    }

    /// Apply one textual setting
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), String> {
        let value = value.trim();
        let number = || value.parse::<f64>().map_err(|_| "must be a number".to_string());
        let integer = || value.parse::<i64>().map_err(|_| "must be a whole number".to_string());

        match key {
            OVERTIME_MULTIPLIER => self.overtime_multiplier = number()?,
            STANDARD_DAILY_HOURS => self.standard_daily_hours = number()?,
            HALF_DAY_HOURS => self.half_day_hours = number()?,
            TAX_RATE => self.tax_rate = number()?,
            WORK_START_TIME => {
                self.work_start_time = NaiveTime::parse_from_str(value, TIME_FORMAT)
                    .map_err(|_| "must be a time formatted as HH:MM".to_string())?
            }
            LATE_GRACE_MINUTES => self.late_grace_minutes = integer()?,
            DEFAULT_BREAK_MINUTES => {
                self.default_break_minutes = i32::try_from(integer()?)
                    .map_err(|_| "is out of range".to_string())?
            }
            _ => return Err("is not a known setting".to_string()),
        }
        Ok(())
    }
}

/// Effective policy together with the stored overrides
#[derive(Debug, Clone, Serialize)]
pub struct SettingsView {
    pub effective: Policy,
    pub overrides: Vec<Setting>,
}

/// Settings service
#[derive(Clone)]
pub struct SettingsService {
    store: DynStore,
    defaults: Policy,
}

impl SettingsService {
    pub fn new(store: DynStore, defaults: Policy) -> Self {
        Self { store, defaults }
    }

    /// Resolve the policy in force right now
    pub async fn policy(&self) -> ApiResult<Policy> {
        let stored = self.store.list_settings().await?;
        Ok(self.resolve(&stored))
    }

    fn resolve(&self, stored: &[Setting]) -> Policy {
        let mut policy = self.defaults.clone();
        for setting in stored {
            let mut candidate = policy.clone();
            match candidate.apply(&setting.key, &setting.value) {
                Ok(()) if candidate.validate().is_ok() => policy = candidate,
                Ok(()) => warn!("Ignoring out-of-range setting {}", setting.key),
                Err(e) => warn!("Ignoring stored setting {}: {}", setting.key, e),
            }
        }
        policy
    }

    pub async fn view(&self) -> ApiResult<SettingsView> {
        let overrides = self.store.list_settings().await?;
        Ok(SettingsView {
            effective: self.resolve(&overrides),
            overrides,
        })
    }

    /// Validate and store a batch of settings
    ///
    /// Nothing is written unless every value is valid and the resulting
    /// policy is consistent.
    pub async fn update(
        &self,
        changes: &BTreeMap<String, String>,
        now: DateTime<Utc>,
    ) -> ApiResult<SettingsView> {
        if changes.is_empty() {
            return Err(ApiError::validation("No settings given"));
        }

        let mut candidate = self.policy().await?;
        for (key, value) in changes {
            candidate
                .apply(key, value)
                .map_err(|message| ApiError::invalid_field(key, format!("{key} {message}")))?;
        }
        candidate
            .validate()
            .map_err(|(key, message)| ApiError::invalid_field(key, format!("{key} {message}")))?;

        for (key, value) in changes {
            self.store.put_setting(key, value.trim(), now).await?;
            info!("Setting {} updated to {}", key, value.trim());
        }

        self.view().await
    }
}
