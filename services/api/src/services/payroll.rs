//! Payroll calculation
//!
//! Amounts are computed in `Decimal` and each line is rounded to cents
//! before it is combined, so the stored record always satisfies
//! `regular_pay + overtime_pay + bonuses + allowances - deductions - tax == net_pay`.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use common::DynStore;
use common::models::{
    AttendanceFilter, AttendanceRecord, Employee, EmployeeFilter, EmployeeId, EmployeeStatus,
    PayrollFilter, PayrollRecord, PayrollStatus,
};
use common::money::{round_decimal, to_decimal, to_f64};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::services::attendance::check_range;
use crate::services::settings::{Policy, SettingsService};

pub const NO_ATTENDANCE_DATA: &str = "NO_ATTENDANCE_DATA";

/// Per-employee extras for one pay period
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct PayAdjustment {
    #[serde(default)]
    pub bonuses: f64,
    #[serde(default)]
    pub allowances: f64,
    #[serde(default)]
    pub deductions: f64,
}

impl PayAdjustment {
    fn validate(&self) -> ApiResult<()> {
        for (field, value) in [
            ("bonuses", self.bonuses),
            ("allowances", self.allowances),
            ("deductions", self.deductions),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ApiError::invalid_field(
                    field,
                    format!("{field} must be a non-negative number"),
                ));
            }
        }
        Ok(())
    }
}

/// A non-fatal remark attached to a generated record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PayrollWarning {
    pub employee_id: EmployeeId,
    pub code: &'static str,
    pub message: String,
}

/// A per-employee failure inside a batch
#[derive(Debug, Clone, Serialize)]
pub struct PayrollFailure {
    pub employee_id: String,
    pub code: &'static str,
    pub message: String,
}

/// Outcome of a payroll batch
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub generated: Vec<PayrollRecord>,
    pub warnings: Vec<PayrollWarning>,
    pub failed: Vec<PayrollFailure>,
}

/// Request to generate payroll for a period
#[derive(Debug, Clone, Deserialize)]
pub struct GeneratePayroll {
    /// Employees to include; all active employees when absent
    pub employee_ids: Option<Vec<String>>,
    pub pay_period_start: NaiveDate,
    pub pay_period_end: NaiveDate,
    /// Adjustments keyed by employee id
    #[serde(default)]
    pub adjustments: HashMap<String, PayAdjustment>,
}

/// Compute a draft payroll record from attendance
///
/// Only records with worked hours count. An empty period yields an all-zero
/// record and a [`NO_ATTENDANCE_DATA`] warning.
pub fn calculate_payroll(
    employee: &Employee,
    start: NaiveDate,
    end: NaiveDate,
    records: &[AttendanceRecord],
    adjustment: &PayAdjustment,
    policy: &Policy,
    now: DateTime<Utc>,
) -> (PayrollRecord, Option<PayrollWarning>) {
    let qualifying: Vec<&AttendanceRecord> = records
        .iter()
        .filter(|r| r.employee_id == employee.employee_id)
        .filter(|r| r.work_date >= start && r.work_date <= end)
        .filter(|r| r.hours_worked > 0.0)
        .collect();

    let (regular_hours, overtime_hours) =
        qualifying
            .iter()
            .fold((Decimal::ZERO, Decimal::ZERO), |(regular, overtime), r| {
                let worked = to_decimal(r.hours_worked);
                let extra = to_decimal(r.overtime_hours).min(worked);
                (regular + worked - extra, overtime + extra)
            });
    let regular_hours = round_decimal(regular_hours);
    let overtime_hours = round_decimal(overtime_hours);

    let rate = to_decimal(employee.hourly_rate);
    let regular_pay = round_decimal(regular_hours * rate);
    let overtime_pay = round_decimal(overtime_hours * rate * to_decimal(policy.overtime_multiplier));
    let bonuses = round_decimal(to_decimal(adjustment.bonuses));
    let allowances = round_decimal(to_decimal(adjustment.allowances));
    let deductions = round_decimal(to_decimal(adjustment.deductions));

    let gross_pay = regular_pay + overtime_pay + bonuses + allowances;
    let tax = round_decimal(gross_pay * to_decimal(policy.tax_rate));
    let net_pay = gross_pay - deductions - tax;

    let warning = qualifying.is_empty().then(|| PayrollWarning {
        employee_id: employee.employee_id.clone(),
        code: NO_ATTENDANCE_DATA,
        message: format!("No attendance with worked hours between {start} and {end}"),
    });

    let record = PayrollRecord {
        id: Uuid::new_v4(),
        employee_id: employee.employee_id.clone(),
        pay_period_start: start,
        pay_period_end: end,
        days_worked: qualifying.len() as i32,
        regular_hours: to_f64(regular_hours),
        overtime_hours: to_f64(overtime_hours),
        hourly_rate: employee.hourly_rate,
        regular_pay: to_f64(regular_pay),
        overtime_pay: to_f64(overtime_pay),
        bonuses: to_f64(bonuses),
        allowances: to_f64(allowances),
        gross_pay: to_f64(gross_pay),
        deductions: to_f64(deductions),
        tax: to_f64(tax),
        net_pay: to_f64(net_pay),
        status: PayrollStatus::Draft,
        created_at: now,
        updated_at: now,
    };

    (record, warning)
}

/// Payroll service
#[derive(Clone)]
pub struct PayrollService {
    store: DynStore,
    settings: SettingsService,
}

impl PayrollService {
    pub fn new(store: DynStore, settings: SettingsService) -> Self {
        Self { store, settings }
    }

    /// Calculate and store the draft for one employee
    pub async fn generate_for(
        &self,
        employee_id: &EmployeeId,
        start: NaiveDate,
        end: NaiveDate,
        adjustment: &PayAdjustment,
        policy: &Policy,
        now: DateTime<Utc>,
    ) -> ApiResult<(PayrollRecord, Option<PayrollWarning>)> {
        adjustment.validate()?;

        let employee = self
            .store
            .find_employee(employee_id)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("Employee {employee_id}")))?;

        let records = self
            .store
            .list_attendance(&AttendanceFilter {
                employee_id: Some(employee_id.clone()),
                from: Some(start),
                to: Some(end),
                ..Default::default()
            })
            .await?;

        let (draft, warning) =
            calculate_payroll(&employee, start, end, &records, adjustment, policy, now);

        let stored = self.store.save_payroll_draft(&draft).await.map_err(|e| {
            if e.is_conflict_on("pay_period") {
                ApiError::conflict(
                    "PAYROLL_FINALIZED",
                    format!("Payroll for {employee_id} in this period is already processed"),
                    Some("pay_period"),
                )
            } else {
                e.into()
            }
        })?;

        Ok((stored, warning))
    }

    /// Generate drafts for a batch of employees
    ///
    /// Failures are collected per employee; the batch itself only fails on
    /// invalid input or when the employee list cannot be read.
    pub async fn generate_payroll(
        &self,
        request: &GeneratePayroll,
        now: DateTime<Utc>,
    ) -> ApiResult<BatchReport> {
        let (start, end) = (request.pay_period_start, request.pay_period_end);
        if start > end {
            return Err(ApiError::invalid_field(
                "pay_period_end",
                "pay_period_end must not be before pay_period_start",
            ));
        }
        check_range(Some(start), Some(end))?;

        let policy = self.settings.policy().await?;
        let mut report = BatchReport::default();

        let adjustments: HashMap<EmployeeId, PayAdjustment> = request
            .adjustments
            .iter()
            .map(|(raw, adjustment)| Ok::<_, ApiError>((EmployeeId::parse(raw)?, *adjustment)))
            .collect::<ApiResult<_>>()?;

        let targets: Vec<Result<EmployeeId, (String, ApiError)>> = match &request.employee_ids {
            Some(ids) => ids
                .iter()
                .map(|raw| EmployeeId::parse(raw).map_err(|e| (raw.clone(), e.into())))
                .collect(),
            None => self
                .store
                .list_employees(&EmployeeFilter {
                    status: Some(EmployeeStatus::Active),
                    ..Default::default()
                })
                .await?
                .into_iter()
                .map(|e| Ok(e.employee_id))
                .collect(),
        };

        for target in targets {
            let outcome = match target {
                Ok(id) => {
                    let adjustment = adjustments.get(&id).copied().unwrap_or_default();
                    self.generate_for(&id, start, end, &adjustment, &policy, now)
                        .await
                        .map_err(|e| (id.to_string(), e))
                }
                Err(failure) => Err(failure),
            };

            match outcome {
                Ok((record, warning)) => {
                    report.generated.push(record);
                    report.warnings.extend(warning);
                }
                Err((employee_id, e)) => {
                    warn!("Payroll for {} failed: {}", employee_id, e);
                    let message = if e.status().is_server_error() {
                        "Internal server error".to_string()
                    } else {
                        e.to_string()
                    };
                    report.failed.push(PayrollFailure {
                        employee_id,
                        code: e.code(),
                        message,
                    });
                }
            }
        }

        info!(
            "Payroll {}..{}: {} generated, {} warnings, {} failed",
            start,
            end,
            report.generated.len(),
            report.warnings.len(),
            report.failed.len()
        );
        Ok(report)
    }

    pub async fn list_payroll(&self, filter: &PayrollFilter) -> ApiResult<Vec<PayrollRecord>> {
        check_range(filter.from, filter.to)?;
        Ok(self.store.list_payroll(filter).await?)
    }

    pub async fn get(&self, id: Uuid) -> ApiResult<PayrollRecord> {
        self.store
            .find_payroll(id)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("Payroll record {id}")))
    }

    /// Move a record forward through draft, processed and paid
    pub async fn update_status(
        &self,
        id: Uuid,
        status: PayrollStatus,
        now: DateTime<Utc>,
    ) -> ApiResult<PayrollRecord> {
        let mut record = self.get(id).await?;
        if !record.status.can_transition_to(status) {
            return Err(invalid_transition(record.status, status));
        }

        if !self
            .store
            .update_payroll_status(id, record.status, status, now)
            .await?
        {
            // Moved or removed since it was read.
            let current = self.get(id).await?;
            return Err(invalid_transition(current.status, status));
        }

        info!("Payroll {} moved to {}", id, status);
        record.status = status;
        record.updated_at = now;
        Ok(record)
    }
}

fn invalid_transition(from: PayrollStatus, to: PayrollStatus) -> ApiError {
    ApiError::conflict(
        "INVALID_STATUS_TRANSITION",
        format!("Cannot move payroll from {from} to {to}"),
        Some("status"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;
    use common::models::AttendanceStatus;

    fn employee(rate: f64) -> Employee {
        Employee {
            employee_id: EmployeeId::from_number(1),
            first_name: "Erika".into(),
            middle_name: None,
            last_name: "Api".into(),
            email: "erika@example.com".into(),
            phone: None,
            address: None,
            department: None,
            position: None,
            hire_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            hourly_rate: rate,
            status: EmployeeStatus::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn day(d: u32, worked: f64, overtime: f64) -> AttendanceRecord {
        AttendanceRecord {
            id: Uuid::new_v4(),
            employee_id: EmployeeId::from_number(1),
            work_date: NaiveDate::from_ymd_opt(2024, 3, d).unwrap(),
            time_in: NaiveTime::from_hms_opt(8, 0, 0),
            time_out: None,
            break_minutes: 0,
            hours_worked: worked,
            overtime_hours: overtime,
            status: AttendanceStatus::Present,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn period() -> (NaiveDate, NaiveDate) {
        (
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
        )
    }

    #[test]
    fn test_single_overtime_day() {
        let (start, end) = period();
        let (record, warning) = calculate_payroll(
            &employee(25.0),
            start,
            end,
            &[day(4, 9.0, 1.0)],
            &PayAdjustment::default(),
            &Policy::default(),
            Utc::now(),
        );

        assert!(warning.is_none());
        assert_eq!(record.days_worked, 1);
        assert_eq!(record.regular_hours, 8.0);
        assert_eq!(record.overtime_hours, 1.0);
        assert_eq!(record.regular_pay, 200.0);
        assert_eq!(record.overtime_pay, 37.5);
        assert_eq!(record.gross_pay, 237.5);
        assert_eq!(record.net_pay, 237.5);
    }

    #[test]
    fn test_identity_holds_with_tax_and_adjustments() {
        let (start, end) = period();
        let policy = Policy {
            tax_rate: 0.12,
            ..Policy::default()
        };
        let adjustment = PayAdjustment {
            bonuses: 100.1,
            allowances: 33.33,
            deductions: 45.67,
        };
        let (r, _) = calculate_payroll(
            &employee(17.37),
            start,
            end,
            &[day(4, 8.33, 0.33), day(5, 7.77, 0.0), day(6, 0.0, 0.0)],
            &adjustment,
            &policy,
            Utc::now(),
        );

        assert_eq!(r.days_worked, 2);
        let total = to_decimal(r.regular_pay)
            + to_decimal(r.overtime_pay)
            + to_decimal(r.bonuses)
            + to_decimal(r.allowances)
            - to_decimal(r.deductions)
            - to_decimal(r.tax);
        assert_eq!(total, to_decimal(r.net_pay));
        assert_eq!(
            to_decimal(r.gross_pay) - to_decimal(r.deductions) - to_decimal(r.tax),
            to_decimal(r.net_pay)
        );
    }

    #[test]
    fn test_no_attendance_gives_zero_record_and_warning() {
        let (start, end) = period();
        let (record, warning) = calculate_payroll(
            &employee(25.0),
            start,
            end,
            &[day(20, 8.0, 0.0)],
            &PayAdjustment::default(),
            &Policy::default(),
            Utc::now(),
        );

        assert_eq!(record.gross_pay, 0.0);
        assert_eq!(record.net_pay, 0.0);
        assert_eq!(warning.map(|w| w.code), Some(NO_ATTENDANCE_DATA));
    }

    #[test]
    fn test_negative_adjustment_is_rejected() {
        let adjustment = PayAdjustment {
            deductions: -5.0,
            ..Default::default()
        };
        assert!(matches!(
            adjustment.validate(),
            Err(ApiError::Validation { field: Some(ref f), .. }) if f == "deductions"
        ));
    }
}
