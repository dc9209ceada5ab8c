//! Payroll record model

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{EmployeeId, text_enum};

text_enum! {
    /// Lifecycle of a payroll record
    PayrollStatus, "payroll status" {
        Draft => "draft",
        Processed => "processed",
        Paid => "paid",
    }
}

impl PayrollStatus {
    /// Status only moves forward: draft, processed, paid
    pub fn can_transition_to(&self, next: PayrollStatus) -> bool {
        matches!(
            (self, next),
            (PayrollStatus::Draft, PayrollStatus::Processed)
                | (PayrollStatus::Processed, PayrollStatus::Paid)
        )
    }
}

/// Pay computed for one employee over one pay period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayrollRecord {
    pub id: Uuid,
    pub employee_id: EmployeeId,
    pub pay_period_start: NaiveDate,
    pub pay_period_end: NaiveDate,
    pub days_worked: i32,
    pub regular_hours: f64,
    pub overtime_hours: f64,
    pub hourly_rate: f64,
    pub regular_pay: f64,
    pub overtime_pay: f64,
    pub bonuses: f64,
    pub allowances: f64,
    pub gross_pay: f64,
    pub deductions: f64,
    pub tax: f64,
    pub net_pay: f64,
    pub status: PayrollStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payroll query filter
#[derive(Debug, Clone, Default)]
pub struct PayrollFilter {
    pub employee_id: Option<EmployeeId>,
    /// Records whose period ends on or after this date
    pub from: Option<NaiveDate>,
    /// Records whose period starts on or before this date
    pub to: Option<NaiveDate>,
    pub status: Option<PayrollStatus>,
}

impl PayrollFilter {
    pub fn matches(&self, record: &PayrollRecord) -> bool {
        self.employee_id
            .as_ref()
            .is_none_or(|id| &record.employee_id == id)
            && self.from.is_none_or(|from| record.pay_period_end >= from)
            && self.to.is_none_or(|to| record.pay_period_start <= to)
            && self.status.is_none_or(|s| record.status == s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_moves_forward_only() {
        assert!(PayrollStatus::Draft.can_transition_to(PayrollStatus::Processed));
        assert!(PayrollStatus::Processed.can_transition_to(PayrollStatus::Paid));
        assert!(!PayrollStatus::Paid.can_transition_to(PayrollStatus::Draft));
        assert!(!PayrollStatus::Draft.can_transition_to(PayrollStatus::Paid));
        assert!(!PayrollStatus::Draft.can_transition_to(PayrollStatus::Draft));
    }
}
