//! Query strings and small request bodies

use chrono::NaiveDate;
use common::models::{
    AttendanceFilter, AttendanceStatus, EmployeeId, EmployeeStatus, PayrollFilter, PayrollStatus,
};
use serde::Deserialize;

use crate::error::ApiResult;

fn parse_id(raw: Option<&str>) -> ApiResult<Option<EmployeeId>> {
    Ok(raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(EmployeeId::parse)
        .transpose()?)
}

/// `GET /api/attendance`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttendanceQuery {
    pub employee_id: Option<String>,
    pub date: Option<NaiveDate>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub department: Option<String>,
    pub status: Option<AttendanceStatus>,
}

impl AttendanceQuery {
    /// A single `date` takes precedence over `from`/`to`
    pub fn into_filter(self) -> ApiResult<AttendanceFilter> {
        let (from, to) = match self.date {
            Some(date) => (Some(date), Some(date)),
            None => (self.from, self.to),
        };
        Ok(AttendanceFilter {
            employee_id: parse_id(self.employee_id.as_deref())?,
            department: self.department.filter(|d| !d.trim().is_empty()),
            from,
            to,
            status: self.status,
        })
    }
}

/// `GET /api/attendance/stats`
pub type StatsQuery = AttendanceQuery;

/// `GET /api/payroll`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PayrollQuery {
    pub employee_id: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub status: Option<PayrollStatus>,
}

impl PayrollQuery {
    pub fn into_filter(self) -> ApiResult<PayrollFilter> {
        Ok(PayrollFilter {
            employee_id: parse_id(self.employee_id.as_deref())?,
            from: self.from,
            to: self.to,
            status: self.status,
        })
    }
}

/// `DELETE /api/employees/:id`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeleteEmployeeQuery {
    pub status: Option<EmployeeStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockAction {
    In,
    Out,
}

/// `POST /api/attendance/clock`
#[derive(Debug, Clone, Deserialize)]
pub struct ClockRequest {
    pub action: ClockAction,
    /// Staff only; defaults to the caller
    pub employee_id: Option<String>,
}

impl ClockRequest {
    pub fn target(&self) -> ApiResult<Option<EmployeeId>> {
        parse_id(self.employee_id.as_deref())
    }
}

/// `PUT /api/payroll/:id/status`
#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpdate {
    pub status: PayrollStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_date_overrides_range() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let filter = AttendanceQuery {
            employee_id: Some("emp_1".into()),
            date: Some(day),
            from: NaiveDate::from_ymd_opt(2024, 1, 1),
            ..Default::default()
        }
        .into_filter()
        .unwrap();

        assert_eq!(filter.from, Some(day));
        assert_eq!(filter.to, Some(day));
        assert_eq!(filter.employee_id, Some(EmployeeId::from_number(1)));
    }

    #[test]
    fn test_bad_employee_id_is_a_validation_error() {
        let query = PayrollQuery {
            employee_id: Some("bob".into()),
            ..Default::default()
        };
        assert!(query.into_filter().is_err());
    }

    #[test]
    fn test_clock_action_is_lowercase() {
        let request: ClockRequest = serde_json::from_str(r#"{"action":"out"}"#).unwrap();
        assert_eq!(request.action, ClockAction::Out);
        assert_eq!(request.target().unwrap(), None);
    }
}
