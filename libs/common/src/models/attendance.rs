//! Attendance record model

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{EmployeeId, text_enum};

text_enum! {
    /// Daily attendance status
    AttendanceStatus, "attendance status" {
        Present => "present",
        Absent => "absent",
        Late => "late",
        HalfDay => "half_day",
        Sick => "sick",
        Vacation => "vacation",
        Holiday => "holiday",
    }
}

impl AttendanceStatus {
    /// Statuses that count as paid leave rather than presence
    pub fn is_leave(&self) -> bool {
        matches!(self, AttendanceStatus::Sick | AttendanceStatus::Vacation)
    }
}

/// One employee's attendance for one date; unique per (employee, date)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: Uuid,
    pub employee_id: EmployeeId,
    pub work_date: NaiveDate,
    pub time_in: Option<NaiveTime>,
    pub time_out: Option<NaiveTime>,
    pub break_minutes: i32,
    pub hours_worked: f64,
    pub overtime_hours: f64,
    pub status: AttendanceStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Attendance query filter
#[derive(Debug, Clone, Default)]
pub struct AttendanceFilter {
    pub employee_id: Option<EmployeeId>,
    pub department: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub status: Option<AttendanceStatus>,
}

impl AttendanceFilter {
    /// Restrict to a single date
    pub fn on(date: NaiveDate) -> Self {
        Self {
            from: Some(date),
            to: Some(date),
            ..Default::default()
        }
    }

    /// Record-level match; the department is resolved by the caller
    pub fn matches(&self, record: &AttendanceRecord, department: Option<&str>) -> bool {
        if let Some(id) = &self.employee_id {
            if &record.employee_id != id {
                return false;
            }
        }
        if let Some(from) = self.from {
            if record.work_date < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if record.work_date > to {
                return false;
            }
        }
        if let Some(status) = self.status {
            if record.status != status {
                return false;
            }
        }
        if let Some(wanted) = &self.department {
            if !department.is_some_and(|d| d.eq_ignore_ascii_case(wanted)) {
                return false;
            }
        }
        true
    }
}
