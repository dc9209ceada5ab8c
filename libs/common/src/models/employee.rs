//! Employee model and related functionality

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{EmployeeId, text_enum};

text_enum! {
    /// Employment status; employees are never hard-deleted
    EmployeeStatus, "employee status" {
        Active => "active",
        Inactive => "inactive",
        Terminated => "terminated",
    }
}

/// Employee entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub employee_id: EmployeeId,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub department: Option<String>,
    pub position: Option<String>,
    pub hire_date: NaiveDate,
    pub hourly_rate: f64,
    pub status: EmployeeStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Employee {
    /// First, middle and last name joined with spaces
    pub fn full_name(&self) -> String {
        [
            Some(self.first_name.as_str()),
            self.middle_name.as_deref(),
            Some(self.last_name.as_str()),
        ]
        .into_iter()
        .flatten()
        .filter(|part| !part.trim().is_empty())
        .collect::<Vec<_>>()
        .join(" ")
    }

    pub fn is_active(&self) -> bool {
        self.status == EmployeeStatus::Active
    }
}

/// Partial employee update; `None` leaves the field untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmployeeUpdate {
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub department: Option<String>,
    pub position: Option<String>,
    pub hire_date: Option<NaiveDate>,
    pub hourly_rate: Option<f64>,
}

impl EmployeeUpdate {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.middle_name.is_none()
            && self.last_name.is_none()
            && self.email.is_none()
            && self.phone.is_none()
            && self.address.is_none()
            && self.department.is_none()
            && self.position.is_none()
            && self.hire_date.is_none()
            && self.hourly_rate.is_none()
    }

    /// Apply the patch onto an employee, bumping `updated_at`
    pub fn apply(self, employee: &mut Employee, now: DateTime<Utc>) {
        if let Some(v) = self.first_name {
            employee.first_name = v;
        }
        if let Some(v) = self.middle_name {
            employee.middle_name = Some(v).filter(|s| !s.trim().is_empty());
        }
        if let Some(v) = self.last_name {
            employee.last_name = v;
        }
        if let Some(v) = self.email {
            employee.email = v;
        }
        if let Some(v) = self.phone {
            employee.phone = Some(v);
        }
        if let Some(v) = self.address {
            employee.address = Some(v);
        }
        if let Some(v) = self.department {
            employee.department = Some(v);
        }
        if let Some(v) = self.position {
            employee.position = Some(v);
        }
        if let Some(v) = self.hire_date {
            employee.hire_date = v;
        }
        if let Some(v) = self.hourly_rate {
            employee.hourly_rate = v;
        }
        employee.updated_at = now;
    }
}

/// Employee listing filter
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmployeeFilter {
    pub status: Option<EmployeeStatus>,
    pub department: Option<String>,
    /// Case-insensitive match on name, email or employee id
    pub search: Option<String>,
}

impl EmployeeFilter {
    pub fn matches(&self, employee: &Employee) -> bool {
        if let Some(status) = self.status {
            if employee.status != status {
                return false;
            }
        }
        if let Some(department) = &self.department {
            if !employee
                .department
                .as_deref()
                .is_some_and(|d| d.eq_ignore_ascii_case(department))
            {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let haystack = format!(
                "{} {} {}",
                employee.full_name(),
                employee.email,
                employee.employee_id
            )
            .to_lowercase();
            if !haystack.contains(&needle) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Employee {
        let now = Utc::now();
        Employee {
            employee_id: EmployeeId::from_number(1),
            first_name: "Erika".into(),
            middle_name: Some("Bianca".into()),
            last_name: "Api".into(),
            email: "erika@example.com".into(),
            phone: None,
            address: None,
            department: Some("Operations".into()),
            position: None,
            hire_date: NaiveDate::from_ymd_opt(2024, 1, 8).unwrap(),
            hourly_rate: 25.0,
            status: EmployeeStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_full_name_skips_missing_parts() {
        let mut e = sample();
        assert_eq!(e.full_name(), "Erika Bianca Api");
        e.middle_name = None;
        assert_eq!(e.full_name(), "Erika Api");
    }

    #[test]
    fn test_update_only_touches_given_fields() {
        let mut e = sample();
        let patch = EmployeeUpdate {
            position: Some("Lead".into()),
            hourly_rate: Some(30.0),
            ..Default::default()
        };
        patch.apply(&mut e, Utc::now());
        assert_eq!(e.position.as_deref(), Some("Lead"));
        assert_eq!(e.hourly_rate, 30.0);
        assert_eq!(e.first_name, "Erika");
    }

    #[test]
    fn test_filter_matches_department_and_search() {
        let e = sample();
        let f = EmployeeFilter {
            department: Some("operations".into()),
            search: Some("bianca".into()),
            ..Default::default()
        };
        assert!(f.matches(&e));
        let f = EmployeeFilter {
            status: Some(EmployeeStatus::Terminated),
            ..Default::default()
        };
        assert!(!f.matches(&e));
    }

    #[test]
    fn test_status_text_roundtrip() {
        assert_eq!("Terminated".parse::<EmployeeStatus>().unwrap(), EmployeeStatus::Terminated);
        assert!("fired".parse::<EmployeeStatus>().is_err());
    }
}
