//! Attendance tracking
//!
//! Clock-in/out, manual corrections and aggregate statistics. Hours are
//! recomputed from `time_in`, `time_out` and `break_minutes` on every write,
//! so stored totals never drift from the times they came from.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use common::DynStore;
use common::models::{AttendanceFilter, AttendanceRecord, AttendanceStatus, EmployeeId};
use common::money::round2;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::services::settings::{Policy, SettingsService};

const MINUTES_PER_DAY: i64 = 24 * 60;

/// Worked and overtime hours for one day
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DayHours {
    pub worked: f64,
    pub overtime: f64,
}

/// Hours between two times minus the break, never negative, rounded to 2dp
///
/// A `time_out` earlier than `time_in` belongs to the next day.
pub fn compute_hours(
    time_in: NaiveTime,
    time_out: NaiveTime,
    break_minutes: i32,
    standard_daily_hours: f64,
) -> DayHours {
    let mut span = (time_out - time_in).num_minutes();
    if span < 0 {
        span += MINUTES_PER_DAY;
    }
    let minutes = span - i64::from(break_minutes);
    let worked = round2((minutes.max(0) as f64) / 60.0);
    let overtime = round2((worked - standard_daily_hours).max(0.0));
    DayHours { worked, overtime }
}

/// Status implied by the recorded times
///
/// Leave and absence statuses are set explicitly and never derived.
pub fn derive_status(
    time_in: NaiveTime,
    time_out: Option<NaiveTime>,
    hours_worked: f64,
    policy: &Policy,
) -> AttendanceStatus {
    if time_out.is_some() && hours_worked < policy.half_day_hours {
        AttendanceStatus::HalfDay
    } else if time_in > policy.late_after() {
        AttendanceStatus::Late
    } else {
        AttendanceStatus::Present
    }
}

fn is_derived(status: AttendanceStatus) -> bool {
    matches!(
        status,
        AttendanceStatus::Present | AttendanceStatus::Late | AttendanceStatus::HalfDay
    )
}

/// Recompute hours, and the status when it is time-derived
fn recalculate(record: &mut AttendanceRecord, policy: &Policy, explicit_status: bool) {
    match (record.time_in, record.time_out) {
        (Some(time_in), Some(time_out)) => {
            let hours = compute_hours(
                time_in,
                time_out,
                record.break_minutes,
                policy.standard_daily_hours,
            );
            record.hours_worked = hours.worked;
            record.overtime_hours = hours.overtime;
        }
        _ => {
            record.hours_worked = 0.0;
            record.overtime_hours = 0.0;
        }
    }

    if !explicit_status && is_derived(record.status) {
        if let Some(time_in) = record.time_in {
            record.status = derive_status(time_in, record.time_out, record.hours_worked, policy);
        }
    }
}

fn check_times(time_in: Option<NaiveTime>, time_out: Option<NaiveTime>) -> ApiResult<()> {
    match (time_in, time_out) {
        (None, Some(_)) => Err(ApiError::invalid_field(
            "time_out",
            "time_out requires a time_in",
        )),
        (Some(time_in), Some(time_out)) if time_out <= time_in => Err(ApiError::invalid_field(
            "time_out",
            "time_out must be after time_in",
        )),
        _ => Ok(()),
    }
}

fn check_break(break_minutes: i32) -> ApiResult<()> {
    if !(0..=720).contains(&break_minutes) {
        return Err(ApiError::invalid_field(
            "break_minutes",
            "break_minutes must be between 0 and 720",
        ));
    }
    Ok(())
}

/// Manually entered attendance record
#[derive(Debug, Clone, Deserialize)]
pub struct NewAttendance {
    pub employee_id: String,
    pub work_date: NaiveDate,
    pub time_in: Option<NaiveTime>,
    pub time_out: Option<NaiveTime>,
    pub break_minutes: Option<i32>,
    pub status: Option<AttendanceStatus>,
    pub notes: Option<String>,
}

/// Partial correction of an attendance record
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttendanceUpdate {
    pub time_in: Option<NaiveTime>,
    pub time_out: Option<NaiveTime>,
    pub break_minutes: Option<i32>,
    pub status: Option<AttendanceStatus>,
    pub notes: Option<String>,
}

/// Aggregate counts over a set of attendance records
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AttendanceStats {
    pub total: u64,
    pub present: u64,
    pub late: u64,
    pub absent: u64,
    pub half_day: u64,
    pub on_leave: u64,
    pub holiday: u64,
    pub total_hours: f64,
    pub overtime_hours: f64,
    /// Share of records that are present or late, as a percentage
    pub attendance_rate: f64,
}

impl AttendanceStats {
    pub fn from_records(records: &[AttendanceRecord]) -> Self {
        let mut stats = AttendanceStats::default();
        let mut total_hours = 0.0;
        let mut overtime_hours = 0.0;

        for record in records {
            stats.total += 1;
            match record.status {
                AttendanceStatus::Present => stats.present += 1,
                AttendanceStatus::Late => stats.late += 1,
                AttendanceStatus::Absent => stats.absent += 1,
                AttendanceStatus::HalfDay => stats.half_day += 1,
                AttendanceStatus::Sick | AttendanceStatus::Vacation => stats.on_leave += 1,
                AttendanceStatus::Holiday => stats.holiday += 1,
            }
            total_hours += record.hours_worked;
            overtime_hours += record.overtime_hours;
        }

        stats.total_hours = round2(total_hours);
        stats.overtime_hours = round2(overtime_hours);
        stats.attendance_rate = if stats.total == 0 {
            0.0
        } else {
            round2((stats.present + stats.late) as f64 / stats.total as f64 * 100.0)
        };
        stats
    }
}

/// Attendance data service
#[derive(Clone)]
pub struct AttendanceService {
    store: DynStore,
    settings: SettingsService,
}

impl AttendanceService {
    pub fn new(store: DynStore, settings: SettingsService) -> Self {
        Self { store, settings }
    }

    async fn active_employee(&self, id: &EmployeeId) -> ApiResult<()> {
        let employee = self
            .store
            .find_employee(id)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("Employee {id}")))?;
        if !employee.is_active() {
            return Err(ApiError::invalid_field(
                "employee_id",
                format!("Employee {id} is not active"),
            ));
        }
        Ok(())
    }

    /// Start today's work period
    ///
    /// `at` is wall-clock local time; its date is the work date.
    pub async fn clock_in(
        &self,
        employee_id: &EmployeeId,
        at: NaiveDateTime,
        now: DateTime<Utc>,
    ) -> ApiResult<AttendanceRecord> {
        self.active_employee(employee_id).await?;
        let policy = self.settings.policy().await?;
        let work_date = at.date();
        let time_in = at.time();

        if let Some(mut record) = self
            .store
            .find_attendance_for_date(employee_id, work_date)
            .await?
        {
            if record.time_in.is_some() {
                return Err(already_clocked_in());
            }
            record.time_in = Some(time_in);
            record.status = AttendanceStatus::Present;
            record.updated_at = now;
            recalculate(&mut record, &policy, false);
            if !self.store.start_attendance(&record).await? {
                warn!("Concurrent clock-in for {} on {}", employee_id, work_date);
                return Err(already_clocked_in());
            }
            info!("Employee {} clocked in on {}", employee_id, work_date);
            return Ok(record);
        }

        let mut record = AttendanceRecord {
            id: Uuid::new_v4(),
            employee_id: employee_id.clone(),
            work_date,
            time_in: Some(time_in),
            time_out: None,
            break_minutes: policy.default_break_minutes,
            hours_worked: 0.0,
            overtime_hours: 0.0,
            status: AttendanceStatus::Present,
            notes: None,
            created_at: now,
            updated_at: now,
        };
        recalculate(&mut record, &policy, false);

        match self.store.insert_attendance(&record).await {
            Ok(()) => {
                info!("Employee {} clocked in on {}", employee_id, work_date);
                Ok(record)
            }
            Err(e) if e.is_conflict_on("work_date") => {
                warn!("Concurrent clock-in for {} on {}", employee_id, work_date);
                Err(already_clocked_in())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Close the open work period and compute its hours
    ///
    /// Today's record is closed when it has a clock-in. Otherwise a shift
    /// still open from yesterday is closed across midnight, provided less
    /// than a day has passed since its clock-in.
    pub async fn clock_out(
        &self,
        employee_id: &EmployeeId,
        at: NaiveDateTime,
        now: DateTime<Utc>,
    ) -> ApiResult<AttendanceRecord> {
        let policy = self.settings.policy().await?;
        let time_out = at.time();

        let today = self
            .store
            .find_attendance_for_date(employee_id, at.date())
            .await?
            .filter(|r| r.time_in.is_some());
        let mut record = match today {
            Some(record) => {
                if record.time_out.is_some() {
                    return Err(already_clocked_out());
                }
                if record.time_in.is_some_and(|time_in| time_out <= time_in) {
                    return Err(ApiError::invalid_field(
                        "time_out",
                        "Clock-out must be after clock-in",
                    ));
                }
                record
            }
            None => self
                .open_overnight(employee_id, at)
                .await?
                .ok_or_else(|| {
                    ApiError::conflict(
                        "NOT_CLOCKED_IN",
                        "No clock-in recorded for today",
                        Some("time_in"),
                    )
                })?,
        };

        record.time_out = Some(time_out);
        record.updated_at = now;
        recalculate(&mut record, &policy, false);
        if !self.store.finish_attendance(&record).await? {
            warn!("Concurrent clock-out for {} on {}", employee_id, record.work_date);
            return Err(already_clocked_out());
        }

        info!(
            "Employee {} clocked out on {} after {} hours",
            employee_id, record.work_date, record.hours_worked
        );
        Ok(record)
    }

    /// Yesterday's record when it is still open and began later in the day than `at`
    async fn open_overnight(
        &self,
        employee_id: &EmployeeId,
        at: NaiveDateTime,
    ) -> ApiResult<Option<AttendanceRecord>> {
        let Some(yesterday) = at.date().pred_opt() else {
            return Ok(None);
        };
        let record = self
            .store
            .find_attendance_for_date(employee_id, yesterday)
            .await?;
        Ok(record.filter(|r| {
            r.time_out.is_none() && r.time_in.is_some_and(|time_in| at.time() < time_in)
        }))
    }

    /// Record attendance entered by a manager
    pub async fn create_entry(
        &self,
        input: NewAttendance,
        now: DateTime<Utc>,
    ) -> ApiResult<AttendanceRecord> {
        let employee_id = EmployeeId::parse(&input.employee_id)?;
        self.active_employee(&employee_id).await?;
        check_times(input.time_in, input.time_out)?;

        let policy = self.settings.policy().await?;
        let break_minutes = input.break_minutes.unwrap_or(policy.default_break_minutes);
        check_break(break_minutes)?;

        let status = match (input.status, input.time_in) {
            (Some(status), _) => status,
            (None, Some(_)) => AttendanceStatus::Present,
            (None, None) => {
                return Err(ApiError::invalid_field(
                    "status",
                    "status is required when no time_in is given",
                ));
            }
        };

        let mut record = AttendanceRecord {
            id: Uuid::new_v4(),
            employee_id,
            work_date: input.work_date,
            time_in: input.time_in,
            time_out: input.time_out,
            break_minutes,
            hours_worked: 0.0,
            overtime_hours: 0.0,
            status,
            notes: input.notes,
            created_at: now,
            updated_at: now,
        };
        recalculate(&mut record, &policy, input.status.is_some());

        self.store
            .insert_attendance(&record)
            .await
            .map_err(|e| match e {
                e if e.is_conflict_on("work_date") => ApiError::conflict(
                    "DUPLICATE_ATTENDANCE",
                    "Attendance already recorded for this date",
                    Some("work_date"),
                ),
                e => e.into(),
            })?;

        info!(
            "Manual attendance for {} on {}",
            record.employee_id, record.work_date
        );
        Ok(record)
    }

    /// Correct an existing record
    pub async fn update_entry(
        &self,
        id: Uuid,
        patch: AttendanceUpdate,
        now: DateTime<Utc>,
    ) -> ApiResult<AttendanceRecord> {
        let mut record = self.get(id).await?;
        let policy = self.settings.policy().await?;

        if let Some(time_in) = patch.time_in {
            record.time_in = Some(time_in);
        }
        if let Some(time_out) = patch.time_out {
            record.time_out = Some(time_out);
        }
        if let Some(break_minutes) = patch.break_minutes {
            check_break(break_minutes)?;
            record.break_minutes = break_minutes;
        }
        if let Some(status) = patch.status {
            record.status = status;
        }
        if let Some(notes) = patch.notes {
            record.notes = Some(notes).filter(|n| !n.trim().is_empty());
        }
        // Overnight shifts are stored with time_out before time_in.
        if patch.time_in.is_some() || patch.time_out.is_some() {
            check_times(record.time_in, record.time_out)?;
        }

        record.updated_at = now;
        recalculate(&mut record, &policy, patch.status.is_some());

        if !self.store.update_attendance(&record).await? {
            return Err(ApiError::not_found(format!("Attendance record {id}")));
        }
        info!("Attendance record {} corrected", id);
        Ok(record)
    }

    pub async fn delete_entry(&self, id: Uuid) -> ApiResult<()> {
        if !self.store.delete_attendance(id).await? {
            return Err(ApiError::not_found(format!("Attendance record {id}")));
        }
        info!("Attendance record {} deleted", id);
        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> ApiResult<AttendanceRecord> {
        self.store
            .find_attendance(id)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("Attendance record {id}")))
    }

    pub async fn list(&self, filter: &AttendanceFilter) -> ApiResult<Vec<AttendanceRecord>> {
        check_range(filter.from, filter.to)?;
        Ok(self.store.list_attendance(filter).await?)
    }

    pub async fn stats(&self, filter: &AttendanceFilter) -> ApiResult<AttendanceStats> {
        let records = self.list(filter).await?;
        Ok(AttendanceStats::from_records(&records))
    }
}

fn already_clocked_in() -> ApiError {
    ApiError::conflict(
        "ALREADY_CLOCKED_IN",
        "Already clocked in today",
        Some("time_in"),
    )
}

fn already_clocked_out() -> ApiError {
    ApiError::conflict(
        "ALREADY_CLOCKED_OUT",
        "Already clocked out today",
        Some("time_out"),
    )
}

/// Reject ranges that end before they start
pub fn check_range(from: Option<NaiveDate>, to: Option<NaiveDate>) -> ApiResult<()> {
    match (from, to) {
        (Some(from), Some(to)) if from > to => Err(ApiError::invalid_field(
            "from",
            "from must not be after to",
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::models::{Account, Employee, EmployeeStatus, Role};
    use common::{MemoryStore, Store};
    use std::sync::Arc;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn on(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap().and_time(t(h, m))
    }

    async fn service() -> (AttendanceService, EmployeeId) {
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();
        let employee = Employee {
            employee_id: EmployeeId::from_number(7),
            first_name: "Erika".into(),
            middle_name: None,
            last_name: "Santos".into(),
            email: "erika@example.com".into(),
            phone: None,
            address: None,
            department: None,
            position: None,
            hire_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            hourly_rate: 25.0,
            status: EmployeeStatus::Active,
            created_at: now,
            updated_at: now,
        };
        let account = Account::new(
            employee.employee_id.clone(),
            "erikasantos".into(),
            "hash".into(),
            Role::Employee,
            now,
        );
        store
            .create_employee_with_account(&employee, &account)
            .await
            .unwrap();

        let settings = SettingsService::new(store.clone(), Policy::default());
        (
            AttendanceService::new(store, settings),
            employee.employee_id,
        )
    }

    fn record(status: AttendanceStatus, hours: f64, overtime: f64) -> AttendanceRecord {
        AttendanceRecord {
            id: Uuid::new_v4(),
            employee_id: EmployeeId::from_number(1),
            work_date: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            time_in: None,
            time_out: None,
            break_minutes: 0,
            hours_worked: hours,
            overtime_hours: overtime,
            status,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_compute_hours_subtracts_break() {
        let hours = compute_hours(t(8, 0), t(17, 0), 60, 8.0);
        assert_eq!(hours, DayHours { worked: 8.0, overtime: 0.0 });

        let hours = compute_hours(t(8, 0), t(17, 0), 0, 8.0);
        assert_eq!(hours, DayHours { worked: 9.0, overtime: 1.0 });
    }

    #[test]
    fn test_compute_hours_rounds_and_clamps() {
        assert_eq!(compute_hours(t(8, 0), t(8, 20), 0, 8.0).worked, 0.33);
        assert_eq!(compute_hours(t(8, 0), t(8, 30), 60, 8.0).worked, 0.0);
    }

    #[test]
    fn test_derive_status() {
        let policy = Policy::default();
        assert_eq!(derive_status(t(8, 15), None, 0.0, &policy), AttendanceStatus::Present);
        assert_eq!(derive_status(t(8, 16), None, 0.0, &policy), AttendanceStatus::Late);
        assert_eq!(
            derive_status(t(8, 0), Some(t(11, 0)), 3.0, &policy),
            AttendanceStatus::HalfDay
        );
    }

    #[test]
    fn test_explicit_status_survives_recalculation() {
        let policy = Policy::default();
        let mut r = record(AttendanceStatus::Sick, 0.0, 0.0);
        r.time_in = Some(t(9, 0));
        recalculate(&mut r, &policy, false);
        assert_eq!(r.status, AttendanceStatus::Sick);

        let mut r = record(AttendanceStatus::Present, 0.0, 0.0);
        r.time_in = Some(t(9, 0));
        recalculate(&mut r, &policy, true);
        assert_eq!(r.status, AttendanceStatus::Present);
    }

    #[test]
    fn test_stats_rate_and_totals() {
        let records = vec![
            record(AttendanceStatus::Present, 8.0, 0.0),
            record(AttendanceStatus::Late, 9.5, 1.5),
            record(AttendanceStatus::Absent, 0.0, 0.0),
            record(AttendanceStatus::Vacation, 0.0, 0.0),
            record(AttendanceStatus::Sick, 0.0, 0.0),
            record(AttendanceStatus::HalfDay, 3.25, 0.0),
        ];
        let stats = AttendanceStats::from_records(&records);
        assert_eq!(stats.total, 6);
        assert_eq!(stats.present, 1);
        assert_eq!(stats.late, 1);
        assert_eq!(stats.on_leave, 2);
        assert_eq!(stats.total_hours, 20.75);
        assert_eq!(stats.overtime_hours, 1.5);
        assert_eq!(stats.attendance_rate, 33.33);
    }

    #[test]
    fn test_stats_of_nothing_is_zero() {
        let stats = AttendanceStats::from_records(&[]);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.attendance_rate, 0.0);
    }

    #[test]
    fn test_compute_hours_across_midnight() {
        let hours = compute_hours(t(22, 0), t(6, 0), 0, 8.0);
        assert_eq!(hours, DayHours { worked: 8.0, overtime: 0.0 });
    }

    #[tokio::test]
    async fn test_clock_out_without_clock_in() {
        let (attendance, id) = service().await;
        let err = attendance
            .clock_out(&id, on(4, 17, 0), Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "NOT_CLOCKED_IN");
    }

    #[tokio::test]
    async fn test_clock_in_then_out_computes_overtime() {
        let (attendance, id) = service().await;
        attendance.clock_in(&id, on(4, 8, 0), Utc::now()).await.unwrap();

        let record = attendance
            .clock_out(&id, on(4, 17, 0), Utc::now())
            .await
            .unwrap();
        assert_eq!(record.time_out, Some(t(17, 0)));
        assert_eq!(record.hours_worked, 9.0);
        assert_eq!(record.overtime_hours, 1.0);
        assert_eq!(record.status, AttendanceStatus::Present);

        let stored = attendance.get(record.id).await.unwrap();
        assert_eq!(stored.hours_worked, 9.0);

        let err = attendance
            .clock_out(&id, on(4, 18, 0), Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "ALREADY_CLOCKED_OUT");
    }

    #[tokio::test]
    async fn test_clock_out_closes_overnight_shift() {
        let (attendance, id) = service().await;
        let started = attendance.clock_in(&id, on(4, 22, 0), Utc::now()).await.unwrap();

        let record = attendance
            .clock_out(&id, on(5, 6, 0), Utc::now())
            .await
            .unwrap();
        assert_eq!(record.id, started.id);
        assert_eq!(record.work_date, NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
        assert_eq!(record.hours_worked, 8.0);

        let err = attendance
            .clock_out(&id, on(5, 7, 0), Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "NOT_CLOCKED_IN");
    }

    #[tokio::test]
    async fn test_shift_open_for_a_day_is_not_closed() {
        let (attendance, id) = service().await;
        attendance.clock_in(&id, on(4, 8, 0), Utc::now()).await.unwrap();

        let err = attendance
            .clock_out(&id, on(5, 9, 0), Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "NOT_CLOCKED_IN");
    }

    #[tokio::test]
    async fn test_clock_in_fills_record_without_time_in_once() {
        let (attendance, id) = service().await;
        let absent = attendance
            .create_entry(
                NewAttendance {
                    employee_id: id.to_string(),
                    work_date: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
                    time_in: None,
                    time_out: None,
                    break_minutes: None,
                    status: Some(AttendanceStatus::Absent),
                    notes: None,
                },
                Utc::now(),
            )
            .await
            .unwrap();

        let record = attendance.clock_in(&id, on(4, 8, 5), Utc::now()).await.unwrap();
        assert_eq!(record.id, absent.id);
        assert_eq!(record.status, AttendanceStatus::Present);

        let err = attendance
            .clock_in(&id, on(4, 9, 0), Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "ALREADY_CLOCKED_IN");
        assert_eq!(attendance.get(absent.id).await.unwrap().time_in, Some(t(8, 5)));
    }

    #[test]
    fn test_range_check() {
        let d = |day| NaiveDate::from_ymd_opt(2024, 3, day).unwrap();
        assert!(check_range(Some(d(1)), Some(d(1))).is_ok());
        assert!(check_range(Some(d(2)), Some(d(1))).is_err());
        assert!(check_range(None, Some(d(1))).is_ok());
    }
}
