use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::config::CompanySettings;
use crate::database::models::{AttendanceRecord, AttendanceStatus};
use crate::database::repositories::{AttendanceRepository, EmployeeRepository, LeaveRepository};
use crate::error::{AppError, AttendanceError};

/// Validate a check-in against today's existing record, if any.
pub fn check_in_transition(existing: Option<&AttendanceRecord>) -> Result<(), AttendanceError> {
    if existing.is_some_and(|record| record.check_in.is_some()) {
        return Err(AttendanceError::AlreadyCheckedIn);
    }
    Ok(())
}

/// Validate a check-out and derive the resulting status: late when the
/// check-in clock time exceeds work start plus the grace period. Both sides
/// of that comparison are UTC clock times.
pub fn check_out_transition(
    record: &AttendanceRecord,
    now: DateTime<Utc>,
    settings: &CompanySettings,
) -> Result<AttendanceStatus, AttendanceError> {
    let check_in = record.check_in.ok_or(AttendanceError::NoCheckIn)?;
    if record.check_out.is_some() {
        return Err(AttendanceError::AlreadyCheckedOut);
    }
    if now < check_in {
        return Err(AttendanceError::InvalidOrder);
    }

    let status = if check_in.time() > settings.late_after() {
        AttendanceStatus::Late
    } else {
        AttendanceStatus::Present
    };
    Ok(status)
}

#[derive(Clone)]
pub struct AttendanceService {
    attendance: AttendanceRepository,
    employees: EmployeeRepository,
    leave: LeaveRepository,
    settings: CompanySettings,
}

impl AttendanceService {
    pub fn new(
        attendance: AttendanceRepository,
        employees: EmployeeRepository,
        leave: LeaveRepository,
        settings: CompanySettings,
    ) -> Self {
        Self {
            attendance,
            employees,
            leave,
            settings,
        }
    }

    pub async fn check_in(
        &self,
        employee_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<AttendanceRecord, AppError> {
        let today = now.date_naive();
        let existing = self.attendance.find_for_date(employee_id, today).await?;
        check_in_transition(existing.as_ref())?;

        // The guarded upsert decides races the pre-check cannot see: a row
        // that gained a check-in since the read comes back as None.
        let record = self
            .attendance
            .upsert_check_in(employee_id, today, now)
            .await?
            .ok_or(AttendanceError::AlreadyCheckedIn)?;
        Ok(record)
    }

    pub async fn check_out(
        &self,
        employee_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<AttendanceRecord, AppError> {
        let today = now.date_naive();
        let record = self
            .attendance
            .find_for_date(employee_id, today)
            .await?
            .ok_or(AttendanceError::NoCheckIn)?;

        let status = check_out_transition(&record, now, &self.settings)?;
        let record = self.attendance.set_check_out(record.id, now, status).await?;
        Ok(record)
    }

    /// Daily job: give every employee without a record on `date` one, marked
    /// on_leave when an approved leave covers the day, absent otherwise.
    /// Idempotent through the unique (employee, date) key.
    pub async fn mark_absent_or_on_leave(&self, date: NaiveDate) -> Result<u64> {
        let mut marked = 0;
        for employee in self.employees.list_all().await? {
            if self
                .attendance
                .find_for_date(employee.id, date)
                .await?
                .is_some()
            {
                continue;
            }

            let status = if self.leave.approved_leave_covers(employee.id, date).await? {
                AttendanceStatus::OnLeave
            } else {
                AttendanceStatus::Absent
            };

            if self
                .attendance
                .insert_if_absent(employee.id, date, status)
                .await?
            {
                marked += 1;
            }
        }
        Ok(marked)
    }

    /// Daily job: flag records on `date` with a check-in and no check-out.
    pub async fn flag_missing_checkouts(&self, date: NaiveDate) -> Result<u64> {
        self.attendance.flag_missing_checkouts(date).await
    }

    /// HR correction path for a flagged record.
    pub async fn manual_checkout(
        &self,
        attendance_id: Uuid,
        check_out: DateTime<Utc>,
    ) -> Result<AttendanceRecord, AppError> {
        self.attendance
            .manual_checkout(attendance_id, check_out)
            .await?
            .ok_or_else(|| AppError::NotFound("Attendance record not found".to_string()))
    }

    pub async fn records_for_employee(
        &self,
        employee_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, AppError> {
        Ok(self
            .attendance
            .list_for_employee(employee_id, start, end)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(check_in: Option<&str>, check_out: Option<&str>) -> AttendanceRecord {
        let parse = |s: &str| s.parse::<DateTime<Utc>>().unwrap();
        AttendanceRecord {
            id: Uuid::new_v4(),
            employee_id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            check_in: check_in.map(parse),
            check_out: check_out.map(parse),
            status: AttendanceStatus::Present,
        }
    }

    fn at(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn second_check_in_same_day_is_rejected() {
        let existing = record(Some("2025-03-10T09:00:00Z"), None);
        assert_eq!(
            check_in_transition(Some(&existing)),
            Err(AttendanceError::AlreadyCheckedIn)
        );
    }

    #[test]
    fn check_in_allowed_on_fresh_day_or_job_created_row() {
        assert_eq!(check_in_transition(None), Ok(()));
        // A job-created absent row has no check-in yet.
        let mut row = record(None, None);
        row.status = AttendanceStatus::Absent;
        assert_eq!(check_in_transition(Some(&row)), Ok(()));
    }

    #[test]
    fn check_out_requires_check_in() {
        let row = record(None, None);
        let settings = CompanySettings::default();
        assert_eq!(
            check_out_transition(&row, at("2025-03-10T17:00:00Z"), &settings),
            Err(AttendanceError::NoCheckIn)
        );
    }

    #[test]
    fn double_check_out_is_rejected() {
        let row = record(Some("2025-03-10T09:00:00Z"), Some("2025-03-10T17:00:00Z"));
        let settings = CompanySettings::default();
        assert_eq!(
            check_out_transition(&row, at("2025-03-10T18:00:00Z"), &settings),
            Err(AttendanceError::AlreadyCheckedOut)
        );
    }

    #[test]
    fn check_out_before_check_in_is_rejected() {
        let row = record(Some("2025-03-10T09:00:00Z"), None);
        let settings = CompanySettings::default();
        assert_eq!(
            check_out_transition(&row, at("2025-03-10T08:59:00Z"), &settings),
            Err(AttendanceError::InvalidOrder)
        );
    }

    #[test]
    fn check_in_within_grace_stays_present() {
        // Work starts 09:00, grace 15 minutes.
        let row = record(Some("2025-03-10T09:10:00Z"), None);
        let settings = CompanySettings::default();
        assert_eq!(
            check_out_transition(&row, at("2025-03-10T17:00:00Z"), &settings),
            Ok(AttendanceStatus::Present)
        );
    }

    #[test]
    fn check_in_past_grace_becomes_late() {
        let row = record(Some("2025-03-10T09:20:00Z"), None);
        let settings = CompanySettings::default();
        assert_eq!(
            check_out_transition(&row, at("2025-03-10T17:00:00Z"), &settings),
            Ok(AttendanceStatus::Late)
        );
    }
}
