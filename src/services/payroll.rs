use anyhow::Result;
use bigdecimal::{BigDecimal, RoundingMode};
use chrono::{Datelike, NaiveDate};
use regex::Regex;
use sqlx::PgPool;
use std::collections::HashSet;
use uuid::Uuid;

use crate::config::CompanySettings;
use crate::database::models::{
    AttendanceRecord, AttendanceStatus, PayrollBreakdown, PayrollPeriod, PayrollPeriodInput,
    PayrollRecord, PayrollRow, PayrollRunSummary, PayrollStatus, hours_between,
};
use crate::database::repositories::{
    AttendanceRepository, EmployeeRepository, LeaveRepository, PayrollRepository,
};
use crate::database::transaction::with_transaction;
use crate::error::{AppError, PayrollError};

/// Everything the engine needs to price one employee for a period. Gathered
/// from the ledgers, consumed by the pure computation below.
#[derive(Debug, Clone)]
pub struct EmployeePayrollFacts {
    pub employee_id: Uuid,
    pub fullname: String,
    pub base_salary: BigDecimal,
    pub overtime_rate: BigDecimal,
    pub attendance: Vec<AttendanceRecord>,
    /// Approved unpaid leave windows overlapping the period.
    pub unpaid_leaves: Vec<(NaiveDate, NaiveDate)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PayrollFigures {
    pub gross: BigDecimal,
    pub overtime_pay: BigDecimal,
    pub deduction: BigDecimal,
    pub net: BigDecimal,
    pub total_hours: BigDecimal,
    pub breakdown: PayrollBreakdown,
}

fn round2(value: BigDecimal) -> BigDecimal {
    value.with_scale_round(2, RoundingMode::HalfUp)
}

/// Count configured weekdays between start and end inclusive. With the
/// default of 5 days per week this is Mon-Fri.
pub fn working_days(start: NaiveDate, end: NaiveDate, days_per_week: u32) -> i64 {
    let mut count = 0;
    let mut day = start;
    while day <= end {
        if day.weekday().num_days_from_monday() < days_per_week {
            count += 1;
        }
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }
    count
}

/// Unpaid leave dates inside the period, deduplicated across windows. This
/// is the single source of truth the engine uses to classify a day as
/// unpaid, whether or not the attendance job already wrote an on_leave row
/// for it.
fn unpaid_dates_in_period(
    windows: &[(NaiveDate, NaiveDate)],
    period_start: NaiveDate,
    period_end: NaiveDate,
) -> HashSet<NaiveDate> {
    let mut dates = HashSet::new();
    for &(start, end) in windows {
        let mut day = start.max(period_start);
        let clipped_end = end.min(period_end);
        while day <= clipped_end {
            dates.insert(day);
            match day.succ_opt() {
                Some(next) => day = next,
                None => break,
            }
        }
    }
    dates
}

/// Deterministic per-employee computation. Rounding is half-up to 2 decimal
/// places at each step, in this exact order: daily rate, base pay,
/// deduction, overtime pay. The order affects the final cent value and must
/// not change.
pub fn compute_employee(
    facts: &EmployeePayrollFacts,
    period: &PayrollPeriod,
    settings: &CompanySettings,
) -> PayrollFigures {
    let total_working_days =
        working_days(period.start_date, period.end_date, settings.working_days_per_week).max(1);
    let standard_hours = settings.standard_work_hours();

    let mut total_hours = BigDecimal::from(0);
    let mut overtime_hours = BigDecimal::from(0);
    let mut paid_days: i64 = 0;
    let mut unpaid_days: i64 = 0;

    let unpaid_dates =
        unpaid_dates_in_period(&facts.unpaid_leaves, period.start_date, period.end_date);
    let mut attended_dates = HashSet::new();

    for att in &facts.attendance {
        attended_dates.insert(att.date);
        match att.status {
            AttendanceStatus::Present | AttendanceStatus::Late | AttendanceStatus::MissingCheckout => {
                let hours = match (att.check_in, att.check_out) {
                    (Some(_), Some(_)) => att.hours_worked(),
                    (Some(check_in), None) => {
                        // Missing checkout: assume the configured work-end time.
                        let assumed = att.date.and_time(settings.work_end).and_utc();
                        if assumed > check_in {
                            hours_between(check_in, assumed)
                        } else {
                            BigDecimal::from(0)
                        }
                    }
                    _ => BigDecimal::from(0),
                };

                if hours > standard_hours {
                    overtime_hours += &hours - &standard_hours;
                }
                total_hours += hours;
                paid_days += 1;
            }
            AttendanceStatus::OnLeave => {
                // A day covered by approved unpaid leave is unpaid even when
                // the attendance job recorded it as on_leave.
                if unpaid_dates.contains(&att.date) {
                    unpaid_days += 1;
                } else {
                    paid_days += 1;
                }
            }
            AttendanceStatus::Absent => {
                unpaid_days += 1;
            }
        }
    }

    // Unpaid leave days with no attendance row at all still deduct.
    for date in &unpaid_dates {
        if !attended_dates.contains(date) {
            unpaid_days += 1;
        }
    }

    let daily_rate = round2(&facts.base_salary / BigDecimal::from(total_working_days));
    let base_pay = round2(&daily_rate * BigDecimal::from(paid_days));
    let deduction = round2(&daily_rate * BigDecimal::from(unpaid_days));
    let overtime_pay = round2(&overtime_hours * &facts.overtime_rate);
    let gross = &base_pay + &overtime_pay;
    let net = &gross - &deduction;

    PayrollFigures {
        gross,
        overtime_pay,
        deduction,
        net,
        total_hours,
        breakdown: PayrollBreakdown {
            daily_rate: daily_rate.to_string(),
            paid_days,
            unpaid_days,
            overtime_hours: round2(overtime_hours).to_string(),
            base_salary: round2(facts.base_salary.clone()).to_string(),
        },
    }
}

pub fn payslip_filename(fullname: &str, period: &PayrollPeriod) -> String {
    let re = Regex::new(r"[^\w\s-]").unwrap();
    let safe_name = re.replace_all(fullname, "").trim().replace(' ', "_");
    format!(
        "payslips/payslip_{}_{}_{}.docx",
        safe_name, period.start_date, period.end_date
    )
}

#[derive(Clone)]
pub struct PayrollService {
    pool: PgPool,
    employees: EmployeeRepository,
    attendance: AttendanceRepository,
    leave: LeaveRepository,
    payroll: PayrollRepository,
    settings: CompanySettings,
}

impl PayrollService {
    pub fn new(
        pool: PgPool,
        employees: EmployeeRepository,
        attendance: AttendanceRepository,
        leave: LeaveRepository,
        payroll: PayrollRepository,
        settings: CompanySettings,
    ) -> Self {
        Self {
            pool,
            employees,
            attendance,
            leave,
            payroll,
            settings,
        }
    }

    pub async fn create_period(
        &self,
        input: &PayrollPeriodInput,
    ) -> Result<PayrollPeriod, AppError> {
        if input.end_date < input.start_date {
            return Err(PayrollError::InvalidDates.into());
        }
        if self
            .payroll
            .find_period_by_range(input.start_date, input.end_date)
            .await?
            .is_some()
        {
            return Err(PayrollError::DuplicatePeriod.into());
        }

        let period = self
            .payroll
            .create_period(input.start_date, input.end_date)
            .await?;
        Ok(period)
    }

    /// Run the engine for one period, optionally restricted to a single
    /// employee for targeted recomputation. Holds an exclusive lock on the
    /// period row for the whole run; all per-employee upserts commit or roll
    /// back together. Re-running with unchanged ledgers overwrites rows with
    /// identical figures.
    pub async fn compute_period(
        &self,
        period_id: Uuid,
        only_employee: Option<Uuid>,
    ) -> Result<PayrollRunSummary, AppError> {
        let service = self.clone();

        with_transaction(&self.pool, move |tx| {
            Box::pin(async move {
                let period = service
                    .payroll
                    .find_period_for_update(tx, period_id)
                    .await?
                    .ok_or(PayrollError::PeriodNotFound)?;

                // Policy: a closed period is frozen; recomputation is an
                // explicit state conflict rather than a silent overwrite.
                if period.is_closed {
                    return Err(PayrollError::PeriodClosed.into());
                }

                let employees = match only_employee {
                    Some(id) => service
                        .employees
                        .find_by_id(id)
                        .await?
                        .map(|employee| vec![employee])
                        .unwrap_or_default(),
                    None => service.employees.list_all().await?,
                };

                let mut rows = Vec::with_capacity(employees.len());
                for employee in employees {
                    let facts = service.gather_facts(&employee.id, &employee.fullname, &period).await?;
                    let figures = compute_employee(&facts, &period, &service.settings);
                    let breakdown = serde_json::to_value(&figures.breakdown)
                        .map_err(|err| AppError::internal_server_error_message(err.to_string()))?;

                    // Closed periods never reach this point, so freshly
                    // computed rows are always drafts; close_period is what
                    // finalizes them.
                    service
                        .payroll
                        .upsert_record(
                            tx,
                            facts.employee_id,
                            period.id,
                            &figures.gross,
                            &figures.overtime_pay,
                            &figures.deduction,
                            &figures.net,
                            &service.settings.currency,
                            &breakdown,
                            PayrollStatus::Draft,
                        )
                        .await?;

                    rows.push(PayrollRow {
                        employee: facts.fullname,
                        gross: figures.gross,
                        net: figures.net,
                    });
                }

                Ok(PayrollRunSummary {
                    message: "Payroll calculation completed successfully!".to_string(),
                    period: format!("{} to {}", period.start_date, period.end_date),
                    result: rows,
                })
            })
        })
        .await
    }

    async fn gather_facts(
        &self,
        employee_id: &Uuid,
        fullname: &str,
        period: &PayrollPeriod,
    ) -> Result<EmployeePayrollFacts, AppError> {
        let profile = self.employees.payment_profile(*employee_id).await?;
        let (base_salary, overtime_rate) = match profile {
            Some(profile) => (profile.base_salary, profile.overtime_rate),
            None => (BigDecimal::from(0), BigDecimal::from(0)),
        };

        let attendance = self
            .attendance
            .list_for_employee(*employee_id, period.start_date, period.end_date)
            .await?;

        let unpaid_leaves = self
            .leave
            .approved_unpaid_overlapping(*employee_id, period.start_date, period.end_date)
            .await?
            .into_iter()
            .map(|request| (request.start_date, request.end_date))
            .collect();

        Ok(EmployeePayrollFacts {
            employee_id: *employee_id,
            fullname: fullname.to_string(),
            base_salary,
            overtime_rate,
            attendance,
            unpaid_leaves,
        })
    }

    /// Close the period and finalize its draft rows atomically.
    pub async fn close_period(&self, period_id: Uuid) -> Result<PayrollPeriod, AppError> {
        let payroll = self.payroll.clone();

        with_transaction(&self.pool, move |tx| {
            Box::pin(async move {
                let period = payroll
                    .find_period_for_update(tx, period_id)
                    .await?
                    .ok_or(PayrollError::PeriodNotFound)?;
                if period.is_closed {
                    return Err(PayrollError::PeriodClosed.into());
                }

                let closed = payroll.close_period(tx, period_id).await?;
                Ok(closed)
            })
        })
        .await
    }

    /// Acquire the single-writer payslip guard for a record.
    pub async fn begin_payslip(&self, payroll_id: Uuid) -> Result<PayrollRecord, AppError> {
        let record = self
            .payroll
            .find_record(payroll_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Payroll record not found".to_string()))?;

        if !self.payroll.try_begin_generation(payroll_id).await? {
            return Err(PayrollError::GenerationInProgress.into());
        }
        Ok(record)
    }

    /// Worker side of payslip generation: write the artifact reference back
    /// and clear the guard. The guard is cleared even when the generation
    /// itself fails, so a retry can re-acquire it.
    pub async fn finish_payslip(&self, payroll_id: Uuid) -> Result<()> {
        match self.payslip_reference(payroll_id).await {
            Ok(reference) => {
                self.payroll
                    .finish_generation(payroll_id, Some(&reference))
                    .await?;
                log::info!("Payslip ready for payroll {}: {}", payroll_id, reference);
                Ok(())
            }
            Err(err) => {
                self.payroll.finish_generation(payroll_id, None).await?;
                Err(err)
            }
        }
    }

    async fn payslip_reference(&self, payroll_id: Uuid) -> Result<String> {
        let record = self
            .payroll
            .find_record(payroll_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Payroll record {} not found", payroll_id))?;
        let employee = self
            .employees
            .find_by_id(record.employee_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Employee {} not found", record.employee_id))?;
        let period = self
            .payroll
            .find_period(record.period_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Period {} not found", record.period_id))?;

        Ok(payslip_filename(&employee.fullname, &period))
    }

    pub async fn find_period(&self, id: Uuid) -> Result<Option<PayrollPeriod>, AppError> {
        Ok(self.payroll.find_period(id).await?)
    }

    pub async fn list_periods(&self) -> Result<Vec<PayrollPeriod>, AppError> {
        Ok(self.payroll.list_periods().await?)
    }

    pub async fn records_for_period(&self, period_id: Uuid) -> Result<Vec<PayrollRecord>, AppError> {
        Ok(self.payroll.list_records_for_period(period_id).await?)
    }

    pub async fn records_for_employee(
        &self,
        employee_id: Uuid,
    ) -> Result<Vec<PayrollRecord>, AppError> {
        Ok(self.payroll.list_records_for_employee(employee_id).await?)
    }

    pub async fn find_record(&self, id: Uuid) -> Result<Option<PayrollRecord>, AppError> {
        Ok(self.payroll.find_record(id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn period(start: NaiveDate, end: NaiveDate) -> PayrollPeriod {
        PayrollPeriod {
            id: Uuid::new_v4(),
            start_date: start,
            end_date: end,
            is_closed: false,
        }
    }

    fn worked(date: NaiveDate, check_in: &str, check_out: &str) -> AttendanceRecord {
        let parse = |s: &str| {
            format!("{}T{}:00Z", date, s)
                .parse::<DateTime<Utc>>()
                .unwrap()
        };
        AttendanceRecord {
            id: Uuid::new_v4(),
            employee_id: Uuid::new_v4(),
            date,
            check_in: Some(parse(check_in)),
            check_out: Some(parse(check_out)),
            status: AttendanceStatus::Present,
        }
    }

    fn status_only(date: NaiveDate, status: AttendanceStatus) -> AttendanceRecord {
        AttendanceRecord {
            id: Uuid::new_v4(),
            employee_id: Uuid::new_v4(),
            date,
            check_in: None,
            check_out: None,
            status,
        }
    }

    fn facts(
        base_salary: &str,
        overtime_rate: &str,
        attendance: Vec<AttendanceRecord>,
    ) -> EmployeePayrollFacts {
        EmployeePayrollFacts {
            employee_id: Uuid::new_v4(),
            fullname: "Asha Rao".to_string(),
            base_salary: dec(base_salary),
            overtime_rate: dec(overtime_rate),
            attendance,
            unpaid_leaves: vec![],
        }
    }

    #[test]
    fn working_days_counts_weekdays() {
        // January 2025: 23 weekdays; Jan 1 is a Wednesday.
        assert_eq!(working_days(d(2025, 1, 1), d(2025, 1, 31), 5), 23);
        // A single Saturday counts zero.
        assert_eq!(working_days(d(2025, 1, 4), d(2025, 1, 4), 5), 0);
        // Six-day weeks include Saturdays.
        assert_eq!(working_days(d(2025, 1, 4), d(2025, 1, 5), 6), 1);
    }

    #[test]
    fn full_month_with_leave_and_absence() {
        // 22 working days, base 22000 -> daily rate 1000.00. Twenty worked
        // 8h days, one approved paid leave day, one absent day.
        let start = d(2025, 9, 1);
        let end = d(2025, 9, 30);
        assert_eq!(working_days(start, end, 5), 22);

        let mut attendance = Vec::new();
        let mut day = start;
        let mut worked_days = 0;
        while worked_days < 20 {
            if day.weekday().num_days_from_monday() < 5 {
                attendance.push(worked(day, "09:00", "17:00"));
                worked_days += 1;
            }
            day = day.succ_opt().unwrap();
        }
        // Next two weekdays: one on approved leave, one absent.
        while day.weekday().num_days_from_monday() >= 5 {
            day = day.succ_opt().unwrap();
        }
        attendance.push(status_only(day, AttendanceStatus::OnLeave));
        day = day.succ_opt().unwrap();
        while day.weekday().num_days_from_monday() >= 5 {
            day = day.succ_opt().unwrap();
        }
        attendance.push(status_only(day, AttendanceStatus::Absent));

        let figures = compute_employee(
            &facts("22000", "100", attendance),
            &period(start, end),
            &CompanySettings::default(),
        );

        assert_eq!(figures.breakdown.daily_rate, "1000.00");
        assert_eq!(figures.breakdown.paid_days, 21);
        assert_eq!(figures.breakdown.unpaid_days, 1);
        assert_eq!(figures.overtime_pay, dec("0.00"));
        assert_eq!(figures.gross, dec("21000.00"));
        assert_eq!(figures.deduction, dec("1000.00"));
        assert_eq!(figures.net, dec("20000.00"));
    }

    #[test]
    fn overtime_is_priced_per_hour_over_standard() {
        // 9.5h worked against an 8h day: 1.5 overtime hours at 100/h.
        let day = d(2025, 9, 1);
        let figures = compute_employee(
            &facts("0", "100", vec![worked(day, "09:00", "18:30")]),
            &period(day, day),
            &CompanySettings::default(),
        );
        assert_eq!(figures.total_hours, dec("9.5"));
        assert_eq!(figures.breakdown.overtime_hours, "1.50");
        assert_eq!(figures.overtime_pay, dec("150.00"));
        assert_eq!(figures.gross, dec("150.00"));
    }

    #[test]
    fn missing_checkout_assumes_work_end() {
        // Check-in 09:00, no check-out; work ends 17:00, so 8h and no
        // overtime, one paid day.
        let day = d(2025, 9, 1);
        let mut att = worked(day, "09:00", "17:00");
        att.check_out = None;
        att.status = AttendanceStatus::MissingCheckout;

        let figures = compute_employee(
            &facts("2200", "100", vec![att]),
            &period(d(2025, 9, 1), d(2025, 9, 30)),
            &CompanySettings::default(),
        );
        assert_eq!(figures.total_hours, dec("8"));
        assert_eq!(figures.breakdown.paid_days, 1);
        assert_eq!(figures.overtime_pay, dec("0.00"));
    }

    #[test]
    fn unpaid_leave_days_deduct_once() {
        // Three unpaid leave days: one has an on_leave attendance row, two
        // have no row at all. All three deduct, none double-counts.
        let start = d(2025, 9, 1);
        let end = d(2025, 9, 30);
        let mut f = facts(
            "22000",
            "0",
            vec![status_only(d(2025, 9, 2), AttendanceStatus::OnLeave)],
        );
        f.unpaid_leaves = vec![(d(2025, 9, 2), d(2025, 9, 4))];

        let figures = compute_employee(&f, &period(start, end), &CompanySettings::default());
        assert_eq!(figures.breakdown.unpaid_days, 3);
        assert_eq!(figures.breakdown.paid_days, 0);
        assert_eq!(figures.deduction, dec("3000.00"));
    }

    #[test]
    fn unpaid_window_is_clipped_to_the_period() {
        let start = d(2025, 9, 1);
        let end = d(2025, 9, 30);
        let mut f = facts("22000", "0", vec![]);
        // Window runs into October; only the September days count.
        f.unpaid_leaves = vec![(d(2025, 9, 29), d(2025, 10, 2))];

        let figures = compute_employee(&f, &period(start, end), &CompanySettings::default());
        assert_eq!(figures.breakdown.unpaid_days, 2);
    }

    #[test]
    fn empty_range_floors_total_working_days_to_one() {
        // A weekend-only period yields zero working days; the divisor
        // floors to 1 instead of dividing by zero.
        let saturday = d(2025, 9, 6);
        let figures = compute_employee(
            &facts("1000", "0", vec![worked(saturday, "09:00", "17:00")]),
            &period(saturday, saturday),
            &CompanySettings::default(),
        );
        assert_eq!(figures.breakdown.daily_rate, "1000.00");
        assert_eq!(figures.gross, dec("1000.00"));
    }

    #[test]
    fn rounding_is_half_up_at_each_step() {
        // base 1000 over 21 working days: 47.619... -> 47.62, then paid
        // days multiply the already-rounded rate.
        let start = d(2025, 7, 1);
        let end = d(2025, 7, 29);
        assert_eq!(working_days(start, end, 5), 21);

        let attendance = vec![
            worked(d(2025, 7, 1), "09:00", "17:00"),
            worked(d(2025, 7, 2), "09:00", "17:00"),
            worked(d(2025, 7, 3), "09:00", "17:00"),
        ];
        let figures = compute_employee(
            &facts("1000", "0", attendance),
            &period(start, end),
            &CompanySettings::default(),
        );
        assert_eq!(figures.breakdown.daily_rate, "47.62");
        assert_eq!(figures.gross, dec("142.86")); // 47.62 * 3
    }

    #[test]
    fn gross_and_net_identities_hold() {
        let day = d(2025, 9, 1);
        let mut f = facts("22000", "150", vec![worked(day, "09:00", "19:00")]);
        f.unpaid_leaves = vec![(d(2025, 9, 3), d(2025, 9, 3))];

        let figures = compute_employee(
            &f,
            &period(d(2025, 9, 1), d(2025, 9, 30)),
            &CompanySettings::default(),
        );
        let base_pay = round2(
            dec(&figures.breakdown.daily_rate) * BigDecimal::from(figures.breakdown.paid_days),
        );
        assert_eq!(figures.gross, &base_pay + &figures.overtime_pay);
        assert_eq!(figures.net, &figures.gross - &figures.deduction);
    }

    #[test]
    fn recomputation_is_deterministic() {
        let day = d(2025, 9, 1);
        let mut f = facts("22017", "133", vec![worked(day, "08:47", "19:23")]);
        f.unpaid_leaves = vec![(d(2025, 9, 2), d(2025, 9, 5))];
        let p = period(d(2025, 9, 1), d(2025, 9, 30));
        let settings = CompanySettings::default();

        let first = compute_employee(&f, &p, &settings);
        let second = compute_employee(&f, &p, &settings);
        assert_eq!(first, second);
    }

    #[test]
    fn missing_payment_profile_prices_to_zero() {
        let day = d(2025, 9, 1);
        let figures = compute_employee(
            &facts("0", "0", vec![worked(day, "09:00", "17:00")]),
            &period(d(2025, 9, 1), d(2025, 9, 30)),
            &CompanySettings::default(),
        );
        assert_eq!(figures.gross, dec("0.00"));
        assert_eq!(figures.net, dec("0.00"));
    }

    #[test]
    fn payslip_filename_is_sanitized_and_stable() {
        let p = PayrollPeriod {
            id: Uuid::new_v4(),
            start_date: d(2025, 9, 1),
            end_date: d(2025, 9, 30),
            is_closed: false,
        };
        assert_eq!(
            payslip_filename("Asha R. O'Neil", &p),
            "payslips/payslip_Asha_R_ONeil_2025-09-01_2025-09-30.docx"
        );
    }
}
