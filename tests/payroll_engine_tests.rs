use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use std::str::FromStr;
use uuid::Uuid;

use hrcore::CompanySettings;
use hrcore::database::models::{AttendanceStatus, PayrollPeriod};
use hrcore::services::payroll::{EmployeePayrollFacts, compute_employee, payslip_filename};

mod common;

use common::{attendance_on, date};

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

/// A realistic month for one employee: mostly plain working days, one late
/// arrival, one overtime day, one forgotten checkout, and a two-day unpaid
/// leave where only the first day got an attendance row.
#[test]
fn full_month_combines_all_day_kinds() {
    let settings = CompanySettings::default();
    // September 2025 has 22 weekdays.
    let period = period(date(2025, 9, 1), date(2025, 9, 30));
    let employee_id = Uuid::new_v4();

    let at = |day: NaiveDate, h: u32, m: u32| Some(day.and_hms_opt(h, m, 0).unwrap().and_utc());

    let mut attendance = Vec::new();
    // Overtime day: 09:00-19:00 is two hours past the 8h standard.
    attendance.push(attendance_on(
        employee_id,
        date(2025, 9, 1),
        AttendanceStatus::Present,
        at(date(2025, 9, 1), 9, 0),
        at(date(2025, 9, 1), 19, 0),
    ));
    // Late arrival, still a full 8h shift.
    attendance.push(attendance_on(
        employee_id,
        date(2025, 9, 2),
        AttendanceStatus::Late,
        at(date(2025, 9, 2), 9, 30),
        at(date(2025, 9, 2), 17, 30),
    ));
    // Forgotten checkout: hours assume the configured 17:00 work end.
    attendance.push(attendance_on(
        employee_id,
        date(2025, 9, 3),
        AttendanceStatus::MissingCheckout,
        at(date(2025, 9, 3), 9, 0),
        None,
    ));
    // Plain 09:00-17:00 days for the rest of the month's weekdays, minus
    // the two unpaid leave days on the 25th and 26th.
    for d in [
        4, 5, 8, 9, 10, 11, 12, 15, 16, 17, 18, 19, 22, 23, 24, 29, 30,
    ] {
        let day = date(2025, 9, d);
        attendance.push(attendance_on(
            employee_id,
            day,
            AttendanceStatus::Present,
            at(day, 9, 0),
            at(day, 17, 0),
        ));
    }
    // The absence job only got to the first unpaid day before approval.
    attendance.push(attendance_on(
        employee_id,
        date(2025, 9, 25),
        AttendanceStatus::OnLeave,
        None,
        None,
    ));

    let facts = EmployeePayrollFacts {
        employee_id,
        fullname: "Priya Sharma".to_string(),
        base_salary: dec("22000"),
        overtime_rate: dec("500"),
        attendance,
        unpaid_leaves: vec![(date(2025, 9, 25), date(2025, 9, 26))],
    };

    let figures = compute_employee(&facts, &period, &settings);

    // 22000 / 22 working days, 20 paid days, 2 unpaid days, 2h overtime.
    assert_eq!(figures.breakdown.daily_rate, "1000.00");
    assert_eq!(figures.breakdown.paid_days, 20);
    assert_eq!(figures.breakdown.unpaid_days, 2);
    assert_eq!(figures.breakdown.overtime_hours, "2.00");
    assert_eq!(figures.breakdown.base_salary, "22000.00");

    assert_eq!(figures.overtime_pay, dec("1000.00"));
    assert_eq!(figures.deduction, dec("2000.00"));
    assert_eq!(figures.gross, dec("21000.00"));
    assert_eq!(figures.net, dec("19000.00"));
    assert_eq!(figures.total_hours, BigDecimal::from(162));
}

#[test]
fn recomputation_is_deterministic() {
    let settings = CompanySettings::default();
    let period = period(date(2025, 9, 1), date(2025, 9, 30));
    let employee_id = Uuid::new_v4();

    let day = date(2025, 9, 1);
    let facts = EmployeePayrollFacts {
        employee_id,
        fullname: "Arun Mehta".to_string(),
        base_salary: dec("31500"),
        overtime_rate: dec("500"),
        attendance: vec![attendance_on(
            employee_id,
            day,
            AttendanceStatus::Present,
            Some(day.and_hms_opt(9, 0, 0).unwrap().and_utc()),
            Some(day.and_hms_opt(17, 0, 0).unwrap().and_utc()),
        )],
        unpaid_leaves: vec![],
    };

    let first = compute_employee(&facts, &period, &settings);
    let second = compute_employee(&facts, &period, &settings);
    assert_eq!(first, second);
    // 31500 / 22 rounds half-up at the daily-rate step.
    assert_eq!(first.breakdown.daily_rate, "1431.82");
    assert_eq!(first.gross, dec("1431.82"));
}

#[test]
fn payslip_reference_is_stable_for_a_name_and_period() {
    let period = period(date(2025, 9, 1), date(2025, 9, 30));
    let name = payslip_filename("Priya Sharma (HR)", &period);
    assert_eq!(name, "payslips/payslip_Priya_Sharma_HR_2025-09-01_2025-09-30.docx");
    assert_eq!(name, payslip_filename("Priya Sharma (HR)", &period));
}
