use chrono::{DateTime, NaiveDate, Utc};

use crate::{
    error::{AppError, AppResult},
    model::{
        employee::Employee,
        leave_application::{ApplicationStatus, LeaveApplication, LeaveType, NewLeaveApplication},
        leave_balance::{ANNUAL_LEAVE_DAYS, LeaveBalance},
        leave_request::{LeaveRequest, RequestStatus},
    },
};

pub const MIN_DAYS_PER_REQUEST: u32 = 1;
pub const MAX_DAYS_PER_REQUEST: u32 = ANNUAL_LEAVE_DAYS;

/// Rows produced by a successful submission; ids are assigned on insert.
#[derive(Debug, Clone)]
pub struct Submission {
    pub application: LeaveApplication,
    pub request: LeaveRequest,
}

/// Shape checks that need nothing but the payload.
pub fn validate_form(form: &NewLeaveApplication) -> AppResult<()> {
    if form.number_of_days < MIN_DAYS_PER_REQUEST {
        return Err(AppError::validation("Number of days must be at least 1"));
    }
    if form.number_of_days > MAX_DAYS_PER_REQUEST {
        return Err(AppError::validation(format!(
            "Maximum leave application is {MAX_DAYS_PER_REQUEST} days per request"
        )));
    }

    match form.leave_type {
        LeaveType::Vacation if form.vacation_location.is_none() => Err(AppError::validation(
            "Vacation location is required for vacation leave",
        )),
        LeaveType::Sick if form.sick_location.is_none() => Err(AppError::validation(
            "Sick location is required for sick leave",
        )),
        _ => Ok(()),
    }
}

/// Files a leave: validates, deducts `balance` and builds the pending application/request
/// pair. On any error `balance` is left as it was.
pub fn submit(
    employee: &Employee,
    balance: &mut LeaveBalance,
    form: &NewLeaveApplication,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> AppResult<Submission> {
    validate_form(form)?;

    if !employee.is_active {
        return Err(AppError::validation(format!(
            "Employee {} is inactive and cannot file leave",
            employee.employee_code
        )));
    }

    let balance_before = balance.remaining_days;
    balance.deduct(form.number_of_days)?;

    // only the location matching the leave type is kept
    let vacation_location = match form.leave_type {
        LeaveType::Vacation => form.vacation_location.map(|l| l.to_string()),
        _ => None,
    };
    let sick_location = match form.leave_type {
        LeaveType::Sick => form.sick_location.map(|l| l.to_string()),
        _ => None,
    };

    let application = LeaveApplication {
        id: 0,
        employee_id: employee.id,
        leave_type: form.leave_type,
        vacation_location,
        sick_location,
        number_of_days: form.number_of_days,
        reason: form.reason.trim().to_string(),
        date_filed: today,
        status: ApplicationStatus::Pending,
    };

    let request = LeaveRequest {
        id: 0,
        application_id: 0,
        status: RequestStatus::Pending,
        dean_reviewer_id: None,
        dean_reviewed_at: None,
        dean_comments: String::new(),
        hr_reviewer_id: None,
        hr_reviewed_at: None,
        hr_comments: String::new(),
        balance_year: balance.year,
        balance_before,
        balance_after: None,
        is_archived: false,
        created_at: now,
        updated_at: now,
    };

    Ok(Submission { application, request })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::leave_application::{SickLocation, VacationLocation};
    use crate::workflow::tests::{employee, form, now, today};

    #[test]
    fn submit_deducts_and_creates_pending_pair() {
        let emp = employee(1, 1, true);
        let mut balance = LeaveBalance::new(1, 2026);

        let sub = submit(&emp, &mut balance, &form(1, 5), today(), now()).unwrap();

        assert_eq!(balance.remaining_days, 10);
        assert_eq!(sub.application.status, ApplicationStatus::Pending);
        assert_eq!(sub.request.status, RequestStatus::Pending);
        assert_eq!(sub.request.balance_before, 15);
        assert_eq!(sub.request.balance_year, 2026);
        assert_eq!(sub.application.vacation_location.as_deref(), Some("philippines"));
    }

    #[test]
    fn insufficient_balance_leaves_balance_unchanged() {
        let emp = employee(1, 1, true);
        let mut balance = LeaveBalance { employee_id: 1, year: 2026, remaining_days: 3 };

        let err = submit(&emp, &mut balance, &form(1, 5), today(), now()).unwrap_err();

        assert!(matches!(err, AppError::InsufficientBalance { requested: 5, remaining: 3 }));
        assert_eq!(balance.remaining_days, 3);
    }

    #[test]
    fn days_out_of_range_are_validation_errors() {
        let emp = employee(1, 1, true);
        let mut balance = LeaveBalance::new(1, 2026);

        for days in [0, 16, 40] {
            let err = submit(&emp, &mut balance, &form(1, days), today(), now()).unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "days = {days}");
        }
        assert_eq!(balance.remaining_days, 15);
    }

    #[test]
    fn vacation_requires_vacation_location() {
        let mut f = form(1, 2);
        f.vacation_location = None;
        assert!(matches!(validate_form(&f), Err(AppError::Validation(_))));
    }

    #[test]
    fn sick_requires_sick_location_and_drops_unrelated_location() {
        let emp = employee(1, 1, true);
        let mut balance = LeaveBalance::new(1, 2026);
        let mut f = form(1, 2);
        f.leave_type = LeaveType::Sick;
        f.vacation_location = Some(VacationLocation::Abroad);

        assert!(matches!(validate_form(&f), Err(AppError::Validation(_))));

        f.sick_location = Some(SickLocation::Hospital);
        let sub = submit(&emp, &mut balance, &f, today(), now()).unwrap();
        assert_eq!(sub.application.sick_location.as_deref(), Some("hospital"));
        assert_eq!(sub.application.vacation_location, None);
    }

    #[test]
    fn emergency_leave_needs_no_location() {
        let mut f = form(1, 1);
        f.leave_type = LeaveType::Emergency;
        f.vacation_location = None;
        assert!(validate_form(&f).is_ok());
    }

    #[test]
    fn inactive_employee_cannot_file() {
        let emp = employee(1, 1, false);
        let mut balance = LeaveBalance::new(1, 2026);

        let err = submit(&emp, &mut balance, &form(1, 2), today(), now()).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(balance.remaining_days, 15);
    }
}
