//! Leave request state machine.
//!
//! ```text
//! pending ──dean_approve──▶ dean_approved ──hr_approve──▶ approved
//!    │                           │
//!    └──dean_deny──▶ dean_denied └──hr_deny──▶ denied
//! ```
//!
//! Every transition here is pure: it mutates an in-memory [`LeaveCase`] and the caller
//! persists the result inside one database transaction. Days are deducted exactly once, at
//! submission; denials give them back, capped at the yearly allotment.

pub mod archive;
pub mod submission;

use chrono::{DateTime, Utc};

use crate::{
    error::{AppError, AppResult},
    model::{
        leave_application::{ApplicationStatus, LeaveApplication},
        leave_balance::LeaveBalance,
        leave_report::LeaveReport,
        leave_request::{LeaveRequest, RequestStatus},
        role::ActorRole,
    },
};

pub use archive::{ArchiveSource, build_archive};
pub use submission::{Submission, submit};

/// Everything one transition reads or writes, loaded under row locks.
#[derive(Debug, Clone)]
pub struct LeaveCase {
    pub request: LeaveRequest,
    pub application: LeaveApplication,
    /// Department of the filing employee; scopes dean actions.
    pub department_id: u64,
    /// Balance for `request.balance_year`.
    pub balance: LeaveBalance,
    pub report: Option<LeaveReport>,
}

impl LeaveCase {
    pub fn dean_approve(
        &mut self,
        actor: &ActorRole,
        comments: Option<String>,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let dean_id = self.require_dean(actor)?;
        self.expect_status("dean-approve", RequestStatus::Pending)?;

        self.request.status = RequestStatus::DeanApproved;
        self.request.dean_reviewer_id = Some(dean_id);
        self.request.dean_reviewed_at = Some(now);
        self.request.dean_comments = comments.unwrap_or_default();
        // still waiting on HR
        self.application.status = ApplicationStatus::Pending;

        self.touch_report(now);
        Ok(())
    }

    pub fn dean_deny(
        &mut self,
        actor: &ActorRole,
        comments: Option<String>,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let dean_id = self.require_dean(actor)?;
        self.expect_status("dean-deny", RequestStatus::Pending)?;

        self.request.status = RequestStatus::DeanDenied;
        self.request.dean_reviewer_id = Some(dean_id);
        self.request.dean_reviewed_at = Some(now);
        self.request.dean_comments = comments.unwrap_or_default();
        self.application.status = ApplicationStatus::Rejected;

        self.balance.restore(self.application.number_of_days);
        self.request.balance_after = Some(self.balance.remaining_days);

        self.touch_report(now);
        Ok(())
    }

    pub fn hr_approve(
        &mut self,
        actor: &ActorRole,
        hr_user_id: u64,
        comments: Option<String>,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        Self::require_hr(actor)?;
        self.expect_status("hr-approve", RequestStatus::DeanApproved)?;

        self.request.status = RequestStatus::Approved;
        self.request.hr_reviewer_id = Some(hr_user_id);
        self.request.hr_reviewed_at = Some(now);
        self.request.hr_comments = comments.unwrap_or_default();
        self.application.status = ApplicationStatus::Approved;

        // already deducted at submission
        self.request.balance_after = Some(self.balance.remaining_days);

        self.touch_report(now);
        Ok(())
    }

    pub fn hr_deny(
        &mut self,
        actor: &ActorRole,
        hr_user_id: u64,
        comments: &str,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        Self::require_hr(actor)?;
        self.expect_status("hr-deny", RequestStatus::DeanApproved)?;

        let comments = comments.trim();
        if comments.is_empty() {
            return Err(AppError::validation("Comments are required when HR denies a leave request"));
        }

        self.request.status = RequestStatus::Denied;
        self.request.hr_reviewer_id = Some(hr_user_id);
        self.request.hr_reviewed_at = Some(now);
        self.request.hr_comments = comments.to_string();
        self.application.status = ApplicationStatus::Rejected;

        self.balance.restore(self.application.number_of_days);
        self.request.balance_after = Some(self.balance.remaining_days);

        self.touch_report(now);
        Ok(())
    }

    /// Only a dean-denied request that never reached HR can be removed.
    pub fn ensure_deletable(&self, actor: &ActorRole) -> AppResult<()> {
        if !actor.is_hr() && !actor.is_dean_of(self.department_id) {
            return Err(AppError::unauthorized(
                "Only HR or the dean of this department can delete this leave request",
            ));
        }
        if self.request.status != RequestStatus::DeanDenied || self.request.hr_reviewer_id.is_some() {
            return Err(AppError::IllegalTransition {
                action: "delete",
                status: self.request.status.to_string(),
            });
        }
        Ok(())
    }

    fn require_dean(&self, actor: &ActorRole) -> AppResult<u64> {
        match actor {
            ActorRole::Dean { dean_id, department_id } if *department_id == self.department_id => {
                Ok(*dean_id)
            }
            ActorRole::Dean { .. } => Err(AppError::unauthorized(
                "You can only review leave requests from your own department",
            )),
            _ => Err(AppError::unauthorized("Dean only")),
        }
    }

    fn require_hr(actor: &ActorRole) -> AppResult<()> {
        if actor.is_hr() {
            Ok(())
        } else {
            Err(AppError::unauthorized("HR only"))
        }
    }

    fn expect_status(&self, action: &'static str, expected: RequestStatus) -> AppResult<()> {
        if self.request.status == expected {
            Ok(())
        } else {
            Err(AppError::IllegalTransition {
                action,
                status: self.request.status.to_string(),
            })
        }
    }

    fn touch_report(&mut self, now: DateTime<Utc>) {
        self.request.updated_at = now;
        self.report = Some(LeaveReport::upsert(
            self.report.take(),
            &self.request,
            &self.application,
            now,
        ));
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::{
        employee::Employee,
        leave_application::{LeaveType, NewLeaveApplication, VacationLocation},
        leave_balance::ANNUAL_LEAVE_DAYS,
        leave_report::ReviewStatus,
    };
    use chrono::{NaiveDate, TimeZone};

    pub fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
    }

    pub fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
    }

    pub fn employee(id: u64, department_id: u64, is_active: bool) -> Employee {
        Employee {
            id,
            employee_code: format!("OC-2026{id:04}"),
            full_name: "Maria Santos Cruz".into(),
            gender: "female".into(),
            age: 34,
            department_id,
            position_id: 1,
            motto: String::new(),
            is_active,
            date_created: now(),
            updated_at: now(),
        }
    }

    pub fn form(employee_id: u64, days: u32) -> NewLeaveApplication {
        NewLeaveApplication {
            employee_id,
            leave_type: LeaveType::Vacation,
            vacation_location: Some(VacationLocation::Philippines),
            sick_location: None,
            number_of_days: days,
            reason: "Family trip".into(),
        }
    }

    /// Submits `days` against a balance of `remaining` for an employee of department 1.
    pub fn filed_case(remaining: u32, days: u32) -> LeaveCase {
        let emp = employee(1, 1, true);
        let mut balance = LeaveBalance { employee_id: 1, year: 2026, remaining_days: remaining };
        let Submission { mut application, mut request } =
            submit(&emp, &mut balance, &form(1, days), today(), now()).unwrap();
        application.id = 5;
        request.id = 8;
        request.application_id = 5;

        LeaveCase {
            request,
            application,
            department_id: 1,
            balance,
            report: None,
        }
    }

    const DEAN_A: ActorRole = ActorRole::Dean { dean_id: 2, department_id: 1 };
    const DEAN_B: ActorRole = ActorRole::Dean { dean_id: 3, department_id: 2 };

    #[test]
    fn dean_approve_then_hr_deny_restores_balance() {
        let mut case = filed_case(15, 5);
        assert_eq!(case.balance.remaining_days, 10);
        assert_eq!(case.request.status, RequestStatus::Pending);

        case.dean_approve(&DEAN_A, None, now()).unwrap();
        assert_eq!(case.request.status, RequestStatus::DeanApproved);
        assert_eq!(case.application.status, ApplicationStatus::Pending);
        assert_eq!(case.balance.remaining_days, 10);
        assert_eq!(case.report.as_ref().unwrap().hr_status, ReviewStatus::Pending);

        case.hr_deny(&ActorRole::Hr, 1, "policy", now()).unwrap();
        assert_eq!(case.request.status, RequestStatus::Denied);
        assert_eq!(case.application.status, ApplicationStatus::Rejected);
        assert_eq!(case.balance.remaining_days, 15);
        assert_eq!(case.request.balance_after, Some(15));

        let report = case.report.unwrap();
        assert_eq!(report.hr_status, ReviewStatus::Denied);
        assert_eq!(report.dean_status, ReviewStatus::Approved);
        assert_eq!(report.hr_comments, "policy");
    }

    #[test]
    fn hr_approve_does_not_deduct_twice() {
        let mut case = filed_case(15, 5);
        case.dean_approve(&DEAN_A, None, now()).unwrap();
        case.hr_approve(&ActorRole::Hr, 1, None, now()).unwrap();

        assert_eq!(case.request.status, RequestStatus::Approved);
        assert_eq!(case.application.status, ApplicationStatus::Approved);
        assert_eq!(case.balance.remaining_days, 10);
        assert_eq!(case.request.balance_before, 15);
        assert_eq!(case.request.balance_after, Some(10));
        assert_eq!(case.report.unwrap().hr_status, ReviewStatus::Approved);
    }

    #[test]
    fn dean_deny_restores_and_closes_hr_path() {
        let mut case = filed_case(15, 4);
        case.dean_deny(&DEAN_A, Some("short staffed".into()), now()).unwrap();

        assert_eq!(case.request.status, RequestStatus::DeanDenied);
        assert_eq!(case.application.status, ApplicationStatus::Rejected);
        assert_eq!(case.balance.remaining_days, 15);
        assert_eq!(case.report.as_ref().unwrap().dean_status, ReviewStatus::Denied);

        let err = case.hr_approve(&ActorRole::Hr, 1, None, now()).unwrap_err();
        assert!(matches!(err, AppError::IllegalTransition { .. }));
        let err = case.hr_deny(&ActorRole::Hr, 1, "no", now()).unwrap_err();
        assert!(matches!(err, AppError::IllegalTransition { .. }));
        assert_eq!(case.balance.remaining_days, 15);
    }

    #[test]
    fn restore_after_denial_never_exceeds_allotment() {
        // balance already topped up elsewhere (e.g. a second request was denied first)
        let mut case = filed_case(15, 5);
        case.balance.remaining_days = 14;
        case.dean_deny(&DEAN_A, None, now()).unwrap();
        assert_eq!(case.balance.remaining_days, ANNUAL_LEAVE_DAYS);
    }

    #[test]
    fn dean_from_other_department_is_unauthorized() {
        let mut case = filed_case(15, 2);
        let err = case.dean_approve(&DEAN_B, None, now()).unwrap_err();

        assert!(matches!(err, AppError::Unauthorized(_)));
        assert_eq!(case.request.status, RequestStatus::Pending);
        assert!(case.report.is_none());
    }

    #[test]
    fn hr_cannot_act_as_dean_and_dean_cannot_act_as_hr() {
        let mut case = filed_case(15, 2);
        assert!(matches!(
            case.dean_approve(&ActorRole::Hr, None, now()),
            Err(AppError::Unauthorized(_))
        ));

        case.dean_approve(&DEAN_A, None, now()).unwrap();
        assert!(matches!(
            case.hr_approve(&DEAN_A, 2, None, now()),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn hr_decision_before_dean_is_illegal() {
        let mut case = filed_case(15, 2);
        let err = case.hr_approve(&ActorRole::Hr, 1, None, now()).unwrap_err();
        assert!(matches!(err, AppError::IllegalTransition { action: "hr-approve", .. }));
    }

    #[test]
    fn dean_cannot_review_twice() {
        let mut case = filed_case(15, 2);
        case.dean_approve(&DEAN_A, None, now()).unwrap();
        let err = case.dean_deny(&DEAN_A, None, now()).unwrap_err();
        assert!(matches!(err, AppError::IllegalTransition { .. }));
        assert_eq!(case.balance.remaining_days, 13);
    }

    #[test]
    fn hr_deny_requires_comments() {
        let mut case = filed_case(15, 2);
        case.dean_approve(&DEAN_A, None, now()).unwrap();

        let err = case.hr_deny(&ActorRole::Hr, 1, "   ", now()).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(case.request.status, RequestStatus::DeanApproved);
        assert_eq!(case.balance.remaining_days, 13);
    }

    #[test]
    fn only_dean_denied_requests_are_deletable() {
        let mut case = filed_case(15, 2);
        assert!(case.ensure_deletable(&ActorRole::Hr).is_err());

        case.dean_deny(&DEAN_A, None, now()).unwrap();
        assert!(case.ensure_deletable(&ActorRole::Hr).is_ok());
        assert!(case.ensure_deletable(&DEAN_A).is_ok());
        assert!(matches!(
            case.ensure_deletable(&DEAN_B),
            Err(AppError::Unauthorized(_))
        ));
    }
}
