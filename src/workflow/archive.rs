use chrono::{DateTime, Utc};

use crate::{
    error::{AppError, AppResult},
    model::{
        archive::{FinalStatus, LeaveArchive},
        leave_application::LeaveApplication,
        leave_request::{LeaveRequest, RequestStatus},
        role::ActorRole,
    },
};

/// A terminal request plus the identity strings copied into its archive row.
/// Reviewer fields are `None` when the reviewer record no longer exists.
#[derive(Debug, Clone)]
pub struct ArchiveSource {
    pub request: LeaveRequest,
    pub application: LeaveApplication,
    pub employee_code: String,
    pub employee_name: String,
    pub employee_department: String,
    pub employee_position: String,
    pub dean_name: Option<String>,
    pub dean_department: Option<String>,
    pub hr_username: Option<String>,
    pub hr_name: Option<String>,
}

pub fn build_archive(
    source: &ArchiveSource,
    actor: &ActorRole,
    by_system: bool,
    now: DateTime<Utc>,
) -> AppResult<LeaveArchive> {
    if !actor.is_hr() {
        return Err(AppError::unauthorized("Only HR can archive leave requests"));
    }

    let request = &source.request;
    if request.is_archived {
        return Err(AppError::validation(format!(
            "Leave request {} is already archived",
            request.id
        )));
    }

    let final_status = match request.status {
        RequestStatus::Approved => FinalStatus::Approved,
        RequestStatus::Denied => FinalStatus::Denied,
        other => {
            return Err(AppError::validation(format!(
                "Can only archive leave requests with final status (approved/denied), this one is {other}"
            )));
        }
    };

    let missing = || AppError::validation("Leave request must be reviewed by both dean and HR");
    request.dean_reviewer_id.ok_or_else(missing)?;
    request.hr_reviewer_id.ok_or_else(missing)?;
    let dean_reviewed_at = request.dean_reviewed_at.ok_or_else(missing)?;
    let hr_reviewed_at = request.hr_reviewed_at.ok_or_else(missing)?;
    let dean_name = source.dean_name.clone().ok_or_else(missing)?;
    let hr_username = source.hr_username.clone().ok_or_else(missing)?;

    let hr_reviewer_name = source
        .hr_name
        .clone()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| hr_username.clone());

    let application = &source.application;

    Ok(LeaveArchive {
        id: 0,
        original_leave_request_id: request.id,
        original_leave_application_id: application.id,
        employee_code: source.employee_code.clone(),
        employee_name: source.employee_name.clone(),
        employee_department: source.employee_department.clone(),
        employee_position: source.employee_position.clone(),
        leave_type: application.leave_type,
        number_of_days: application.number_of_days,
        vacation_location: application.vacation_location.clone(),
        sick_location: application.sick_location.clone(),
        reason: application.reason.clone(),
        date_filed: application.date_filed,
        dean_name,
        dean_department: source.dean_department.clone().unwrap_or_default(),
        dean_reviewed_at,
        dean_comments: request.dean_comments.clone(),
        hr_reviewer_username: hr_username,
        hr_reviewer_name,
        hr_reviewed_at,
        hr_comments: request.hr_comments.clone(),
        final_status,
        leave_balance_before: request.balance_before,
        leave_balance_after: request.balance_after,
        leave_balance_year: request.balance_year,
        archived_at: now,
        archived_by_system: by_system,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::tests::{filed_case, now};

    const DEAN: ActorRole = ActorRole::Dean { dean_id: 2, department_id: 1 };

    fn source(request: LeaveRequest, application: LeaveApplication) -> ArchiveSource {
        ArchiveSource {
            request,
            application,
            employee_code: "OC-20260001".into(),
            employee_name: "Maria Santos Cruz".into(),
            employee_department: "College of Nursing".into(),
            employee_position: "Instructor".into(),
            dean_name: Some("Dr. Ana Reyes".into()),
            dean_department: Some("College of Nursing".into()),
            hr_username: Some("hr.jane".into()),
            hr_name: Some("Jane Dela Cruz".into()),
        }
    }

    #[test]
    fn archives_a_dual_reviewed_request_with_snapshots() {
        let mut case = filed_case(15, 5);
        case.dean_approve(&DEAN, None, now()).unwrap();
        case.hr_approve(&ActorRole::Hr, 1, Some("enjoy".into()), now()).unwrap();

        let archive = build_archive(&source(case.request, case.application), &ActorRole::Hr, false, now())
            .unwrap();

        assert_eq!(archive.final_status, FinalStatus::Approved);
        assert_eq!(archive.original_leave_request_id, 8);
        assert_eq!(archive.original_leave_application_id, 5);
        assert_eq!(archive.leave_balance_before, 15);
        assert_eq!(archive.leave_balance_after, Some(10));
        assert_eq!(archive.hr_reviewer_name, "Jane Dela Cruz");
        assert_eq!(archive.dean_name, "Dr. Ana Reyes");
        assert!(!archive.archived_by_system);
    }

    #[test]
    fn non_terminal_request_cannot_be_archived() {
        let mut case = filed_case(15, 5);
        let err = build_archive(&source(case.request.clone(), case.application.clone()), &ActorRole::Hr, true, now())
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        case.dean_approve(&DEAN, None, now()).unwrap();
        let err = build_archive(&source(case.request, case.application), &ActorRole::Hr, true, now())
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn dean_denied_request_is_not_archivable() {
        let mut case = filed_case(15, 5);
        case.dean_deny(&DEAN, None, now()).unwrap();
        let err = build_archive(&source(case.request, case.application), &ActorRole::Hr, true, now())
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn archiving_twice_fails() {
        let mut case = filed_case(15, 5);
        case.dean_approve(&DEAN, None, now()).unwrap();
        case.hr_deny(&ActorRole::Hr, 1, "policy", now()).unwrap();
        case.request.is_archived = true;

        let err = build_archive(&source(case.request, case.application), &ActorRole::Hr, true, now())
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn deleted_reviewer_blocks_archive() {
        let mut case = filed_case(15, 5);
        case.dean_approve(&DEAN, None, now()).unwrap();
        case.hr_approve(&ActorRole::Hr, 1, None, now()).unwrap();
        let mut src = source(case.request, case.application);
        src.dean_name = None;

        let err = build_archive(&src, &ActorRole::Hr, true, now()).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn hr_name_falls_back_to_username_and_dean_cannot_archive() {
        let mut case = filed_case(15, 5);
        case.dean_approve(&DEAN, None, now()).unwrap();
        case.hr_deny(&ActorRole::Hr, 1, "policy", now()).unwrap();
        let mut src = source(case.request, case.application);
        src.hr_name = Some(" ".into());

        let archive = build_archive(&src, &ActorRole::Hr, true, now()).unwrap();
        assert_eq!(archive.hr_reviewer_name, "hr.jane");
        assert_eq!(archive.final_status, FinalStatus::Denied);
        assert_eq!(archive.leave_balance_after, Some(15));

        assert!(matches!(
            build_archive(&src, &DEAN, true, now()),
            Err(AppError::Unauthorized(_))
        ));
    }
}
