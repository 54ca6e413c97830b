use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use super::{
    leave_application::{LeaveApplication, LeaveType},
    leave_request::{LeaveRequest, RequestStatus},
};
use crate::string_column;

/// One reviewer's half of a report.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Denied,
}

string_column!(ReviewStatus);

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct LeaveReport {
    pub id: u64,
    pub leave_request_id: u64,
    pub employee_id: u64,
    #[sqlx(try_from = "String")]
    pub leave_type: LeaveType,
    pub number_of_days: u32,
    pub location: String,
    #[schema(format = "date", value_type = String)]
    pub date_filed: NaiveDate,

    #[sqlx(try_from = "String")]
    pub dean_status: ReviewStatus,
    pub dean_reviewer_id: Option<u64>,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub dean_reviewed_at: Option<DateTime<Utc>>,
    pub dean_comments: String,

    #[sqlx(try_from = "String")]
    pub hr_status: ReviewStatus,
    pub hr_reviewer_id: Option<u64>,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub hr_reviewed_at: Option<DateTime<Utc>>,
    pub hr_comments: String,

    #[schema(format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
    #[schema(format = "date-time", value_type = String)]
    pub updated_at: DateTime<Utc>,
}

impl LeaveReport {
    /// Get-or-insert keyed by the request, then refresh whichever halves have a reviewer.
    /// A fresh report carries `id == 0` until the store assigns one.
    pub fn upsert(
        existing: Option<LeaveReport>,
        request: &LeaveRequest,
        application: &LeaveApplication,
        now: DateTime<Utc>,
    ) -> LeaveReport {
        let mut report = existing.unwrap_or_else(|| LeaveReport {
            id: 0,
            leave_request_id: request.id,
            employee_id: application.employee_id,
            leave_type: application.leave_type,
            number_of_days: application.number_of_days,
            location: application.location(),
            date_filed: application.date_filed,
            dean_status: ReviewStatus::Pending,
            dean_reviewer_id: None,
            dean_reviewed_at: None,
            dean_comments: String::new(),
            hr_status: ReviewStatus::Pending,
            hr_reviewer_id: None,
            hr_reviewed_at: None,
            hr_comments: String::new(),
            created_at: now,
            updated_at: now,
        });

        if request.dean_reviewer_id.is_some() {
            report.dean_reviewer_id = request.dean_reviewer_id;
            report.dean_status = if request.status == RequestStatus::DeanDenied {
                ReviewStatus::Denied
            } else {
                ReviewStatus::Approved
            };
            report.dean_reviewed_at = request.dean_reviewed_at;
            report.dean_comments = request.dean_comments.clone();
        }

        if request.hr_reviewer_id.is_some() {
            report.hr_reviewer_id = request.hr_reviewer_id;
            report.hr_status = if request.status == RequestStatus::Approved {
                ReviewStatus::Approved
            } else {
                ReviewStatus::Denied
            };
            report.hr_reviewed_at = request.hr_reviewed_at;
            report.hr_comments = request.hr_comments.clone();
        }

        report.updated_at = now;
        report
    }
}

#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct LeaveTypeCount {
    #[schema(example = "vacation")]
    pub leave_type: String,
    #[schema(example = 4)]
    pub count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::leave_application::ApplicationStatus;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, hour, 0, 0).unwrap()
    }

    fn application() -> LeaveApplication {
        LeaveApplication {
            id: 3,
            employee_id: 9,
            leave_type: LeaveType::Sick,
            vacation_location: None,
            sick_location: Some("home".into()),
            number_of_days: 2,
            reason: String::new(),
            date_filed: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            status: ApplicationStatus::Pending,
        }
    }

    fn request(status: RequestStatus) -> LeaveRequest {
        LeaveRequest {
            id: 11,
            application_id: 3,
            status,
            dean_reviewer_id: None,
            dean_reviewed_at: None,
            dean_comments: String::new(),
            hr_reviewer_id: None,
            hr_reviewed_at: None,
            hr_comments: String::new(),
            balance_year: 2026,
            balance_before: 15,
            balance_after: None,
            is_archived: false,
            created_at: at(8),
            updated_at: at(8),
        }
    }

    #[test]
    fn dean_only_report_leaves_hr_half_pending() {
        let mut req = request(RequestStatus::DeanApproved);
        req.dean_reviewer_id = Some(2);
        req.dean_reviewed_at = Some(at(9));

        let report = LeaveReport::upsert(None, &req, &application(), at(9));

        assert_eq!(report.leave_request_id, 11);
        assert_eq!(report.location, "home");
        assert_eq!(report.dean_status, ReviewStatus::Approved);
        assert_eq!(report.hr_status, ReviewStatus::Pending);
        assert_eq!(report.hr_reviewer_id, None);
    }

    #[test]
    fn hr_half_is_filled_later_without_touching_creation() {
        let mut req = request(RequestStatus::DeanApproved);
        req.dean_reviewer_id = Some(2);
        req.dean_reviewed_at = Some(at(9));
        let first = LeaveReport::upsert(None, &req, &application(), at(9));

        req.status = RequestStatus::Denied;
        req.hr_reviewer_id = Some(1);
        req.hr_reviewed_at = Some(at(10));
        req.hr_comments = "policy".into();
        let second = LeaveReport::upsert(Some(first), &req, &application(), at(10));

        assert_eq!(second.created_at, at(9));
        assert_eq!(second.updated_at, at(10));
        assert_eq!(second.dean_status, ReviewStatus::Approved);
        assert_eq!(second.hr_status, ReviewStatus::Denied);
        assert_eq!(second.hr_comments, "policy");
    }

    #[test]
    fn dean_denial_is_recorded_as_denied() {
        let mut req = request(RequestStatus::DeanDenied);
        req.dean_reviewer_id = Some(2);

        let report = LeaveReport::upsert(None, &req, &application(), at(9));
        assert_eq!(report.dean_status, ReviewStatus::Denied);
    }
}
