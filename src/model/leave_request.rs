use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::string_column;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    DeanApproved,
    DeanDenied,
    Approved,
    Denied,
}

string_column!(RequestStatus);

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct LeaveRequest {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 1)]
    pub application_id: u64,
    #[sqlx(try_from = "String")]
    pub status: RequestStatus,
    pub dean_reviewer_id: Option<u64>,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub dean_reviewed_at: Option<DateTime<Utc>>,
    pub dean_comments: String,
    pub hr_reviewer_id: Option<u64>,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub hr_reviewed_at: Option<DateTime<Utc>>,
    pub hr_comments: String,
    /// Year of the balance this request draws from.
    #[schema(example = 2026)]
    pub balance_year: u32,
    /// Remaining days before the submission deduction.
    #[schema(example = 15)]
    pub balance_before: u32,
    /// Remaining days right after the final decision.
    #[schema(example = 10, nullable = true)]
    pub balance_after: Option<u32>,
    pub is_archived: bool,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
    #[schema(format = "date-time", value_type = String)]
    pub updated_at: DateTime<Utc>,
}

/// Request joined with what a reviewer needs to see.
#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct LeaveRequestView {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub request: LeaveRequest,
    pub employee_id: u64,
    pub employee_code: String,
    pub employee_name: String,
    pub department_id: u64,
    pub department_name: String,
    pub position_title: String,
    pub leave_type: String,
    pub number_of_days: u32,
    pub vacation_location: Option<String>,
    pub sick_location: Option<String>,
    pub reason: String,
    #[schema(format = "date", value_type = String)]
    pub date_filed: chrono::NaiveDate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_column_text_is_snake_case() {
        assert_eq!(RequestStatus::DeanApproved.as_ref(), "dean_approved");
        assert_eq!(
            RequestStatus::try_from("dean_denied".to_string()).unwrap(),
            RequestStatus::DeanDenied
        );
    }
}
