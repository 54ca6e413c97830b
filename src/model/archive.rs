use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use super::leave_application::LeaveType;
use crate::string_column;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FinalStatus {
    Approved,
    Denied,
}

impl FinalStatus {
    pub fn label(&self) -> &'static str {
        match self {
            FinalStatus::Approved => "Approved by Dean and HR",
            FinalStatus::Denied => "Approved by Dean, Denied by HR",
        }
    }
}

string_column!(FinalStatus);

/// Snapshot of a fully reviewed request. Every identity is copied as text, so the row
/// survives deletion or edits of the employee, dean and HR records.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct LeaveArchive {
    pub id: u64,
    pub original_leave_request_id: u64,
    pub original_leave_application_id: u64,

    #[schema(example = "OC-20260001")]
    pub employee_code: String,
    pub employee_name: String,
    pub employee_department: String,
    pub employee_position: String,

    #[sqlx(try_from = "String")]
    pub leave_type: LeaveType,
    pub number_of_days: u32,
    pub vacation_location: Option<String>,
    pub sick_location: Option<String>,
    pub reason: String,
    #[schema(format = "date", value_type = String)]
    pub date_filed: NaiveDate,

    pub dean_name: String,
    pub dean_department: String,
    #[schema(format = "date-time", value_type = String)]
    pub dean_reviewed_at: DateTime<Utc>,
    pub dean_comments: String,

    pub hr_reviewer_username: String,
    pub hr_reviewer_name: String,
    #[schema(format = "date-time", value_type = String)]
    pub hr_reviewed_at: DateTime<Utc>,
    pub hr_comments: String,

    #[sqlx(try_from = "String")]
    pub final_status: FinalStatus,
    pub leave_balance_before: u32,
    pub leave_balance_after: Option<u32>,
    pub leave_balance_year: u32,

    #[schema(format = "date-time", value_type = String)]
    pub archived_at: DateTime<Utc>,
    pub archived_by_system: bool,
}

/// Outcome of a bulk archival run.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ArchiveBatchSummary {
    #[schema(example = 4)]
    pub archived: u32,
    #[schema(example = 1)]
    pub failed: u32,
}

impl ArchiveBatchSummary {
    pub fn record<T, E>(&mut self, outcome: &Result<T, E>) {
        match outcome {
            Ok(_) => self.archived += 1,
            Err(_) => self.failed += 1,
        }
    }

    pub fn message(&self) -> String {
        if self.failed == 0 {
            format!("Archived {} leave request(s)", self.archived)
        } else {
            format!(
                "Archived {} leave request(s), {} failed",
                self.archived, self.failed
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_summary_counts_failures_without_stopping() {
        let mut summary = ArchiveBatchSummary::default();
        summary.record::<(), &str>(&Ok(()));
        summary.record::<(), &str>(&Err("missing reviewer"));
        summary.record::<(), &str>(&Ok(()));

        assert_eq!(summary, ArchiveBatchSummary { archived: 2, failed: 1 });
        assert_eq!(summary.message(), "Archived 2 leave request(s), 1 failed");
    }
}
