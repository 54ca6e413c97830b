use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use utoipa::ToSchema;

use crate::string_column;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
    EnumIter, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LeaveType {
    Vacation,
    Sick,
    Maternity,
    Paternity,
    Emergency,
}

impl LeaveType {
    pub fn label(&self) -> &'static str {
        match self {
            LeaveType::Vacation => "Vacation Leave",
            LeaveType::Sick => "Sick Leave",
            LeaveType::Maternity => "Maternity Leave",
            LeaveType::Paternity => "Paternity Leave",
            LeaveType::Emergency => "Emergency Leave",
        }
    }
}

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum VacationLocation {
    Philippines,
    Abroad,
}

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SickLocation {
    Hospital,
    Home,
}

/// Mirrors the owning request: pending until the final decision.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
}

string_column!(LeaveType, ApplicationStatus);

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct LeaveApplication {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 1)]
    pub employee_id: u64,
    #[sqlx(try_from = "String")]
    pub leave_type: LeaveType,
    #[schema(example = "philippines", nullable = true)]
    pub vacation_location: Option<String>,
    #[schema(example = "home", nullable = true)]
    pub sick_location: Option<String>,
    #[schema(example = 5)]
    pub number_of_days: u32,
    pub reason: String,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub date_filed: NaiveDate,
    #[sqlx(try_from = "String")]
    pub status: ApplicationStatus,
}

impl LeaveApplication {
    /// Where the leave is spent, as shown on reports.
    pub fn location(&self) -> String {
        self.vacation_location
            .clone()
            .or_else(|| self.sick_location.clone())
            .unwrap_or_else(|| "N/A".to_string())
    }
}

/// Submission payload.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewLeaveApplication {
    #[schema(example = 1)]
    pub employee_id: u64,
    pub leave_type: LeaveType,
    pub vacation_location: Option<VacationLocation>,
    pub sick_location: Option<SickLocation>,
    #[schema(example = 5)]
    pub number_of_days: u32,
    #[serde(default)]
    #[schema(example = "Family trip")]
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn application(vacation: Option<&str>, sick: Option<&str>) -> LeaveApplication {
        LeaveApplication {
            id: 1,
            employee_id: 1,
            leave_type: LeaveType::Vacation,
            vacation_location: vacation.map(str::to_string),
            sick_location: sick.map(str::to_string),
            number_of_days: 2,
            reason: String::new(),
            date_filed: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            status: ApplicationStatus::Pending,
        }
    }

    #[test]
    fn location_prefers_vacation_then_sick() {
        assert_eq!(application(Some("abroad"), Some("home")).location(), "abroad");
        assert_eq!(application(None, Some("hospital")).location(), "hospital");
        assert_eq!(application(None, None).location(), "N/A");
    }

    #[test]
    fn leave_type_column_text() {
        assert_eq!(LeaveType::Paternity.as_ref(), "paternity");
        assert_eq!(LeaveType::try_from("sick".to_string()).unwrap(), LeaveType::Sick);
    }
}
