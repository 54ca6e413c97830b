use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

pub const MIN_AGE: u32 = 18;
pub const MAX_AGE: u32 = 100;
const CODE_PREFIX: &str = "OC-";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "employee_code": "OC-20260001",
        "full_name": "Maria Santos Cruz",
        "gender": "female",
        "age": 34,
        "department_id": 1,
        "position_id": 2,
        "motto": "",
        "is_active": true,
        "date_created": "2026-01-01T00:00:00Z",
        "updated_at": "2026-01-01T00:00:00Z"
    })
)]
pub struct Employee {
    pub id: u64,
    pub employee_code: String,
    pub full_name: String,
    pub gender: String,
    pub age: u32,
    pub department_id: u64,
    pub position_id: u64,
    pub motto: String,
    pub is_active: bool,
    #[schema(format = "date-time", value_type = String)]
    pub date_created: DateTime<Utc>,
    #[schema(format = "date-time", value_type = String)]
    pub updated_at: DateTime<Utc>,
}

/// Next `OC-<year><seq>` code after `last` (the highest code already issued this year).
pub fn next_employee_code(year: i32, last: Option<&str>) -> String {
    let prefix = format!("{CODE_PREFIX}{year}");
    let next = last
        .and_then(|code| code.strip_prefix(&prefix))
        .and_then(|seq| seq.parse::<u32>().ok())
        .map_or(1, |n| n + 1);

    format!("{prefix}{next:04}")
}

pub fn validate_gender(gender: &str) -> AppResult<()> {
    match gender {
        "male" | "female" | "other" => Ok(()),
        _ => Err(AppError::validation("Gender must be one of: male, female, other")),
    }
}

pub fn validate_age(age: u32) -> AppResult<()> {
    if (MIN_AGE..=MAX_AGE).contains(&age) {
        Ok(())
    } else {
        Err(AppError::validation(format!(
            "Age must be between {MIN_AGE} and {MAX_AGE}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_code_of_the_year_starts_at_one() {
        assert_eq!(next_employee_code(2026, None), "OC-20260001");
    }

    #[test]
    fn code_sequence_continues_from_last() {
        assert_eq!(next_employee_code(2026, Some("OC-20260041")), "OC-20260042");
        assert_eq!(next_employee_code(2026, Some("OC-20269999")), "OC-202610000");
    }

    #[test]
    fn code_from_another_year_restarts_sequence() {
        assert_eq!(next_employee_code(2027, Some("OC-20260041")), "OC-20270001");
    }

    #[test]
    fn age_and_gender_bounds() {
        assert!(validate_age(18).is_ok());
        assert!(validate_age(100).is_ok());
        assert!(validate_age(17).is_err());
        assert!(validate_gender("female").is_ok());
        assert!(validate_gender("unknown").is_err());
    }
}
