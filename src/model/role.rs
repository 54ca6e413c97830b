use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::string_column;

/// Role stored on a `users` row.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Hr,
    Dean,
}

string_column!(Role);

/// Who is acting, resolved once per HTTP request from the bearer token.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActorRole {
    Hr,
    Dean { dean_id: u64, department_id: u64 },
    /// Kiosk holder filing on behalf of an employee.
    Employee,
}

impl ActorRole {
    pub fn is_hr(&self) -> bool {
        matches!(self, ActorRole::Hr)
    }

    pub fn is_dean_of(&self, department_id: u64) -> bool {
        matches!(self, ActorRole::Dean { department_id: d, .. } if *d == department_id)
    }

    pub fn dean_department(&self) -> Option<u64> {
        match self {
            ActorRole::Dean { department_id, .. } => Some(*department_id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_column_text() {
        assert_eq!(Role::Hr.as_ref(), "hr");
        assert_eq!(Role::try_from("dean".to_string()).unwrap(), Role::Dean);
        assert!(Role::try_from("admin".to_string()).is_err());
    }

    #[test]
    fn dean_scope_is_department_bound() {
        let dean = ActorRole::Dean { dean_id: 7, department_id: 1 };
        assert!(dean.is_dean_of(1));
        assert!(!dean.is_dean_of(2));
        assert!(!ActorRole::Hr.is_dean_of(1));
        assert_eq!(dean.dean_department(), Some(1));
    }
}
