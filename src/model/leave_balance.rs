use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

/// Yearly allotment; also the ceiling for restorations.
pub const ANNUAL_LEAVE_DAYS: u32 = 15;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct LeaveBalance {
    #[schema(example = 1)]
    pub employee_id: u64,
    #[schema(example = 2026)]
    pub year: u32,
    #[schema(example = 15)]
    pub remaining_days: u32,
}

impl LeaveBalance {
    /// A fresh balance for `(employee, year)`.
    pub fn new(employee_id: u64, year: u32) -> Self {
        Self {
            employee_id,
            year,
            remaining_days: ANNUAL_LEAVE_DAYS,
        }
    }

    /// Leaves the balance untouched on failure.
    pub fn deduct(&mut self, days: u32) -> AppResult<()> {
        if days > self.remaining_days {
            return Err(AppError::InsufficientBalance {
                requested: days,
                remaining: self.remaining_days,
            });
        }
        self.remaining_days -= days;
        Ok(())
    }

    pub fn restore(&mut self, days: u32) {
        self.remaining_days = self
            .remaining_days
            .saturating_add(days)
            .min(ANNUAL_LEAVE_DAYS);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_balance_starts_at_allotment() {
        assert_eq!(LeaveBalance::new(1, 2026).remaining_days, 15);
    }

    #[test]
    fn deduct_beyond_remaining_fails_and_keeps_balance() {
        let mut balance = LeaveBalance { employee_id: 1, year: 2026, remaining_days: 3 };
        let err = balance.deduct(5).unwrap_err();

        assert!(matches!(err, AppError::InsufficientBalance { requested: 5, remaining: 3 }));
        assert_eq!(balance.remaining_days, 3);
    }

    #[test]
    fn deduct_can_reach_zero() {
        let mut balance = LeaveBalance::new(1, 2026);
        balance.deduct(15).unwrap();
        assert_eq!(balance.remaining_days, 0);
        assert!(balance.deduct(1).is_err());
    }

    #[test]
    fn restore_is_capped_even_when_repeated() {
        let mut balance = LeaveBalance { employee_id: 1, year: 2026, remaining_days: 10 };
        balance.restore(5);
        assert_eq!(balance.remaining_days, 15);
        balance.restore(5);
        assert_eq!(balance.remaining_days, 15);
    }

    #[test]
    fn restore_handles_huge_values() {
        let mut balance = LeaveBalance { employee_id: 1, year: 2026, remaining_days: 2 };
        balance.restore(u32::MAX);
        assert_eq!(balance.remaining_days, ANNUAL_LEAVE_DAYS);
    }
}
