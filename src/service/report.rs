//! Read side of leave reports. Reports are written only by the workflow in `service::leave`.

use serde::Serialize;
use sqlx::MySqlPool;
use utoipa::ToSchema;

use crate::{
    bind_values,
    error::{AppError, AppResult},
    model::{
        leave_report::{LeaveReport, LeaveTypeCount},
        role::ActorRole,
    },
    utils::db_utils::{Conditions, SqlValue},
};

const SCOPED_COLUMNS: &str = "lr.id, lr.leave_request_id, lr.employee_id, lr.leave_type, \
    lr.number_of_days, lr.location, lr.date_filed, lr.dean_status, lr.dean_reviewer_id, \
    lr.dean_reviewed_at, lr.dean_comments, lr.hr_status, lr.hr_reviewer_id, lr.hr_reviewed_at, \
    lr.hr_comments, lr.created_at, lr.updated_at";

const SCOPED_FROM: &str = " FROM leave_reports lr JOIN employees e ON e.id = lr.employee_id";

#[derive(Debug, Serialize, ToSchema)]
pub struct ReportStatistics {
    #[schema(example = 12)]
    pub total_reports: i64,
    pub by_leave_type: Vec<LeaveTypeCount>,
}

/// Department restriction for the caller; kiosk callers get nothing.
fn scope(actor: &ActorRole) -> AppResult<Conditions> {
    let mut conditions = Conditions::default();
    match actor {
        ActorRole::Hr => {}
        ActorRole::Dean { department_id, .. } => {
            conditions.push("e.department_id = ?", SqlValue::U64(*department_id))
        }
        ActorRole::Employee => return Err(AppError::unauthorized("HR or dean only")),
    }
    Ok(conditions)
}

pub async fn list(
    pool: &MySqlPool,
    actor: &ActorRole,
    limit: u32,
    offset: u32,
) -> AppResult<(Vec<LeaveReport>, i64)> {
    let conditions = scope(actor)?;
    let where_sql = conditions.where_sql();

    let count_sql = format!("SELECT COUNT(*){SCOPED_FROM}{where_sql}");
    let total = bind_values!(sqlx::query_scalar::<_, i64>(&count_sql), &conditions.values)
        .fetch_one(pool)
        .await?;

    let data_sql = format!(
        "SELECT {SCOPED_COLUMNS}{SCOPED_FROM}{where_sql} \
         ORDER BY lr.updated_at DESC, lr.id DESC LIMIT ? OFFSET ?"
    );
    let rows = bind_values!(sqlx::query_as::<_, LeaveReport>(&data_sql), &conditions.values)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

    Ok((rows, total))
}

/// Most recently created reports.
pub async fn recent(pool: &MySqlPool, actor: &ActorRole, limit: u32) -> AppResult<Vec<LeaveReport>> {
    let conditions = scope(actor)?;
    let sql = format!(
        "SELECT {SCOPED_COLUMNS}{SCOPED_FROM}{} ORDER BY lr.created_at DESC, lr.id DESC LIMIT ?",
        conditions.where_sql()
    );
    let rows = bind_values!(sqlx::query_as::<_, LeaveReport>(&sql), &conditions.values)
        .bind(limit)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn statistics(pool: &MySqlPool, actor: &ActorRole) -> AppResult<ReportStatistics> {
    let conditions = scope(actor)?;
    let where_sql = conditions.where_sql();

    let total_sql = format!("SELECT COUNT(*){SCOPED_FROM}{where_sql}");
    let total_reports = bind_values!(sqlx::query_scalar::<_, i64>(&total_sql), &conditions.values)
        .fetch_one(pool)
        .await?;

    let by_type_sql = format!(
        "SELECT lr.leave_type, COUNT(*) AS count{SCOPED_FROM}{where_sql} \
         GROUP BY lr.leave_type ORDER BY count DESC, lr.leave_type"
    );
    let by_leave_type = bind_values!(sqlx::query_as::<_, LeaveTypeCount>(&by_type_sql), &conditions.values)
        .fetch_all(pool)
        .await?;

    Ok(ReportStatistics {
        total_reports,
        by_leave_type,
    })
}

pub async fn get(pool: &MySqlPool, actor: &ActorRole, report_id: u64) -> AppResult<LeaveReport> {
    let mut conditions = scope(actor)?;
    conditions.push("lr.id = ?", SqlValue::U64(report_id));

    let sql = format!("SELECT {SCOPED_COLUMNS}{SCOPED_FROM}{}", conditions.where_sql());
    bind_values!(sqlx::query_as::<_, LeaveReport>(&sql), &conditions.values)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Leave report {report_id} not found")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dean_scope_filters_by_department() {
        let conditions = scope(&ActorRole::Dean { dean_id: 1, department_id: 4 }).unwrap();
        assert_eq!(conditions.where_sql(), " WHERE e.department_id = ?");
        assert_eq!(conditions.values, vec![SqlValue::U64(4)]);

        assert_eq!(scope(&ActorRole::Hr).unwrap().where_sql(), "");
        assert!(matches!(scope(&ActorRole::Employee), Err(AppError::Unauthorized(_))));
    }
}
