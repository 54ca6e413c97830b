use chrono::{DateTime, Utc};
use sqlx::{MySqlConnection, MySqlPool};
use tracing::{info, warn};

use crate::{
    bind_values,
    error::{AppError, AppResult},
    model::{
        archive::{ArchiveBatchSummary, LeaveArchive},
        role::ActorRole,
    },
    service::leave::{fetch_application, fetch_request},
    utils::db_utils::{Conditions, SqlValue},
    workflow::{ArchiveSource, build_archive},
};

const ARCHIVE_COLUMNS: &str = "id, original_leave_request_id, original_leave_application_id, \
    employee_code, employee_name, employee_department, employee_position, leave_type, \
    number_of_days, vacation_location, sick_location, reason, date_filed, dean_name, \
    dean_department, dean_reviewed_at, dean_comments, hr_reviewer_username, hr_reviewer_name, \
    hr_reviewed_at, hr_comments, final_status, leave_balance_before, leave_balance_after, \
    leave_balance_year, archived_at, archived_by_system";

#[derive(sqlx::FromRow)]
struct EmployeeIdentity {
    employee_code: String,
    employee_name: String,
    employee_department: String,
    employee_position: String,
}

async fn load_source(conn: &mut MySqlConnection, request_id: u64) -> AppResult<ArchiveSource> {
    let request = fetch_request(conn, request_id).await?;
    let application = fetch_application(conn, request.application_id).await?;

    let identity = sqlx::query_as::<_, EmployeeIdentity>(
        r#"
        SELECT e.employee_code, e.full_name AS employee_name,
               d.name AS employee_department, p.title AS employee_position
        FROM employees e
        JOIN departments d ON d.id = e.department_id
        JOIN positions p ON p.id = e.position_id
        WHERE e.id = ?
        "#,
    )
    .bind(application.employee_id)
    .fetch_one(&mut *conn)
    .await?;

    let dean = match request.dean_reviewer_id {
        Some(dean_id) => {
            sqlx::query_as::<_, (String, String)>(
                r#"
                SELECT dn.full_name, d.name
                FROM deans dn
                JOIN departments d ON d.id = dn.department_id
                WHERE dn.id = ?
                "#,
            )
            .bind(dean_id)
            .fetch_optional(&mut *conn)
            .await?
        }
        None => None,
    };

    let hr = match request.hr_reviewer_id {
        Some(user_id) => {
            sqlx::query_as::<_, (String, String)>("SELECT username, full_name FROM users WHERE id = ?")
                .bind(user_id)
                .fetch_optional(&mut *conn)
                .await?
        }
        None => None,
    };

    let (dean_name, dean_department) = dean.unzip();
    let (hr_username, hr_name) = hr.unzip();

    Ok(ArchiveSource {
        request,
        application,
        employee_code: identity.employee_code,
        employee_name: identity.employee_name,
        employee_department: identity.employee_department,
        employee_position: identity.employee_position,
        dean_name,
        dean_department,
        hr_username,
        hr_name,
    })
}

async fn insert_archive(conn: &mut MySqlConnection, archive: &LeaveArchive) -> AppResult<u64> {
    let result = sqlx::query(
        r#"
        INSERT INTO leave_request_archives
            (original_leave_request_id, original_leave_application_id, employee_code,
             employee_name, employee_department, employee_position, leave_type, number_of_days,
             vacation_location, sick_location, reason, date_filed, dean_name, dean_department,
             dean_reviewed_at, dean_comments, hr_reviewer_username, hr_reviewer_name,
             hr_reviewed_at, hr_comments, final_status, leave_balance_before,
             leave_balance_after, leave_balance_year, archived_at, archived_by_system)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(archive.original_leave_request_id)
    .bind(archive.original_leave_application_id)
    .bind(&archive.employee_code)
    .bind(&archive.employee_name)
    .bind(&archive.employee_department)
    .bind(&archive.employee_position)
    .bind(archive.leave_type.to_string())
    .bind(archive.number_of_days)
    .bind(archive.vacation_location.as_deref())
    .bind(archive.sick_location.as_deref())
    .bind(&archive.reason)
    .bind(archive.date_filed)
    .bind(&archive.dean_name)
    .bind(&archive.dean_department)
    .bind(archive.dean_reviewed_at)
    .bind(&archive.dean_comments)
    .bind(&archive.hr_reviewer_username)
    .bind(&archive.hr_reviewer_name)
    .bind(archive.hr_reviewed_at)
    .bind(&archive.hr_comments)
    .bind(archive.final_status.to_string())
    .bind(archive.leave_balance_before)
    .bind(archive.leave_balance_after)
    .bind(archive.leave_balance_year)
    .bind(archive.archived_at)
    .bind(archive.archived_by_system)
    .execute(&mut *conn)
    .await
    .map_err(|e| AppError::from_insert(e, "Leave request is already archived"))?;

    Ok(result.last_insert_id())
}

/// Snapshots one terminal request and flags it archived.
pub async fn archive_one(
    pool: &MySqlPool,
    request_id: u64,
    actor: &ActorRole,
    by_system: bool,
    now: DateTime<Utc>,
) -> AppResult<LeaveArchive> {
    let mut tx = pool.begin().await?;
    let source = load_source(&mut tx, request_id).await?;

    let mut archive = build_archive(&source, actor, by_system, now)?;
    archive.id = insert_archive(&mut tx, &archive).await?;

    sqlx::query("UPDATE leave_requests SET is_archived = TRUE WHERE id = ?")
        .bind(request_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    info!(
        request_id,
        archive_id = archive.id,
        action = "archive",
        status = %archive.final_status,
        by_system,
        "Leave request archived"
    );
    Ok(archive)
}

/// Archives every approved or denied request not archived yet. Each one gets its own
/// transaction; failures are counted and the batch goes on.
pub async fn archive_all_processed(
    pool: &MySqlPool,
    actor: &ActorRole,
    now: DateTime<Utc>,
) -> AppResult<ArchiveBatchSummary> {
    if !actor.is_hr() {
        return Err(AppError::unauthorized("Only HR can archive leave requests"));
    }

    let ids = sqlx::query_scalar::<_, u64>(
        r#"
        SELECT id FROM leave_requests
        WHERE status IN ('approved', 'denied') AND is_archived = FALSE
        ORDER BY id
        "#,
    )
    .fetch_all(pool)
    .await?;

    let summary = archive_each(ids, |request_id| archive_one(pool, request_id, actor, true, now)).await;
    info!(archived = summary.archived, failed = summary.failed, "Bulk archive finished");
    Ok(summary)
}

/// Runs `archive` over every id in order. A failed id is logged and counted, never fatal.
async fn archive_each<F, Fut>(ids: Vec<u64>, mut archive: F) -> ArchiveBatchSummary
where
    F: FnMut(u64) -> Fut,
    Fut: Future<Output = AppResult<LeaveArchive>>,
{
    let mut summary = ArchiveBatchSummary::default();
    for request_id in ids {
        let outcome = archive(request_id).await;
        if let Err(e) = &outcome {
            warn!(request_id, error = %e, "Failed to archive leave request");
        }
        summary.record(&outcome);
    }
    summary
}

/// Deans only see archives of their own department, matched by its current name.
pub async fn list(
    pool: &MySqlPool,
    actor: &ActorRole,
    final_status: Option<&str>,
    limit: u32,
    offset: u32,
) -> AppResult<(Vec<LeaveArchive>, i64)> {
    let mut conditions = Conditions::default();
    match actor {
        ActorRole::Hr => {}
        ActorRole::Dean { department_id, .. } => conditions.push(
            "employee_department = (SELECT name FROM departments WHERE id = ?)",
            SqlValue::U64(*department_id),
        ),
        ActorRole::Employee => return Err(AppError::unauthorized("HR or dean only")),
    }
    if let Some(status) = final_status {
        conditions.push("final_status = ?", SqlValue::String(status.to_string()));
    }
    let where_sql = conditions.where_sql();

    let count_sql = format!("SELECT COUNT(*) FROM leave_request_archives{where_sql}");
    let total = bind_values!(sqlx::query_scalar::<_, i64>(&count_sql), &conditions.values)
        .fetch_one(pool)
        .await?;

    let data_sql = format!(
        "SELECT {ARCHIVE_COLUMNS} FROM leave_request_archives{where_sql} \
         ORDER BY archived_at DESC, id DESC LIMIT ? OFFSET ?"
    );
    let rows = bind_values!(sqlx::query_as::<_, LeaveArchive>(&data_sql), &conditions.values)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

    Ok((rows, total))
}

/// Reads one archive, enforcing the same scope as [`list`].
pub async fn get(pool: &MySqlPool, actor: &ActorRole, archive_id: u64) -> AppResult<LeaveArchive> {
    let archive = sqlx::query_as::<_, LeaveArchive>(&format!(
        "SELECT {ARCHIVE_COLUMNS} FROM leave_request_archives WHERE id = ?"
    ))
    .bind(archive_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found(format!("Archive {archive_id} not found")))?;

    match actor {
        ActorRole::Hr => Ok(archive),
        ActorRole::Dean { department_id, .. } => {
            let name = sqlx::query_scalar::<_, String>("SELECT name FROM departments WHERE id = ?")
                .bind(department_id)
                .fetch_optional(pool)
                .await?;
            if name.as_deref() == Some(archive.employee_department.as_str()) {
                Ok(archive)
            } else {
                Err(AppError::unauthorized("This archive belongs to another department"))
            }
        }
        ActorRole::Employee => Err(AppError::unauthorized("HR or dean only")),
    }
}

pub async fn delete(pool: &MySqlPool, actor: &ActorRole, archive_id: u64) -> AppResult<()> {
    if !actor.is_hr() {
        return Err(AppError::unauthorized("Only HR can delete archives"));
    }

    let result = sqlx::query("DELETE FROM leave_request_archives WHERE id = ?")
        .bind(archive_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found(format!("Archive {archive_id} not found")));
    }
    info!(archive_id, "Archive deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{archive::FinalStatus, leave_application::LeaveType};
    use chrono::{NaiveDate, TimeZone};

    fn archived(request_id: u64) -> LeaveArchive {
        let at = Utc.with_ymd_and_hms(2026, 4, 1, 8, 0, 0).unwrap();
        LeaveArchive {
            id: request_id,
            original_leave_request_id: request_id,
            original_leave_application_id: request_id,
            employee_code: "OC-20260001".into(),
            employee_name: "Maria Cruz".into(),
            employee_department: "College of Nursing".into(),
            employee_position: "Instructor".into(),
            leave_type: LeaveType::Vacation,
            number_of_days: 2,
            vacation_location: Some("philippines".into()),
            sick_location: None,
            reason: String::new(),
            date_filed: NaiveDate::from_ymd_opt(2026, 3, 30).unwrap(),
            dean_name: "Dr. Ana Reyes".into(),
            dean_department: "College of Nursing".into(),
            dean_reviewed_at: at,
            dean_comments: String::new(),
            hr_reviewer_username: "hr.jane".into(),
            hr_reviewer_name: "Jane Dela Cruz".into(),
            hr_reviewed_at: at,
            hr_comments: String::new(),
            final_status: FinalStatus::Approved,
            leave_balance_before: 15,
            leave_balance_after: Some(13),
            leave_balance_year: 2026,
            archived_at: at,
            archived_by_system: true,
        }
    }

    #[actix_web::test]
    async fn failed_item_does_not_stop_the_batch() {
        let mut seen = Vec::new();
        let summary = archive_each(vec![1, 2, 3], |request_id| {
            seen.push(request_id);
            async move {
                if request_id == 2 {
                    Err(AppError::validation("Leave request must be reviewed by both dean and HR"))
                } else {
                    Ok(archived(request_id))
                }
            }
        })
        .await;

        assert_eq!(seen, vec![1, 2, 3]);
        assert_eq!(summary, ArchiveBatchSummary { archived: 2, failed: 1 });
    }
}
