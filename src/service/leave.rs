//! Persistence around the leave workflow: every operation loads what it needs under row locks,
//! runs the pure transition, writes the result back and commits.

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use sqlx::{MySqlConnection, MySqlPool};
use strum_macros::{AsRefStr, Display};
use tracing::info;
use utoipa::ToSchema;

use crate::{
    bind_values,
    error::{AppError, AppResult},
    model::{
        employee::Employee,
        leave_application::{LeaveApplication, NewLeaveApplication},
        leave_balance::LeaveBalance,
        leave_report::LeaveReport,
        leave_request::{LeaveRequest, LeaveRequestView, RequestStatus},
        role::ActorRole,
    },
    utils::db_utils::{Conditions, SqlValue},
    workflow::{self, LeaveCase, Submission},
};

const REQUEST_COLUMNS: &str = "id, application_id, status, dean_reviewer_id, \
    dean_reviewed_at, dean_comments, hr_reviewer_id, hr_reviewed_at, hr_comments, balance_year, \
    balance_before, balance_after, is_archived, created_at, updated_at";

const APPLICATION_COLUMNS: &str = "id, employee_id, leave_type, vacation_location, \
    sick_location, number_of_days, reason, date_filed, status";

const REPORT_COLUMNS: &str = "id, leave_request_id, employee_id, leave_type, \
    number_of_days, location, date_filed, dean_status, dean_reviewer_id, dean_reviewed_at, \
    dean_comments, hr_status, hr_reviewer_id, hr_reviewed_at, hr_comments, created_at, updated_at";

const VIEW_SELECT: &str = r#"
    SELECT r.id, r.application_id, r.status, r.dean_reviewer_id, r.dean_reviewed_at,
           r.dean_comments, r.hr_reviewer_id, r.hr_reviewed_at, r.hr_comments, r.balance_year,
           r.balance_before, r.balance_after, r.is_archived, r.created_at, r.updated_at,
           e.id AS employee_id, e.employee_code, e.full_name AS employee_name, e.department_id,
           d.name AS department_name, p.title AS position_title,
           a.leave_type, a.number_of_days, a.vacation_location, a.sick_location, a.reason,
           a.date_filed
    FROM leave_requests r
    JOIN leave_applications a ON a.id = r.application_id
    JOIN employees e ON e.id = a.employee_id
    JOIN departments d ON d.id = e.department_id
    JOIN positions p ON p.id = e.position_id
"#;

/// Reviewer decision on a leave request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum Decision {
    DeanApprove,
    DeanDeny,
    HrApprove,
    HrDeny,
}

impl Decision {
    pub fn message(&self) -> &'static str {
        match self {
            Decision::DeanApprove => "Leave request approved by dean and forwarded to HR",
            Decision::DeanDeny => "Leave request denied by dean, days returned to balance",
            Decision::HrApprove => "Leave request approved",
            Decision::HrDeny => "Leave request denied, days returned to balance",
        }
    }
}

/// Result of a successful submission.
#[derive(Debug, Serialize, ToSchema)]
pub struct FiledLeave {
    pub application: LeaveApplication,
    pub request: LeaveRequest,
    #[schema(example = 10)]
    pub remaining_days: u32,
}

/// Returns the `(employee, year)` balance locked for update, creating it at the yearly
/// allotment when missing.
async fn lock_balance(
    conn: &mut MySqlConnection,
    employee_id: u64,
    year: u32,
) -> AppResult<LeaveBalance> {
    let fresh = LeaveBalance::new(employee_id, year);
    sqlx::query(
        "INSERT IGNORE INTO leave_balances (employee_id, year, remaining_days) VALUES (?, ?, ?)",
    )
    .bind(fresh.employee_id)
    .bind(fresh.year)
    .bind(fresh.remaining_days)
    .execute(&mut *conn)
    .await?;

    let balance = sqlx::query_as::<_, LeaveBalance>(
        r#"
        SELECT employee_id, year, remaining_days
        FROM leave_balances
        WHERE employee_id = ? AND year = ?
        FOR UPDATE
        "#,
    )
    .bind(employee_id)
    .bind(year)
    .fetch_one(&mut *conn)
    .await?;

    Ok(balance)
}

async fn save_balance(conn: &mut MySqlConnection, balance: &LeaveBalance) -> AppResult<()> {
    sqlx::query(
        "UPDATE leave_balances SET remaining_days = ? WHERE employee_id = ? AND year = ?",
    )
    .bind(balance.remaining_days)
    .bind(balance.employee_id)
    .bind(balance.year)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Current-year balance for the kiosk greeting; created on first look.
pub async fn current_balance(pool: &MySqlPool, employee_id: u64, now: DateTime<Utc>) -> AppResult<LeaveBalance> {
    let mut tx = pool.begin().await?;
    let balance = lock_balance(&mut tx, employee_id, now.year() as u32).await?;
    tx.commit().await?;
    Ok(balance)
}

pub async fn submit(
    pool: &MySqlPool,
    form: &NewLeaveApplication,
    now: DateTime<Utc>,
) -> AppResult<FiledLeave> {
    let mut tx = pool.begin().await?;

    let employee = sqlx::query_as::<_, Employee>("SELECT * FROM employees WHERE id = ?")
        .bind(form.employee_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found("Employee not found in records"))?;

    let mut balance = lock_balance(&mut tx, employee.id, now.year() as u32).await?;
    let Submission {
        mut application,
        mut request,
    } = workflow::submit(&employee, &mut balance, form, now.date_naive(), now)?;

    application.id = sqlx::query(
        r#"
        INSERT INTO leave_applications
            (employee_id, leave_type, vacation_location, sick_location, number_of_days, reason,
             date_filed, status)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(application.employee_id)
    .bind(application.leave_type.to_string())
    .bind(application.vacation_location.as_deref())
    .bind(application.sick_location.as_deref())
    .bind(application.number_of_days)
    .bind(&application.reason)
    .bind(application.date_filed)
    .bind(application.status.to_string())
    .execute(&mut *tx)
    .await?
    .last_insert_id();

    request.application_id = application.id;
    request.id = sqlx::query(
        r#"
        INSERT INTO leave_requests
            (application_id, status, dean_comments, hr_comments, balance_year, balance_before,
             is_archived, created_at, updated_at)
        VALUES (?, ?, '', '', ?, ?, FALSE, ?, ?)
        "#,
    )
    .bind(request.application_id)
    .bind(request.status.to_string())
    .bind(request.balance_year)
    .bind(request.balance_before)
    .bind(request.created_at)
    .bind(request.updated_at)
    .execute(&mut *tx)
    .await?
    .last_insert_id();

    save_balance(&mut tx, &balance).await?;
    tx.commit().await?;

    info!(
        request_id = request.id,
        employee_id = employee.id,
        days = application.number_of_days,
        remaining = balance.remaining_days,
        action = "submit",
        status = %request.status,
        "Leave application filed"
    );

    Ok(FiledLeave {
        application,
        request,
        remaining_days: balance.remaining_days,
    })
}

pub(crate) async fn fetch_request(
    conn: &mut MySqlConnection,
    request_id: u64,
) -> AppResult<LeaveRequest> {
    sqlx::query_as::<_, LeaveRequest>(&format!(
        "SELECT {REQUEST_COLUMNS} FROM leave_requests WHERE id = ? FOR UPDATE"
    ))
    .bind(request_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::not_found(format!("Leave request {request_id} not found")))
}

pub(crate) async fn fetch_application(
    conn: &mut MySqlConnection,
    application_id: u64,
) -> AppResult<LeaveApplication> {
    sqlx::query_as::<_, LeaveApplication>(&format!(
        "SELECT {APPLICATION_COLUMNS} FROM leave_applications WHERE id = ? FOR UPDATE"
    ))
    .bind(application_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::not_found(format!("Leave application {application_id} not found")))
}

/// Request, application, balance and report of one case, locked in that order.
async fn load_case(conn: &mut MySqlConnection, request_id: u64) -> AppResult<LeaveCase> {
    let request = fetch_request(conn, request_id).await?;
    let application = fetch_application(conn, request.application_id).await?;

    let department_id =
        sqlx::query_scalar::<_, u64>("SELECT department_id FROM employees WHERE id = ?")
            .bind(application.employee_id)
            .fetch_one(&mut *conn)
            .await?;

    let balance = lock_balance(conn, application.employee_id, request.balance_year).await?;

    let report = sqlx::query_as::<_, LeaveReport>(&format!(
        "SELECT {REPORT_COLUMNS} FROM leave_reports WHERE leave_request_id = ?"
    ))
    .bind(request.id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(LeaveCase {
        request,
        application,
        department_id,
        balance,
        report,
    })
}

async fn upsert_report(conn: &mut MySqlConnection, report: &LeaveReport) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO leave_reports
            (leave_request_id, employee_id, leave_type, number_of_days, location, date_filed,
             dean_status, dean_reviewer_id, dean_reviewed_at, dean_comments,
             hr_status, hr_reviewer_id, hr_reviewed_at, hr_comments, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON DUPLICATE KEY UPDATE
            dean_status = VALUES(dean_status),
            dean_reviewer_id = VALUES(dean_reviewer_id),
            dean_reviewed_at = VALUES(dean_reviewed_at),
            dean_comments = VALUES(dean_comments),
            hr_status = VALUES(hr_status),
            hr_reviewer_id = VALUES(hr_reviewer_id),
            hr_reviewed_at = VALUES(hr_reviewed_at),
            hr_comments = VALUES(hr_comments),
            updated_at = VALUES(updated_at)
        "#,
    )
    .bind(report.leave_request_id)
    .bind(report.employee_id)
    .bind(report.leave_type.to_string())
    .bind(report.number_of_days)
    .bind(&report.location)
    .bind(report.date_filed)
    .bind(report.dean_status.to_string())
    .bind(report.dean_reviewer_id)
    .bind(report.dean_reviewed_at)
    .bind(&report.dean_comments)
    .bind(report.hr_status.to_string())
    .bind(report.hr_reviewer_id)
    .bind(report.hr_reviewed_at)
    .bind(&report.hr_comments)
    .bind(report.created_at)
    .bind(report.updated_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn save_case(conn: &mut MySqlConnection, case: &LeaveCase) -> AppResult<()> {
    let r = &case.request;
    sqlx::query(
        r#"
        UPDATE leave_requests
        SET status = ?, dean_reviewer_id = ?, dean_reviewed_at = ?, dean_comments = ?,
            hr_reviewer_id = ?, hr_reviewed_at = ?, hr_comments = ?, balance_after = ?,
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(r.status.to_string())
    .bind(r.dean_reviewer_id)
    .bind(r.dean_reviewed_at)
    .bind(&r.dean_comments)
    .bind(r.hr_reviewer_id)
    .bind(r.hr_reviewed_at)
    .bind(&r.hr_comments)
    .bind(r.balance_after)
    .bind(r.updated_at)
    .bind(r.id)
    .execute(&mut *conn)
    .await?;

    sqlx::query("UPDATE leave_applications SET status = ? WHERE id = ?")
        .bind(case.application.status.to_string())
        .bind(case.application.id)
        .execute(&mut *conn)
        .await?;

    save_balance(conn, &case.balance).await?;

    if let Some(report) = &case.report {
        upsert_report(conn, report).await?;
    }
    Ok(())
}

/// Applies a reviewer decision. `user_id` is the HR user id recorded on HR decisions.
pub async fn review(
    pool: &MySqlPool,
    request_id: u64,
    actor: &ActorRole,
    user_id: u64,
    decision: Decision,
    comments: Option<String>,
    now: DateTime<Utc>,
) -> AppResult<LeaveCase> {
    let mut tx = pool.begin().await?;
    let mut case = load_case(&mut tx, request_id).await?;

    match decision {
        Decision::DeanApprove => case.dean_approve(actor, comments, now)?,
        Decision::DeanDeny => case.dean_deny(actor, comments, now)?,
        Decision::HrApprove => case.hr_approve(actor, user_id, comments, now)?,
        Decision::HrDeny => {
            case.hr_deny(actor, user_id, comments.as_deref().unwrap_or_default(), now)?
        }
    }

    save_case(&mut tx, &case).await?;
    tx.commit().await?;

    info!(
        request_id,
        action = %decision,
        status = %case.request.status,
        remaining = case.balance.remaining_days,
        "Leave request reviewed"
    );
    Ok(case)
}

/// Removes a dean-denied request together with its report and application.
pub async fn delete(pool: &MySqlPool, request_id: u64, actor: &ActorRole) -> AppResult<()> {
    let mut tx = pool.begin().await?;
    let case = load_case(&mut tx, request_id).await?;
    case.ensure_deletable(actor)?;

    sqlx::query("DELETE FROM leave_reports WHERE leave_request_id = ?")
        .bind(request_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM leave_requests WHERE id = ?")
        .bind(request_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM leave_applications WHERE id = ?")
        .bind(case.application.id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    info!(request_id, action = "delete", "Leave request deleted");
    Ok(())
}

/// Filters for request listings; `department_id` comes from the caller's scope.
#[derive(Debug, Default)]
pub struct RequestFilter {
    pub department_id: Option<u64>,
    pub status: Option<RequestStatus>,
    pub employee_id: Option<u64>,
}

impl RequestFilter {
    fn conditions(&self) -> Conditions {
        let mut c = Conditions::default();
        if let Some(dept) = self.department_id {
            c.push("e.department_id = ?", SqlValue::U64(dept));
        }
        if let Some(status) = self.status {
            c.push("r.status = ?", SqlValue::String(status.to_string()));
        }
        if let Some(emp) = self.employee_id {
            c.push("e.id = ?", SqlValue::U64(emp));
        }
        c
    }
}

pub async fn list_requests(
    pool: &MySqlPool,
    filter: &RequestFilter,
    limit: u32,
    offset: u32,
) -> AppResult<(Vec<LeaveRequestView>, i64)> {
    let conditions = filter.conditions();
    let where_sql = conditions.where_sql();

    let count_sql = format!(
        r#"
        SELECT COUNT(*)
        FROM leave_requests r
        JOIN leave_applications a ON a.id = r.application_id
        JOIN employees e ON e.id = a.employee_id
        {where_sql}
        "#
    );
    let total = bind_values!(sqlx::query_scalar::<_, i64>(&count_sql), &conditions.values)
        .fetch_one(pool)
        .await?;

    let data_sql = format!("{VIEW_SELECT}{where_sql} ORDER BY r.created_at DESC, r.id DESC LIMIT ? OFFSET ?");
    let rows = bind_values!(sqlx::query_as::<_, LeaveRequestView>(&data_sql), &conditions.values)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

    Ok((rows, total))
}

pub async fn get_request_view(pool: &MySqlPool, request_id: u64) -> AppResult<LeaveRequestView> {
    sqlx::query_as::<_, LeaveRequestView>(&format!("{VIEW_SELECT} WHERE r.id = ?"))
        .bind(request_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Leave request {request_id} not found")))
}
