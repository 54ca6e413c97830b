use actix_web::{HttpResponse, web};
use serde::Serialize;
use sqlx::MySqlPool;
use utoipa::ToSchema;

use crate::{api::ok, auth::auth::AuthUser, error::AppResult};

#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct DepartmentHeadcount {
    #[schema(example = "CON")]
    pub code: String,
    #[schema(example = "College of Nursing")]
    pub name: String,
    /// Active employees only
    #[schema(example = 12)]
    pub count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardStats {
    pub total_employees: i64,
    pub inactive_employees: i64,
    pub pending_requests: i64,
    pub approved_requests: i64,
    pub denied_requests: i64,
    pub departments: Vec<DepartmentHeadcount>,
}

/// HR dashboard counters
#[utoipa::path(
    get,
    path = "/api/dashboard-stats",
    responses(
        (status = 200, description = "Headcounts and request counts", body = DashboardStats),
        (status = 403, description = "HR only")
    ),
    tag = "Dashboard",
    security(("bearer_auth" = []))
)]
pub async fn dashboard_stats(auth: AuthUser, pool: web::Data<MySqlPool>) -> AppResult<HttpResponse> {
    auth.require_hr()?;
    let pool = pool.get_ref();

    let (total_employees, inactive_employees) = sqlx::query_as::<_, (i64, i64)>(
        r#"
        SELECT CAST(COALESCE(SUM(is_active = 1), 0) AS SIGNED),
               CAST(COALESCE(SUM(is_active = 0), 0) AS SIGNED)
        FROM employees
        "#,
    )
    .fetch_one(pool)
    .await?;

    // pending covers both review stages
    let (pending_requests, approved_requests, denied_requests) = sqlx::query_as::<_, (i64, i64, i64)>(
        r#"
        SELECT CAST(COALESCE(SUM(status IN ('pending', 'dean_approved')), 0) AS SIGNED),
               CAST(COALESCE(SUM(status = 'approved'), 0) AS SIGNED),
               CAST(COALESCE(SUM(status IN ('denied', 'dean_denied')), 0) AS SIGNED)
        FROM leave_requests
        "#,
    )
    .fetch_one(pool)
    .await?;

    let departments = sqlx::query_as::<_, DepartmentHeadcount>(
        r#"
        SELECT d.code, d.name, COUNT(e.id) AS count
        FROM departments d
        LEFT JOIN employees e ON e.department_id = d.id AND e.is_active = 1
        GROUP BY d.id, d.code, d.name
        ORDER BY d.name
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(ok(
        "Dashboard statistics",
        DashboardStats {
            total_employees,
            inactive_employees,
            pending_requests,
            approved_requests,
            denied_requests,
            departments,
        },
    ))
}
