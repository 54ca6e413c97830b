use actix_web::{HttpResponse, web};
use serde::Serialize;
use sqlx::MySqlPool;
use utoipa::ToSchema;

use crate::{
    api::{created, department::EMPLOYEE_COLUMNS, ok},
    auth::auth::AuthUser,
    error::{AppError, AppResult},
    model::{
        employee::Employee, leave_report::LeaveReport, leave_request::LeaveRequestView,
        user::Dean,
    },
    service::{
        account::{self, NewDean},
        leave::{RequestFilter, list_requests},
        report,
    },
};

const DASHBOARD_LIMIT: u32 = 50;

#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct DeanProfile {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub dean: Dean,
    #[schema(example = "dean.reyes")]
    pub username: String,
    #[schema(example = "College of Nursing")]
    pub department_name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeanDashboard {
    pub profile: DeanProfile,
    pub faculty: Vec<Employee>,
    pub requests: Vec<LeaveRequestView>,
    pub reports: Vec<LeaveReport>,
}

/// Create dean
#[utoipa::path(
    post,
    path = "/api/deans",
    request_body = NewDean,
    responses(
        (status = 201, description = "Dean login and profile created", body = Dean),
        (status = 400, description = "Unknown department or weak password"),
        (status = 409, description = "Username already taken")
    ),
    tag = "Dean",
    security(("bearer_auth" = []))
)]
pub async fn create_dean(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<NewDean>,
) -> AppResult<HttpResponse> {
    auth.require_hr()?;
    let dean = account::create_dean(pool.get_ref(), &payload).await?;
    Ok(created("Dean created", dean))
}

async fn profile(pool: &MySqlPool, dean_id: u64) -> AppResult<DeanProfile> {
    sqlx::query_as::<_, DeanProfile>(
        r#"
        SELECT dn.id, dn.user_id, dn.full_name, dn.department_id, dn.is_active, dn.created_at,
               u.username, d.name AS department_name
        FROM deans dn
        JOIN users u ON u.id = dn.user_id
        JOIN departments d ON d.id = dn.department_id
        WHERE dn.id = ?
        "#,
    )
    .bind(dean_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("Dean profile not found"))
}

/// Current dean's profile
#[utoipa::path(
    get,
    path = "/api/deans/me",
    responses(
        (status = 200, description = "Dean profile", body = DeanProfile),
        (status = 403, description = "Dean only")
    ),
    tag = "Dean",
    security(("bearer_auth" = []))
)]
pub async fn me(auth: AuthUser, pool: web::Data<MySqlPool>) -> AppResult<HttpResponse> {
    let (dean_id, _) = auth.require_dean()?;
    Ok(ok("Dean profile", profile(pool.get_ref(), dean_id).await?))
}

/// Dean dashboard: faculty, latest requests and reports of the dean's department
#[utoipa::path(
    get,
    path = "/api/deans/dashboard",
    responses(
        (status = 200, description = "Department overview", body = DeanDashboard),
        (status = 403, description = "Dean only")
    ),
    tag = "Dean",
    security(("bearer_auth" = []))
)]
pub async fn dashboard(auth: AuthUser, pool: web::Data<MySqlPool>) -> AppResult<HttpResponse> {
    let (dean_id, department_id) = auth.require_dean()?;
    let pool = pool.get_ref();

    let profile = profile(pool, dean_id).await?;

    let faculty = sqlx::query_as::<_, Employee>(&format!(
        "SELECT {EMPLOYEE_COLUMNS} FROM employees \
         WHERE department_id = ? AND is_active = TRUE ORDER BY full_name"
    ))
    .bind(department_id)
    .fetch_all(pool)
    .await?;

    let filter = RequestFilter {
        department_id: Some(department_id),
        ..Default::default()
    };
    let (requests, _) = list_requests(pool, &filter, DASHBOARD_LIMIT, 0).await?;
    let reports = report::recent(pool, &auth.actor, DASHBOARD_LIMIT).await?;

    Ok(ok(
        "Dean dashboard",
        DeanDashboard {
            profile,
            faculty,
            requests,
            reports,
        },
    ))
}
