use actix_web::{HttpResponse, web};
use serde::Deserialize;
use sqlx::MySqlPool;
use utoipa::IntoParams;

use crate::{
    api::{PageQuery, ok, paginated},
    auth::auth::AuthUser,
    error::AppResult,
    service::report,
};

const DEFAULT_RECENT: u32 = 10;

#[derive(Debug, Deserialize, IntoParams)]
pub struct RecentQuery {
    /// How many reports to return (default 10, max 100)
    pub limit: Option<u32>,
}

/// List leave reports
#[utoipa::path(
    get,
    path = "/api/leave-reports",
    params(PageQuery),
    responses((status = 200, description = "Paginated reports in the caller's scope", body = [crate::model::leave_report::LeaveReport])),
    tag = "Leave Report",
    security(("bearer_auth" = []))
)]
pub async fn list_leave_reports(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let (page, per_page, offset) = query.limits();
    let (reports, total) = report::list(pool.get_ref(), &auth.actor, per_page, offset).await?;
    Ok(paginated("Leave reports", reports, page, per_page, total))
}

/// Most recent leave reports
#[utoipa::path(
    get,
    path = "/api/leave-reports/recent",
    params(RecentQuery),
    responses((status = 200, description = "Newest reports first", body = [crate::model::leave_report::LeaveReport])),
    tag = "Leave Report",
    security(("bearer_auth" = []))
)]
pub async fn recent_leave_reports(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<RecentQuery>,
) -> AppResult<HttpResponse> {
    let limit = query.limit.unwrap_or(DEFAULT_RECENT).clamp(1, 100);
    let reports = report::recent(pool.get_ref(), &auth.actor, limit).await?;
    Ok(ok("Recent leave reports", reports))
}

/// Report counts by leave type
#[utoipa::path(
    get,
    path = "/api/leave-reports/statistics",
    responses((status = 200, description = "Totals in the caller's scope", body = crate::service::report::ReportStatistics)),
    tag = "Leave Report",
    security(("bearer_auth" = []))
)]
pub async fn leave_report_statistics(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> AppResult<HttpResponse> {
    let stats = report::statistics(pool.get_ref(), &auth.actor).await?;
    Ok(ok("Leave report statistics", stats))
}

/// Get leave report by ID
#[utoipa::path(
    get,
    path = "/api/leave-reports/{report_id}",
    params(("report_id", Path, description = "Leave report ID")),
    responses(
        (status = 200, description = "Leave report", body = crate::model::leave_report::LeaveReport),
        (status = 404, description = "Not found or outside the caller's department")
    ),
    tag = "Leave Report",
    security(("bearer_auth" = []))
)]
pub async fn get_leave_report(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let report = report::get(pool.get_ref(), &auth.actor, path.into_inner()).await?;
    Ok(ok("Leave report", report))
}
