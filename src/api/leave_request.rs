use actix_web::{HttpResponse, web};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

use crate::{
    api::{PageQuery, ok, paginated},
    auth::auth::AuthUser,
    error::{AppError, AppResult},
    model::{
        leave_report::LeaveReport,
        leave_request::{LeaveRequest, RequestStatus},
        role::ActorRole,
    },
    service::{
        archive,
        leave::{self, Decision, RequestFilter},
    },
};

#[derive(Debug, Deserialize, IntoParams)]
pub struct RequestQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    /// pending, dean_approved, dean_denied, approved or denied
    pub status: Option<RequestStatus>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ReviewBody {
    /// Required for an HR denial
    #[schema(example = "Approved as filed")]
    pub comments: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReviewOutcome {
    pub request: LeaveRequest,
    pub report: Option<LeaveReport>,
    /// Employee balance after the decision.
    #[schema(example = 10)]
    pub remaining_days: u32,
}

fn scoped_filter(auth: &AuthUser, status: Option<RequestStatus>) -> AppResult<RequestFilter> {
    auth.require_staff()?;
    Ok(RequestFilter {
        department_id: auth.actor.dean_department(),
        status,
        employee_id: None,
    })
}

/// The queue waiting on the caller: deans see pending requests of their department,
/// HR sees dean-approved ones.
fn pending_status(actor: &ActorRole) -> RequestStatus {
    match actor {
        ActorRole::Dean { .. } => RequestStatus::Pending,
        _ => RequestStatus::DeanApproved,
    }
}

/// List leave requests
#[utoipa::path(
    get,
    path = "/api/leave-requests",
    params(RequestQuery),
    responses((status = 200, description = "Paginated requests in the caller's scope", body = [crate::model::leave_request::LeaveRequestView])),
    tag = "Leave Request",
    security(("bearer_auth" = []))
)]
pub async fn list_leave_requests(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<RequestQuery>,
) -> AppResult<HttpResponse> {
    let filter = scoped_filter(&auth, query.status)?;
    let (page, per_page, offset) = PageQuery {
        page: query.page,
        per_page: query.per_page,
    }
    .limits();

    let (requests, total) = leave::list_requests(pool.get_ref(), &filter, per_page, offset).await?;
    Ok(paginated("Leave requests", requests, page, per_page, total))
}

/// Requests waiting on the caller
#[utoipa::path(
    get,
    path = "/api/leave-requests/pending",
    params(PageQuery),
    responses((status = 200, description = "Pending for a dean, dean-approved for HR", body = [crate::model::leave_request::LeaveRequestView])),
    tag = "Leave Request",
    security(("bearer_auth" = []))
)]
pub async fn pending_leave_requests(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let filter = scoped_filter(&auth, Some(pending_status(&auth.actor)))?;
    let (page, per_page, offset) = query.limits();

    let (requests, total) = leave::list_requests(pool.get_ref(), &filter, per_page, offset).await?;
    Ok(paginated("Pending leave requests", requests, page, per_page, total))
}

/// Get leave request by ID
#[utoipa::path(
    get,
    path = "/api/leave-requests/{request_id}",
    params(("request_id", Path, description = "Leave request ID")),
    responses(
        (status = 200, description = "Leave request", body = crate::model::leave_request::LeaveRequestView),
        (status = 403, description = "Request belongs to another department"),
        (status = 404, description = "Leave request not found")
    ),
    tag = "Leave Request",
    security(("bearer_auth" = []))
)]
pub async fn get_leave_request(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    auth.require_staff()?;
    let view = leave::get_request_view(pool.get_ref(), path.into_inner()).await?;
    if !auth.can_view_department(view.department_id) {
        return Err(AppError::unauthorized("Leave request belongs to another department"));
    }
    Ok(ok("Leave request", view))
}

/// Delete a dean-denied leave request
#[utoipa::path(
    delete,
    path = "/api/leave-requests/{request_id}",
    params(("request_id", Path, description = "Leave request ID")),
    responses(
        (status = 200, description = "Request, report and application removed"),
        (status = 409, description = "Request is not dean-denied")
    ),
    tag = "Leave Request",
    security(("bearer_auth" = []))
)]
pub async fn delete_leave_request(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    auth.require_staff()?;
    leave::delete(pool.get_ref(), path.into_inner(), &auth.actor).await?;
    Ok(ok("Leave request deleted", Value::Null))
}

async fn decide(
    auth: AuthUser,
    pool: &MySqlPool,
    request_id: u64,
    decision: Decision,
    body: Option<web::Json<ReviewBody>>,
) -> AppResult<HttpResponse> {
    let comments = body.and_then(|b| b.into_inner().comments);
    let case = leave::review(
        pool,
        request_id,
        &auth.actor,
        auth.user_id,
        decision,
        comments,
        Utc::now(),
    )
    .await?;

    Ok(ok(
        decision.message(),
        ReviewOutcome {
            request: case.request,
            report: case.report,
            remaining_days: case.balance.remaining_days,
        },
    ))
}

/// Dean approves and forwards to HR
#[utoipa::path(
    post,
    path = "/api/leave-requests/{request_id}/dean-approve",
    params(("request_id", Path, description = "Leave request ID")),
    request_body(content = ReviewBody, description = "Optional comments"),
    responses(
        (status = 200, description = "Forwarded to HR", body = ReviewOutcome),
        (status = 403, description = "Not the dean of the employee's department"),
        (status = 409, description = "Request is not pending")
    ),
    tag = "Leave Request",
    security(("bearer_auth" = []))
)]
pub async fn dean_approve(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: Option<web::Json<ReviewBody>>,
) -> AppResult<HttpResponse> {
    decide(auth, pool.get_ref(), path.into_inner(), Decision::DeanApprove, body).await
}

/// Dean denies; days go back to the balance
#[utoipa::path(
    post,
    path = "/api/leave-requests/{request_id}/dean-deny",
    params(("request_id", Path, description = "Leave request ID")),
    request_body(content = ReviewBody, description = "Optional comments"),
    responses(
        (status = 200, description = "Denied by dean", body = ReviewOutcome),
        (status = 403, description = "Not the dean of the employee's department"),
        (status = 409, description = "Request is not pending")
    ),
    tag = "Leave Request",
    security(("bearer_auth" = []))
)]
pub async fn dean_deny(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: Option<web::Json<ReviewBody>>,
) -> AppResult<HttpResponse> {
    decide(auth, pool.get_ref(), path.into_inner(), Decision::DeanDeny, body).await
}

/// HR gives final approval
#[utoipa::path(
    post,
    path = "/api/leave-requests/{request_id}/hr-approve",
    params(("request_id", Path, description = "Leave request ID")),
    request_body(content = ReviewBody, description = "Optional comments"),
    responses(
        (status = 200, description = "Approved", body = ReviewOutcome),
        (status = 403, description = "HR only"),
        (status = 409, description = "Request is not dean-approved")
    ),
    tag = "Leave Request",
    security(("bearer_auth" = []))
)]
pub async fn hr_approve(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: Option<web::Json<ReviewBody>>,
) -> AppResult<HttpResponse> {
    decide(auth, pool.get_ref(), path.into_inner(), Decision::HrApprove, body).await
}

/// HR denies; comments are required and days go back to the balance
#[utoipa::path(
    post,
    path = "/api/leave-requests/{request_id}/hr-deny",
    params(("request_id", Path, description = "Leave request ID")),
    request_body = ReviewBody,
    responses(
        (status = 200, description = "Denied", body = ReviewOutcome),
        (status = 400, description = "Comments missing"),
        (status = 403, description = "HR only"),
        (status = 409, description = "Request is not dean-approved")
    ),
    tag = "Leave Request",
    security(("bearer_auth" = []))
)]
pub async fn hr_deny(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: Option<web::Json<ReviewBody>>,
) -> AppResult<HttpResponse> {
    decide(auth, pool.get_ref(), path.into_inner(), Decision::HrDeny, body).await
}

/// Archive one approved or denied request
#[utoipa::path(
    post,
    path = "/api/leave-requests/{request_id}/archive",
    params(("request_id", Path, description = "Leave request ID")),
    responses(
        (status = 200, description = "Archived", body = crate::model::archive::LeaveArchive),
        (status = 400, description = "Not finally decided, already archived or reviewer missing"),
        (status = 403, description = "HR only")
    ),
    tag = "Leave Request",
    security(("bearer_auth" = []))
)]
pub async fn archive_leave_request(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let archive = archive::archive_one(pool.get_ref(), path.into_inner(), &auth.actor, false, Utc::now()).await?;
    Ok(ok("Leave request archived", archive))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(actor: ActorRole) -> AuthUser {
        AuthUser {
            user_id: 1,
            username: "someone".into(),
            actor,
        }
    }

    #[test]
    fn pending_queue_depends_on_reviewer() {
        let dean = ActorRole::Dean { dean_id: 1, department_id: 2 };
        assert_eq!(pending_status(&dean), RequestStatus::Pending);
        assert_eq!(pending_status(&ActorRole::Hr), RequestStatus::DeanApproved);
    }

    #[test]
    fn listing_is_scoped_to_the_dean_department() {
        let filter = scoped_filter(&user(ActorRole::Dean { dean_id: 1, department_id: 2 }), None).unwrap();
        assert_eq!(filter.department_id, Some(2));

        let filter = scoped_filter(&user(ActorRole::Hr), Some(RequestStatus::Approved)).unwrap();
        assert_eq!(filter.department_id, None);
        assert_eq!(filter.status, Some(RequestStatus::Approved));

        assert!(matches!(
            scoped_filter(&user(ActorRole::Employee), None),
            Err(AppError::Unauthorized(_))
        ));
    }
}
