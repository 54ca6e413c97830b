use actix_web::{HttpResponse, web};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use tracing::info;
use utoipa::ToSchema;

use crate::{
    api::{created, ok},
    error::{AppError, AppResult},
    model::leave_application::NewLeaveApplication,
    service::leave,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyEmployee {
    #[schema(example = "OC-20260001")]
    pub employee_code: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct KioskEmployee {
    #[schema(example = 1)]
    pub employee_id: u64,
    #[schema(example = "OC-20260001")]
    pub employee_code: String,
    #[schema(example = "Maria Santos Cruz")]
    pub full_name: String,
    #[schema(example = "College of Nursing")]
    pub department_name: String,
    #[schema(example = 15)]
    pub remaining_days: u32,
    #[schema(example = 2026)]
    pub year: u32,
}

/// Look up an employee by code at the kiosk
#[utoipa::path(
    post,
    path = "/kiosk/verify-employee",
    request_body = VerifyEmployee,
    responses(
        (status = 200, description = "Employee identity and current-year balance", body = KioskEmployee),
        (status = 400, description = "Employee is inactive"),
        (status = 404, description = "Employee code not found", body = Object, example = json!({
            "success": false, "message": "Employee not found in records"
        }))
    ),
    tag = "Kiosk",
    security(("kiosk_token" = []))
)]
pub async fn verify_employee(
    pool: web::Data<MySqlPool>,
    payload: web::Json<VerifyEmployee>,
) -> AppResult<HttpResponse> {
    let code = payload.employee_code.trim();
    if code.is_empty() {
        return Err(AppError::validation("Employee code is required"));
    }

    let (employee_id, employee_code, full_name, department_name, is_active) =
        sqlx::query_as::<_, (u64, String, String, String, bool)>(
            r#"
            SELECT e.id, e.employee_code, e.full_name, d.name, e.is_active
            FROM employees e
            JOIN departments d ON d.id = e.department_id
            WHERE e.employee_code = ?
            "#,
        )
        .bind(code)
        .fetch_optional(pool.get_ref())
        .await?
        .ok_or_else(|| AppError::not_found("Employee not found in records"))?;

    if !is_active {
        return Err(AppError::validation(format!(
            "Employee {employee_code} is inactive"
        )));
    }

    let balance = leave::current_balance(pool.get_ref(), employee_id, Utc::now()).await?;
    info!(employee_id, "Kiosk employee verified");

    Ok(ok(
        "Employee verified",
        KioskEmployee {
            employee_id,
            employee_code,
            full_name,
            department_name,
            remaining_days: balance.remaining_days,
            year: balance.year,
        },
    ))
}

/// File a leave application at the kiosk
#[utoipa::path(
    post,
    path = "/kiosk/leave-applications",
    request_body = NewLeaveApplication,
    responses(
        (status = 201, description = "Filed; days are deducted now", body = crate::service::leave::FiledLeave),
        (status = 400, description = "Invalid form or insufficient balance", body = Object, example = json!({
            "success": false,
            "message": "Insufficient leave balance. Requested 5 day(s) but only 3 remaining."
        })),
        (status = 404, description = "Employee not found")
    ),
    tag = "Kiosk",
    security(("kiosk_token" = []))
)]
pub async fn submit_leave_application(
    pool: web::Data<MySqlPool>,
    payload: web::Json<NewLeaveApplication>,
) -> AppResult<HttpResponse> {
    let filed = leave::submit(pool.get_ref(), &payload, Utc::now()).await?;
    Ok(created("Leave application submitted", filed))
}
