use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::Value;
use sqlx::MySqlPool;
use tracing::info;
use utoipa::ToSchema;

use crate::{
    api::{created, ok},
    auth::auth::AuthUser,
    error::{AppError, AppResult},
    model::{department::Department, employee::Employee},
    utils::db_utils::{build_update_sql, execute_update},
};

const DEPARTMENT_COLUMNS: &str = "id, code, name, description, created_at";
pub(crate) const EMPLOYEE_COLUMNS: &str = "id, employee_code, full_name, gender, age, \
    department_id, position_id, motto, is_active, date_created, updated_at";

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateDepartment {
    #[schema(example = "CCS")]
    pub code: String,
    #[schema(example = "College of Computer Studies")]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

async fn find(pool: &MySqlPool, id: u64) -> AppResult<Department> {
    sqlx::query_as::<_, Department>(&format!(
        "SELECT {DEPARTMENT_COLUMNS} FROM departments WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found(format!("Department {id} not found")))
}

/// List departments
#[utoipa::path(
    get,
    path = "/api/departments",
    responses((status = 200, description = "All departments", body = [Department])),
    tag = "Department",
    security(("bearer_auth" = []))
)]
pub async fn list_departments(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> AppResult<HttpResponse> {
    auth.require_staff()?;

    let departments = sqlx::query_as::<_, Department>(&format!(
        "SELECT {DEPARTMENT_COLUMNS} FROM departments ORDER BY name"
    ))
    .fetch_all(pool.get_ref())
    .await?;

    Ok(ok("Departments", departments))
}

/// Create department
#[utoipa::path(
    post,
    path = "/api/departments",
    request_body = CreateDepartment,
    responses(
        (status = 201, description = "Department created", body = Department),
        (status = 409, description = "Department code already exists")
    ),
    tag = "Department",
    security(("bearer_auth" = []))
)]
pub async fn create_department(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateDepartment>,
) -> AppResult<HttpResponse> {
    auth.require_hr()?;

    let code = payload.code.trim();
    let name = payload.name.trim();
    if code.is_empty() || name.is_empty() {
        return Err(AppError::validation("Department code and name are required"));
    }

    let id = sqlx::query("INSERT INTO departments (code, name, description) VALUES (?, ?, ?)")
        .bind(code)
        .bind(name)
        .bind(payload.description.trim())
        .execute(pool.get_ref())
        .await
        .map_err(|e| AppError::from_insert(e, "Department code already exists"))?
        .last_insert_id();

    info!(department_id = id, code, "Department created");
    Ok(created("Department created", find(pool.get_ref(), id).await?))
}

/// Get department by ID
#[utoipa::path(
    get,
    path = "/api/departments/{department_id}",
    params(("department_id", Path, description = "Department ID")),
    responses(
        (status = 200, description = "Department found", body = Department),
        (status = 404, description = "Department not found")
    ),
    tag = "Department",
    security(("bearer_auth" = []))
)]
pub async fn get_department(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    auth.require_staff()?;
    Ok(ok("Department", find(pool.get_ref(), path.into_inner()).await?))
}

/// Update department
#[utoipa::path(
    put,
    path = "/api/departments/{department_id}",
    params(("department_id", Path, description = "Department ID")),
    request_body = Object,
    responses(
        (status = 200, description = "Department updated", body = Department),
        (status = 400, description = "Field not updatable"),
        (status = 404, description = "Department not found")
    ),
    tag = "Department",
    security(("bearer_auth" = []))
)]
pub async fn update_department(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> AppResult<HttpResponse> {
    auth.require_hr()?;
    let id = path.into_inner();
    find(pool.get_ref(), id).await?;

    let update = build_update_sql("departments", &body, &["code", "name", "description"], id)?;
    execute_update(pool.get_ref(), &update)
        .await
        .map_err(|e| AppError::from_insert(e, "Department code already exists"))?;

    info!(department_id = id, "Department updated");
    Ok(ok("Department updated", find(pool.get_ref(), id).await?))
}

/// Delete department
#[utoipa::path(
    delete,
    path = "/api/departments/{department_id}",
    params(("department_id", Path, description = "Department ID")),
    responses(
        (status = 200, description = "Department deleted"),
        (status = 404, description = "Department not found"),
        (status = 409, description = "Employees or deans are still assigned")
    ),
    tag = "Department",
    security(("bearer_auth" = []))
)]
pub async fn delete_department(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    auth.require_hr()?;
    let id = path.into_inner();
    find(pool.get_ref(), id).await?;

    let assigned = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT (SELECT COUNT(*) FROM employees WHERE department_id = ?)
             + (SELECT COUNT(*) FROM deans WHERE department_id = ?)
        "#,
    )
    .bind(id)
    .bind(id)
    .fetch_one(pool.get_ref())
    .await?;
    if assigned > 0 {
        return Err(AppError::Conflict(format!(
            "Department {id} still has {assigned} employee(s) or dean(s) assigned"
        )));
    }

    sqlx::query("DELETE FROM departments WHERE id = ?")
        .bind(id)
        .execute(pool.get_ref())
        .await?;

    info!(department_id = id, "Department deleted");
    Ok(ok("Department deleted", Value::Null))
}

/// Active employees of a department
#[utoipa::path(
    get,
    path = "/api/departments/{department_id}/employees",
    params(("department_id", Path, description = "Department ID")),
    responses(
        (status = 200, description = "Active employees", body = [Employee]),
        (status = 403, description = "Dean of another department")
    ),
    tag = "Department",
    security(("bearer_auth" = []))
)]
pub async fn department_employees(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    if !auth.can_view_department(id) {
        return Err(AppError::unauthorized("Not allowed to view this department"));
    }
    find(pool.get_ref(), id).await?;

    let employees = sqlx::query_as::<_, Employee>(&format!(
        "SELECT {EMPLOYEE_COLUMNS} FROM employees \
         WHERE department_id = ? AND is_active = TRUE ORDER BY full_name"
    ))
    .bind(id)
    .fetch_all(pool.get_ref())
    .await?;

    Ok(ok("Department employees", employees))
}
