use actix_web::{HttpResponse, web};
use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{MySqlConnection, MySqlPool};
use tracing::{debug, info};
use utoipa::{IntoParams, ToSchema};

use crate::{
    api::{PageQuery, created, department::EMPLOYEE_COLUMNS, ok, paginated},
    auth::auth::AuthUser,
    bind_values,
    error::{AppError, AppResult},
    model::employee::{Employee, next_employee_code, validate_age, validate_gender},
    service::leave::{RequestFilter, list_requests},
    utils::db_utils::{Conditions, SqlValue, build_update_sql, execute_update},
};

const UPDATABLE: &[&str] = &[
    "full_name",
    "gender",
    "age",
    "department_id",
    "position_id",
    "motto",
    "is_active",
];

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateEmployee {
    #[schema(example = "Maria Santos Cruz")]
    pub full_name: String,
    #[schema(example = "female")]
    pub gender: String,
    #[schema(example = 34)]
    pub age: u32,
    #[schema(example = 1)]
    pub department_id: u64,
    #[schema(example = 2)]
    pub position_id: u64,
    #[serde(default)]
    pub motto: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct EmployeeQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub is_active: Option<bool>,
    pub department_id: Option<u64>,
    pub position_id: Option<u64>,
    /// Matches name or employee code
    pub search: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct EmployeeListResponse {
    #[schema(example = true)]
    pub success: bool,
    pub message: String,
    pub data: Vec<Employee>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 42)]
    pub total: i64,
}

pub(crate) async fn find(pool: &MySqlPool, id: u64) -> AppResult<Employee> {
    sqlx::query_as::<_, Employee>(&format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Employee {id} not found")))
}

/// Loads an employee the caller may see.
async fn find_visible(pool: &MySqlPool, auth: &AuthUser, id: u64) -> AppResult<Employee> {
    let employee = find(pool, id).await?;
    if !auth.can_view_department(employee.department_id) {
        return Err(AppError::unauthorized("Employee belongs to another department"));
    }
    Ok(employee)
}

async fn ensure_references(
    conn: &mut MySqlConnection,
    department_id: Option<u64>,
    position_id: Option<u64>,
) -> AppResult<()> {
    if let Some(id) = department_id {
        let found = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM departments WHERE id = ?")
            .bind(id)
            .fetch_one(&mut *conn)
            .await?;
        if found == 0 {
            return Err(AppError::validation(format!("Department {id} does not exist")));
        }
    }
    if let Some(id) = position_id {
        let found = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM positions WHERE id = ?")
            .bind(id)
            .fetch_one(&mut *conn)
            .await?;
        if found == 0 {
            return Err(AppError::validation(format!("Position {id} does not exist")));
        }
    }
    Ok(())
}

/// Create employee
#[utoipa::path(
    post,
    path = "/api/employees",
    request_body = CreateEmployee,
    responses(
        (status = 201, description = "Employee created with a generated OC-<year><seq> code", body = Employee),
        (status = 400, description = "Invalid gender, age, department or position", body = Object, example = json!({
            "success": false, "message": "Age must be between 18 and 100"
        }))
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn create_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateEmployee>,
) -> AppResult<HttpResponse> {
    auth.require_hr()?;

    let full_name = payload.full_name.trim();
    if full_name.is_empty() {
        return Err(AppError::validation("Full name is required"));
    }
    validate_gender(&payload.gender)?;
    validate_age(payload.age)?;

    let mut tx = pool.begin().await?;
    ensure_references(&mut tx, Some(payload.department_id), Some(payload.position_id)).await?;

    let year = Utc::now().year();
    let last = sqlx::query_scalar::<_, String>(
        r#"
        SELECT employee_code FROM employees
        WHERE employee_code LIKE ?
        ORDER BY LENGTH(employee_code) DESC, employee_code DESC
        LIMIT 1
        FOR UPDATE
        "#,
    )
    .bind(format!("OC-{year}%"))
    .fetch_optional(&mut *tx)
    .await?;
    let code = next_employee_code(year, last.as_deref());
    debug!(code = %code, "Generated employee code");

    let id = sqlx::query(
        r#"
        INSERT INTO employees (employee_code, full_name, gender, age, department_id, position_id, motto)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&code)
    .bind(full_name)
    .bind(&payload.gender)
    .bind(payload.age)
    .bind(payload.department_id)
    .bind(payload.position_id)
    .bind(payload.motto.trim())
    .execute(&mut *tx)
    .await
    .map_err(|e| AppError::from_insert(e, "Employee code already issued, please retry"))?
    .last_insert_id();

    tx.commit().await?;
    info!(employee_id = id, code = %code, "Employee created");
    Ok(created("Employee created", find(pool.get_ref(), id).await?))
}

/// List employees
#[utoipa::path(
    get,
    path = "/api/employees",
    params(EmployeeQuery),
    responses((status = 200, description = "Paginated employee list", body = EmployeeListResponse)),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn list_employees(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<EmployeeQuery>,
) -> AppResult<HttpResponse> {
    auth.require_staff()?;

    let (page, per_page, offset) = PageQuery {
        page: query.page,
        per_page: query.per_page,
    }
    .limits();

    let mut conditions = Conditions::default();
    // deans are pinned to their own department
    let department_id = auth.actor.dean_department().or(query.department_id);
    if let Some(department_id) = department_id {
        conditions.push("department_id = ?", SqlValue::U64(department_id));
    }
    if let Some(position_id) = query.position_id {
        conditions.push("position_id = ?", SqlValue::U64(position_id));
    }
    if let Some(is_active) = query.is_active {
        conditions.push("is_active = ?", SqlValue::Bool(is_active));
    }
    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let like = format!("%{search}%");
        conditions.push_many(
            "(full_name LIKE ? OR employee_code LIKE ?)",
            [SqlValue::String(like.clone()), SqlValue::String(like)],
        );
    }
    let where_sql = conditions.where_sql();

    let count_sql = format!("SELECT COUNT(*) FROM employees{where_sql}");
    debug!(sql = %count_sql, bindings = ?conditions.values, "Counting employees");
    let total = bind_values!(sqlx::query_scalar::<_, i64>(&count_sql), &conditions.values)
        .fetch_one(pool.get_ref())
        .await?;

    let data_sql = format!(
        "SELECT {EMPLOYEE_COLUMNS} FROM employees{where_sql} ORDER BY id DESC LIMIT ? OFFSET ?"
    );
    let employees = bind_values!(sqlx::query_as::<_, Employee>(&data_sql), &conditions.values)
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await?;

    Ok(paginated("Employees", employees, page, per_page, total))
}

/// Get employee by ID
#[utoipa::path(
    get,
    path = "/api/employees/{employee_id}",
    params(("employee_id", Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Employee found", body = Employee),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn get_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let employee = find_visible(pool.get_ref(), &auth, path.into_inner()).await?;
    Ok(ok("Employee", employee))
}

/// Update employee
#[utoipa::path(
    put,
    path = "/api/employees/{employee_id}",
    params(("employee_id", Path, description = "Employee ID")),
    request_body(content = Object, description = "Any of: full_name, gender, age, department_id, position_id, motto, is_active"),
    responses(
        (status = 200, description = "Employee updated", body = Employee),
        (status = 400, description = "Field not updatable or invalid"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn update_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> AppResult<HttpResponse> {
    auth.require_hr()?;
    let id = path.into_inner();
    find(pool.get_ref(), id).await?;

    let update = build_update_sql("employees", &body, UPDATABLE, id)?;
    if let Some(gender) = body.get("gender") {
        validate_gender(gender.as_str().unwrap_or_default())?;
    }
    if let Some(age) = body.get("age") {
        let age = age
            .as_u64()
            .and_then(|a| u32::try_from(a).ok())
            .ok_or_else(|| AppError::validation("Age must be a whole number"))?;
        validate_age(age)?;
    }

    let mut conn = pool.acquire().await?;
    ensure_references(
        &mut conn,
        body.get("department_id").and_then(Value::as_u64),
        body.get("position_id").and_then(Value::as_u64),
    )
    .await?;
    execute_update(&mut *conn, &update).await?;

    info!(employee_id = id, "Employee updated");
    Ok(ok("Employee updated", find(pool.get_ref(), id).await?))
}

async fn set_active(pool: &MySqlPool, id: u64, active: bool) -> AppResult<Employee> {
    find(pool, id).await?;
    sqlx::query("UPDATE employees SET is_active = ? WHERE id = ?")
        .bind(active)
        .bind(id)
        .execute(pool)
        .await?;
    info!(employee_id = id, active, "Employee activation changed");
    find(pool, id).await
}

/// Deactivate employee
#[utoipa::path(
    delete,
    path = "/api/employees/{employee_id}",
    params(("employee_id", Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Employee deactivated; history is kept", body = Employee),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn delete_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    auth.require_hr()?;
    let employee = set_active(pool.get_ref(), path.into_inner(), false).await?;
    Ok(ok("Employee deactivated", employee))
}

/// Reactivate employee
#[utoipa::path(
    post,
    path = "/api/employees/{employee_id}/activate",
    params(("employee_id", Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Employee activated", body = Employee),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn activate_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    auth.require_hr()?;
    let employee = set_active(pool.get_ref(), path.into_inner(), true).await?;
    Ok(ok("Employee activated", employee))
}

/// Leave history of an employee
#[utoipa::path(
    get,
    path = "/api/employees/{employee_id}/leave-history",
    params(("employee_id", Path, description = "Employee ID"), PageQuery),
    responses((status = 200, description = "Requests filed by the employee", body = [crate::model::leave_request::LeaveRequestView])),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn leave_history(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let employee = find_visible(pool.get_ref(), &auth, path.into_inner()).await?;
    let (page, per_page, offset) = query.limits();

    let filter = RequestFilter {
        employee_id: Some(employee.id),
        ..Default::default()
    };
    let (requests, total) = list_requests(pool.get_ref(), &filter, per_page, offset).await?;

    Ok(paginated("Leave history", requests, page, per_page, total))
}
