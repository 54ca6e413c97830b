use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::Value;
use sqlx::MySqlPool;
use tracing::info;
use utoipa::ToSchema;

use crate::{
    api::{created, department::EMPLOYEE_COLUMNS, ok},
    auth::auth::AuthUser,
    bind_values,
    error::{AppError, AppResult},
    model::{department::Position, employee::Employee},
    utils::db_utils::{Conditions, SqlValue, build_update_sql, execute_update},
};

const POSITION_COLUMNS: &str = "id, code, title, description, created_at";

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePosition {
    #[schema(example = "INSTR")]
    pub code: String,
    #[schema(example = "Instructor")]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

async fn find(pool: &MySqlPool, id: u64) -> AppResult<Position> {
    sqlx::query_as::<_, Position>(&format!(
        "SELECT {POSITION_COLUMNS} FROM positions WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found(format!("Position {id} not found")))
}

/// List positions
#[utoipa::path(
    get,
    path = "/api/positions",
    responses((status = 200, description = "All positions", body = [Position])),
    tag = "Position",
    security(("bearer_auth" = []))
)]
pub async fn list_positions(auth: AuthUser, pool: web::Data<MySqlPool>) -> AppResult<HttpResponse> {
    auth.require_staff()?;

    let positions = sqlx::query_as::<_, Position>(&format!(
        "SELECT {POSITION_COLUMNS} FROM positions ORDER BY title"
    ))
    .fetch_all(pool.get_ref())
    .await?;

    Ok(ok("Positions", positions))
}

/// Create position
#[utoipa::path(
    post,
    path = "/api/positions",
    request_body = CreatePosition,
    responses(
        (status = 201, description = "Position created", body = Position),
        (status = 409, description = "Position code already exists")
    ),
    tag = "Position",
    security(("bearer_auth" = []))
)]
pub async fn create_position(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreatePosition>,
) -> AppResult<HttpResponse> {
    auth.require_hr()?;

    let code = payload.code.trim();
    let title = payload.title.trim();
    if code.is_empty() || title.is_empty() {
        return Err(AppError::validation("Position code and title are required"));
    }

    let id = sqlx::query("INSERT INTO positions (code, title, description) VALUES (?, ?, ?)")
        .bind(code)
        .bind(title)
        .bind(payload.description.trim())
        .execute(pool.get_ref())
        .await
        .map_err(|e| AppError::from_insert(e, "Position code already exists"))?
        .last_insert_id();

    info!(position_id = id, code, "Position created");
    Ok(created("Position created", find(pool.get_ref(), id).await?))
}

/// Get position by ID
#[utoipa::path(
    get,
    path = "/api/positions/{position_id}",
    params(("position_id", Path, description = "Position ID")),
    responses(
        (status = 200, description = "Position found", body = Position),
        (status = 404, description = "Position not found")
    ),
    tag = "Position",
    security(("bearer_auth" = []))
)]
pub async fn get_position(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    auth.require_staff()?;
    Ok(ok("Position", find(pool.get_ref(), path.into_inner()).await?))
}

/// Update position
#[utoipa::path(
    put,
    path = "/api/positions/{position_id}",
    params(("position_id", Path, description = "Position ID")),
    request_body = Object,
    responses(
        (status = 200, description = "Position updated", body = Position),
        (status = 404, description = "Position not found")
    ),
    tag = "Position",
    security(("bearer_auth" = []))
)]
pub async fn update_position(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> AppResult<HttpResponse> {
    auth.require_hr()?;
    let id = path.into_inner();
    find(pool.get_ref(), id).await?;

    let update = build_update_sql("positions", &body, &["code", "title", "description"], id)?;
    execute_update(pool.get_ref(), &update)
        .await
        .map_err(|e| AppError::from_insert(e, "Position code already exists"))?;

    Ok(ok("Position updated", find(pool.get_ref(), id).await?))
}

/// Delete position
#[utoipa::path(
    delete,
    path = "/api/positions/{position_id}",
    params(("position_id", Path, description = "Position ID")),
    responses(
        (status = 200, description = "Position deleted"),
        (status = 404, description = "Position not found"),
        (status = 409, description = "Employees are still assigned")
    ),
    tag = "Position",
    security(("bearer_auth" = []))
)]
pub async fn delete_position(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    auth.require_hr()?;
    let id = path.into_inner();
    find(pool.get_ref(), id).await?;

    let assigned = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM employees WHERE position_id = ?")
        .bind(id)
        .fetch_one(pool.get_ref())
        .await?;
    if assigned > 0 {
        return Err(AppError::Conflict(format!(
            "Position {id} still has {assigned} employee(s) assigned"
        )));
    }

    sqlx::query("DELETE FROM positions WHERE id = ?")
        .bind(id)
        .execute(pool.get_ref())
        .await?;

    info!(position_id = id, "Position deleted");
    Ok(ok("Position deleted", Value::Null))
}

/// Active employees holding a position. Deans only see their own department.
#[utoipa::path(
    get,
    path = "/api/positions/{position_id}/employees",
    params(("position_id", Path, description = "Position ID")),
    responses((status = 200, description = "Active employees", body = [Employee])),
    tag = "Position",
    security(("bearer_auth" = []))
)]
pub async fn position_employees(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    auth.require_staff()?;
    let id = path.into_inner();
    find(pool.get_ref(), id).await?;

    let mut conditions = Conditions::default();
    conditions.push("position_id = ?", SqlValue::U64(id));
    conditions.push("is_active = ?", SqlValue::Bool(true));
    if let Some(department_id) = auth.actor.dean_department() {
        conditions.push("department_id = ?", SqlValue::U64(department_id));
    }

    let sql = format!(
        "SELECT {EMPLOYEE_COLUMNS} FROM employees{} ORDER BY full_name",
        conditions.where_sql()
    );
    let employees = bind_values!(sqlx::query_as::<_, Employee>(&sql), &conditions.values)
        .fetch_all(pool.get_ref())
        .await?;

    Ok(ok("Position employees", employees))
}
