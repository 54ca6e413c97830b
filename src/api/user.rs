use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use utoipa::ToSchema;

use crate::{
    api::{created, ok},
    auth::auth::AuthUser,
    error::AppResult,
    service::account::{self, NewUser},
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct RotateAccessKey {
    #[schema(example = "kiosk-secret-2026")]
    pub key: String,
}

/// Create HR user
#[utoipa::path(
    post,
    path = "/api/users",
    request_body = NewUser,
    responses(
        (status = 201, description = "HR user created", body = Object, example = json!({
            "success": true, "message": "HR user created", "data": { "id": 2 }
        })),
        (status = 403, description = "HR only"),
        (status = 409, description = "Username already taken")
    ),
    tag = "User",
    security(("bearer_auth" = []))
)]
pub async fn create_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<NewUser>,
) -> AppResult<HttpResponse> {
    auth.require_hr()?;
    let id = account::create_hr_user(pool.get_ref(), &payload).await?;
    Ok(created("HR user created", json!({ "id": id })))
}

/// Rotate the kiosk access key
#[utoipa::path(
    post,
    path = "/api/access-keys",
    request_body = RotateAccessKey,
    responses(
        (status = 200, description = "Kiosk key replaced; previous keys stop working"),
        (status = 403, description = "HR only")
    ),
    tag = "User",
    security(("bearer_auth" = []))
)]
pub async fn rotate_access_key(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<RotateAccessKey>,
) -> AppResult<HttpResponse> {
    auth.require_hr()?;
    account::rotate_access_key(pool.get_ref(), &payload.key).await?;
    Ok(ok("Access key updated", serde_json::Value::Null))
}
