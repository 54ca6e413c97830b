use actix_web::{HttpRequest, HttpResponse, web};
use serde::{Deserialize, Serialize};
use sqlx::{MySqlConnection, MySqlPool};
use tracing::{debug, info, instrument};
use utoipa::ToSchema;

use crate::{
    api::ok,
    auth::{
        auth::bearer_token,
        jwt::{
            Claims, Identity, TokenType, generate_access_token, generate_kiosk_token,
            generate_refresh_token, verify_token,
        },
    },
    config::Config,
    error::{AppError, AppResult},
    model::role::Role,
    service::account,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "hr.jane")]
    pub username: String,
    #[schema(example = "changeme123")]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    #[schema(example = "Bearer")]
    pub token_type: String,
    /// Access token lifetime in seconds.
    #[schema(example = 900)]
    pub expires_in: usize,
    pub role: Role,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AccessKeyRequest {
    #[schema(example = "kiosk-secret-2026")]
    pub key: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct KioskToken {
    pub kiosk_token: String,
    #[schema(example = 1800)]
    pub expires_in: usize,
}

async fn store_refresh_token(conn: &mut MySqlConnection, claims: &Claims) -> AppResult<()> {
    debug!(user_id = claims.user_id, jti = %claims.jti, "Storing refresh token");
    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (user_id, jti, expires_at)
        VALUES (?, ?, FROM_UNIXTIME(?))
        "#,
    )
    .bind(claims.user_id)
    .bind(&claims.jti)
    .bind(claims.exp as i64)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Issues an access token and a stored refresh token.
async fn issue_pair(
    conn: &mut MySqlConnection,
    identity: &Identity,
    config: &Config,
) -> AppResult<TokenPair> {
    let access_token =
        generate_access_token(identity, &config.jwt_secret, config.access_token_ttl)?;
    let (refresh_token, refresh_claims) =
        generate_refresh_token(identity, &config.jwt_secret, config.refresh_token_ttl)?;
    store_refresh_token(conn, &refresh_claims).await?;

    Ok(TokenPair {
        access_token,
        refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: config.access_token_ttl,
        role: identity.role,
    })
}

fn refresh_claims(req: &HttpRequest, config: &Config) -> Option<Claims> {
    let token = bearer_token(req)?;
    verify_token(token, &config.jwt_secret)
        .ok()
        .filter(|c| c.token_type == TokenType::Refresh)
}

/// Login with HR or dean credentials
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = TokenPair),
        (status = 400, description = "Username or password missing"),
        (status = 403, description = "Invalid credentials", body = Object, example = json!({
            "success": false, "message": "Invalid credentials"
        }))
    ),
    tag = "Auth"
)]
#[instrument(
    name = "auth_login",
    skip(pool, config, body),
    fields(username = %body.username)
)]
pub async fn login(
    body: web::Json<LoginRequest>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> AppResult<HttpResponse> {
    info!("Login request received");

    if body.username.trim().is_empty() || body.password.is_empty() {
        return Err(AppError::validation("Username or password required"));
    }

    let Some(identity) = account::authenticate(pool.get_ref(), &body.username, &body.password).await?
    else {
        info!("Invalid credentials");
        return Err(AppError::unauthorized("Invalid credentials"));
    };

    let mut conn = pool.acquire().await?;
    let pair = issue_pair(&mut conn, &identity, &config).await?;

    info!(user_id = identity.user_id, role = %identity.role, "Login successful");
    Ok(ok("Login successful", pair))
}

/// Rotate a refresh token
#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "New token pair", body = TokenPair),
        (status = 403, description = "Refresh token invalid, expired or revoked")
    ),
    tag = "Auth",
    security(("bearer_auth" = []))
)]
pub async fn refresh_token(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> AppResult<HttpResponse> {
    let claims = refresh_claims(&req, &config)
        .ok_or_else(|| AppError::unauthorized("Invalid refresh token"))?;

    let mut tx = pool.begin().await?;

    let record = sqlx::query_scalar::<_, u64>(
        r#"
        SELECT id FROM refresh_tokens
        WHERE jti = ? AND revoked = 0 AND expires_at > NOW()
        FOR UPDATE
        "#,
    )
    .bind(&claims.jti)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::unauthorized("Refresh token revoked or expired"))?;

    sqlx::query("UPDATE refresh_tokens SET revoked = 1 WHERE id = ?")
        .bind(record)
        .execute(&mut *tx)
        .await?;

    // role or department may have changed since login
    let identity = account::reload_identity(pool.get_ref(), claims.user_id).await?;
    let pair = issue_pair(&mut tx, &identity, &config).await?;

    tx.commit().await?;
    debug!(user_id = identity.user_id, "Refresh token rotated");
    Ok(ok("Token refreshed", pair))
}

/// Revoke a refresh token
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 204, description = "Logged out, even when the token was unknown")),
    tag = "Auth",
    security(("bearer_auth" = []))
)]
pub async fn logout(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> AppResult<HttpResponse> {
    let Some(claims) = refresh_claims(&req, &config) else {
        return Ok(HttpResponse::NoContent().finish());
    };

    sqlx::query("UPDATE refresh_tokens SET revoked = 1 WHERE jti = ?")
        .bind(&claims.jti)
        .execute(pool.get_ref())
        .await?;

    info!(user_id = claims.user_id, "Logged out");
    Ok(HttpResponse::NoContent().finish())
}

/// Exchange the kiosk access key for a kiosk token
#[utoipa::path(
    post,
    path = "/auth/verify-key",
    request_body = AccessKeyRequest,
    responses(
        (status = 200, description = "Kiosk token issued", body = KioskToken),
        (status = 403, description = "Invalid access key", body = Object, example = json!({
            "success": false, "message": "Invalid access key"
        }))
    ),
    tag = "Auth"
)]
pub async fn verify_key(
    body: web::Json<AccessKeyRequest>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> AppResult<HttpResponse> {
    if !account::verify_access_key(pool.get_ref(), &body.key).await? {
        info!("Kiosk access key rejected");
        return Err(AppError::unauthorized("Invalid access key"));
    }

    let kiosk_token = generate_kiosk_token(&config.jwt_secret, config.kiosk_token_ttl)?;
    Ok(ok(
        "Access key verified",
        KioskToken {
            kiosk_token,
            expires_in: config.kiosk_token_ttl,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use actix_web::test::TestRequest;

    fn identity() -> Identity {
        Identity {
            user_id: 3,
            username: "dean.reyes".into(),
            role: Role::Dean,
            dean_id: Some(1),
            department_id: Some(2),
        }
    }

    #[test]
    fn only_refresh_tokens_are_accepted_for_rotation() {
        let config = test_config();
        let access = generate_access_token(&identity(), &config.jwt_secret, 60).unwrap();
        let (refresh, claims) = generate_refresh_token(&identity(), &config.jwt_secret, 60).unwrap();

        let with_access = TestRequest::default()
            .insert_header(("Authorization", format!("Bearer {access}")))
            .to_http_request();
        assert!(refresh_claims(&with_access, &config).is_none());

        let with_refresh = TestRequest::default()
            .insert_header(("Authorization", format!("Bearer {refresh}")))
            .to_http_request();
        assert_eq!(refresh_claims(&with_refresh, &config).unwrap().jti, claims.jti);

        assert!(refresh_claims(&TestRequest::default().to_http_request(), &config).is_none());
    }
}
