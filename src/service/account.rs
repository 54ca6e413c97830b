use serde::Deserialize;
use sqlx::MySqlPool;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::{
    auth::{
        jwt::Identity,
        password::{hash_password, verify_password},
    },
    config::Config,
    error::{AppError, AppResult},
    model::{
        role::Role,
        user::{Dean, User},
    },
    utils::username_index,
};

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Deserialize, ToSchema)]
pub struct NewUser {
    #[schema(example = "hr.jane")]
    pub username: String,
    #[schema(example = "changeme123")]
    pub password: String,
    #[schema(example = "Jane Dela Cruz")]
    pub full_name: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct NewDean {
    #[schema(example = "dean.reyes")]
    pub username: String,
    #[schema(example = "changeme123")]
    pub password: String,
    #[schema(example = "Dr. Ana Reyes")]
    pub full_name: String,
    #[schema(example = 1)]
    pub department_id: u64,
}

fn validate_credentials(username: &str, password: &str, full_name: &str) -> AppResult<()> {
    if username.trim().is_empty() || full_name.trim().is_empty() {
        return Err(AppError::validation("Username and full name are required"));
    }
    if password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

async fn ensure_available(pool: &MySqlPool, username: &str) -> AppResult<()> {
    if username_index::is_username_available(pool, username).await? {
        Ok(())
    } else {
        Err(AppError::Conflict("Username already taken".into()))
    }
}

/// Resolves the token identity of an active user. Deans also need an active dean profile.
async fn identity_of(pool: &MySqlPool, user: &User) -> AppResult<Identity> {
    let (dean_id, department_id) = match user.role {
        Role::Hr => (None, None),
        Role::Dean => {
            let dean = sqlx::query_as::<_, (u64, u64)>(
                "SELECT id, department_id FROM deans WHERE user_id = ? AND is_active = TRUE",
            )
            .bind(user.id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::unauthorized("Dean profile missing or inactive"))?;
            (Some(dean.0), Some(dean.1))
        }
    };

    Ok(Identity {
        user_id: user.id,
        username: user.username.clone(),
        role: user.role,
        dean_id,
        department_id,
    })
}

const USER_COLUMNS: &str = "id, username, password, role, full_name, is_active";

/// Checks credentials; `None` means unknown user, inactive user or wrong password.
pub async fn authenticate(
    pool: &MySqlPool,
    username: &str,
    password: &str,
) -> AppResult<Option<Identity>> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE username = ?"
    ))
    .bind(username.trim())
    .fetch_optional(pool)
    .await?;

    let Some(user) = user.filter(|u| u.is_active) else {
        return Ok(None);
    };
    if !verify_password(password, &user.password) {
        return Ok(None);
    }

    let identity = identity_of(pool, &user).await?;

    // non-fatal
    if let Err(e) = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = ?")
        .bind(user.id)
        .execute(pool)
        .await
    {
        warn!(error = %e, user_id = user.id, "Failed to update last_login_at");
    }

    Ok(Some(identity))
}

/// Reloads an identity for refresh, so role or dean changes apply on the next token.
pub async fn reload_identity(pool: &MySqlPool, user_id: u64) -> AppResult<Identity> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = ? AND is_active = TRUE"
    ))
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::unauthorized("Account is inactive or no longer exists"))?;

    identity_of(pool, &user).await
}

async fn insert_user(
    conn: &mut sqlx::MySqlConnection,
    username: &str,
    password: &str,
    role: Role,
    full_name: &str,
) -> AppResult<u64> {
    let hashed = hash_password(password)?;
    let result = sqlx::query(
        "INSERT INTO users (username, password, role, full_name) VALUES (?, ?, ?, ?)",
    )
    .bind(username.trim())
    .bind(hashed)
    .bind(role.to_string())
    .bind(full_name.trim())
    .execute(&mut *conn)
    .await
    .map_err(|e| AppError::from_insert(e, "Username already taken"))?;

    Ok(result.last_insert_id())
}

pub async fn create_hr_user(pool: &MySqlPool, new: &NewUser) -> AppResult<u64> {
    validate_credentials(&new.username, &new.password, &new.full_name)?;
    ensure_available(pool, &new.username).await?;

    let mut conn = pool.acquire().await?;
    let id = insert_user(&mut conn, &new.username, &new.password, Role::Hr, &new.full_name).await?;
    username_index::mark_taken(&new.username).await;

    info!(user_id = id, username = %new.username, "HR user created");
    Ok(id)
}

/// Creates the dean's login and profile in one transaction.
pub async fn create_dean(pool: &MySqlPool, new: &NewDean) -> AppResult<Dean> {
    validate_credentials(&new.username, &new.password, &new.full_name)?;
    ensure_available(pool, &new.username).await?;

    let mut tx = pool.begin().await?;

    let department_exists =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM departments WHERE id = ?")
            .bind(new.department_id)
            .fetch_one(&mut *tx)
            .await?
            > 0;
    if !department_exists {
        return Err(AppError::validation(format!(
            "Department {} does not exist",
            new.department_id
        )));
    }

    let user_id = insert_user(&mut tx, &new.username, &new.password, Role::Dean, &new.full_name).await?;
    let dean_id = sqlx::query(
        "INSERT INTO deans (user_id, full_name, department_id) VALUES (?, ?, ?)",
    )
    .bind(user_id)
    .bind(new.full_name.trim())
    .bind(new.department_id)
    .execute(&mut *tx)
    .await?
    .last_insert_id();

    let dean = sqlx::query_as::<_, Dean>(
        "SELECT id, user_id, full_name, department_id, is_active, created_at FROM deans WHERE id = ?",
    )
    .bind(dean_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    username_index::mark_taken(&new.username).await;

    info!(dean_id, user_id, department_id = new.department_id, "Dean created");
    Ok(dean)
}

/// Creates the configured first HR account when no HR user exists.
pub async fn bootstrap_hr(pool: &MySqlPool, config: &Config) -> AppResult<()> {
    let Some((username, password)) = &config.bootstrap_hr else {
        return Ok(());
    };

    let hr_count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE role = 'hr'")
        .fetch_one(pool)
        .await?;
    if hr_count > 0 {
        return Ok(());
    }

    let new = NewUser {
        username: username.clone(),
        password: password.clone(),
        full_name: username.clone(),
    };
    create_hr_user(pool, &new).await?;
    info!(username = %username, "Bootstrap HR user created");
    Ok(())
}

pub async fn rotate_access_key(pool: &MySqlPool, key: &str) -> AppResult<()> {
    if key.len() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "Access key must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    sqlx::query("INSERT INTO access_keys (key_hash) VALUES (?)")
        .bind(hash_password(key)?)
        .execute(pool)
        .await?;
    info!("Kiosk access key rotated");
    Ok(())
}

/// Compares against the most recent key only.
pub async fn verify_access_key(pool: &MySqlPool, key: &str) -> AppResult<bool> {
    let latest = sqlx::query_scalar::<_, String>(
        "SELECT key_hash FROM access_keys ORDER BY created_at DESC, id DESC LIMIT 1",
    )
    .fetch_optional(pool)
    .await?;

    Ok(latest.is_some_and(|hash| verify_password(key, &hash)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::mysql::MySqlPoolOptions;

    #[test]
    fn credentials_need_name_and_long_password() {
        assert!(validate_credentials("hr.jane", "changeme123", "Jane").is_ok());
        assert!(matches!(
            validate_credentials(" ", "changeme123", "Jane"),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            validate_credentials("hr.jane", "short", "Jane"),
            Err(AppError::Validation(_))
        ));
    }

    #[actix_web::test]
    async fn created_username_conflicts_from_the_index() {
        // unreachable database: only the in-memory index can answer
        let pool = MySqlPoolOptions::new()
            .connect_lazy("mysql://localhost:1/leave_records_test")
            .unwrap();

        username_index::mark_taken("hr.bootstrap").await;
        assert!(matches!(
            ensure_available(&pool, "HR.Bootstrap").await,
            Err(AppError::Conflict(_))
        ));
    }
}
