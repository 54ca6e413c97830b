use std::{env, str::FromStr};

use anyhow::{Context, Result};

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub jwt_secret: String,
    pub server_addr: String,
    pub access_token_ttl: usize,
    pub refresh_token_ttl: usize,
    pub kiosk_token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_kiosk_per_min: u32,
    pub rate_refresh_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    // Archive PDF
    pub pdf_font_dir: String,
    pub pdf_font_name: String,
    pub institution_name: String,
    pub institution_address: String,

    /// First HR account, created only when no HR user exists yet.
    pub bootstrap_hr: Option<(String, String)>,
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{key} must be set"))
}

fn or_default<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}

fn text_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let bootstrap_hr = match (
            env::var("BOOTSTRAP_HR_USERNAME"),
            env::var("BOOTSTRAP_HR_PASSWORD"),
        ) {
            (Ok(user), Ok(pass)) if !user.trim().is_empty() && !pass.is_empty() => {
                Some((user.trim().to_string(), pass))
            }
            _ => None,
        };

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            db_max_connections: or_default("DB_MAX_CONNECTIONS", 10)?,
            jwt_secret: required("JWT_SECRET")?,
            access_token_ttl: or_default("ACCESS_TOKEN_TTL", 900)?, // 15 min
            refresh_token_ttl: or_default("REFRESH_TOKEN_TTL", 604_800)?, // 7 days
            kiosk_token_ttl: or_default("KIOSK_TOKEN_TTL", 1800)?,

            rate_login_per_min: or_default("RATE_LOGIN_PER_MIN", 60)?,
            rate_kiosk_per_min: or_default("RATE_KIOSK_PER_MIN", 30)?,
            rate_refresh_per_min: or_default("RATE_REFRESH_PER_MIN", 30)?,
            rate_protected_per_min: or_default("RATE_PROTECTED_PER_MIN", 1000)?,

            api_prefix: text_or("API_PREFIX", "/api"),

            pdf_font_dir: text_or("PDF_FONT_DIR", "./fonts"),
            pdf_font_name: text_or("PDF_FONT_NAME", "LiberationSans"),
            institution_name: text_or("INSTITUTION_NAME", "OSMEÑA COLLEGES"),
            institution_address: text_or("INSTITUTION_ADDRESS", "City of Masbate, 5400, Philippines"),

            bootstrap_hr,
        })
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        database_url: "mysql://localhost/leave_records_test".into(),
        db_max_connections: 1,
        jwt_secret: "test-secret".into(),
        server_addr: "127.0.0.1:0".into(),
        access_token_ttl: 900,
        refresh_token_ttl: 604_800,
        kiosk_token_ttl: 1800,
        rate_login_per_min: 60,
        rate_kiosk_per_min: 30,
        rate_refresh_per_min: 30,
        rate_protected_per_min: 1000,
        api_prefix: "/api".into(),
        pdf_font_dir: "./fonts".into(),
        pdf_font_name: "LiberationSans".into(),
        institution_name: "Test College".into(),
        institution_address: "Somewhere".into(),
        bootstrap_hr: None,
    }
}
