use std::sync::Arc;

use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use anyhow::{Result, anyhow};

use crate::{
    api::{
        archive, dashboard, dean, department, employee, kiosk, leave_report, leave_request,
        position, user,
    },
    auth::{
        handlers,
        middleware::{auth_middleware, kiosk_middleware},
    },
    config::Config,
    error::AppError,
};

type Limiter = Arc<Governor<PeerIpKeyExtractor, NoOpMiddleware>>;

/// Per-IP limiters, built once and shared by every worker.
#[derive(Clone)]
pub struct Limiters {
    login: Limiter,
    refresh: Limiter,
    kiosk: Limiter,
    protected: Limiter,
}

fn build_limiter(requests_per_min: u32) -> Result<Limiter> {
    let burst = requests_per_min.max(1);
    let per_ms = 60_000 / u64::from(burst);
    let cfg = GovernorConfigBuilder::default()
        .milliseconds_per_request(per_ms.max(1))
        .burst_size(burst)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .ok_or_else(|| anyhow!("Invalid rate limit: {requests_per_min} per minute"))?;
    Ok(Arc::new(Governor::new(&cfg)))
}

impl Limiters {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            login: build_limiter(config.rate_login_per_min)?,
            refresh: build_limiter(config.rate_refresh_per_min)?,
            kiosk: build_limiter(config.rate_kiosk_per_min)?,
            protected: build_limiter(config.rate_protected_per_min)?,
        })
    }
}

/// Malformed bodies, query strings and path segments answer with the failure envelope.
fn extractor_errors(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|e, _| AppError::validation(e.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|e, _| AppError::validation(e.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|e, _| AppError::validation(e.to_string()).into()),
    );
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config, limiters: &Limiters) {
    extractor_errors(cfg);

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(limiters.login.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(limiters.refresh.clone())
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(limiters.login.clone())
                    .route(web::post().to(handlers::logout)),
            )
            .service(
                web::resource("/verify-key")
                    .wrap(limiters.kiosk.clone())
                    .route(web::post().to(handlers::verify_key)),
            ),
    );

    // Kiosk routes
    cfg.service(
        web::scope("/kiosk")
            .wrap(from_fn(kiosk_middleware))
            .wrap(limiters.kiosk.clone())
            .service(
                web::resource("/verify-employee").route(web::post().to(kiosk::verify_employee)),
            )
            .service(
                web::resource("/leave-applications")
                    .route(web::post().to(kiosk::submit_leave_application)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            .wrap(limiters.protected.clone())
            .service(
                web::scope("/departments")
                    .service(
                        web::resource("")
                            .route(web::get().to(department::list_departments))
                            .route(web::post().to(department::create_department)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(department::get_department))
                            .route(web::put().to(department::update_department))
                            .route(web::delete().to(department::delete_department)),
                    )
                    .service(
                        web::resource("/{id}/employees")
                            .route(web::get().to(department::department_employees)),
                    ),
            )
            .service(
                web::scope("/positions")
                    .service(
                        web::resource("")
                            .route(web::get().to(position::list_positions))
                            .route(web::post().to(position::create_position)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(position::get_position))
                            .route(web::put().to(position::update_position))
                            .route(web::delete().to(position::delete_position)),
                    )
                    .service(
                        web::resource("/{id}/employees")
                            .route(web::get().to(position::position_employees)),
                    ),
            )
            .service(
                web::scope("/employees")
                    .service(
                        web::resource("")
                            .route(web::get().to(employee::list_employees))
                            .route(web::post().to(employee::create_employee)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(employee::get_employee))
                            .route(web::put().to(employee::update_employee))
                            .route(web::delete().to(employee::delete_employee)),
                    )
                    .service(
                        web::resource("/{id}/activate")
                            .route(web::post().to(employee::activate_employee)),
                    )
                    .service(
                        web::resource("/{id}/leave-history")
                            .route(web::get().to(employee::leave_history)),
                    ),
            )
            .service(web::resource("/users").route(web::post().to(user::create_user)))
            .service(web::resource("/access-keys").route(web::post().to(user::rotate_access_key)))
            .service(
                web::scope("/deans")
                    .service(web::resource("").route(web::post().to(dean::create_dean)))
                    .service(web::resource("/me").route(web::get().to(dean::me)))
                    .service(web::resource("/dashboard").route(web::get().to(dean::dashboard))),
            )
            .service(
                web::scope("/leave-requests")
                    .service(
                        web::resource("").route(web::get().to(leave_request::list_leave_requests)),
                    )
                    // static segments before /{id}
                    .service(
                        web::resource("/pending")
                            .route(web::get().to(leave_request::pending_leave_requests)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(leave_request::get_leave_request))
                            .route(web::delete().to(leave_request::delete_leave_request)),
                    )
                    .service(
                        web::resource("/{id}/dean-approve")
                            .route(web::post().to(leave_request::dean_approve)),
                    )
                    .service(
                        web::resource("/{id}/dean-deny")
                            .route(web::post().to(leave_request::dean_deny)),
                    )
                    .service(
                        web::resource("/{id}/hr-approve")
                            .route(web::post().to(leave_request::hr_approve)),
                    )
                    .service(
                        web::resource("/{id}/hr-deny").route(web::post().to(leave_request::hr_deny)),
                    )
                    .service(
                        web::resource("/{id}/archive")
                            .route(web::post().to(leave_request::archive_leave_request)),
                    ),
            )
            .service(
                web::scope("/leave-reports")
                    .service(
                        web::resource("").route(web::get().to(leave_report::list_leave_reports)),
                    )
                    .service(
                        web::resource("/recent")
                            .route(web::get().to(leave_report::recent_leave_reports)),
                    )
                    .service(
                        web::resource("/statistics")
                            .route(web::get().to(leave_report::leave_report_statistics)),
                    )
                    .service(
                        web::resource("/{id}").route(web::get().to(leave_report::get_leave_report)),
                    ),
            )
            .service(
                web::scope("/archives")
                    .service(web::resource("").route(web::get().to(archive::list_archives)))
                    .service(
                        web::resource("/archive-all").route(web::post().to(archive::archive_all)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(archive::get_archive))
                            .route(web::delete().to(archive::delete_archive)),
                    )
                    .service(web::resource("/{id}/pdf").route(web::get().to(archive::archive_pdf))),
            )
            .service(
                web::resource("/dashboard-stats").route(web::get().to(dashboard::dashboard_stats)),
            ),
    );
}

// LOGIN
//  ├─ access_token (15 min)
//  └─ refresh_token (7 days)

// KIOSK
//  └─ POST /auth/verify-key with the access key
//       └─ kiosk_token, only accepted under /kiosk

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{auth::jwt::generate_kiosk_token, config::test_config};
    use actix_web::{App, http::StatusCode, test, web::Data};
    use serde_json::{Value, json};
    use sqlx::mysql::MySqlPoolOptions;

    #[core::prelude::v1::test]
    fn zero_rate_still_builds_a_limiter() {
        assert!(build_limiter(0).is_ok());
        assert!(build_limiter(60_000).is_ok());
    }

    #[actix_web::test]
    async fn malformed_leave_form_gets_failure_envelope() {
        let config = test_config();
        let limiters = Limiters::from_config(&config).unwrap();
        // never connects; the body is rejected before any query runs
        let pool = MySqlPoolOptions::new().connect_lazy(&config.database_url).unwrap();
        let kiosk = generate_kiosk_token(&config.jwt_secret, 60).unwrap();

        let app = test::init_service(
            App::new()
                .app_data(Data::new(pool))
                .app_data(Data::new(config.clone()))
                .configure(|cfg| configure(cfg, &config, &limiters)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/kiosk/leave-applications")
            .peer_addr("127.0.0.1:40000".parse().unwrap())
            .insert_header(("Authorization", format!("Bearer {kiosk}")))
            .set_json(json!({
                "employee_id": 1,
                "leave_type": "vacation",
                "vacation_location": "mars",
                "number_of_days": -3,
                "reason": "trip"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            resp.headers().get("content-type").unwrap(),
            "application/json"
        );

        let value: Value = test::read_body_json(resp).await;
        assert_eq!(value["success"], false);
        assert!(value["message"].as_str().unwrap().contains("Json deserialize error"));
    }
}
