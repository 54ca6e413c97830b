use actix_web::{
    Error, HttpMessage, HttpResponse,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    middleware::Next,
    web::Data,
};
use serde_json::json;

use crate::{
    auth::{
        auth::{authenticate, bearer_token},
        jwt::TokenType,
    },
    config::Config,
};

fn reject(req: ServiceRequest, message: &str) -> ServiceResponse<BoxBody> {
    let resp = HttpResponse::Unauthorized().json(json!({
        "success": false,
        "message": message
    }));
    req.into_response(resp.map_into_boxed_body())
}

async fn guard(
    req: ServiceRequest,
    next: Next<BoxBody>,
    expected: TokenType,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let config = req
        .app_data::<Data<Config>>()
        .cloned()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("App config missing"))?;

    let Some(token) = bearer_token(req.request()).map(str::to_string) else {
        return Ok(reject(req, "Missing or malformed Authorization header"));
    };

    let user = match authenticate(&token, &config.jwt_secret, expected) {
        Ok(user) => user,
        Err(e) => {
            tracing::debug!(error = %e, "Rejected bearer token");
            return Ok(reject(req, "Invalid or expired token"));
        }
    };

    req.extensions_mut().insert(user);
    next.call(req).await
}

/// Access tokens only: HR and deans.
pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    guard(req, next, TokenType::Access).await
}

/// Kiosk tokens only.
pub async fn kiosk_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    guard(req, next, TokenType::Kiosk).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::{
            auth::AuthUser,
            jwt::{Identity, generate_access_token, generate_kiosk_token},
        },
        config::test_config,
        model::role::Role,
    };
    use actix_web::{App, HttpResponse, http::StatusCode, middleware::from_fn, test, web};

    async fn whoami(user: AuthUser) -> HttpResponse {
        HttpResponse::Ok().body(user.username)
    }

    fn dean_token() -> String {
        let identity = Identity {
            user_id: 4,
            username: "dean.reyes".into(),
            role: Role::Dean,
            dean_id: Some(2),
            department_id: Some(1),
        };
        generate_access_token(&identity, &test_config().jwt_secret, 60).unwrap()
    }

    #[actix_web::test]
    async fn protected_scope_requires_access_token() {
        let app = test::init_service(
            App::new().app_data(Data::new(test_config())).service(
                web::scope("/api")
                    .wrap(from_fn(auth_middleware))
                    .route("/me", web::get().to(whoami)),
            ),
        )
        .await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/api/me").to_request()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let kiosk = generate_kiosk_token(&test_config().jwt_secret, 60).unwrap();
        let req = test::TestRequest::get()
            .uri("/api/me")
            .insert_header(("Authorization", format!("Bearer {kiosk}")))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::get()
            .uri("/api/me")
            .insert_header(("Authorization", format!("Bearer {}", dean_token())))
            .to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(body, "dean.reyes");
    }

    #[actix_web::test]
    async fn kiosk_scope_rejects_staff_tokens() {
        let app = test::init_service(
            App::new().app_data(Data::new(test_config())).service(
                web::scope("/kiosk")
                    .wrap(from_fn(kiosk_middleware))
                    .route("/me", web::get().to(whoami)),
            ),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/kiosk/me")
            .insert_header(("Authorization", format!("Bearer {}", dean_token())))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let kiosk = generate_kiosk_token(&test_config().jwt_secret, 60).unwrap();
        let req = test::TestRequest::get()
            .uri("/kiosk/me")
            .insert_header(("Authorization", format!("Bearer {kiosk}")))
            .to_request();
        assert_eq!(test::call_and_read_body(&app, req).await, "kiosk");
    }
}
