use actix_web::{
    FromRequest, HttpMessage, HttpRequest, dev::Payload, error::ErrorUnauthorized, web::Data,
};
use futures::future::{Ready, ready};

use crate::{
    auth::jwt::{TokenType, verify_token},
    config::Config,
    error::{AppError, AppResult},
    model::role::ActorRole,
};

/// Caller of a protected or kiosk route.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// 0 for kiosk callers.
    pub user_id: u64,
    pub username: String,
    pub actor: ActorRole,
}

/// Pulls the bearer token from `Authorization`.
pub fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

/// Decodes `token` and requires it to be of `expected` type with a resolvable actor.
pub fn authenticate(token: &str, secret: &str, expected: TokenType) -> Result<AuthUser, String> {
    let claims = verify_token(token, secret)?;
    if claims.token_type != expected {
        return Err(format!("Expected a {expected:?} token"));
    }
    let actor = claims
        .actor()
        .ok_or_else(|| "Token carries no usable role".to_string())?;

    Ok(AuthUser {
        user_id: claims.user_id,
        username: claims.sub,
        actor,
    })
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // set by the scope middleware
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }

        let Some(token) = bearer_token(req) else {
            return ready(Err(ErrorUnauthorized("Missing token")));
        };

        let Some(config) = req.app_data::<Data<Config>>() else {
            return ready(Err(actix_web::error::ErrorInternalServerError(
                "Config missing",
            )));
        };

        ready(authenticate(token, &config.jwt_secret, TokenType::Access).map_err(ErrorUnauthorized))
    }
}

impl AuthUser {
    pub fn require_hr(&self) -> AppResult<()> {
        if self.actor.is_hr() {
            Ok(())
        } else {
            Err(AppError::unauthorized("HR only"))
        }
    }

    /// Dean id and department of a dean caller.
    pub fn require_dean(&self) -> AppResult<(u64, u64)> {
        match self.actor {
            ActorRole::Dean { dean_id, department_id } => Ok((dean_id, department_id)),
            _ => Err(AppError::unauthorized("Dean only")),
        }
    }

    pub fn require_staff(&self) -> AppResult<()> {
        match self.actor {
            ActorRole::Hr | ActorRole::Dean { .. } => Ok(()),
            ActorRole::Employee => Err(AppError::unauthorized("HR or dean only")),
        }
    }

    /// HR sees everything; a dean only their own department.
    pub fn can_view_department(&self, department_id: u64) -> bool {
        self.actor.is_hr() || self.actor.is_dean_of(department_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::jwt::{Identity, generate_access_token, generate_kiosk_token},
        config::test_config,
        model::role::Role,
    };
    use actix_web::test::TestRequest;

    fn hr_token() -> String {
        let identity = Identity {
            user_id: 1,
            username: "hr.jane".into(),
            role: Role::Hr,
            dean_id: None,
            department_id: None,
        };
        generate_access_token(&identity, &test_config().jwt_secret, 60).unwrap()
    }

    #[actix_web::test]
    async fn extracts_hr_from_bearer_token() {
        let req = TestRequest::default()
            .insert_header(("Authorization", format!("Bearer {}", hr_token())))
            .app_data(Data::new(test_config()))
            .to_http_request();

        let user = AuthUser::from_request(&req, &mut Payload::None).await.unwrap();
        assert_eq!(user.user_id, 1);
        assert_eq!(user.actor, ActorRole::Hr);
        assert!(user.require_hr().is_ok());
        assert!(user.require_dean().is_err());
    }

    #[actix_web::test]
    async fn prefers_identity_set_by_middleware() {
        let req = TestRequest::default().to_http_request();
        req.extensions_mut().insert(AuthUser {
            user_id: 4,
            username: "dean.reyes".into(),
            actor: ActorRole::Dean { dean_id: 2, department_id: 3 },
        });

        let user = AuthUser::from_request(&req, &mut Payload::None).await.unwrap();
        assert_eq!(user.require_dean().unwrap(), (2, 3));
        assert!(user.can_view_department(3));
        assert!(!user.can_view_department(1));
    }

    #[actix_web::test]
    async fn kiosk_token_is_not_an_access_token() {
        let config = test_config();
        let kiosk = generate_kiosk_token(&config.jwt_secret, 60).unwrap();
        let req = TestRequest::default()
            .insert_header(("Authorization", format!("Bearer {kiosk}")))
            .app_data(Data::new(config))
            .to_http_request();

        assert!(AuthUser::from_request(&req, &mut Payload::None).await.is_err());
    }

    #[actix_web::test]
    async fn missing_header_is_rejected() {
        let req = TestRequest::default()
            .app_data(Data::new(test_config()))
            .to_http_request();
        assert!(AuthUser::from_request(&req, &mut Payload::None).await.is_err());
    }
}
