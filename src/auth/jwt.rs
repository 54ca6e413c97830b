use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::role::{ActorRole, Role};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TokenType {
    Access,
    Refresh,
    /// Issued by `/auth/verify-key`; only valid on the kiosk scope.
    Kiosk,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// 0 for kiosk tokens.
    pub user_id: u64,
    pub sub: String,
    pub role: Option<Role>,
    pub dean_id: Option<u64>,
    pub department_id: Option<u64>,
    pub exp: usize,
    pub jti: String,
    pub token_type: TokenType,
}

/// Identity baked into access and refresh tokens.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: u64,
    pub username: String,
    pub role: Role,
    pub dean_id: Option<u64>,
    pub department_id: Option<u64>,
}

impl Claims {
    pub fn actor(&self) -> Option<ActorRole> {
        match (self.token_type, self.role) {
            (TokenType::Kiosk, _) => Some(ActorRole::Employee),
            (_, Some(Role::Hr)) => Some(ActorRole::Hr),
            (_, Some(Role::Dean)) => Some(ActorRole::Dean {
                dean_id: self.dean_id?,
                department_id: self.department_id?,
            }),
            (_, None) => None,
        }
    }
}

fn now() -> usize {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as usize)
        .unwrap_or_default()
}

fn sign(claims: &Claims, secret: &str) -> Result<String> {
    Ok(encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?)
}

fn identity_claims(identity: &Identity, token_type: TokenType, ttl: usize) -> Claims {
    Claims {
        user_id: identity.user_id,
        sub: identity.username.clone(),
        role: Some(identity.role),
        dean_id: identity.dean_id,
        department_id: identity.department_id,
        exp: now() + ttl,
        jti: Uuid::new_v4().to_string(),
        token_type,
    }
}

pub fn generate_access_token(identity: &Identity, secret: &str, ttl: usize) -> Result<String> {
    sign(&identity_claims(identity, TokenType::Access, ttl), secret)
}

pub fn generate_refresh_token(
    identity: &Identity,
    secret: &str,
    ttl: usize,
) -> Result<(String, Claims)> {
    let claims = identity_claims(identity, TokenType::Refresh, ttl);
    let token = sign(&claims, secret)?;
    Ok((token, claims))
}

pub fn generate_kiosk_token(secret: &str, ttl: usize) -> Result<String> {
    let claims = Claims {
        user_id: 0,
        sub: "kiosk".to_string(),
        role: None,
        dean_id: None,
        department_id: None,
        exp: now() + ttl,
        jti: Uuid::new_v4().to_string(),
        token_type: TokenType::Kiosk,
    };
    sign(&claims, secret)
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dean() -> Identity {
        Identity {
            user_id: 4,
            username: "dean.reyes".into(),
            role: Role::Dean,
            dean_id: Some(2),
            department_id: Some(1),
        }
    }

    #[test]
    fn access_token_round_trips_to_dean_actor() {
        let token = generate_access_token(&dean(), "secret", 60).unwrap();
        let claims = verify_token(&token, "secret").unwrap();

        assert_eq!(claims.token_type, TokenType::Access);
        assert_eq!(claims.sub, "dean.reyes");
        assert_eq!(
            claims.actor(),
            Some(ActorRole::Dean { dean_id: 2, department_id: 1 })
        );
    }

    #[test]
    fn kiosk_token_resolves_to_employee_actor() {
        let token = generate_kiosk_token("secret", 60).unwrap();
        let claims = verify_token(&token, "secret").unwrap();

        assert_eq!(claims.token_type, TokenType::Kiosk);
        assert_eq!(claims.actor(), Some(ActorRole::Employee));
    }

    #[test]
    fn dean_without_profile_has_no_actor() {
        let mut identity = dean();
        identity.dean_id = None;
        let (token, _) = generate_refresh_token(&identity, "secret", 60).unwrap();
        let claims = verify_token(&token, "secret").unwrap();

        assert_eq!(claims.actor(), None);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = generate_access_token(&dean(), "secret", 60).unwrap();
        assert!(verify_token(&token, "other").is_err());
    }
}
