//! Bearer access/refresh token issuance and verification.
//! Tokens are JWT-shaped (`header.payload.signature`); the payload
//! carries `exp`, `roles`, `role_slugs`.

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::types::Role;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub exp: i64,
    pub roles: Vec<Role>,
    pub role_slugs: Vec<String>,
    /// Distinguishes an access token from a refresh token so one cannot
    /// be replayed as the other.
    pub token_use: TokenUse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenUse {
    Access,
    Refresh,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub roles: Vec<Role>,
}

#[derive(Clone)]
pub struct AuthService {
    signing_key: String,
    access_ttl: chrono::Duration,
    refresh_ttl: chrono::Duration,
}

impl AuthService {
    pub fn new(
        signing_key: String,
        access_ttl: std::time::Duration,
        refresh_ttl: std::time::Duration,
    ) -> Self {
        Self {
            signing_key,
            access_ttl: chrono::Duration::from_std(access_ttl).unwrap_or(chrono::Duration::seconds(900)),
            refresh_ttl: chrono::Duration::from_std(refresh_ttl)
                .unwrap_or(chrono::Duration::seconds(1_209_600)),
        }
    }

    pub fn issue_pair(&self, user_id: Uuid, roles: &[Role]) -> AppResult<TokenPair> {
        let role_slugs: Vec<String> = roles.iter().map(|r| r.as_str().to_string()).collect();
        let access_token = self.encode(user_id, roles, &role_slugs, TokenUse::Access, self.access_ttl)?;
        let refresh_token =
            self.encode(user_id, roles, &role_slugs, TokenUse::Refresh, self.refresh_ttl)?;
        Ok(TokenPair {
            access_token,
            refresh_token,
            roles: roles.to_vec(),
        })
    }

    fn encode(
        &self,
        user_id: Uuid,
        roles: &[Role],
        role_slugs: &[String],
        token_use: TokenUse,
        ttl: chrono::Duration,
    ) -> AppResult<String> {
        let claims = Claims {
            sub: user_id,
            exp: (Utc::now() + ttl).timestamp(),
            roles: roles.to_vec(),
            role_slugs: role_slugs.to_vec(),
            token_use,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.signing_key.as_bytes()),
        )
        .map_err(|e| AppError::internal(format!("token encode failed: {e}")))
    }

    pub fn verify(&self, token: &str, expected_use: TokenUse) -> AppResult<Claims> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.signing_key.as_bytes()),
            &Validation::default(),
        )
        .map_err(|_| AppError::unauthenticated("invalid or expired token"))?;
        if data.claims.token_use != expected_use {
            return Err(AppError::unauthenticated("wrong token type presented"));
        }
        Ok(data.claims)
    }

    pub fn refresh(&self, refresh_token: &str) -> AppResult<TokenPair> {
        let claims = self.verify(refresh_token, TokenUse::Refresh)?;
        self.issue_pair(claims.sub, &claims.roles)
    }
}
