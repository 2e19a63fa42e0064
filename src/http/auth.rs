use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::errors::{AppError, AppResult};
use crate::services::auth::TokenUse;
use crate::state::AppState;
use crate::types::Role;

use super::{ok, Envelope};

#[derive(Deserialize)]
pub struct LoginRequest {
    pub phone: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub roles: Vec<Role>,
}

/// Phone-only login; a production deployment would gate this behind an
/// OTP or password check out of this component's scope.
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> AppResult<Json<Envelope<LoginResponse>>> {
    let user = state
        .users()
        .find_by_phone(&body.phone)
        .await?
        .ok_or_else(|| AppError::unauthenticated("no user with that phone"))?;
    let roles = state.users().active_roles(user.id).await?;
    let pair = state.auth().issue_pair(user.id, &roles)?;
    Ok(ok(LoginResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        roles: pair.roles,
    }))
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

pub async fn refresh(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> AppResult<Json<Envelope<LoginResponse>>> {
    let pair = state.auth().refresh(&body.refresh_token)?;
    Ok(ok(LoginResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        roles: pair.roles,
    }))
}

#[derive(Deserialize)]
pub struct VerifyRequest {
    pub access_token: String,
}

#[derive(Serialize)]
pub struct VerifyResponse {
    pub valid: bool,
    pub roles: Vec<Role>,
}

pub async fn verify(
    State(state): State<AppState>,
    Json(body): Json<VerifyRequest>,
) -> AppResult<Json<Envelope<VerifyResponse>>> {
    let claims = state.auth().verify(&body.access_token, TokenUse::Access)?;
    Ok(ok(VerifyResponse {
        valid: true,
        roles: claims.roles,
    }))
}

#[derive(Deserialize)]
pub struct VerifyInitDataRequest {
    pub init_data: String,
}

#[derive(Serialize)]
#[serde(untagged)]
pub enum VerifyInitDataResponse {
    LoggedIn {
        access_token: String,
        refresh_token: String,
        roles: Vec<Role>,
    },
    UnknownUser {
        user_exists: bool,
        telegram_id: i64,
        username: Option<String>,
    },
}

pub async fn verify_telegram_init_data(
    State(state): State<AppState>,
    Json(body): Json<VerifyInitDataRequest>,
) -> AppResult<Json<Envelope<VerifyInitDataResponse>>> {
    let verifier = state
        .telegram_verifier()
        .ok_or_else(|| AppError::internal("telegram verification is not configured"))?;
    let verified = verifier.verify(&body.init_data)?;

    match state.users().find_by_telegram_id(verified.telegram_id).await? {
        Some(user) => {
            let roles = state.users().active_roles(user.id).await?;
            let pair = state.auth().issue_pair(user.id, &roles)?;
            Ok(ok(VerifyInitDataResponse::LoggedIn {
                access_token: pair.access_token,
                refresh_token: pair.refresh_token,
                roles: pair.roles,
            }))
        }
        None => Ok(ok(VerifyInitDataResponse::UnknownUser {
            user_exists: false,
            telegram_id: verified.telegram_id,
            username: verified.telegram_username,
        })),
    }
}
