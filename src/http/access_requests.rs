use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::state::AppState;
use crate::types::Capability;

use super::{ok, CurrentUser, Envelope};

#[derive(Deserialize)]
pub struct CreateAccessRequest {
    pub telegram_id: i64,
    pub telegram_username: Option<String>,
    pub first_name: String,
    pub last_name: Option<String>,
    pub phone: String,
}

pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateAccessRequest>,
) -> AppResult<Json<Envelope<crate::db::models::AccessRequest>>> {
    let request = state
        .access_onboarding()
        .request_access(
            body.telegram_id,
            body.telegram_username.as_deref(),
            &body.first_name,
            body.last_name.as_deref(),
            &body.phone,
        )
        .await?;
    Ok(ok(request))
}

fn require_moderator(state: &AppState, caller: &CurrentUser) -> AppResult<()> {
    if state
        .rbac()
        .has(Capability::AccessRequestModerate, &caller.roles)
    {
        Ok(())
    } else {
        Err(AppError::forbidden("caller cannot moderate access requests"))
    }
}

pub async fn approve(
    State(state): State<AppState>,
    caller: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Envelope<crate::db::models::User>>> {
    require_moderator(&state, &caller)?;
    let user = state.access_onboarding().approve(id).await?;
    Ok(ok(user))
}

pub async fn reject(
    State(state): State<AppState>,
    caller: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Envelope<crate::db::models::AccessRequest>>> {
    require_moderator(&state, &caller)?;
    let request = state.access_onboarding().reject(id).await?;
    Ok(ok(request))
}
