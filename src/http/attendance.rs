use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::state::AppState;
use crate::types::Capability;

use super::{ok, CurrentUser, Envelope};

#[derive(Deserialize)]
pub struct CheckinRequest {
    pub attendance_id: Uuid,
    pub on_time: bool,
}

/// Once-per-day attendance check-in for the caller themselves;
/// `attendance_id` is the caller's idempotency reference for the event.
pub async fn checkin(
    State(state): State<AppState>,
    caller: CurrentUser,
    Json(body): Json<CheckinRequest>,
) -> AppResult<Json<Envelope<crate::db::models::XpLedgerEntry>>> {
    if !state.rbac().has(Capability::AttendanceCheckin, &caller.roles) {
        return Err(AppError::forbidden("caller cannot check in"));
    }
    let entry = state
        .xp_ledger()
        .record_attendance_checkin(caller.user_id, body.attendance_id, body.on_time)
        .await?;
    Ok(ok(entry))
}
