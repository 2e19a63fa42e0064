use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub db: &'static str,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_ok = state.db_is_healthy().await;
    Json(HealthResponse {
        status: "ok",
        db: if db_ok { "ok" } else { "unreachable" },
    })
}
