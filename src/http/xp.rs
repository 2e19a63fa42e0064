use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::repo::Page;
use crate::state::AppState;
use crate::types::Capability;

use super::{paginated, CurrentUser, PaginatedEnvelope};

#[derive(Deserialize)]
pub struct LedgerQuery {
    page: Option<i64>,
    per_page: Option<i64>,
    user_id: Option<Uuid>,
}

/// `xp.read_self` lets any authenticated user see their own entries;
/// `xp.read_any` additionally lets MANAGER/SUPER_ADMIN filter by
/// `user_id`.
pub async fn ledger(
    State(state): State<AppState>,
    caller: CurrentUser,
    Query(q): Query<LedgerQuery>,
) -> AppResult<Json<PaginatedEnvelope<crate::db::models::XpLedgerEntry>>> {
    let target_user = match q.user_id {
        Some(requested) if requested != caller.user_id => {
            if !state.rbac().has(Capability::XpReadAny, &caller.roles) {
                return Err(AppError::forbidden("caller cannot read another user's XP ledger"));
            }
            requested
        }
        _ => caller.user_id,
    };

    let page = Page::new(q.page, q.per_page);
    let (rows, total) = state.xp_ledger().history_for_user(target_user, page).await?;
    Ok(paginated(rows, total, page))
}
