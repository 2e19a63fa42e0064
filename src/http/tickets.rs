use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::rbac::TicketObjectContext;
use crate::repo::Page;
use crate::services::ticket_engine::CreateTicketInput;
use crate::state::AppState;
use crate::types::{Capability, FlagColor, TicketStatus};

use super::{ok, paginated, CurrentUser, Envelope, PaginatedEnvelope};

#[derive(Deserialize)]
pub struct ListQuery {
    page: Option<i64>,
    per_page: Option<i64>,
    status: Option<TicketStatus>,
}

pub async fn list(
    State(state): State<AppState>,
    _caller: CurrentUser,
    Query(q): Query<ListQuery>,
) -> AppResult<Json<PaginatedEnvelope<crate::db::models::Ticket>>> {
    let page = Page::new(q.page, q.per_page);
    let (rows, total) = state.tickets().list(page, q.status).await?;
    Ok(paginated(rows, total, page))
}

pub async fn get_one(
    State(state): State<AppState>,
    _caller: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Envelope<crate::db::models::Ticket>>> {
    let ticket = state.tickets().get(id).await?;
    Ok(ok(ticket))
}

#[derive(Deserialize)]
pub struct PartSpec {
    pub part_id: Uuid,
    pub color: FlagColor,
    pub minutes: i32,
    #[serde(default)]
    pub comment: String,
}

#[derive(Deserialize)]
pub struct CreateTicketRequest {
    pub inventory_item_id: Uuid,
    pub title: String,
    pub part_specs: Vec<PartSpec>,
}

pub async fn create(
    State(state): State<AppState>,
    caller: CurrentUser,
    Json(body): Json<CreateTicketRequest>,
) -> AppResult<Json<Envelope<crate::db::models::Ticket>>> {
    if !state.rbac().has(Capability::TicketCreate, &caller.roles) {
        return Err(AppError::forbidden("caller cannot create tickets"));
    }
    for spec in &body.part_specs {
        if spec.minutes < 1 {
            return Err(AppError::validation("minutes must be >= 1"));
        }
    }
    let parts = body
        .part_specs
        .into_iter()
        .map(|p| crate::repo::tickets::NewTicketPart {
            part_id: p.part_id,
            color: p.color,
            minutes: p.minutes,
            comment: p.comment,
        })
        .collect();

    let ticket = state
        .tickets()
        .create(CreateTicketInput {
            inventory_item_id: body.inventory_item_id,
            title: body.title,
            master_id: caller.user_id,
            parts,
        })
        .await?;
    Ok(ok(ticket))
}

#[derive(Deserialize)]
pub struct AssignRequest {
    pub technician_id: Uuid,
}

#[derive(Deserialize)]
pub struct ManualMetricsRequest {
    pub flag_color: FlagColor,
    pub xp_amount: i32,
}

/// Routes `/tickets/{id}/{action}` to the matching ticket-engine or
/// work-session operation, enforcing the capability for that action
/// first.
pub async fn dispatch_action(
    State(state): State<AppState>,
    caller: CurrentUser,
    Path((id, action)): Path<(Uuid, String)>,
    body: axum::body::Bytes,
) -> AppResult<Json<Envelope<crate::db::models::Ticket>>> {
    let ticket = state.tickets().get(id).await?;

    let requires = capability_for(&action);
    let session_is_stopped = state
        .work_sessions()
        .for_ticket(id)
        .await?
        .iter()
        .all(|s| s.status == crate::types::WorkSessionStatus::Stopped);
    let ctx = TicketObjectContext {
        ticket: &ticket,
        session_is_stopped: Some(session_is_stopped),
    };

    if let Some(capability) = requires {
        if !state
            .rbac()
            .has_on_ticket(capability, &caller.roles, caller.user_id, ctx)
        {
            return Err(AppError::forbidden("caller cannot perform this action"));
        }
    }

    let ticket = match action.as_str() {
        "review_approve" => state.tickets().review_approve(id, caller.user_id).await?,
        "assign" => {
            let req: AssignRequest = parse_body(&body)?;
            state
                .tickets()
                .assign(id, caller.user_id, req.technician_id)
                .await?
        }
        "start" => state.tickets().start_work(id, caller.user_id).await?,
        "pause" => {
            state.work_sessions().pause(id, caller.user_id).await?;
            state.tickets().get(id).await?
        }
        "resume" => {
            state.work_sessions().resume(id, caller.user_id).await?;
            state.tickets().get(id).await?
        }
        "stop" => {
            state.work_sessions().stop(id, caller.user_id).await?;
            state.tickets().get(id).await?
        }
        "to_waiting_qc" => state.tickets().to_waiting_qc(id, caller.user_id).await?,
        "qc_pass" => state.tickets().qc_pass(id, caller.user_id).await?,
        "qc_fail" => state.tickets().qc_fail(id, caller.user_id).await?,
        "manual_metrics" => {
            let req: ManualMetricsRequest = parse_body(&body)?;
            state
                .tickets()
                .manual_metrics(id, caller.user_id, req.flag_color, req.xp_amount)
                .await?
        }
        other => return Err(AppError::validation(format!("unknown ticket action: {other}"))),
    };

    Ok(ok(ticket))
}

fn parse_body<T: for<'de> Deserialize<'de>>(body: &axum::body::Bytes) -> AppResult<T> {
    serde_json::from_slice(body).map_err(|e| AppError::validation(format!("invalid body: {e}")))
}

fn capability_for(action: &str) -> Option<Capability> {
    match action {
        "review_approve" => Some(Capability::TicketReviewApprove),
        "assign" => Some(Capability::TicketAssign),
        "start" => Some(Capability::TicketWorkStart),
        "pause" => Some(Capability::TicketWorkPause),
        "resume" => Some(Capability::TicketWorkResume),
        "stop" => Some(Capability::TicketWorkStop),
        "to_waiting_qc" => Some(Capability::TicketToWaitingQc),
        "qc_pass" => Some(Capability::TicketQcPass),
        "qc_fail" => Some(Capability::TicketQcFail),
        "manual_metrics" => Some(Capability::TicketManualMetrics),
        _ => None,
    }
}

#[derive(Deserialize)]
pub struct TransitionsQuery {
    page: Option<i64>,
    per_page: Option<i64>,
}

pub async fn transitions(
    State(state): State<AppState>,
    _caller: CurrentUser,
    Path(id): Path<Uuid>,
    Query(q): Query<TransitionsQuery>,
) -> AppResult<Json<PaginatedEnvelope<crate::db::models::TicketTransition>>> {
    let page = Page::new(q.page, q.per_page);
    let (rows, total) = state.tickets().transitions(id, page).await?;
    Ok(paginated(rows, total, page))
}

pub async fn work_sessions(
    State(state): State<AppState>,
    _caller: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Envelope<Vec<crate::db::models::WorkSession>>>> {
    let sessions = state.work_sessions().for_ticket(id).await?;
    Ok(ok(sessions))
}
