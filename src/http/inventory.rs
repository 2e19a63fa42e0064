use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppResult;
use crate::repo::Page;
use crate::state::AppState;
use crate::types::ItemStatus;

use super::{ok, paginated, CurrentUser, Envelope, PaginatedEnvelope};

#[derive(Deserialize)]
pub struct ListItemsQuery {
    page: Option<i64>,
    per_page: Option<i64>,
    status: Option<ItemStatus>,
}

pub async fn list_items(
    State(state): State<AppState>,
    _caller: CurrentUser,
    Query(q): Query<ListItemsQuery>,
) -> AppResult<Json<PaginatedEnvelope<crate::db::models::Item>>> {
    let page = Page::new(q.page, q.per_page);
    let (rows, total) = state.inventory().list_items(page, q.status).await?;
    Ok(paginated(rows, total, page))
}

pub async fn get_item(
    State(state): State<AppState>,
    _caller: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Envelope<crate::db::models::Item>>> {
    let item = state.inventory().get_item(id).await?;
    Ok(ok(item))
}

#[derive(Deserialize)]
pub struct CreateItemRequest {
    pub serial_number: String,
    pub name: String,
    pub category_id: Uuid,
}

pub async fn create_item(
    State(state): State<AppState>,
    _caller: CurrentUser,
    Json(body): Json<CreateItemRequest>,
) -> AppResult<Json<Envelope<crate::db::models::Item>>> {
    let item = state
        .inventory()
        .create_item(&body.serial_number, &body.name, body.category_id)
        .await?;
    Ok(ok(item))
}

pub async fn list_categories(
    State(state): State<AppState>,
    _caller: CurrentUser,
) -> AppResult<Json<Envelope<Vec<crate::db::models::Category>>>> {
    Ok(ok(state.inventory().list_categories().await?))
}

#[derive(Deserialize)]
pub struct ListPartsQuery {
    category: Option<Uuid>,
}

pub async fn list_parts(
    State(state): State<AppState>,
    _caller: CurrentUser,
    Query(q): Query<ListPartsQuery>,
) -> AppResult<Json<Envelope<Vec<crate::db::models::Part>>>> {
    Ok(ok(state.inventory().list_parts(q.category).await?))
}
