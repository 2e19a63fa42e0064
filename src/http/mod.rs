//! JSON HTTP API: axum router under `/api/v1`, uniform success
//! / paginated / error envelopes, and the bearer-token auth extractor.

pub mod access_requests;
pub mod attendance;
pub mod auth;
pub mod inventory;
pub mod misc;
pub mod tickets;
pub mod xp;

use std::time::Duration;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::errors::{AppError, ErrorKind};
use crate::services::auth::TokenUse;
use crate::state::AppState;
use crate::types::Role;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .nest(
            "/api/v1",
            Router::new()
                .route("/auth/login", post(auth::login))
                .route("/auth/refresh", post(auth::refresh))
                .route("/auth/verify", post(auth::verify))
                .route(
                    "/auth/telegram/initdata/verify",
                    post(auth::verify_telegram_init_data),
                )
                .route("/tickets", get(tickets::list).post(tickets::create))
                .route("/tickets/:id", get(tickets::get_one))
                .route("/tickets/:id/:action", post(tickets::dispatch_action))
                .route("/tickets/:id/transitions", get(tickets::transitions))
                .route("/tickets/:id/work_sessions", get(tickets::work_sessions))
                .route(
                    "/inventory/items",
                    get(inventory::list_items).post(inventory::create_item),
                )
                .route("/inventory/items/:id", get(inventory::get_item))
                .route("/inventory/categories", get(inventory::list_categories))
                .route("/inventory/parts", get(inventory::list_parts))
                .route("/access-requests", post(access_requests::create))
                .route(
                    "/access-requests/:id/approve",
                    post(access_requests::approve),
                )
                .route(
                    "/access-requests/:id/reject",
                    post(access_requests::reject),
                )
                .route("/xp/ledger", get(xp::ledger))
                .route("/attendance/checkin", post(attendance::checkin))
                .route("/misc/health", get(misc::health)),
        )
        .route("/bot/webhook/", post(crate::bot::webhook::handle))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .with_state(state)
}

#[derive(Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

pub fn ok<T: Serialize>(data: T) -> Json<Envelope<T>> {
    Json(Envelope {
        success: true,
        message: "OK".to_string(),
        data: Some(data),
    })
}

#[derive(Serialize)]
pub struct PaginatedEnvelope<T: Serialize> {
    pub success: bool,
    pub message: String,
    pub results: Vec<T>,
    pub total_count: i64,
    pub page: i64,
    pub page_count: i64,
    pub per_page: i64,
}

pub fn paginated<T: Serialize>(
    results: Vec<T>,
    total_count: i64,
    page: crate::repo::Page,
) -> Json<PaginatedEnvelope<T>> {
    Json(PaginatedEnvelope {
        success: true,
        message: "OK".to_string(),
        page_count: page.page_count(total_count),
        results,
        total_count,
        page: page.page,
        per_page: page.per_page,
    })
}

#[derive(Serialize)]
struct ErrorPayload {
    kind: ErrorKind,
    detail: String,
}

#[derive(Serialize)]
struct ErrorEnvelope {
    success: bool,
    message: String,
    error: ErrorPayload,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self.kind {
            ErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::RateOrReplay => StatusCode::TOO_MANY_REQUESTS,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if self.kind == ErrorKind::Internal {
            tracing::warn!(trace_id = ?self.trace_id, detail = %self.detail, "internal error");
        } else {
            tracing::info!(kind = ?self.kind, "request failed");
        }

        let body = ErrorEnvelope {
            success: false,
            message: self.public_message(),
            error: ErrorPayload {
                kind: self.kind,
                detail: self.public_message(),
            },
        };

        (status, Json(body)).into_response()
    }
}

/// The authenticated caller, resolved from the `Authorization: Bearer`
/// header and injected into every handler that needs identity.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: Uuid,
    pub roles: Vec<Role>,
}

#[async_trait::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::unauthenticated("missing Authorization header"))?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::unauthenticated("Authorization header must be a Bearer token"))?;
        let claims = state.auth().verify(token, TokenUse::Access)?;
        Ok(CurrentUser {
            user_id: claims.sub,
            roles: claims.roles,
        })
    }
}
