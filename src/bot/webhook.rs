//! Telegram webhook intake: an axum handler that accepts the same
//! `Update` a polling loop would receive, but pushed over HTTP. Used
//! when `BOT_MODE=webhook`; mutually exclusive with [`super::run_polling`].

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use teloxide::types::{Update, UpdateKind};

use crate::state::AppState;

/// `POST /bot/webhook/`. Telegram is configured (via `shopfloor botwebhook
/// set`) to send the shared secret back on every delivery in
/// `X-Telegram-Bot-Api-Secret-Token`; a mismatch (or a missing header when
/// a secret is configured) is rejected before the update is ever parsed.
pub async fn handle(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(update): Json<Update>,
) -> StatusCode {
    if let Some(expected) = state.bot_webhook_secret() {
        let provided = headers
            .get("X-Telegram-Bot-Api-Secret-Token")
            .and_then(|v| v.to_str().ok());
        if provided != Some(expected) {
            return StatusCode::UNAUTHORIZED;
        }
    }

    let Some(bot) = state.bot().cloned() else {
        return StatusCode::SERVICE_UNAVAILABLE;
    };

    match update.kind {
        UpdateKind::Message(msg) => {
            if let Err(err) = super::commands::handle_message(bot, msg, state).await {
                tracing::warn!(%err, "bot message handler failed");
            }
        }
        UpdateKind::CallbackQuery(query) => {
            if let Err(err) = super::callbacks::handle_callback(bot, query, state).await {
                tracing::warn!(%err, "bot callback handler failed");
            }
        }
        _ => {}
    }

    StatusCode::OK
}
