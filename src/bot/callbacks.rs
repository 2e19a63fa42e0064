//! Callback-query dispatch. Every handler resolves the caller's roles
//! from the Telegram id on the update, performs the same capability
//! check the HTTP edge performs, then calls straight into the service
//! layer — no bot-only business logic lives here.

use teloxide::prelude::*;
use teloxide::types::{CallbackQuery, InlineKeyboardButton, InlineKeyboardMarkup};
use uuid::Uuid;

use crate::errors::{AppError, ErrorKind};
use crate::rbac::TicketObjectContext;
use crate::repo::Page;
use crate::state::AppState;
use crate::types::{Capability, FlagColor};

use super::ui;

/// Renders an [`AppError`] as a short user-safe alert: never the internal
/// detail, never a trace id beyond what `AppError::public_message`
/// already decided to surface.
pub fn alert_text(err: &AppError) -> String {
    match err.kind {
        ErrorKind::Unauthenticated => "Please /start again to re-authenticate.".to_string(),
        ErrorKind::Forbidden => "You don't have permission to do that.".to_string(),
        ErrorKind::NotFound => "Not found.".to_string(),
        ErrorKind::Conflict => err.detail.clone(),
        ErrorKind::Validation => err.detail.clone(),
        ErrorKind::RateOrReplay => "That action was already processed.".to_string(),
        ErrorKind::Internal => err.public_message(),
    }
}

pub async fn handle_callback(
    bot: Bot,
    query: CallbackQuery,
    state: AppState,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let Some(data) = query.data.clone() else {
        return Ok(());
    };
    let result = route(&bot, &query, &data, &state).await;

    if let Err(err) = result {
        bot.answer_callback_query(query.id)
            .text(alert_text(&err))
            .show_alert(true)
            .await?;
    } else {
        bot.answer_callback_query(query.id).await?;
    }
    Ok(())
}

async fn caller_roles_and_id(
    state: &AppState,
    query: &CallbackQuery,
) -> Result<(Uuid, Vec<crate::types::Role>), AppError> {
    let telegram_id = i64::try_from(query.from.id.0)
        .map_err(|_| AppError::validation("telegram id out of range"))?;
    let user = state
        .users()
        .find_by_telegram_id(telegram_id)
        .await?
        .ok_or_else(|| AppError::unauthenticated("no account bound to this Telegram id"))?;
    let roles = state.users().active_roles(user.id).await?;
    Ok((user.id, roles))
}

async fn route(
    bot: &Bot,
    query: &CallbackQuery,
    data: &str,
    state: &AppState,
) -> Result<(), AppError> {
    let (caller_id, roles) = caller_roles_and_id(state, query).await?;

    if let Some(rest) = data.strip_prefix("tt:") {
        return handle_ticket_action(state, caller_id, &roles, rest).await;
    }
    if let Some(rest) = data.strip_prefix("tqc:") {
        return handle_qc_decision(state, caller_id, &roles, rest).await;
    }
    if let Some(rest) = data.strip_prefix("tra:") {
        return handle_review_action(state, caller_id, &roles, rest).await;
    }
    if let Some(rest) = data.strip_prefix("trq:") {
        if let Some(id) = rest.strip_prefix("open:") {
            return handle_review_ticket_detail(bot, query, state, caller_id, &roles, id).await;
        }
        return handle_review_queue(bot, query, state, &roles, rest).await;
    }
    if let Some(rest) = data.strip_prefix("tqq:") {
        return handle_qc_queue(bot, query, state, &roles, rest).await;
    }
    if let Some(rest) = data.strip_prefix("xph:") {
        return handle_xp_history(bot, query, state, caller_id, rest).await;
    }
    if data.starts_with("tc:") {
        // Reserved prefix; the multi-step ticket-create wizard (item/part
        // selection, per-step callback state) is not implemented over the
        // bot surface yet. Ticket creation is only reachable via POST
        // /api/v1/tickets today.
        return Err(AppError::validation(
            "ticket creation isn't available from Telegram yet; use the HTTP API",
        ));
    }

    Ok(())
}

async fn handle_ticket_action(
    state: &AppState,
    caller_id: Uuid,
    roles: &[crate::types::Role],
    rest: &str,
) -> Result<(), AppError> {
    let mut parts = rest.splitn(2, ':');
    let action = parts.next().unwrap_or_default();
    let ticket_id: Uuid = parts
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| AppError::validation("malformed ticket callback"))?;

    let ticket = state.tickets().get(ticket_id).await?;
    let session_stopped = state
        .work_sessions()
        .for_ticket(ticket_id)
        .await?
        .iter()
        .all(|s| s.status == crate::types::WorkSessionStatus::Stopped);
    let ctx = TicketObjectContext {
        ticket: &ticket,
        session_is_stopped: Some(session_stopped),
    };

    let capability = match action {
        "start" => Capability::TicketWorkStart,
        "pause" => Capability::TicketWorkPause,
        "resume" => Capability::TicketWorkResume,
        "stop" => Capability::TicketWorkStop,
        "to_waiting_qc" => Capability::TicketToWaitingQc,
        other => return Err(AppError::validation(format!("unknown tt action: {other}"))),
    };
    if !state.rbac().has_on_ticket(capability, roles, caller_id, ctx) {
        return Err(AppError::forbidden("not allowed"));
    }

    match action {
        "start" => {
            state.tickets().start_work(ticket_id, caller_id).await?;
        }
        "pause" => {
            state.work_sessions().pause(ticket_id, caller_id).await?;
        }
        "resume" => {
            state.work_sessions().resume(ticket_id, caller_id).await?;
        }
        "stop" => {
            state.work_sessions().stop(ticket_id, caller_id).await?;
        }
        "to_waiting_qc" => {
            state.tickets().to_waiting_qc(ticket_id, caller_id).await?;
        }
        _ => unreachable!(),
    }
    Ok(())
}

async fn handle_qc_decision(
    state: &AppState,
    caller_id: Uuid,
    roles: &[crate::types::Role],
    rest: &str,
) -> Result<(), AppError> {
    let mut parts = rest.splitn(2, ':');
    let action = parts.next().unwrap_or_default();
    if action == "refresh" {
        return Ok(());
    }
    let ticket_id: Uuid = parts
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| AppError::validation("malformed qc callback"))?;

    let ticket = state.tickets().get(ticket_id).await?;
    let ctx = TicketObjectContext {
        ticket: &ticket,
        session_is_stopped: None,
    };
    let capability = match action {
        "pass" => Capability::TicketQcPass,
        "fail" => Capability::TicketQcFail,
        other => return Err(AppError::validation(format!("unknown tqc action: {other}"))),
    };
    if !state.rbac().has_on_ticket(capability, roles, caller_id, ctx) {
        return Err(AppError::forbidden("not allowed"));
    }

    match action {
        "pass" => {
            state.tickets().qc_pass(ticket_id, caller_id).await?;
        }
        "fail" => {
            state.tickets().qc_fail(ticket_id, caller_id).await?;
        }
        _ => unreachable!(),
    }
    Ok(())
}

async fn handle_review_action(
    state: &AppState,
    caller_id: Uuid,
    roles: &[crate::types::Role],
    rest: &str,
) -> Result<(), AppError> {
    let mut parts = rest.splitn(3, ':');
    let action = parts.next().unwrap_or_default();
    let ticket_id: Uuid = parts
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| AppError::validation("malformed review callback"))?;

    match action {
        "assign" => {
            let technician_id: Uuid = parts
                .next()
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| AppError::validation("missing technician id"))?;
            let ticket = state.tickets().get(ticket_id).await?;
            let ctx = TicketObjectContext {
                ticket: &ticket,
                session_is_stopped: None,
            };
            if !state.rbac().has_on_ticket(Capability::TicketAssign, roles, caller_id, ctx) {
                return Err(AppError::forbidden("not allowed"));
            }
            state.tickets().assign(ticket_id, caller_id, technician_id).await?;
        }
        "manual_metrics" => {
            let payload = parts
                .next()
                .ok_or_else(|| AppError::validation("missing manual metrics payload"))?;
            let mut fields = payload.splitn(2, ':');
            let flag_color: FlagColor = fields
                .next()
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| AppError::validation("missing flag color"))?;
            let xp_amount: i32 = fields
                .next()
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| AppError::validation("missing xp amount"))?;

            let ticket = state.tickets().get(ticket_id).await?;
            let ctx = TicketObjectContext {
                ticket: &ticket,
                session_is_stopped: None,
            };
            if !state
                .rbac()
                .has_on_ticket(Capability::TicketManualMetrics, roles, caller_id, ctx)
            {
                return Err(AppError::forbidden("not allowed"));
            }
            state
                .tickets()
                .manual_metrics(ticket_id, caller_id, flag_color, xp_amount)
                .await?;
        }
        other => return Err(AppError::validation(format!("unknown tra action: {other}"))),
    }
    Ok(())
}

async fn handle_review_queue(
    bot: &Bot,
    query: &CallbackQuery,
    state: &AppState,
    _roles: &[crate::types::Role],
    rest: &str,
) -> Result<(), AppError> {
    let page_num: i64 = rest
        .strip_prefix("page:")
        .and_then(|s| s.parse().ok())
        .unwrap_or(1);
    let page = Page::new(Some(page_num), Some(ui::PAGE_SIZE));
    let (tickets, total) = state
        .tickets()
        .list(page, Some(crate::types::TicketStatus::UnderReview))
        .await?;

    if let Some(message) = query.message.as_ref() {
        let text = if tickets.is_empty() {
            "No tickets pending review.".to_string()
        } else {
            tickets
                .iter()
                .map(|t| format!("#{} — {}", t.id, t.title))
                .collect::<Vec<_>>()
                .join("\n")
        };
        let rows: Vec<Vec<InlineKeyboardButton>> = tickets
            .iter()
            .map(|t| {
                vec![InlineKeyboardButton::callback(
                    format!("Open #{} {}", t.id, t.title),
                    format!("trq:open:{}", t.id),
                )]
            })
            .collect();
        let total_pages = ui::page_count(total);
        let keyboard = ui::keyboard_with_pagination(rows, "trq", page_num, total_pages);
        bot.edit_message_text(message.chat().id, message.id(), text)
            .reply_markup(keyboard)
            .await
            .ok();
    }
    Ok(())
}

/// Single-ticket detail view reached from `trq:open`: renders the
/// ticket's status plus whichever action buttons the caller's capabilities
/// allow (assign, work-session transitions, QC decision).
async fn handle_review_ticket_detail(
    bot: &Bot,
    query: &CallbackQuery,
    state: &AppState,
    caller_id: Uuid,
    roles: &[crate::types::Role],
    id: &str,
) -> Result<(), AppError> {
    let ticket_id: Uuid = id.parse().map_err(|_| AppError::validation("malformed ticket id"))?;
    let ticket = state.tickets().get(ticket_id).await?;
    let sessions = state.work_sessions().for_ticket(ticket_id).await?;
    let session_is_stopped = sessions
        .iter()
        .all(|s| s.status == crate::types::WorkSessionStatus::Stopped);
    let ctx = TicketObjectContext {
        ticket: &ticket,
        session_is_stopped: Some(session_is_stopped),
    };

    let mut rows: Vec<Vec<InlineKeyboardButton>> = Vec::new();

    if state.rbac().has_on_ticket(Capability::TicketAssign, roles, caller_id, ctx) {
        let technicians = state.users().list_by_role(crate::types::Role::Technician).await?;
        for tech in technicians {
            let label = tech.telegram_username.clone().unwrap_or_else(|| tech.phone.clone());
            rows.push(vec![InlineKeyboardButton::callback(
                format!("Assign to {label}"),
                format!("tra:assign:{ticket_id}:{}", tech.id),
            )]);
        }
    }

    for (action, capability, label) in [
        ("start", Capability::TicketWorkStart, "Start"),
        ("pause", Capability::TicketWorkPause, "Pause"),
        ("resume", Capability::TicketWorkResume, "Resume"),
        ("stop", Capability::TicketWorkStop, "Stop"),
        ("to_waiting_qc", Capability::TicketToWaitingQc, "Send to QC"),
    ] {
        if state.rbac().has_on_ticket(capability, roles, caller_id, ctx) {
            rows.push(vec![InlineKeyboardButton::callback(
                label,
                format!("tt:{action}:{ticket_id}"),
            )]);
        }
    }

    if state.rbac().has_on_ticket(Capability::TicketQcPass, roles, caller_id, ctx) {
        rows.push(vec![
            InlineKeyboardButton::callback("Pass QC", format!("tqc:pass:{ticket_id}")),
            InlineKeyboardButton::callback("Fail QC", format!("tqc:fail:{ticket_id}")),
        ]);
    }

    rows.push(vec![InlineKeyboardButton::callback("Back", "trq:page:1")]);

    if let Some(message) = query.message.as_ref() {
        let text = format!(
            "#{} — {}\nStatus: {}",
            ticket.id,
            ticket.title,
            status_label(ticket.status)
        );
        bot.edit_message_text(message.chat().id, message.id(), text)
            .reply_markup(InlineKeyboardMarkup::new(rows))
            .await
            .ok();
    }
    Ok(())
}

fn status_label(status: crate::types::TicketStatus) -> &'static str {
    use crate::types::TicketStatus::*;
    match status {
        UnderReview => "under review",
        New => "new",
        Assigned => "assigned",
        InProgress => "in progress",
        WaitingQc => "waiting QC",
        Rework => "rework",
        Done => "done",
    }
}

async fn handle_qc_queue(
    bot: &Bot,
    query: &CallbackQuery,
    state: &AppState,
    _roles: &[crate::types::Role],
    rest: &str,
) -> Result<(), AppError> {
    let page_num: i64 = rest
        .strip_prefix("page:")
        .and_then(|s| s.parse().ok())
        .unwrap_or(1);
    let page = Page::new(Some(page_num), Some(ui::PAGE_SIZE));
    let (tickets, total) = state
        .tickets()
        .list(page, Some(crate::types::TicketStatus::WaitingQc))
        .await?;

    if let Some(message) = query.message.as_ref() {
        let text = if tickets.is_empty() {
            "QC queue is empty.".to_string()
        } else {
            tickets
                .iter()
                .map(|t| format!("#{} — {}", t.id, t.title))
                .collect::<Vec<_>>()
                .join("\n")
        };
        let rows: Vec<Vec<InlineKeyboardButton>> = tickets
            .iter()
            .map(|t| {
                vec![
                    InlineKeyboardButton::callback(
                        format!("Pass #{}", t.id),
                        format!("tqc:pass:{}", t.id),
                    ),
                    InlineKeyboardButton::callback(
                        format!("Fail #{}", t.id),
                        format!("tqc:fail:{}", t.id),
                    ),
                ]
            })
            .collect();
        let total_pages = ui::page_count(total);
        let keyboard = ui::keyboard_with_pagination(rows, "tqq", page_num, total_pages);
        bot.edit_message_text(message.chat().id, message.id(), text)
            .reply_markup(keyboard)
            .await
            .ok();
    }
    Ok(())
}

async fn handle_xp_history(
    bot: &Bot,
    query: &CallbackQuery,
    state: &AppState,
    caller_id: Uuid,
    rest: &str,
) -> Result<(), AppError> {
    let page_num: i64 = rest
        .strip_prefix("page:")
        .and_then(|s| s.parse().ok())
        .unwrap_or(1);
    let page = Page::new(Some(page_num), Some(ui::PAGE_SIZE));
    let (entries, total) = state.xp_ledger().history_for_user(caller_id, page).await?;

    if let Some(message) = query.message.as_ref() {
        let text = if entries.is_empty() {
            "No XP entries yet.".to_string()
        } else {
            entries
                .iter()
                .map(|e| format!("{}: {:+}", e.reason_label, e.amount))
                .collect::<Vec<_>>()
                .join("\n")
        };
        let total_pages = ui::page_count(total);
        let keyboard = ui::keyboard_with_pagination(Vec::new(), "xph", page_num, total_pages);
        bot.edit_message_text(message.chat().id, message.id(), text)
            .reply_markup(keyboard)
            .await
            .ok();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AppError;

    #[test]
    fn internal_errors_never_leak_detail_in_alert_text() {
        let err = AppError::internal("connection string: postgres://user:pw@host/db");
        let text = alert_text(&err);
        assert!(!text.contains("postgres://"));
    }

    #[test]
    fn conflict_detail_is_shown_verbatim() {
        let err = AppError::conflict("ticket already assigned");
        assert_eq!(alert_text(&err), "ticket already assigned");
    }
}
