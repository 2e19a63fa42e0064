//! Plain-message handling: `/start` plus the contact-sharing step of
//! access onboarding. Ticket creation/review/QC flows are driven
//! entirely by callback buttons (see [`super::callbacks`]); this module
//! only has to get a brand-new Telegram user as far as a pending
//! `AccessRequest`.

use teloxide::prelude::*;
use teloxide::types::{ButtonRequest, KeyboardButton, KeyboardMarkup};

use crate::state::AppState;

pub async fn handle_message(
    bot: Bot,
    msg: Message,
    state: AppState,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    if let Some(text) = msg.text() {
        if text == "/start" {
            return handle_start(bot, msg, state).await;
        }
    }

    if let Some(contact) = msg.contact() {
        return handle_contact(bot, msg.clone(), state, contact.phone_number.clone()).await;
    }

    Ok(())
}

async fn handle_start(
    bot: Bot,
    msg: Message,
    state: AppState,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let telegram_id = msg.from().and_then(|u| i64::try_from(u.id.0).ok());
    let Some(telegram_id) = telegram_id else {
        return Ok(());
    };

    if state.users().find_by_telegram_id(telegram_id).await?.is_some() {
        bot.send_message(msg.chat.id, "Welcome back.").await?;
        return Ok(());
    }

    let share_button = KeyboardButton::new("Share my phone number").request(ButtonRequest::Contact);
    let keyboard = KeyboardMarkup::new([[share_button]]).resize_keyboard();
    bot.send_message(
        msg.chat.id,
        "Welcome. Share your phone number to request access.",
    )
    .reply_markup(keyboard)
    .await?;
    Ok(())
}

async fn handle_contact(
    bot: Bot,
    msg: Message,
    state: AppState,
    phone: String,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let Some(from) = msg.from() else { return Ok(()) };
    let telegram_id = i64::try_from(from.id.0)?;
    let telegram_username = from.username.clone();
    let first_name = from.first_name.clone();
    let last_name = from.last_name.clone();

    match state
        .access_onboarding()
        .request_access(
            telegram_id,
            telegram_username.as_deref(),
            &first_name,
            last_name.as_deref(),
            &phone,
        )
        .await
    {
        Ok(_) => {
            bot.send_message(msg.chat.id, "Request submitted. A manager will review it shortly.")
                .await?;
        }
        Err(err) => {
            bot.send_message(msg.chat.id, super::callbacks::alert_text(&err)).await?;
        }
    }
    Ok(())
}
