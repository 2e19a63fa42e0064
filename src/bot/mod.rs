//! Bot workflow surface: a teloxide dispatcher mirroring the HTTP API's
//! actions over Telegram callbacks, composed from `dptree` filters wired
//! through `Dispatcher::builder`.

pub mod callbacks;
pub mod commands;
pub mod ui;
pub mod webhook;

use teloxide::dispatching::{Dispatcher, UpdateFilterExt};
use teloxide::prelude::*;
use teloxide::types::Update;

use crate::state::AppState;

/// Runs the long-polling intake loop. Used when `BOT_MODE=polling`; the
/// webhook path instead feeds updates into the same handler tree via
/// [`webhook::handle`].
pub async fn run_polling(bot: Bot, state: AppState) {
    let handler = build_handler();

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

pub fn build_handler(
) -> teloxide::dispatching::UpdateHandler<Box<dyn std::error::Error + Send + Sync + 'static>> {
    dptree::entry()
        .branch(Update::filter_message().endpoint(commands::handle_message))
        .branch(Update::filter_callback_query().endpoint(callbacks::handle_callback))
}

pub fn bot_from_token(token: &str) -> Bot {
    Bot::new(token)
}
