//! Command-line surface: `serve` (the default, bare-invocation behavior)
//! and `botwebhook set|delete`, a thin wrapper over the Telegram Bot
//! API's `setWebhook`/`deleteWebhook` calls.

use clap::{Parser, Subcommand};

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(name = "shopfloor", about = "Bike-rental repair-shop ticket and XP workflow engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP API (and, depending on BOT_MODE, the Telegram bot).
    Serve,
    /// Manage the Telegram webhook registration.
    Botwebhook {
        #[command(subcommand)]
        action: BotwebhookAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum BotwebhookAction {
    /// Register the webhook URL with Telegram.
    Set,
    /// Remove the currently registered webhook.
    Delete,
}

pub async fn run_botwebhook(action: BotwebhookAction, config: &Config) -> anyhow::Result<()> {
    let token = config
        .bot_token
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("BOT_TOKEN must be set to manage the webhook"))?;
    let client = reqwest::Client::new();

    match action {
        BotwebhookAction::Set => {
            let base_url = config
                .bot_webhook_base_url
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("BOT_WEBHOOK_BASE_URL must be set"))?;
            let url = format!("{}{}", base_url.trim_end_matches('/'), config.bot_webhook_path);

            let mut form = vec![("url".to_string(), url)];
            if let Some(secret) = &config.bot_webhook_secret {
                form.push(("secret_token".to_string(), secret.clone()));
            }

            let response = client
                .post(format!("https://api.telegram.org/bot{token}/setWebhook"))
                .form(&form)
                .send()
                .await?
                .text()
                .await?;
            println!("{response}");
        }
        BotwebhookAction::Delete => {
            let response = client
                .post(format!("https://api.telegram.org/bot{token}/deleteWebhook"))
                .send()
                .await?
                .text()
                .await?;
            println!("{response}");
        }
    }
    Ok(())
}
