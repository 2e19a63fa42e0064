#![allow(missing_docs)]

use clap::Parser;
use tracing::info;

use shopfloor::cli::{BotwebhookAction, Cli, Command};
use shopfloor::config::{BotMode, Config};
use shopfloor::state::AppState;
use shopfloor::{bot, db, http};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;

    init_tracing(&config);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Botwebhook { action } => run_botwebhook(action, config).await,
    }
}

fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.rust_log.clone()));

    match config.log_format {
        shopfloor::config::LogFormat::Json => {
            tracing_subscriber::fmt().with_env_filter(filter).json().init();
        }
        shopfloor::config::LogFormat::Pretty => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }
}

async fn run_botwebhook(action: BotwebhookAction, config: Config) -> anyhow::Result<()> {
    shopfloor::cli::run_botwebhook(action, &config).await
}

async fn serve(config: Config) -> anyhow::Result<()> {
    info!("shopfloor starting");

    let pool = db::connect(&config).await?;
    let state = AppState::build(pool, &config);

    if config.bot_mode == BotMode::Polling {
        if let Some(token) = config.bot_token.clone() {
            let bot_state = state.clone();
            tokio::spawn(async move {
                let bot = bot::bot_from_token(&token);
                bot::run_polling(bot, bot_state).await;
            });
            info!("bot polling loop started");
        } else {
            tracing::warn!("BOT_MODE=polling but BOT_TOKEN is not set; skipping bot startup");
        }
    }

    let router = http::build_router(state);
    let listener = tokio::net::TcpListener::bind(&config.http_bind_addr).await?;
    info!(addr = %config.http_bind_addr, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("shopfloor shutting down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
