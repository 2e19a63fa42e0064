//! Configuration loading. Precedence is environment variable > `.env`
//! file (development convenience only, via `dotenvy`) > compiled default.

use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub db_url: String,
    pub db_max_connections: u32,

    pub http_bind_addr: String,

    pub bot_token: Option<String>,
    pub bot_mode: BotMode,
    pub bot_webhook_base_url: Option<String>,
    pub bot_webhook_path: String,
    pub bot_webhook_secret: Option<String>,
    pub bot_tma_max_age: Duration,
    pub bot_tma_replay_ttl: Duration,

    pub jwt_signing_key: String,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,

    pub log_format: LogFormat,
    pub rust_log: String,

    pub punctuality_base_xp: i32,
    pub first_pass_bonus_xp: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotMode {
    Polling,
    Webhook,
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl Config {
    /// Loads `.env` (if present, silently ignored otherwise) then reads
    /// every recognized key from the process environment, falling back to
    /// compiled defaults.
    pub fn load() -> anyhow::Result<Self> {
        let _ = dotenvy::dotenv();

        let db_url = env_or_default("DB_URL", "postgres://localhost/shopfloor");
        let db_max_connections = env_parse_or("DB_MAX_CONNECTIONS", 10)?;

        let http_bind_addr = env_or_default("HTTP_BIND_ADDR", "0.0.0.0:8080");

        let bot_token = env::var("BOT_TOKEN").ok();
        let bot_mode = match env::var("BOT_MODE").ok().as_deref() {
            Some("polling") => BotMode::Polling,
            Some("webhook") => BotMode::Webhook,
            Some(other) => anyhow::bail!("unrecognized BOT_MODE: {other}"),
            None => BotMode::Disabled,
        };
        let bot_webhook_base_url = env::var("BOT_WEBHOOK_BASE_URL").ok();
        let bot_webhook_path = env_or_default("BOT_WEBHOOK_PATH", "/bot/webhook/");
        let bot_webhook_secret = env::var("BOT_WEBHOOK_SECRET").ok();
        let bot_tma_max_age =
            Duration::from_secs(env_parse_or("BOT_TMA_MAX_AGE_SECONDS", 600)?);
        let bot_tma_replay_ttl =
            Duration::from_secs(env_parse_or("BOT_TMA_REPLAY_TTL_SECONDS", 3600)?);

        let jwt_signing_key = match env::var("JWT_SIGNING_KEY") {
            Ok(key) => key,
            Err(_) if cfg!(debug_assertions) => {
                "dev-only-signing-key-do-not-use-in-production".to_string()
            }
            Err(_) => anyhow::bail!("JWT_SIGNING_KEY must be set in release builds"),
        };
        let access_token_ttl =
            Duration::from_secs(env_parse_or("ACCESS_TOKEN_TTL_SECONDS", 900)?);
        let refresh_token_ttl =
            Duration::from_secs(env_parse_or("REFRESH_TOKEN_TTL_SECONDS", 1_209_600)?);

        let log_format = match env_or_default("LOG_FORMAT", "pretty").as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        };
        let rust_log = env_or_default("RUST_LOG", "info");

        let punctuality_base_xp = env_parse_or("PUNCTUALITY_BASE_XP", 5)?;
        let first_pass_bonus_xp = env_parse_or("FIRST_PASS_BONUS_XP", 10)?;

        Ok(Self {
            db_url,
            db_max_connections,
            http_bind_addr,
            bot_token,
            bot_mode,
            bot_webhook_base_url,
            bot_webhook_path,
            bot_webhook_secret,
            bot_tma_max_age,
            bot_tma_replay_ttl,
            jwt_signing_key,
            access_token_ttl,
            refresh_token_ttl,
            log_format,
            rust_log,
            punctuality_base_xp,
            first_pass_bonus_xp,
        })
    }
}

fn env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse_or<T: std::str::FromStr>(key: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid value for {key}: {e}")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_parse_or_falls_back_on_missing_key() {
        let value: u32 = env_parse_or("SHOPFLOOR_TEST_NONEXISTENT_KEY", 42).expect("ok");
        assert_eq!(value, 42);
    }

    #[test]
    fn env_or_default_falls_back_on_missing_key() {
        assert_eq!(
            env_or_default("SHOPFLOOR_TEST_NONEXISTENT_KEY", "fallback"),
            "fallback"
        );
    }
}
