//! Connection pool construction and migration runner.

pub mod models;

use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::config::Config;

/// Opens the process-wide pool and applies any pending migrations. Called
/// exactly once during bootstrap; every repository borrows
/// this pool rather than opening connections of its own.
pub async fn connect(config: &Config) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.db_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}
