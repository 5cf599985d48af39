use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::config::AppConfig;

/// Create the PostgreSQL pool backing the recipient store.
///
/// A broadcast holds at most one connection at a time (the dispatcher's page
/// query), so `AppConfig::db_max_connections` mainly bounds concurrent broadcasts.
pub async fn create_pool(config: &AppConfig) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&config.database_url)
        .await
        .map_err(|e| anyhow::anyhow!("failed to connect to recipient store: {e}"))?;

    tracing::info!(
        max_connections = config.db_max_connections,
        "Connected to PostgreSQL recipient store"
    );
    Ok(pool)
}
