use std::str::FromStr;

use serde::Deserialize;

/// Global application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// PostgreSQL connection string
    pub database_url: String,

    /// Maximum number of PostgreSQL connections in the pool (default: 5)
    pub db_max_connections: u32,

    /// Telegram bot token
    pub telegram_bot_token: String,

    /// Telegram Bot API base URL (default: https://api.telegram.org)
    pub telegram_api_url: String,

    /// Parse mode for outgoing messages; `None` sends plain text (default: Markdown)
    pub telegram_parse_mode: Option<String>,

    /// Recipients fetched per page, also the job queue capacity (default: 20)
    pub broadcast_batch_size: usize,

    /// Number of concurrent delivery workers (default: 5)
    pub broadcast_worker_count: usize,

    /// Delay each worker observes after a send, in milliseconds (default: 1000)
    pub broadcast_message_interval_ms: u64,

    /// Attempts per recipient, 1 disables retries (default: 1)
    pub broadcast_max_send_attempts: u32,

    /// Delay before retrying a transient failure, in milliseconds (default: 1000)
    pub broadcast_retry_backoff_ms: u64,

    /// Inserted between a prefix and the message body (default: single space)
    pub broadcast_prefix_separator: String,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: std::env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?,
            db_max_connections: parse_var("DB_MAX_CONNECTIONS", 5)?,
            telegram_bot_token: std::env::var("TELEGRAM_BOT_TOKEN").map_err(|_| {
                anyhow::anyhow!("TELEGRAM_BOT_TOKEN environment variable is required")
            })?,
            telegram_api_url: std::env::var("TELEGRAM_API_URL")
                .unwrap_or_else(|_| "https://api.telegram.org".to_string()),
            telegram_parse_mode: match std::env::var("TELEGRAM_PARSE_MODE") {
                Ok(mode) if mode.trim().is_empty() => None,
                Ok(mode) => Some(mode),
                Err(_) => Some("Markdown".to_string()),
            },
            broadcast_batch_size: parse_var("BROADCAST_BATCH_SIZE", 20)?,
            broadcast_worker_count: parse_var("BROADCAST_WORKER_COUNT", 5)?,
            broadcast_message_interval_ms: parse_var("BROADCAST_MESSAGE_INTERVAL_MS", 1000)?,
            broadcast_max_send_attempts: parse_var("BROADCAST_MAX_SEND_ATTEMPTS", 1)?,
            broadcast_retry_backoff_ms: parse_var("BROADCAST_RETRY_BACKOFF_MS", 1000)?,
            broadcast_prefix_separator: std::env::var("BROADCAST_PREFIX_SEPARATOR")
                .unwrap_or_else(|_| " ".to_string()),
        })
    }
}

/// Read `key` from the environment, falling back to `default` when unset.
fn parse_var<T: FromStr>(key: &str, default: T) -> anyhow::Result<T> {
    match std::env::var(key) {
        Ok(raw) => parse_value(key, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> anyhow::Result<T> {
    raw.trim().parse().map_err(|_| {
        anyhow::anyhow!(
            "{key} must be a valid {}",
            std::any::type_name::<T>()
        )
    })
}
