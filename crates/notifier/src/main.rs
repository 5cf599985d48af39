//! Herald broadcast binary: sends one message to every registered user.

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use herald_common::config::AppConfig;
use herald_common::db::create_pool;
use herald_common::types::BroadcastRequest;
use herald_notifier::{BroadcastConfig, Broadcaster, PgRecipientSource, TelegramSender};

#[derive(Parser)]
#[command(name = "herald-broadcast")]
#[command(about = "Send a notification to every registered Telegram user")]
#[command(version)]
struct Cli {
    /// Message text (Markdown)
    #[arg(long, short)]
    message: String,

    /// Image to send with the message as its caption
    #[arg(long)]
    image_url: Option<String>,

    /// Decoration placed in front of the message, e.g. an emoji
    #[arg(long)]
    prefix: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "herald_notifier=info,herald_common=info".into()),
        )
        .json()
        .init();

    let mut request = BroadcastRequest::new(cli.message);
    request.image_url = cli.image_url;
    request.prefix = cli.prefix;
    request.validate()?;

    // Load configuration
    let config = AppConfig::from_env()?;

    // Collaborators are built once here; any failure aborts before a broadcast is accepted.
    let pool = create_pool(&config).await?;
    let sender = TelegramSender::from_config(&config).await?;

    let broadcaster = Broadcaster::new(
        Arc::new(PgRecipientSource::new(pool)),
        Arc::new(sender),
        BroadcastConfig::from(&config),
    )?;

    let handle = broadcaster.broadcast(request);
    let broadcast_id = handle.id();

    tokio::select! {
        report = handle.wait() => {
            tracing::info!(
                broadcast_id = %report.broadcast_id,
                enqueued = report.enqueued,
                delivered = report.delivered,
                failed = report.failed,
                source_failed = report.source_failed,
                elapsed_ms = (report.finished_at - report.started_at).num_milliseconds(),
                "Broadcast complete"
            );
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!(
                broadcast_id = %broadcast_id,
                "Received shutdown signal, abandoning remaining deliveries"
            );
        }
    }

    Ok(())
}
