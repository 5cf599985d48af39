//! Paged access to the recipient store.

use async_trait::async_trait;
use sqlx::PgPool;

use herald_common::error::AppError;
use herald_common::types::Recipient;

/// One page of recipients.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipientPage {
    pub recipients: Vec<Recipient>,
    /// Whether another call with the last id of this page may return more.
    pub has_more: bool,
}

/// Source of broadcast recipients, read page by page.
///
/// Pages are keyed by [`Recipient::id`]: the caller passes the id of the last
/// recipient it received, so a full paging sequence never yields the same
/// recipient twice.
#[async_trait]
pub trait RecipientSource: Send + Sync {
    /// Fetch up to `limit` recipients with an id greater than `after`.
    async fn fetch_page(
        &self,
        after: Option<i64>,
        limit: usize,
    ) -> Result<RecipientPage, AppError>;
}

/// Recipient source backed by the `users` table.
#[derive(Debug, Clone)]
pub struct PgRecipientSource {
    pool: PgPool,
}

impl PgRecipientSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecipientSource for PgRecipientSource {
    async fn fetch_page(
        &self,
        after: Option<i64>,
        limit: usize,
    ) -> Result<RecipientPage, AppError> {
        // One extra row tells us whether another page exists.
        let mut recipients: Vec<Recipient> = sqlx::query_as(
            r#"
            SELECT id, telegram_id, COALESCE(username, '') AS username, channel_id
            FROM users
            WHERE id > $1
            ORDER BY id
            LIMIT $2
            "#,
        )
        .bind(after.unwrap_or(i64::MIN))
        .bind(limit as i64 + 1)
        .fetch_all(&self.pool)
        .await?;

        let has_more = recipients.len() > limit;
        recipients.truncate(limit);

        tracing::debug!(
            after = ?after,
            fetched = recipients.len(),
            has_more,
            "Fetched recipient page"
        );

        Ok(RecipientPage {
            recipients,
            has_more,
        })
    }
}
