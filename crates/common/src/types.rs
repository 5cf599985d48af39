use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::AppError;

/// A registered bot user eligible to receive broadcasts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Recipient {
    /// Row id in the `users` table, used as the paging key.
    pub id: i64,
    /// Telegram user id; the chat to deliver to.
    pub telegram_id: i64,
    pub username: String,
    /// Channel the user registered through, if any.
    pub channel_id: Option<i64>,
}

/// One outbound message addressed to every recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastRequest {
    pub message: String,
    /// Image to send with the message as its caption.
    pub image_url: Option<String>,
    /// Decoration placed in front of the message (typically an emoji).
    pub prefix: Option<String>,
}

impl BroadcastRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            image_url: None,
            prefix: None,
        }
    }

    pub fn with_image_url(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = Some(image_url.into());
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Check the request before it is handed to a broadcaster.
    ///
    /// The broadcaster trusts its input, so callers must run this first.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.message.trim().is_empty() {
            return Err(AppError::Validation("message is required".to_string()));
        }

        if let Some(raw) = &self.image_url {
            validate_image_url(raw)?;
        }

        Ok(())
    }
}

fn validate_image_url(raw: &str) -> Result<(), AppError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(
            "image_url cannot be empty if provided".to_string(),
        ));
    }

    let parsed = Url::parse(trimmed)
        .map_err(|e| AppError::Validation(format!("image_url has invalid URL format: {e}")))?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(AppError::Validation(
            "image_url must be HTTP or HTTPS URL".to_string(),
        ));
    }

    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(AppError::Validation(
            "image_url must have a valid host".to_string(),
        ));
    }

    Ok(())
}
