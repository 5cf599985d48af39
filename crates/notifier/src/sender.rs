//! Delivery of a single message to a single recipient.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Failure of one send attempt.
#[derive(Debug, Error)]
pub enum SendError {
    /// The request never got a usable HTTP response.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The provider answered and refused the message.
    #[error("api error {code}: {description}")]
    Api {
        code: u16,
        description: String,
        /// Seconds the provider asked us to wait (flood control).
        retry_after: Option<u64>,
    },

    /// The provider's answer could not be understood.
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl SendError {
    /// Whether another attempt could plausibly succeed.
    ///
    /// Rate limiting, server-side failures and connection problems are
    /// transient. Rejections such as a blocked bot or unknown chat are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            SendError::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            SendError::Api { code, .. } => *code == 429 || *code >= 500,
            SendError::Decode(_) => false,
        }
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            SendError::Api {
                retry_after: Some(secs),
                ..
            } => Some(Duration::from_secs(*secs)),
            _ => None,
        }
    }
}

/// Abstraction over the messaging provider, enabling testability.
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Send a plain text message.
    async fn send_text(&self, recipient: i64, text: &str) -> Result<(), SendError>;

    /// Send an image fetched by the provider from `image_url`, with a caption.
    async fn send_image(
        &self,
        recipient: i64,
        image_url: &str,
        caption: &str,
    ) -> Result<(), SendError>;
}
