//! Delivery jobs and the message content they produce.

use std::sync::Arc;

use herald_common::types::{BroadcastRequest, Recipient};

/// One recipient paired with the broadcast it should receive.
#[derive(Debug, Clone)]
pub struct DeliveryJob {
    pub recipient: Recipient,
    pub request: Arc<BroadcastRequest>,
}

/// What a worker actually hands to the sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutgoingMessage {
    Text { text: String },
    Image { image_url: String, caption: String },
}

impl DeliveryJob {
    pub fn new(recipient: Recipient, request: Arc<BroadcastRequest>) -> Self {
        Self { recipient, request }
    }

    /// Build the message for this recipient.
    ///
    /// A blank image URL is treated as absent, as is a blank prefix.
    pub fn render(&self, prefix_separator: &str) -> OutgoingMessage {
        let body = match self.request.prefix.as_deref() {
            Some(prefix) if !prefix.trim().is_empty() => {
                format!("{prefix}{prefix_separator}{}", self.request.message)
            }
            _ => self.request.message.clone(),
        };

        match self.request.image_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => OutgoingMessage::Image {
                image_url: url.to_string(),
                caption: body,
            },
            _ => OutgoingMessage::Text { text: body },
        }
    }
}
