//! Shared fakes for the broadcast integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use herald_common::error::AppError;
use herald_common::types::Recipient;
use herald_notifier::{MessageSender, RecipientPage, RecipientSource, SendError};

pub fn recipients(count: i64) -> Vec<Recipient> {
    (1..=count)
        .map(|id| Recipient {
            id,
            telegram_id: 500_000 + id,
            username: format!("user{id}"),
            channel_id: (id % 2 == 0).then_some(7),
        })
        .collect()
}

/// In-memory store paged by id, optionally failing on the n-th fetch.
pub struct MemorySource {
    recipients: Vec<Recipient>,
    fail_on_fetch: Option<usize>,
    fetches: AtomicUsize,
}

impl MemorySource {
    pub fn new(recipients: Vec<Recipient>) -> Self {
        Self {
            recipients,
            fail_on_fetch: None,
            fetches: AtomicUsize::new(0),
        }
    }

    /// Fail the fetch with this zero-based index.
    pub fn failing_on(mut self, fetch: usize) -> Self {
        self.fail_on_fetch = Some(fetch);
        self
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecipientSource for MemorySource {
    async fn fetch_page(
        &self,
        after: Option<i64>,
        limit: usize,
    ) -> Result<RecipientPage, AppError> {
        let fetch = self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_on_fetch == Some(fetch) {
            return Err(AppError::Internal("recipient store unavailable".to_string()));
        }

        let remaining: Vec<Recipient> = self
            .recipients
            .iter()
            .filter(|r| after.is_none_or(|after| r.id > after))
            .cloned()
            .collect();
        let has_more = remaining.len() > limit;

        Ok(RecipientPage {
            recipients: remaining.into_iter().take(limit).collect(),
            has_more,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentMessage {
    Text { chat: i64, text: String },
    Image { chat: i64, image_url: String, caption: String },
}

impl SentMessage {
    pub fn chat(&self) -> i64 {
        match self {
            SentMessage::Text { chat, .. } | SentMessage::Image { chat, .. } => *chat,
        }
    }
}

/// Sender that takes `latency` per call and records what it was asked to send.
pub struct RecordingSender {
    latency: Duration,
    failing: HashSet<i64>,
    sent: Mutex<Vec<SentMessage>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl RecordingSender {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            failing: HashSet::new(),
            sent: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Reject every message addressed to `chat`.
    pub fn rejecting(mut self, chat: i64) -> Self {
        self.failing.insert(chat);
        self
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn record(&self, message: SentMessage) -> Result<(), SendError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.latency).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let chat = message.chat();
        self.sent.lock().unwrap().push(message);

        if self.failing.contains(&chat) {
            return Err(SendError::Api {
                code: 403,
                description: "Forbidden: bot was blocked by the user".to_string(),
                retry_after: None,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl MessageSender for RecordingSender {
    async fn send_text(&self, recipient: i64, text: &str) -> Result<(), SendError> {
        self.record(SentMessage::Text {
            chat: recipient,
            text: text.to_string(),
        })
        .await
    }

    async fn send_image(
        &self,
        recipient: i64,
        image_url: &str,
        caption: &str,
    ) -> Result<(), SendError> {
        self.record(SentMessage::Image {
            chat: recipient,
            image_url: image_url.to_string(),
            caption: caption.to_string(),
        })
        .await
    }
}

/// Layer counting `ERROR` events, installed as the thread's default subscriber.
///
/// Tests run on the current-thread runtime, so spawned tasks log through it too.
#[derive(Clone, Default)]
pub struct ErrorCounter {
    errors: Arc<AtomicUsize>,
}

impl ErrorCounter {
    pub fn count(&self) -> usize {
        self.errors.load(Ordering::SeqCst)
    }
}

impl<S: Subscriber> Layer<S> for ErrorCounter {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == Level::ERROR {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }
}
