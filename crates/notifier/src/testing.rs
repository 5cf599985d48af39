//! In-memory collaborators for unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use herald_common::error::AppError;
use herald_common::types::{BroadcastRequest, Recipient};

use crate::job::DeliveryJob;
use crate::sender::{MessageSender, SendError};
use crate::source::{RecipientPage, RecipientSource};

pub(crate) fn recipient(id: i64) -> Recipient {
    Recipient {
        id,
        telegram_id: 1000 + id,
        username: format!("user{id}"),
        channel_id: None,
    }
}

pub(crate) fn job_for(id: i64) -> DeliveryJob {
    DeliveryJob::new(recipient(id), Arc::new(BroadcastRequest::new("hi")))
}

/// Source replaying a fixed sequence of page results.
pub(crate) struct ScriptedSource {
    pages: Mutex<VecDeque<Result<RecipientPage, AppError>>>,
    pub(crate) cursors: Mutex<Vec<Option<i64>>>,
}

impl ScriptedSource {
    pub(crate) fn new(pages: Vec<Result<RecipientPage, AppError>>) -> Self {
        Self {
            pages: Mutex::new(pages.into()),
            cursors: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn page(ids: &[i64], has_more: bool) -> Result<RecipientPage, AppError> {
        Ok(RecipientPage {
            recipients: ids.iter().copied().map(recipient).collect(),
            has_more,
        })
    }
}

#[async_trait]
impl RecipientSource for ScriptedSource {
    async fn fetch_page(
        &self,
        after: Option<i64>,
        _limit: usize,
    ) -> Result<RecipientPage, AppError> {
        self.cursors.lock().unwrap().push(after);
        self.pages
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(RecipientPage::default()))
    }
}

/// Sender recording every call and failing for chosen recipients.
#[derive(Default)]
pub(crate) struct RecordingSender {
    pub(crate) calls: Mutex<Vec<(i64, String)>>,
    pub(crate) sent_at: Mutex<Vec<tokio::time::Instant>>,
    failures: Mutex<Vec<(i64, u16)>>,
}

impl RecordingSender {
    /// Fail the next send to `recipient` with the given API status code.
    pub(crate) fn fail_once(&self, recipient: i64, code: u16) {
        self.failures.lock().unwrap().push((recipient, code));
    }

    fn outcome(&self, recipient: i64, content: String) -> Result<(), SendError> {
        self.calls.lock().unwrap().push((recipient, content));
        self.sent_at.lock().unwrap().push(tokio::time::Instant::now());
        let mut failures = self.failures.lock().unwrap();
        match failures.iter().position(|(r, _)| *r == recipient) {
            Some(index) => {
                let (_, code) = failures.remove(index);
                Err(SendError::Api {
                    code,
                    description: "scripted failure".to_string(),
                    retry_after: None,
                })
            }
            None => Ok(()),
        }
    }
}

#[async_trait]
impl MessageSender for RecordingSender {
    async fn send_text(&self, recipient: i64, text: &str) -> Result<(), SendError> {
        self.outcome(recipient, text.to_string())
    }

    async fn send_image(
        &self,
        recipient: i64,
        image_url: &str,
        caption: &str,
    ) -> Result<(), SendError> {
        self.outcome(recipient, format!("{image_url}|{caption}"))
    }
}

/// Layer counting events logged at exactly `level`.
#[derive(Clone)]
pub(crate) struct LevelCounter {
    level: Level,
    events: Arc<AtomicUsize>,
}

impl LevelCounter {
    pub(crate) fn new(level: Level) -> Self {
        Self {
            level,
            events: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn count(&self) -> usize {
        self.events.load(Ordering::SeqCst)
    }
}

impl<S: Subscriber> Layer<S> for LevelCounter {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == self.level {
            self.events.fetch_add(1, Ordering::SeqCst);
        }
    }
}
