//! Bulk notification fan-out.
//!
//! A [`Broadcaster`] turns one [`BroadcastRequest`] into a delivery job per
//! registered recipient:
//! - the dispatcher pages the [`RecipientSource`] and fills a bounded queue
//! - a fixed pool of workers drains the queue through a [`MessageSender`],
//!   pausing after every send to stay under the provider's rate limit
//!
//! `broadcast` returns as soon as the tasks are spawned. Failures after that
//! point are only visible in logs and in the optional [`BroadcastReport`].
//!
//! [`BroadcastRequest`]: herald_common::types::BroadcastRequest

pub mod broadcaster;
pub mod config;
pub mod dispatcher;
pub mod job;
pub mod queue;
pub mod sender;
pub mod source;
pub mod telegram;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use broadcaster::{BroadcastHandle, BroadcastPhase, BroadcastReport, Broadcaster};
pub use config::{BroadcastConfig, RetryPolicy};
pub use sender::{MessageSender, SendError};
pub use source::{PgRecipientSource, RecipientPage, RecipientSource};
pub use telegram::TelegramSender;
