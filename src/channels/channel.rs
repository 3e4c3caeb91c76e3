//! Transport abstraction — the messaging network seen from the moderator.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::error::ChannelError;
use crate::identity::{ChatId, Identity};
use crate::moderation::InboundEvent;

/// Stream of events produced by a transport.
pub type EventStream = Pin<Box<dyn Stream<Item = InboundEvent> + Send>>;

/// Content handed to [`Transport::send`].
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingContent {
    pub text: String,
    /// Participants the client should highlight.
    pub mentions: Vec<Identity>,
}

/// A messaging network connection — pure I/O, no policy.
///
/// Session handling, encoding and reconnects live behind this trait.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Transport name for logging (e.g. "cli").
    fn name(&self) -> &str;

    /// Start receiving events.
    async fn start(&self) -> Result<EventStream, ChannelError>;

    /// Post a message into a chat. Called once per reply, never retried.
    async fn send(&self, chat: &ChatId, content: OutgoingContent) -> Result<(), ChannelError>;
}
