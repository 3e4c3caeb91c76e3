//! Shared types for the moderation engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::channels::OutgoingContent;
use crate::identity::{ChatId, Identity};

// ── Inbound events ──────────────────────────────────────────────────

/// Event emitted by a transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum InboundEvent {
    Text(TextMessage),
    Membership(MembershipChange),
}

impl InboundEvent {
    /// Chat the event belongs to.
    pub fn chat(&self) -> &ChatId {
        match self {
            Self::Text(msg) => &msg.chat,
            Self::Membership(change) => &change.chat,
        }
    }

    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Membership(change) => match change.kind {
                MembershipKind::Joined => "joined",
                MembershipKind::Left => "left",
            },
        }
    }
}

/// A text message posted in a chat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextMessage {
    pub chat: ChatId,
    pub sender: Identity,
    pub body: String,
    /// When the message was posted; drives the quiet-hours check.
    pub timestamp: DateTime<Utc>,
}

/// Participants joining or leaving a chat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembershipChange {
    pub chat: ChatId,
    pub subjects: Vec<Identity>,
    pub kind: MembershipKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipKind {
    Joined,
    Left,
}

// ── Actions ─────────────────────────────────────────────────────────

/// Effect requested by the engine.
///
/// The engine never performs I/O itself. Persist actions always precede the
/// replies that report the state they persist.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Reply(Reply),
    /// Rewrite the warning ledger to durable storage.
    PersistWarnings,
    /// Rewrite the moderation config to durable storage.
    PersistConfig,
}

impl Action {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Reply(_) => "reply",
            Self::PersistWarnings => "persist_warnings",
            Self::PersistConfig => "persist_config",
        }
    }

    pub fn as_reply(&self) -> Option<&Reply> {
        match self {
            Self::Reply(reply) => Some(reply),
            _ => None,
        }
    }
}

/// Message to post back into a chat.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub chat: ChatId,
    pub text: String,
    pub mentions: Vec<Identity>,
}

impl Reply {
    pub fn new(chat: &ChatId, text: impl Into<String>) -> Self {
        Self {
            chat: chat.clone(),
            text: text.into(),
            mentions: Vec::new(),
        }
    }

    /// Tag a participant so the client highlights the `@number` in the text.
    pub fn mentioning(mut self, id: &Identity) -> Self {
        self.mentions.push(id.clone());
        self
    }

    /// Split into the chat and the content handed to the transport.
    pub fn into_parts(self) -> (ChatId, OutgoingContent) {
        (
            self.chat,
            OutgoingContent {
                text: self.text,
                mentions: self.mentions,
            },
        )
    }
}

impl From<Reply> for Action {
    fn from(reply: Reply) -> Self {
        Self::Reply(reply)
    }
}

/// Collect the replies out of an action list.
pub fn replies(actions: &[Action]) -> Vec<&Reply> {
    actions.iter().filter_map(Action::as_reply).collect()
}
