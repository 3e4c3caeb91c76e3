//! Moderation engine — turns one inbound event plus state into actions.
//!
//! `handle` is synchronous and performs no I/O: persistence and delivery are
//! returned as [`Action`]s for the router to carry out.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::config::ModerationConfig;
use crate::identity::{ChatId, Identity};
use crate::moderation::ledger::WarningLedger;
use crate::moderation::pipeline;
use crate::moderation::rate::RateTracker;
use crate::moderation::types::{Action, InboundEvent, MembershipChange, MembershipKind, Reply};

/// Mutable state the engine reads and writes.
#[derive(Debug, Clone)]
pub struct ModerationState {
    pub config: ModerationConfig,
    pub ledger: WarningLedger,
    pub rates: RateTracker,
}

/// Copy of the durable parts of [`ModerationState`], taken before an event
/// so a failed persist can be rolled back.
#[derive(Debug, Clone)]
pub struct Checkpoint {
    config: ModerationConfig,
    ledger: WarningLedger,
}

impl ModerationState {
    pub fn new(config: ModerationConfig, ledger: WarningLedger) -> Self {
        Self {
            config,
            ledger,
            rates: RateTracker::new(),
        }
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            config: self.config.clone(),
            ledger: self.ledger.clone(),
        }
    }

    /// Restore config and ledger. Rate windows are kept: the messages were
    /// still sent.
    pub fn restore(&mut self, checkpoint: Checkpoint) {
        self.config = checkpoint.config;
        self.ledger = checkpoint.ledger;
    }
}

/// Evaluate one event.
pub fn handle(state: &mut ModerationState, event: &InboundEvent, now: DateTime<Utc>) -> Vec<Action> {
    match event {
        InboundEvent::Text(msg) => pipeline::evaluate(state, msg, now).actions,
        InboundEvent::Membership(change) => membership(&state.config, change),
    }
}

/// Welcome joiners; say goodbye to leavers only if a goodbye text is set.
fn membership(config: &ModerationConfig, change: &MembershipChange) -> Vec<Action> {
    match change.kind {
        MembershipKind::Joined => change
            .subjects
            .iter()
            .map(|subject| {
                info!(chat = %change.chat, subject = %subject, "Welcoming new member");
                Action::Reply(
                    Reply::new(&change.chat, render(&config.welcome_text, subject, config))
                        .mentioning(subject),
                )
            })
            .collect(),
        MembershipKind::Left => change
            .subjects
            .iter()
            .filter_map(|subject| {
                info!(chat = %change.chat, subject = %subject, "Member left");
                let text = config.goodbye_text.as_deref()?;
                Some(Action::Reply(
                    Reply::new(&change.chat, render(text, subject, config)).mentioning(subject),
                ))
            })
            .collect(),
    }
}

fn render(template: &str, subject: &Identity, config: &ModerationConfig) -> String {
    template
        .replace("{user}", &subject.mention())
        .replace("{group}", &config.group_name)
}

/// Add a warning and build the actions announcing it.
///
/// Emits `PersistWarnings`, the notice produced by `notice(subject, count,
/// limit)` and, on every increment that lands at or above the limit, the
/// limit-reached notice.
pub(crate) fn issue_warning(
    state: &mut ModerationState,
    chat: &ChatId,
    subject: &Identity,
    reason: &str,
    now: DateTime<Utc>,
    notice: impl FnOnce(&Identity, u32, u32) -> String,
) -> Vec<Action> {
    let count = state.ledger.warn(subject, reason, now);
    let limit = state.config.warn_limit;

    info!(chat = %chat, subject = %subject, count, limit, reason, "Warning issued");

    let mut actions = vec![
        Action::PersistWarnings,
        Reply::new(chat, notice(subject, count, limit))
            .mentioning(subject)
            .into(),
    ];

    if count >= limit {
        warn!(chat = %chat, subject = %subject, count, limit, "Member reached warning limit");
        actions.push(
            Reply::new(
                chat,
                format!(
                    "⛔ {} has reached the warning limit ({count}/{limit}). \
                     Admins, please consider muting or removing this member.",
                    subject.mention()
                ),
            )
            .mentioning(subject)
            .into(),
        );
    }

    actions
}
