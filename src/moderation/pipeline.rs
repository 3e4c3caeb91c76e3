//! Policy pipeline for text messages.
//!
//! Checks run in a fixed order and the first one that triggers ends the
//! pipeline:
//! 1. empty body → nothing
//! 2. flood control (applies to everyone, owner included)
//! 3. quiet hours (owner and allow-list exempt)
//! 4. link restriction (owner and allow-list exempt)
//! 5. owner commands
//! 6. liveness probe

use std::sync::LazyLock;

use chrono::{DateTime, Timelike, Utc};
use regex::Regex;
use tracing::debug;

use crate::moderation::commands;
use crate::moderation::engine::{ModerationState, issue_warning};
use crate::moderation::types::{Action, Reply, TextMessage};

/// Prefix that marks a command message.
pub const COMMAND_PREFIX: char = '!';

pub const FLOOD_REASON: &str = "Flooding messages";
pub const LINK_REASON: &str = "Shared link";

static LINK_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(https?://|www\.)").expect("link pattern compiles"));

/// Which check decided the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    EmptyBody,
    Flood,
    QuietHours,
    Link,
    Command,
    Probe,
    /// No check triggered.
    Pass,
}

impl Check {
    pub fn label(&self) -> &'static str {
        match self {
            Self::EmptyBody => "empty_body",
            Self::Flood => "flood",
            Self::QuietHours => "quiet_hours",
            Self::Link => "link",
            Self::Command => "command",
            Self::Probe => "probe",
            Self::Pass => "pass",
        }
    }
}

/// Result of running a message through the pipeline.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub check: Check,
    pub actions: Vec<Action>,
}

impl Evaluation {
    fn none(check: Check) -> Self {
        Self {
            check,
            actions: Vec::new(),
        }
    }
}

/// Whether `body` contains a link.
pub fn contains_link(body: &str) -> bool {
    LINK_PATTERN.is_match(body)
}

/// Run `msg` through every check.
pub fn evaluate(state: &mut ModerationState, msg: &TextMessage, now: DateTime<Utc>) -> Evaluation {
    let body = msg.body.trim();
    if body.is_empty() {
        return Evaluation::none(Check::EmptyBody);
    }

    let evaluation = run_checks(state, msg, body, now);
    debug!(
        chat = %msg.chat,
        sender = %msg.sender,
        check = evaluation.check.label(),
        actions = evaluation.actions.len(),
        "Message evaluated"
    );
    evaluation
}

fn run_checks(
    state: &mut ModerationState,
    msg: &TextMessage,
    body: &str,
    now: DateTime<Utc>,
) -> Evaluation {
    let sender = &msg.sender;

    let flood = &state.config.flood_control;
    if flood.enabled {
        let (max, window) = (flood.max_messages_per_window, flood.window());
        let count = state.rates.record(sender, now, window);
        if count > max {
            let actions = issue_warning(state, &msg.chat, sender, FLOOD_REASON, now, |s, n, limit| {
                format!(
                    "🚫 {}, please slow down! Flooding the chat is not allowed. (Warning {n}/{limit})",
                    s.mention()
                )
            });
            return Evaluation {
                check: Check::Flood,
                actions,
            };
        }
    }

    let exempt = state.config.is_exempt(sender);

    let quiet = &state.config.quiet_hours;
    if quiet.enabled && !exempt {
        let hour = msg.timestamp.with_timezone(&quiet.timezone).hour();
        if quiet.contains(hour) {
            let reply = Reply::new(&msg.chat, quiet.reminder_text.clone()).mentioning(sender);
            return Evaluation {
                check: Check::QuietHours,
                actions: vec![reply.into()],
            };
        }
    }

    if state.config.instant_warn_on_link && !exempt && contains_link(body) {
        let actions = issue_warning(state, &msg.chat, sender, LINK_REASON, now, |s, n, limit| {
            format!(
                "⚠️ {}, sharing links is not allowed in this group. (Warning {n}/{limit})",
                s.mention()
            )
        });
        return Evaluation {
            check: Check::Link,
            actions,
        };
    }

    if body.starts_with(COMMAND_PREFIX) && *sender == state.config.owner {
        return Evaluation {
            check: Check::Command,
            actions: commands::execute(state, &msg.chat, body, now),
        };
    }

    if let Some(phrase) = state.config.probe_phrase.as_deref() {
        let phrase = phrase.trim().to_lowercase();
        if !phrase.is_empty() && body.to_lowercase().contains(&phrase) {
            let reply = Reply::new(
                &msg.chat,
                format!(
                    "🤖 {} is working! I can read messages and respond.",
                    state.config.bot_name
                ),
            );
            return Evaluation {
                check: Check::Probe,
                actions: vec![reply.into()],
            };
        }
    }

    Evaluation::none(Check::Pass)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    use crate::config::ModerationConfig;
    use crate::identity::{ChatId, Identity};
    use crate::moderation::ledger::WarningLedger;
    use crate::moderation::types::replies;

    fn member() -> Identity {
        Identity::normalize("923001234567").unwrap()
    }

    /// Config with quiet hours off so checks can be tested in isolation.
    fn state() -> ModerationState {
        let mut config = ModerationConfig::default();
        config.quiet_hours.enabled = false;
        ModerationState::new(config, WarningLedger::new())
    }

    /// 12:00 in Karachi (UTC+5).
    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 7, 0, 0).unwrap()
    }

    fn message(sender: &Identity, body: &str, timestamp: DateTime<Utc>) -> TextMessage {
        TextMessage {
            chat: ChatId::new("1203@g.us"),
            sender: sender.clone(),
            body: body.into(),
            timestamp,
        }
    }

    fn run(state: &mut ModerationState, sender: &Identity, body: &str) -> Evaluation {
        evaluate(state, &message(sender, body, noon()), noon())
    }

    #[test]
    fn empty_body_does_nothing() {
        let mut state = state();
        let eval = run(&mut state, &member(), "   \n");
        assert_eq!(eval.check, Check::EmptyBody);
        assert!(eval.actions.is_empty());
        assert!(state.rates.is_empty());
    }

    #[test]
    fn huge_flood_window_still_evaluates() {
        let mut state = state();
        state.config.flood_control.window_seconds = 10_000_000_000_000_000;
        let eval = run(&mut state, &member(), "hello everyone");
        assert_eq!(eval.check, Check::Pass);
        assert_eq!(state.rates.len(), 1);
    }

    #[test]
    fn plain_message_passes() {
        let mut state = state();
        let eval = run(&mut state, &member(), "hello everyone");
        assert_eq!(eval.check, Check::Pass);
        assert!(eval.actions.is_empty());
    }

    #[test]
    fn link_warns_member() {
        let mut state = state();
        let eval = run(&mut state, &member(), "look at http://x.com");
        assert_eq!(eval.check, Check::Link);
        assert_eq!(eval.actions[0], Action::PersistWarnings);
        assert_eq!(replies(&eval.actions).len(), 1);
        assert_eq!(state.ledger.count_for(&member()), 1);
        assert_eq!(state.ledger.get(&member()).unwrap().last_reason, LINK_REASON);
    }

    #[test]
    fn link_patterns() {
        assert!(contains_link("https://example.com"));
        assert!(contains_link("WWW.Example.com"));
        assert!(contains_link("HTTP://shout.example"));
        assert!(!contains_link("see the website later"));
        assert!(!contains_link("ftp://files.example"));
    }

    #[test]
    fn link_ignored_when_disabled() {
        let mut state = state();
        state.config.instant_warn_on_link = false;
        let eval = run(&mut state, &member(), "www.example.com");
        assert_eq!(eval.check, Check::Pass);
        assert_eq!(state.ledger.count_for(&member()), 0);
    }

    #[test]
    fn owner_and_allow_list_may_post_links() {
        let mut state = state();
        let owner = state.config.owner.clone();
        state.config.allow(member());

        assert_eq!(run(&mut state, &owner, "http://x.com").check, Check::Pass);
        assert_eq!(run(&mut state, &member(), "http://x.com").check, Check::Pass);
        assert!(state.ledger.is_empty());
    }

    #[test]
    fn flood_triggers_on_seventh_message_and_each_after() {
        let mut state = state();
        let sender = member();
        let start = noon();
        let mut triggered = Vec::new();
        for i in 0..8 {
            let now = start + chrono::Duration::seconds(i);
            let eval = evaluate(&mut state, &message(&sender, "hi", now), now);
            triggered.push(eval.check == Check::Flood);
        }
        assert_eq!(triggered, vec![false, false, false, false, false, false, true, true]);
        assert_eq!(state.ledger.count_for(&sender), 2);
        assert_eq!(state.ledger.get(&sender).unwrap().last_reason, FLOOD_REASON);
    }

    #[test]
    fn flood_applies_to_owner() {
        let mut state = state();
        let owner = state.config.owner.clone();
        let mut last = Check::Pass;
        for _ in 0..7 {
            last = run(&mut state, &owner, "!status").check;
        }
        assert_eq!(last, Check::Flood);
        assert_eq!(state.ledger.count_for(&owner), 1);
    }

    #[test]
    fn flood_short_circuits_link_check() {
        let mut state = state();
        for _ in 0..6 {
            run(&mut state, &member(), "hi");
        }
        let eval = run(&mut state, &member(), "http://x.com");
        assert_eq!(eval.check, Check::Flood);
        assert_eq!(state.ledger.count_for(&member()), 1);
    }

    #[test]
    fn quiet_hours_remind_members() {
        let mut state = state();
        state.config.quiet_hours.enabled = true;
        // 02:00 Karachi == 21:00 UTC the day before.
        let late = Utc.with_ymd_and_hms(2024, 2, 29, 21, 0, 0).unwrap();
        let eval = evaluate(&mut state, &message(&member(), "http://x.com", late), late);
        assert_eq!(eval.check, Check::QuietHours);
        let replies = replies(&eval.actions);
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].text, state.config.quiet_hours.reminder_text);
        // Quiet hours short-circuit the link warning.
        assert!(state.ledger.is_empty());
    }

    #[test]
    fn quiet_hours_exempt_owner() {
        let mut state = state();
        state.config.quiet_hours.enabled = true;
        let owner = state.config.owner.clone();
        let late = Utc.with_ymd_and_hms(2024, 2, 29, 21, 0, 0).unwrap();
        let eval = evaluate(&mut state, &message(&owner, "!rules", late), late);
        assert_eq!(eval.check, Check::Command);
    }

    #[test]
    fn quiet_hours_outside_window() {
        let mut state = state();
        state.config.quiet_hours.enabled = true;
        let eval = run(&mut state, &member(), "good afternoon");
        assert_eq!(eval.check, Check::Pass);
    }

    #[test]
    fn commands_only_from_owner() {
        let mut state = state();
        assert_eq!(run(&mut state, &member(), "!rules").check, Check::Pass);

        let owner = state.config.owner.clone();
        let eval = run(&mut state, &owner, "!rules");
        assert_eq!(eval.check, Check::Command);
        assert_eq!(replies(&eval.actions)[0].text, state.config.rules_text);
    }

    #[test]
    fn probe_phrase_answers_anyone() {
        let mut state = state();
        let eval = run(&mut state, &member(), "is this BOT TEST working?");
        assert_eq!(eval.check, Check::Probe);
        assert!(replies(&eval.actions)[0].text.contains("ModBot is working"));

        state.config.probe_phrase = None;
        assert_eq!(run(&mut state, &member(), "bot test").check, Check::Pass);
    }
}
