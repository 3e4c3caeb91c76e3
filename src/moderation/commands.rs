//! Owner command interpreter.
//!
//! Commands arrive already verified as coming from the owner. Parsing never
//! fails outward: malformed input turns into a usage reply.

use chrono::{DateTime, Utc};
use tracing::info;

use crate::identity::{ChatId, Identity};
use crate::moderation::engine::{ModerationState, issue_warning};
use crate::moderation::ledger::DEFAULT_REASON;
use crate::moderation::types::{Action, Reply};

const HELP_TEXT: &str = "📋 Available commands:\n\
!rules - Show group rules\n\
!status - Check bot status\n\
!help - Show this help\n\
!warn <number> [reason] - Warn a member\n\
!warnreset - Clear all warnings\n\
!whitelist add <number> - Exempt a member from link and quiet-hour checks\n\
!whitelist remove <number> - Remove an exemption\n\
!whitelist list - Show exempt members";

const WHITELIST_USAGE: &str = "!whitelist add|remove <number> or !whitelist list";
const WARN_USAGE: &str = "!warn <number> [reason]";

/// A parsed owner command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Rules,
    Status,
    Help,
    WarnReset,
    WhitelistAdd(Identity),
    WhitelistRemove(Identity),
    WhitelistList,
    Warn { target: Identity, reason: String },
    Unknown(String),
}

/// Why a command could not be parsed. Rendered back to the owner.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommandError {
    #[error("⚠️ Missing argument. Usage: {usage}")]
    MissingArgument { usage: &'static str },

    #[error("⚠️ '{raw}' is not a valid phone number. Usage: {usage}")]
    InvalidNumber { raw: String, usage: &'static str },

    #[error("⚠️ Unknown option '{raw}'. Usage: {usage}")]
    UnknownSubcommand { raw: String, usage: &'static str },
}

impl Command {
    /// Parse a `!`-prefixed message. The command name is case-insensitive;
    /// arguments keep their case.
    pub fn parse(body: &str) -> Result<Self, CommandError> {
        let mut tokens = body.split_whitespace();
        let name = tokens
            .next()
            .unwrap_or_default()
            .trim_start_matches('!')
            .to_lowercase();

        match name.as_str() {
            "rules" => Ok(Self::Rules),
            "status" => Ok(Self::Status),
            "help" => Ok(Self::Help),
            "warnreset" => Ok(Self::WarnReset),
            "whitelist" => {
                let sub = tokens
                    .next()
                    .ok_or(CommandError::MissingArgument {
                        usage: WHITELIST_USAGE,
                    })?
                    .to_lowercase();
                match sub.as_str() {
                    "list" => Ok(Self::WhitelistList),
                    "add" => Ok(Self::WhitelistAdd(number_arg(tokens.next(), WHITELIST_USAGE)?)),
                    "remove" => Ok(Self::WhitelistRemove(number_arg(
                        tokens.next(),
                        WHITELIST_USAGE,
                    )?)),
                    other => Err(CommandError::UnknownSubcommand {
                        raw: other.to_string(),
                        usage: WHITELIST_USAGE,
                    }),
                }
            }
            "warn" => {
                let target = number_arg(tokens.next(), WARN_USAGE)?;
                let reason = tokens.collect::<Vec<_>>().join(" ");
                let reason = if reason.is_empty() {
                    DEFAULT_REASON.to_string()
                } else {
                    reason
                };
                Ok(Self::Warn { target, reason })
            }
            other => Ok(Self::Unknown(other.to_string())),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Rules => "rules",
            Self::Status => "status",
            Self::Help => "help",
            Self::WarnReset => "warnreset",
            Self::WhitelistAdd(_) => "whitelist_add",
            Self::WhitelistRemove(_) => "whitelist_remove",
            Self::WhitelistList => "whitelist_list",
            Self::Warn { .. } => "warn",
            Self::Unknown(_) => "unknown",
        }
    }
}

fn number_arg(token: Option<&str>, usage: &'static str) -> Result<Identity, CommandError> {
    let raw = token.ok_or(CommandError::MissingArgument { usage })?;
    Identity::normalize(raw).ok_or_else(|| CommandError::InvalidNumber {
        raw: raw.to_string(),
        usage,
    })
}

/// Parse and run an owner command.
pub fn execute(
    state: &mut ModerationState,
    chat: &ChatId,
    body: &str,
    now: DateTime<Utc>,
) -> Vec<Action> {
    let command = match Command::parse(body) {
        Ok(command) => command,
        Err(e) => {
            info!(chat = %chat, error = %e, "Malformed command");
            return vec![Reply::new(chat, e.to_string()).into()];
        }
    };

    info!(chat = %chat, command = command.label(), "Executing command");

    match command {
        Command::Rules => vec![Reply::new(chat, state.config.rules_text.clone()).into()],
        Command::Status => vec![
            Reply::new(
                chat,
                format!(
                    "✅ {} is online and active!\n⚠️ Members with warnings: {}\n🛡️ Allow-listed members: {}",
                    state.config.bot_name,
                    state.ledger.len(),
                    state.config.allow_list.len()
                ),
            )
            .into(),
        ],
        Command::Help => vec![Reply::new(chat, HELP_TEXT).into()],
        Command::WarnReset => {
            state.ledger.reset();
            vec![
                Action::PersistWarnings,
                Reply::new(chat, "✅ All warnings have been cleared.").into(),
            ]
        }
        Command::WhitelistAdd(id) => {
            let number = id.number().to_string();
            if state.config.allow(id) {
                vec![
                    Action::PersistConfig,
                    Reply::new(chat, format!("✅ {number} added to the allow-list.")).into(),
                ]
            } else {
                vec![Reply::new(chat, format!("ℹ️ {number} is already in list.")).into()]
            }
        }
        Command::WhitelistRemove(id) => {
            let removed = state.config.disallow(&id);
            info!(subject = %id, removed, "Allow-list removal");
            vec![
                Action::PersistConfig,
                Reply::new(
                    chat,
                    format!("✅ {} removed from the allow-list.", id.number()),
                )
                .into(),
            ]
        }
        Command::WhitelistList => {
            let text = if state.config.allow_list.is_empty() {
                "📭 The allow-list is empty.".to_string()
            } else {
                state
                    .config
                    .allow_list
                    .iter()
                    .map(Identity::number)
                    .collect::<Vec<_>>()
                    .join("\n")
            };
            vec![Reply::new(chat, text).into()]
        }
        Command::Warn { target, reason } => {
            issue_warning(state, chat, &target, &reason, now, |s, n, limit| {
                format!(
                    "⚠️ {} has been warned by the admin. Reason: {reason} (Warning {n}/{limit})",
                    s.mention()
                )
            })
        }
        Command::Unknown(name) => vec![
            Reply::new(chat, format!("❓ Unknown command: !{name}\n\n{HELP_TEXT}")).into(),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::config::ModerationConfig;
    use crate::moderation::ledger::WarningLedger;
    use crate::moderation::types::replies;

    fn chat() -> ChatId {
        ChatId::new("1203@g.us")
    }

    fn target() -> Identity {
        Identity::normalize("923001234567").unwrap()
    }

    fn state() -> ModerationState {
        ModerationState::new(ModerationConfig::default(), WarningLedger::new())
    }

    fn run(state: &mut ModerationState, body: &str) -> Vec<Action> {
        execute(state, &chat(), body, Utc::now())
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(Command::parse("!RULES"), Ok(Command::Rules));
        assert_eq!(Command::parse("!Status  "), Ok(Command::Status));
        assert_eq!(
            Command::parse("!WhiteList ADD 0300-1234567"),
            Ok(Command::WhitelistAdd(target()))
        );
    }

    #[test]
    fn parse_warn_keeps_reason_case() {
        assert_eq!(
            Command::parse("!warn 923001234567 Posting SPAM again"),
            Ok(Command::Warn {
                target: target(),
                reason: "Posting SPAM again".into()
            })
        );
    }

    #[test]
    fn parse_warn_default_reason() {
        match Command::parse("!warn 03001234567") {
            Ok(Command::Warn { reason, .. }) => assert_eq!(reason, DEFAULT_REASON),
            other => panic!("Expected Warn, got {:?}", other),
        }
    }

    #[test]
    fn parse_missing_arguments() {
        assert!(matches!(
            Command::parse("!warn"),
            Err(CommandError::MissingArgument { .. })
        ));
        assert!(matches!(
            Command::parse("!whitelist"),
            Err(CommandError::MissingArgument { .. })
        ));
        assert!(matches!(
            Command::parse("!whitelist add"),
            Err(CommandError::MissingArgument { .. })
        ));
        assert!(matches!(
            Command::parse("!warn someone"),
            Err(CommandError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn unknown_whitelist_option_is_named_in_reply() {
        assert_eq!(
            Command::parse("!whitelist Purge"),
            Err(CommandError::UnknownSubcommand {
                raw: "purge".into(),
                usage: WHITELIST_USAGE,
            })
        );

        let mut state = state();
        let actions = run(&mut state, "!whitelist purge");
        let text = &replies(&actions)[0].text;
        assert!(text.contains("Unknown option 'purge'"));
        assert!(!text.contains("Missing argument"));
        assert_eq!(actions.len(), 1);
    }

    #[test]
    fn rules_replies_with_rules_text() {
        let mut state = state();
        let actions = run(&mut state, "!rules");
        assert_eq!(replies(&actions)[0].text, state.config.rules_text);
    }

    #[test]
    fn status_reports_ledger_size() {
        let mut state = state();
        state.ledger.warn(&target(), "x", Utc::now());
        let actions = run(&mut state, "!status");
        let text = &replies(&actions)[0].text;
        assert!(text.contains("ModBot"));
        assert!(text.contains("Members with warnings: 1"));
    }

    #[test]
    fn warnreset_clears_and_persists() {
        let mut state = state();
        state.ledger.warn(&target(), "x", Utc::now());
        let actions = run(&mut state, "!warnreset");
        assert_eq!(actions[0], Action::PersistWarnings);
        assert!(state.ledger.is_empty());
    }

    #[test]
    fn whitelist_add_twice_keeps_one_entry() {
        let mut state = state();
        let first = run(&mut state, "!whitelist add 0300-1234567");
        assert_eq!(first[0], Action::PersistConfig);

        let second = run(&mut state, "!whitelist add 923001234567");
        assert!(!second.contains(&Action::PersistConfig));
        assert!(replies(&second)[0].text.contains("already in list"));
        assert_eq!(state.config.allow_list, vec![target()]);
    }

    #[test]
    fn whitelist_remove_absent_is_not_an_error() {
        let mut state = state();
        let actions = run(&mut state, "!whitelist remove 923001234567");
        assert_eq!(actions[0], Action::PersistConfig);
        assert!(replies(&actions)[0].text.contains("removed"));
        assert!(state.config.allow_list.is_empty());
    }

    #[test]
    fn whitelist_list() {
        let mut state = state();
        assert!(replies(&run(&mut state, "!whitelist list"))[0].text.contains("empty"));

        run(&mut state, "!whitelist add 923001234567");
        run(&mut state, "!whitelist add 923009999999");
        let actions = run(&mut state, "!whitelist list");
        assert_eq!(replies(&actions)[0].text, "923001234567\n923009999999");
    }

    #[test]
    fn warn_reaching_limit_emits_two_replies() {
        let mut state = state();
        state.ledger.warn(&target(), "earlier", Utc::now());
        state.ledger.warn(&target(), "earlier", Utc::now());

        let actions = run(&mut state, "!warn 923001234567 spam");
        assert_eq!(state.ledger.count_for(&target()), 3);
        assert_eq!(actions[0], Action::PersistWarnings);
        let replies = replies(&actions);
        assert_eq!(replies.len(), 2);
        assert!(replies[0].text.contains("Reason: spam"));
        assert!(replies[1].text.contains("warning limit (3/3)"));
    }

    #[test]
    fn malformed_command_gets_usage_reply() {
        let mut state = state();
        let actions = run(&mut state, "!warn");
        assert_eq!(actions.len(), 1);
        assert!(replies(&actions)[0].text.contains("Usage"));
    }

    #[test]
    fn unknown_command_lists_commands() {
        let mut state = state();
        let actions = run(&mut state, "!dance");
        let text = &replies(&actions)[0].text;
        assert!(text.contains("Unknown command: !dance"));
        assert!(text.contains("!whitelist list"));
    }
}
