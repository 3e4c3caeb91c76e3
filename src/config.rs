//! Configuration types.
//!
//! [`ModerationConfig`] is the policy the moderator enforces. It lives in a
//! human-editable JSON file, is reloaded at startup and rewritten wholesale
//! whenever an owner command changes it. [`RuntimeConfig`] holds
//! process-level settings read from the environment.

use std::path::PathBuf;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::identity::Identity;

const DEFAULT_RULES_TEXT: &str = "📌 Group Rules:\n\
✅ No one, except the admins, can share links.\n\
✅ Avoid off-topic conversations in the chat.\n\
✅ Behave respectfully; misbehavior is not allowed.\n\
✅ Do not send private messages to anyone without their permission.\n\
✅ Share only study-related content like assignments, quizzes and past papers.";

const DEFAULT_WELCOME_TEXT: &str =
    "🎓 Welcome {user} to {group}!\n\nPlease read the group rules by typing: !rules";

/// Longest flood window a config may ask for.
pub const MAX_FLOOD_WINDOW_SECONDS: u64 = 24 * 60 * 60;

const DEFAULT_QUIET_REMINDER: &str =
    "🌙 Quiet hours are in effect. Please hold your messages until the morning.";

/// Moderation policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModerationConfig {
    /// The only identity allowed to issue `!` commands.
    pub owner: Identity,
    pub bot_name: String,
    pub group_name: String,
    pub rules_text: String,
    /// Warning count at which the limit-reached notice is emitted.
    pub warn_limit: u32,
    /// Warn non-exempt members as soon as they post a link.
    pub instant_warn_on_link: bool,
    pub flood_control: FloodControl,
    pub quiet_hours: QuietHours,
    /// Identities exempt from quiet hours and link warnings.
    pub allow_list: Vec<Identity>,
    /// Welcome template; `{user}` and `{group}` are substituted.
    pub welcome_text: String,
    /// Goodbye template; departures are only logged when unset.
    pub goodbye_text: Option<String>,
    /// Phrase that makes the bot confirm it is alive; disabled when unset.
    pub probe_phrase: Option<String>,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            owner: Identity::from_digits("923000000000"),
            bot_name: "ModBot".to_string(),
            group_name: "Study Group".to_string(),
            rules_text: DEFAULT_RULES_TEXT.to_string(),
            warn_limit: 3,
            instant_warn_on_link: true,
            flood_control: FloodControl::default(),
            quiet_hours: QuietHours::default(),
            allow_list: Vec::new(),
            welcome_text: DEFAULT_WELCOME_TEXT.to_string(),
            goodbye_text: None,
            probe_phrase: Some("bot test".to_string()),
        }
    }
}

impl ModerationConfig {
    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.warn_limit == 0 {
            return Err(invalid("warn_limit", "must be at least 1"));
        }
        if self.flood_control.max_messages_per_window == 0 {
            return Err(invalid(
                "flood_control.max_messages_per_window",
                "must be at least 1",
            ));
        }
        if self.flood_control.window_seconds == 0 {
            return Err(invalid("flood_control.window_seconds", "must be at least 1"));
        }
        if self.flood_control.window_seconds > MAX_FLOOD_WINDOW_SECONDS {
            return Err(invalid(
                "flood_control.window_seconds",
                "must be at most 86400 (one day)",
            ));
        }
        if self.quiet_hours.start_hour > 23 {
            return Err(invalid("quiet_hours.start_hour", "must be between 0 and 23"));
        }
        if self.quiet_hours.end_hour > 23 {
            return Err(invalid("quiet_hours.end_hour", "must be between 0 and 23"));
        }
        Ok(())
    }

    /// Whether `id` is exempt from quiet hours and link warnings.
    pub fn is_exempt(&self, id: &Identity) -> bool {
        *id == self.owner || self.is_allowed(id)
    }

    pub fn is_allowed(&self, id: &Identity) -> bool {
        self.allow_list.contains(id)
    }

    /// Append to the allow-list. Returns `false` if already present.
    pub fn allow(&mut self, id: Identity) -> bool {
        if self.is_allowed(&id) {
            return false;
        }
        self.allow_list.push(id);
        true
    }

    /// Remove from the allow-list. Returns whether an entry was removed.
    pub fn disallow(&mut self, id: &Identity) -> bool {
        let before = self.allow_list.len();
        self.allow_list.retain(|entry| entry != id);
        self.allow_list.len() != before
    }
}

fn invalid(key: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    }
}

/// Sliding-window flood limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FloodControl {
    pub enabled: bool,
    pub max_messages_per_window: usize,
    pub window_seconds: u64,
}

impl Default for FloodControl {
    fn default() -> Self {
        Self {
            enabled: true,
            max_messages_per_window: 6,
            window_seconds: 10,
        }
    }
}

impl FloodControl {
    /// Window length. Saturates rather than overflowing for values that
    /// `validate` would reject.
    pub fn window(&self) -> chrono::Duration {
        i64::try_from(self.window_seconds)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX)
    }
}

/// Local-time window during which regular members get a reminder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuietHours {
    pub enabled: bool,
    pub start_hour: u32,
    pub end_hour: u32,
    /// IANA timezone the hours are expressed in.
    pub timezone: Tz,
    pub reminder_text: String,
}

impl Default for QuietHours {
    fn default() -> Self {
        Self {
            enabled: true,
            start_hour: 0,
            end_hour: 5,
            timezone: chrono_tz::Asia::Karachi,
            reminder_text: DEFAULT_QUIET_REMINDER.to_string(),
        }
    }
}

impl QuietHours {
    /// Whether `hour` falls inside the window.
    ///
    /// `start <= end` is the half-open range `[start, end)`; otherwise the
    /// window wraps past midnight.
    pub fn contains(&self, hour: u32) -> bool {
        hour_in_window(self.start_hour, self.end_hour, hour)
    }
}

pub fn hour_in_window(start: u32, end: u32, hour: u32) -> bool {
    if start <= end {
        hour >= start && hour < end
    } else {
        hour >= start || hour < end
    }
}

/// Process-level settings, built from environment variables.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub data_dir: PathBuf,
    pub config_path: PathBuf,
    pub warnings_path: PathBuf,
}

impl RuntimeConfig {
    /// Read `MODBOT_DATA_DIR`, `MODBOT_CONFIG_PATH` and `MODBOT_WARNINGS_PATH`.
    pub fn from_env() -> Self {
        let data_dir = std::env::var("MODBOT_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data"));

        let config_path = std::env::var("MODBOT_CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("config.json"));

        let warnings_path = std::env::var("MODBOT_WARNINGS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("warnings.json"));

        Self {
            data_dir,
            config_path,
            warnings_path,
        }
    }
}
