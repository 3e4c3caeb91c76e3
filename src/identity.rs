//! Participant identities and chat scopes.
//!
//! Every phone number that enters the moderator (message senders, command
//! arguments, hand-edited config) is normalized into an [`Identity`] so that
//! `0300-1234567`, `+92 300 1234567` and `923001234567@s.whatsapp.net` all
//! compare equal.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Domain marker appended to every normalized participant address.
pub const USER_DOMAIN: &str = "@s.whatsapp.net";

/// Suffix that marks a group-scoped chat id.
pub const GROUP_DOMAIN: &str = "@g.us";

/// Country code prepended to local-format numbers.
const COUNTRY_CODE: &str = "92";

/// Normalized address of a chat participant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identity(String);

impl Identity {
    /// Normalize a raw number or participant address.
    ///
    /// Keeps digits only, rewrites the local `03xx…` / `3xx…` format to the
    /// international one and appends [`USER_DOMAIN`]. Returns `None` when the
    /// input contains no digits.
    pub fn normalize(raw: &str) -> Option<Self> {
        // Only the local part carries the number; "1234@lid" style suffixes
        // must not leak digits into it.
        let local = raw.split('@').next().unwrap_or(raw);
        let digits: String = local.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() {
            return None;
        }

        let digits = if digits.len() == 11 && digits.starts_with("03") {
            format!("{COUNTRY_CODE}{}", &digits[1..])
        } else if digits.len() == 10 && digits.starts_with('3') {
            format!("{COUNTRY_CODE}{digits}")
        } else {
            digits
        };

        Some(Self(format!("{digits}{USER_DOMAIN}")))
    }

    /// Build from an already international, digits-only number.
    pub(crate) fn from_digits(digits: &str) -> Self {
        Self(format!("{digits}{USER_DOMAIN}"))
    }

    /// Full address, including the domain marker.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Bare number without the domain marker, as used in `@mentions`.
    pub fn number(&self) -> &str {
        self.0.strip_suffix(USER_DOMAIN).unwrap_or(&self.0)
    }

    /// Mention tag for reply texts.
    pub fn mention(&self) -> String {
        format!("@{}", self.number())
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Identity {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::normalize(&value).ok_or_else(|| format!("'{value}' is not a phone number"))
    }
}

impl From<Identity> for String {
    fn from(id: Identity) -> Self {
        id.0
    }
}

/// Chat scope a message was posted in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(String);

impl ChatId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this chat is a group (the only scope the moderator acts in).
    pub fn is_group(&self) -> bool {
        self.0.ends_with(GROUP_DOMAIN)
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
