//! Warning ledger — per-member warning counts, durable across restarts.
//!
//! The ledger itself is plain in-memory state. Durability comes from the
//! engine emitting [`Action::PersistWarnings`](super::types::Action) ahead of
//! any reply that reports a mutation, and the router writing the whole ledger
//! before those replies are queued.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::Identity;

/// Reason recorded when a warning is issued without one.
pub const DEFAULT_REASON: &str = "No reason provided";

/// Warnings accumulated by one member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarningRecord {
    pub subject: Identity,
    pub count: u32,
    pub last_reason: String,
    #[serde(default)]
    pub last_warned_at: Option<DateTime<Utc>>,
}

/// Mapping of member → warning record, keyed by normalized identity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WarningLedger {
    records: BTreeMap<Identity, WarningRecord>,
}

impl WarningLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one warning and return the member's new count.
    pub fn warn(&mut self, subject: &Identity, reason: &str, now: DateTime<Utc>) -> u32 {
        let record = self
            .records
            .entry(subject.clone())
            .or_insert_with(|| WarningRecord {
                subject: subject.clone(),
                count: 0,
                last_reason: String::new(),
                last_warned_at: None,
            });

        record.count = record.count.saturating_add(1);
        record.last_reason = if reason.trim().is_empty() {
            DEFAULT_REASON.to_string()
        } else {
            reason.to_string()
        };
        record.last_warned_at = Some(now);
        record.count
    }

    /// Clear every record.
    pub fn reset(&mut self) {
        self.records.clear();
    }

    /// Current count for `subject`, 0 if never warned.
    pub fn count_for(&self, subject: &Identity) -> u32 {
        self.records.get(subject).map_or(0, |r| r.count)
    }

    pub fn get(&self, subject: &Identity) -> Option<&WarningRecord> {
        self.records.get(subject)
    }

    /// Number of members with a record.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Identity {
        Identity::normalize("923001234567").unwrap()
    }

    #[test]
    fn absent_subject_has_zero() {
        let ledger = WarningLedger::new();
        assert_eq!(ledger.count_for(&alice()), 0);
        assert!(ledger.get(&alice()).is_none());
    }

    #[test]
    fn warn_n_times_counts_n() {
        let mut ledger = WarningLedger::new();
        for n in 1..=5 {
            assert_eq!(ledger.warn(&alice(), "spam", Utc::now()), n);
        }
        assert_eq!(ledger.count_for(&alice()), 5);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn records_last_reason() {
        let mut ledger = WarningLedger::new();
        ledger.warn(&alice(), "Shared link", Utc::now());
        ledger.warn(&alice(), "Flooding messages", Utc::now());
        let record = ledger.get(&alice()).unwrap();
        assert_eq!(record.last_reason, "Flooding messages");
        assert!(record.last_warned_at.is_some());
    }

    #[test]
    fn blank_reason_gets_default() {
        let mut ledger = WarningLedger::new();
        ledger.warn(&alice(), "  ", Utc::now());
        assert_eq!(ledger.get(&alice()).unwrap().last_reason, DEFAULT_REASON);
    }

    #[test]
    fn reset_clears_everyone() {
        let mut ledger = WarningLedger::new();
        let bob = Identity::normalize("923009999999").unwrap();
        ledger.warn(&alice(), "a", Utc::now());
        ledger.warn(&bob, "b", Utc::now());
        ledger.reset();
        assert!(ledger.is_empty());
        assert_eq!(ledger.count_for(&alice()), 0);
        assert_eq!(ledger.count_for(&bob), 0);
    }

    #[test]
    fn serializes_keyed_by_identity() {
        let mut ledger = WarningLedger::new();
        ledger.warn(&alice(), "spam", Utc::now());
        let json = serde_json::to_value(&ledger).unwrap();
        assert_eq!(json["923001234567@s.whatsapp.net"]["count"], 1);

        let back: WarningLedger = serde_json::from_value(json).unwrap();
        assert_eq!(back, ledger);
    }
}
