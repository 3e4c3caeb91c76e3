//! Sliding-window message counter per sender.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Duration, Utc};

use crate::identity::Identity;

/// Per-sender message timestamps.
///
/// Every `record` sweeps all windows and forgets senders with nothing left
/// in theirs; there is no background task.
#[derive(Debug, Clone, Default)]
pub struct RateTracker {
    windows: HashMap<Identity, VecDeque<DateTime<Utc>>>,
}

impl RateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message at `now` and return how many messages `subject` sent
    /// within `window`, this one included.
    pub fn record(&mut self, subject: &Identity, now: DateTime<Utc>, window: Duration) -> usize {
        self.windows.retain(|id, timestamps| {
            evict(timestamps, now, window);
            id == subject || !timestamps.is_empty()
        });
        let timestamps = self.windows.entry(subject.clone()).or_default();
        timestamps.push_back(now);
        timestamps.len()
    }

    /// Number of senders with a tracked window.
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

/// Drop every timestamp at least `window` old.
fn evict(timestamps: &mut VecDeque<DateTime<Utc>>, now: DateTime<Utc>, window: Duration) {
    timestamps.retain(|t| now.signed_duration_since(*t) < window);
}
