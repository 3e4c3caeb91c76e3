//! Error types for modbot.

use std::path::PathBuf;

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Persistence errors for config and warning state.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt state file {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid stored configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
}

/// Transport-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Failed to send message on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },

    #[error("Invalid event format: {0}")]
    InvalidEvent(String),
}

/// Failures while routing a single event.
///
/// These never stop the router; they are logged and the next event is
/// processed against the restored state.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error("Persisting state for event in {chat} failed: {source}")]
    Persist {
        chat: String,
        #[source]
        source: StoreError,
    },

    #[error("Policy evaluation panicked for event in {chat}: {message}")]
    Panicked { chat: String, message: String },

    #[error("Delivery queue closed")]
    DeliveryClosed,
}
