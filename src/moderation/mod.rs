//! Moderation decision engine.
//!
//! Every inbound event flows through:
//! 1. `engine::handle()` — membership greetings or the text pipeline
//! 2. `pipeline::evaluate()` — flood, quiet hours, links, commands
//! 3. `commands::execute()` — owner commands mutating config and ledger
//!
//! The result is an ordered list of [`Action`]s. Nothing here performs I/O.

pub mod commands;
pub mod engine;
pub mod ledger;
pub mod pipeline;
pub mod rate;
pub mod types;

pub use engine::{ModerationState, handle};
pub use ledger::{WarningLedger, WarningRecord};
pub use rate::RateTracker;
pub use types::{Action, InboundEvent, MembershipChange, MembershipKind, Reply, TextMessage};
