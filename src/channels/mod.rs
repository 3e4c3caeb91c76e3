//! Transport abstraction and reply delivery.

pub mod channel;
pub mod cli;
pub mod delivery;

pub use channel::*;
pub use cli::CliTransport;
pub use delivery::{DeliveryQueue, spawn_delivery_task};
