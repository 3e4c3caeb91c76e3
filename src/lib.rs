//! modbot — automated moderator for group chats.

pub mod channels;
pub mod config;
pub mod error;
pub mod identity;
pub mod moderation;
pub mod router;
pub mod store;
