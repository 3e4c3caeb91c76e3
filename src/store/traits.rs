//! Backend-agnostic persistence for moderation state.

use async_trait::async_trait;

use crate::config::ModerationConfig;
use crate::error::StoreError;
use crate::moderation::WarningLedger;

/// Durable storage for the moderation config and warning ledger.
///
/// Both are rewritten wholesale on every save. A returned `Ok` means the
/// state is durable.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the stored config, `None` if nothing has been stored yet.
    async fn load_config(&self) -> Result<Option<ModerationConfig>, StoreError>;

    async fn save_config(&self, config: &ModerationConfig) -> Result<(), StoreError>;

    /// Load the warning ledger; empty if nothing has been stored yet.
    async fn load_warnings(&self) -> Result<WarningLedger, StoreError>;

    async fn save_warnings(&self, ledger: &WarningLedger) -> Result<(), StoreError>;
}
