//! Persistence layer — config and warning ledger.

pub mod json;
pub mod traits;

pub use json::JsonFileStore;
pub use traits::StateStore;

use tracing::info;

use crate::config::ModerationConfig;
use crate::error::StoreError;

/// Load the stored config, writing the defaults on first start.
pub async fn load_or_init_config(store: &dyn StateStore) -> Result<ModerationConfig, StoreError> {
    if let Some(config) = store.load_config().await? {
        return Ok(config);
    }

    let config = ModerationConfig::default();
    store.save_config(&config).await?;
    info!("No config found, wrote defaults");
    Ok(config)
}
