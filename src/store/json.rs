//! JSON-file backend.
//!
//! `config.json` is pretty-printed so it can be edited by hand. Writes go to
//! a sibling `.tmp` file that is renamed over the target, so a crash mid-write
//! leaves the previous version intact.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::config::{ModerationConfig, RuntimeConfig};
use crate::error::StoreError;
use crate::moderation::WarningLedger;
use crate::store::StateStore;

/// Stores config and warnings as two JSON files.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    config_path: PathBuf,
    warnings_path: PathBuf,
}

impl JsonFileStore {
    pub fn new(config_path: impl Into<PathBuf>, warnings_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            warnings_path: warnings_path.into(),
        }
    }

    pub fn from_runtime(runtime: &RuntimeConfig) -> Self {
        Self::new(&runtime.config_path, &runtime.warnings_path)
    }

    /// Both files in `dir`, with their default names.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join("config.json"), dir.join("warnings.json"))
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn warnings_path(&self) -> &Path {
        &self.warnings_path
    }
}

#[async_trait]
impl StateStore for JsonFileStore {
    async fn load_config(&self) -> Result<Option<ModerationConfig>, StoreError> {
        let Some(config) = read_json::<ModerationConfig>(&self.config_path).await? else {
            return Ok(None);
        };
        config.validate()?;
        Ok(Some(config))
    }

    async fn save_config(&self, config: &ModerationConfig) -> Result<(), StoreError> {
        write_json(&self.config_path, config).await
    }

    async fn load_warnings(&self) -> Result<WarningLedger, StoreError> {
        Ok(read_json(&self.warnings_path).await?.unwrap_or_default())
    }

    async fn save_warnings(&self, ledger: &WarningLedger) -> Result<(), StoreError> {
        write_json(&self.warnings_path, ledger).await
    }
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let raw = match fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(StoreError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|e| StoreError::Corrupt {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(value)?;
    let write_err = |source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    // The temp file must be on disk before it replaces the old state.
    let mut file = fs::File::create(&tmp).await.map_err(write_err)?;
    file.write_all(json.as_bytes()).await.map_err(write_err)?;
    file.sync_all().await.map_err(write_err)?;
    drop(file);
    fs::rename(&tmp, path).await.map_err(write_err)?;

    debug!(path = %path.display(), "State file written");
    Ok(())
}
