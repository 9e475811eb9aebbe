//! Settings storage backed by a single JSON document on disk

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::SettingsStore,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};

const SETTINGS_FILE_NAME: &str = "settings.json";

/// File-backed settings store implementation
///
/// Keeps every key in memory and rewrites the whole document on each
/// mutation. Writes go to a sibling temp file first and are then renamed
/// over the target so a crash never leaves a half-written document behind.
pub struct JsonFileSettingsStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl JsonFileSettingsStore {
    /// Open (or create) a settings document at the given path
    ///
    /// A missing file is treated as an empty store. A file that exists but
    /// does not parse is logged and replaced on the next write.
    pub async fn new(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(BridgeError::Io)?;
        }

        let values = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(values) => values,
                Err(e) => {
                    warn!(path = ?path, error = %e, "Settings file is corrupt, starting empty");
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(BridgeError::Io(e)),
        };

        debug!(path = ?path, keys = values.len(), "Initialized settings store");

        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    /// Open the settings document inside a data directory
    pub async fn in_dir(dir: &Path) -> Result<Self> {
        Self::new(dir.join(SETTINGS_FILE_NAME)).await
    }

    /// Open the settings document in the platform config directory
    pub async fn default_location(app_name: &str) -> Result<Self> {
        let base = dirs::config_dir().ok_or_else(|| {
            BridgeError::NotAvailable("No platform config directory".to_string())
        })?;
        Self::in_dir(&base.join(app_name)).await
    }

    /// Location of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn flush(&self, values: &BTreeMap<String, String>) -> Result<()> {
        let json = serde_json::to_string_pretty(values)?;
        let tmp = self.path.with_extension("json.tmp");

        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        debug!(keys = values.len(), "Flushed settings");
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for JsonFileSettingsStore {
    async fn set_string(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self.values.lock().await;
        values.insert(key.to_string(), value.to_string());
        self.flush(&values).await
    }

    async fn get_string(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.lock().await.get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut values = self.values.lock().await;
        if values.remove(key).is_some() {
            self.flush(&values).await?;
            debug!(key = key, "Deleted setting");
        }
        Ok(())
    }

    async fn has_key(&self, key: &str) -> Result<bool> {
        Ok(self.values.lock().await.contains_key(key))
    }

    async fn list_keys(&self) -> Result<Vec<String>> {
        Ok(self.values.lock().await.keys().cloned().collect())
    }

    async fn clear_all(&self) -> Result<()> {
        let mut values = self.values.lock().await;
        values.clear();
        self.flush(&values).await?;

        debug!("Cleared all settings");
        Ok(())
    }
}
