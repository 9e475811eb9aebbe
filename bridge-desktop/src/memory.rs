//! In-memory settings store for tests and ephemeral sessions

use async_trait::async_trait;
use bridge_traits::{error::Result, storage::SettingsStore};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

/// Settings store that never touches disk.
///
/// Useful for guest sessions and as a test double when a real round-trip
/// through `SettingsStore` is wanted.
#[derive(Debug, Default)]
pub struct InMemorySettingsStore {
    values: RwLock<BTreeMap<String, String>>,
}

impl InMemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SettingsStore for InMemorySettingsStore {
    async fn set_string(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get_string(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.values.write().await.remove(key);
        Ok(())
    }

    async fn list_keys(&self) -> Result<Vec<String>> {
        Ok(self.values.read().await.keys().cloned().collect())
    }

    async fn clear_all(&self) -> Result<()> {
        self.values.write().await.clear();
        Ok(())
    }
}
