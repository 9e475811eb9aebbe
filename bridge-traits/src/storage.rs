//! Storage Abstractions
//!
//! Provides the platform-agnostic key-value settings trait the player uses
//! to persist its durable fields.

use async_trait::async_trait;

use crate::error::Result;

/// Key-value settings storage trait
///
/// Abstracts platform-specific preferences/settings storage:
/// - iOS: UserDefaults
/// - Android: SharedPreferences / DataStore
/// - Desktop: Config files or OS-specific preferences
/// - Web: localStorage / IndexedDB
///
/// Values are opaque strings. Callers that need structured data serialize it
/// themselves (the player stores one JSON document under a fixed key).
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::SettingsStore;
///
/// async fn save_preference(store: &dyn SettingsStore) -> Result<()> {
///     store.set_string("theme", "dark").await?;
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Store a string value, replacing any previous value
    async fn set_string(&self, key: &str, value: &str) -> Result<()>;

    /// Retrieve a string value
    ///
    /// Returns `Ok(None)` if the key has never been written (first run).
    async fn get_string(&self, key: &str) -> Result<Option<String>>;

    /// Delete a setting
    ///
    /// Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Check if a setting exists
    async fn has_key(&self, key: &str) -> Result<bool> {
        Ok(self.get_string(key).await?.is_some())
    }

    /// List all setting keys
    async fn list_keys(&self) -> Result<Vec<String>>;

    /// Clear all settings
    async fn clear_all(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MapStore {
        values: Mutex<HashMap<String, String>>,
    }

    #[async_trait]
    impl SettingsStore for MapStore {
        async fn set_string(&self, key: &str, value: &str) -> Result<()> {
            self.values
                .lock()
                .unwrap()
                .insert(key.to_string(), value.to_string());
            Ok(())
        }

        async fn get_string(&self, key: &str) -> Result<Option<String>> {
            Ok(self.values.lock().unwrap().get(key).cloned())
        }

        async fn delete(&self, key: &str) -> Result<()> {
            self.values.lock().unwrap().remove(key);
            Ok(())
        }

        async fn list_keys(&self) -> Result<Vec<String>> {
            Ok(self.values.lock().unwrap().keys().cloned().collect())
        }

        async fn clear_all(&self) -> Result<()> {
            self.values.lock().unwrap().clear();
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_has_key_default_uses_get_string() {
        let store = MapStore::default();
        assert!(!store.has_key("volume").await.unwrap());

        store.set_string("volume", "0.5").await.unwrap();
        assert!(store.has_key("volume").await.unwrap());

        store.delete("volume").await.unwrap();
        assert!(!store.has_key("volume").await.unwrap());
    }
}
