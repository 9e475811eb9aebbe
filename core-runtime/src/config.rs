//! # Core Configuration Module
//!
//! Provides runtime configuration for the player core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance that holds the host-provided bridges the core depends on. It
//! enforces fail-fast validation so a missing capability is reported at
//! start-up instead of surfacing as lost settings later.
//!
//! ## Required Dependencies
//!
//! - `SettingsStore` - Durable storage for volume, repeat/shuffle mode and
//!   the uploaded-track list
//!
//! ## Optional Dependencies (with defaults)
//!
//! - `UserSession` - Attribution and recently-played hook (default: anonymous)
//! - `Clock` - Event timestamps (default: system clock)
//!
//! When the `desktop-shims` feature is enabled and a `data_dir` is set, a
//! `JsonFileSettingsStore` is injected automatically if no store is provided.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .settings_store(Arc::new(MySettingsStore))
//!     .user_session(Arc::new(MyAccount))
//!     .debug_events(true)
//!     .build()
//!     .expect("Failed to build config");
//! ```
//!
//! ## Error Handling
//!
//! ```should_panic
//! use core_runtime::config::CoreConfig;
//!
//! // No settings store and no data directory to create one in
//! let config = CoreConfig::builder()
//!     .build()
//!     .expect("Should fail - missing settings store");
//! ```

use crate::error::{Error, Result};
use bridge_traits::{AnonymousSession, Clock, SettingsStore, SystemClock, UserSession};
use std::path::PathBuf;
use std::sync::Arc;

/// Default application name used for platform directories.
pub const DEFAULT_APP_NAME: &str = "music-player";

/// Core configuration for the player.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Application name, used for log targets and platform directories
    pub app_name: String,

    /// Directory for durable player data (settings document)
    pub data_dir: Option<PathBuf>,

    /// Durable key-value storage (required)
    pub settings_store: Arc<dyn SettingsStore>,

    /// Signed-in user accessor
    pub user_session: Arc<dyn UserSession>,

    /// Time source for event timestamps
    pub clock: Arc<dyn Clock>,

    /// Log every event publish at debug level
    pub debug_events: bool,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("app_name", &self.app_name)
            .field("data_dir", &self.data_dir)
            .field("settings_store", &"SettingsStore { ... }")
            .field("user_session", &"UserSession { ... }")
            .field("clock", &"Clock { ... }")
            .field("debug_events", &self.debug_events)
            .finish()
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.app_name.trim().is_empty() {
            return Err(Error::Config("Application name cannot be empty".to_string()));
        }

        if let Some(dir) = &self.data_dir {
            if dir.as_os_str().is_empty() {
                return Err(Error::Config("Data directory cannot be empty".to_string()));
            }
        }

        Ok(())
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn settings_store_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "SettingsStore".to_string(),
        message: "SettingsStore implementation is required for player preferences. \
                 Desktop: enable the 'desktop-shims' feature and set a data_dir to use JsonFileSettingsStore. \
                 Mobile: inject platform-native settings (UserDefaults/DataStore)."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_settings_store(data_dir: Option<&PathBuf>) -> Result<Arc<dyn SettingsStore>> {
    use bridge_desktop::JsonFileSettingsStore;
    use std::thread;
    use tokio::runtime::{Builder, Handle};

    let dir = data_dir.cloned().ok_or_else(|| Error::CapabilityMissing {
        capability: "SettingsStore".to_string(),
        message: "No SettingsStore provided and no data_dir to create the default \
                 JsonFileSettingsStore in. Call .data_dir() or .settings_store()."
            .to_string(),
    })?;

    let init_store = |dir: PathBuf| -> Result<JsonFileSettingsStore> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| {
                Error::Internal(format!(
                    "Failed to create Tokio runtime for default settings store: {}",
                    e
                ))
            })?;

        Ok(runtime.block_on(JsonFileSettingsStore::in_dir(&dir))?)
    };

    // block_on panics inside a runtime, so hop to a plain thread there.
    let store = match Handle::try_current() {
        Ok(_) => thread::spawn(move || init_store(dir))
            .join()
            .map_err(|_| {
                Error::Internal(
                    "Worker thread panicked while creating default SettingsStore".to_string(),
                )
            })??,
        Err(_) => init_store(dir)?,
    };

    let store: Arc<dyn SettingsStore> = Arc::new(store);
    Ok(store)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_settings_store(_data_dir: Option<&PathBuf>) -> Result<Arc<dyn SettingsStore>> {
    Err(settings_store_missing_error())
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    app_name: Option<String>,
    data_dir: Option<PathBuf>,
    settings_store: Option<Arc<dyn SettingsStore>>,
    user_session: Option<Arc<dyn UserSession>>,
    clock: Option<Arc<dyn Clock>>,
    debug_events: bool,
}

impl CoreConfigBuilder {
    /// Sets the application name.
    ///
    /// Default: [`DEFAULT_APP_NAME`]
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = Some(name.into());
        self
    }

    /// Sets the data directory.
    ///
    /// # Examples
    ///
    /// ```
    /// use core_runtime::config::CoreConfig;
    ///
    /// let builder = CoreConfig::builder()
    ///     .data_dir("/path/to/player");
    /// ```
    pub fn data_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.data_dir = Some(path.into());
        self
    }

    /// Sets the settings store implementation (required unless the
    /// desktop default can be created).
    pub fn settings_store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.settings_store = Some(store);
        self
    }

    /// Sets the user session accessor.
    ///
    /// If not provided, plays are attributed anonymously.
    pub fn user_session(mut self, session: Arc<dyn UserSession>) -> Self {
        self.user_session = Some(session);
        self
    }

    /// Sets the clock used to timestamp events.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Enables or disables verbose logging of every event publish.
    ///
    /// Default: false
    pub fn debug_events(mut self, enabled: bool) -> Self {
        self.debug_events = enabled;
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// # Errors
    ///
    /// - `Error::CapabilityMissing` if no settings store is available
    /// - `Error::Config` if a value is invalid
    pub fn build(self) -> Result<CoreConfig> {
        let settings_store = match self.settings_store {
            Some(store) => store,
            None => provide_default_settings_store(self.data_dir.as_ref())?,
        };

        let config = CoreConfig {
            app_name: self
                .app_name
                .unwrap_or_else(|| DEFAULT_APP_NAME.to_string()),
            data_dir: self.data_dir,
            settings_store,
            user_session: self
                .user_session
                .unwrap_or_else(|| Arc::new(AnonymousSession)),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            debug_events: self.debug_events,
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::BridgeError;

    struct MockSettingsStore;

    #[async_trait]
    impl SettingsStore for MockSettingsStore {
        async fn set_string(
            &self,
            _key: &str,
            _value: &str,
        ) -> std::result::Result<(), BridgeError> {
            Ok(())
        }

        async fn get_string(&self, _key: &str) -> std::result::Result<Option<String>, BridgeError> {
            Ok(None)
        }

        async fn delete(&self, _key: &str) -> std::result::Result<(), BridgeError> {
            Ok(())
        }

        async fn list_keys(&self) -> std::result::Result<Vec<String>, BridgeError> {
            Ok(Vec::new())
        }

        async fn clear_all(&self) -> std::result::Result<(), BridgeError> {
            Ok(())
        }
    }

    struct NamedUser;

    impl UserSession for NamedUser {
        fn current_user_id(&self) -> Option<String> {
            Some("user-1".to_string())
        }

        fn add_to_recently_played(&self, _track_id: &str) {}
    }

    #[test]
    fn test_builder_with_settings_store() {
        let config = CoreConfig::builder()
            .settings_store(Arc::new(MockSettingsStore))
            .build()
            .unwrap();

        assert_eq!(config.app_name, DEFAULT_APP_NAME);
        assert!(config.data_dir.is_none());
        assert!(!config.debug_events);
        assert_eq!(config.user_session.current_user_id(), None);
    }

    #[test]
    fn test_builder_all_options() {
        let config = CoreConfig::builder()
            .app_name("tidal-pool")
            .data_dir("/tmp/tidal-pool")
            .settings_store(Arc::new(MockSettingsStore))
            .user_session(Arc::new(NamedUser))
            .debug_events(true)
            .build()
            .unwrap();

        assert_eq!(config.app_name, "tidal-pool");
        assert_eq!(config.data_dir, Some(PathBuf::from("/tmp/tidal-pool")));
        assert!(config.debug_events);
        assert_eq!(
            config.user_session.current_user_id(),
            Some("user-1".to_string())
        );
    }

    #[test]
    fn test_empty_app_name_rejected() {
        let err = CoreConfig::builder()
            .app_name("  ")
            .settings_store(Arc::new(MockSettingsStore))
            .build()
            .unwrap_err();

        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_missing_settings_store_without_data_dir() {
        let err = CoreConfig::builder().build().unwrap_err();
        assert!(matches!(err, Error::CapabilityMissing { .. }));
    }

    #[cfg(feature = "desktop-shims")]
    #[test]
    fn test_default_settings_store_created_in_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = CoreConfig::builder()
            .data_dir(dir.path())
            .build()
            .unwrap();

        assert_eq!(config.data_dir.as_deref(), Some(dir.path()));
    }

    #[test]
    fn test_debug_output_hides_bridges() {
        let config = CoreConfig::builder()
            .settings_store(Arc::new(MockSettingsStore))
            .build()
            .unwrap();

        let output = format!("{:?}", config);
        assert!(output.contains("SettingsStore { ... }"));
        assert!(output.contains("debug_events"));
    }
}
