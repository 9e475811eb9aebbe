//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (settings storage,
//! user session, clock) into the player core. It constructs the event bus,
//! rehydrates the persisted player settings, starts the persistence writer
//! and attaches the built-in subscribers:
//!
//! - [`RecentlyPlayedRecorder`] feeds the user's recently-played list
//! - [`NotificationCenter`] derives upload and play-milestone notifications
//! - [`TracingSink`] logs every event under the `analytics` target
//!
//! Desktop apps typically enable the `desktop-shims` feature and call
//! [`bootstrap_desktop`], which stores settings in a JSON document.

pub mod error;
pub mod notifications;
pub mod recently_played;

pub use error::{CoreError, Result};
pub use notifications::{Notification, NotificationCenter, NotificationKind};
pub use recently_played::RecentlyPlayedRecorder;

use std::sync::Arc;

use bridge_traits::UserSession;
use core_playback::{
    load_persisted_state, PersistenceHandle, PersistenceWriter, PlaybackSessionManager,
    PlayerConfig,
};
use core_runtime::config::CoreConfig;
use core_runtime::events::{EventBus, EventFilter, Subscription, TracingSink};
use core_runtime::logging::redact_if_sensitive;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Primary façade exposed to host applications.
///
/// Owns the playback session manager; the host drives it through
/// [`player_mut`](Self::player_mut) from its UI thread.
pub struct CoreService {
    app_name: String,
    events: EventBus,
    player: PlaybackSessionManager,
    notifications: NotificationCenter,
    user_session: Arc<dyn UserSession>,
    recently_played: RecentlyPlayedRecorder,
    subscriptions: Vec<Subscription>,
    writer: JoinHandle<()>,
}

impl CoreService {
    /// Build the service from runtime and player configuration.
    ///
    /// Must be called from within a tokio runtime; the persistence writer
    /// is spawned onto it.
    ///
    /// # Errors
    ///
    /// Fails if either configuration is invalid or the settings store
    /// cannot be read. A corrupt settings document is not an error.
    pub async fn new(config: CoreConfig, player_config: PlayerConfig) -> Result<Self> {
        config.validate()?;
        player_config.ensure_valid()?;

        let events = EventBus::with_clock(Arc::clone(&config.clock));
        events.set_debug_mode(config.debug_events);
        events.set_user_id(config.user_session.current_user_id());

        let persisted =
            load_persisted_state(config.settings_store.as_ref(), &player_config.settings_key)
                .await?;

        let (handle, receiver) = PersistenceHandle::channel();
        let writer = PersistenceWriter::new(
            Arc::clone(&config.settings_store),
            player_config.settings_key.clone(),
            receiver,
        )
        .spawn();

        let mut player =
            PlaybackSessionManager::new(player_config, events.clone())?.with_persistence(handle);
        if let Some(state) = persisted {
            player.restore(state);
        }

        let notifications = NotificationCenter::new();
        let recently_played =
            RecentlyPlayedRecorder::attach(&events, Arc::clone(&config.user_session));
        let subscriptions = vec![
            notifications.attach(&events),
            events.subscribe_sink(EventFilter::All, Arc::new(TracingSink)),
        ];

        let user = events
            .user_id()
            .map(|id| redact_if_sensitive("user_id", &id))
            .unwrap_or_else(|| "anonymous".to_string());
        info!(
            app = %config.app_name,
            user = %user,
            subscribers = events.subscriber_count(),
            "Core service started"
        );

        Ok(Self {
            app_name: config.app_name,
            events,
            player,
            notifications,
            user_session: config.user_session,
            recently_played,
            subscriptions,
            writer,
        })
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// The event bus every player action is published on.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn player(&self) -> &PlaybackSessionManager {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut PlaybackSessionManager {
        &mut self.player
    }

    pub fn notifications(&self) -> &NotificationCenter {
        &self.notifications
    }

    /// Change the user subsequent events are attributed to.
    pub fn set_user(&self, user_id: Option<String>) {
        debug!(signed_in = user_id.is_some(), "Attribution context changed");
        self.events.set_user_id(user_id);
    }

    /// Re-read the user from the injected session, e.g. after sign-in.
    pub fn refresh_user(&self) {
        self.set_user(self.user_session.current_user_id());
    }

    /// Detach subscribers and wait for pending settings to be written.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::ShutdownFailed` if the writer task panicked.
    pub async fn shutdown(self) -> Result<()> {
        let Self {
            player,
            recently_played,
            subscriptions,
            writer,
            ..
        } = self;

        recently_played.detach();
        for subscription in subscriptions {
            subscription.unsubscribe();
        }

        // Last persistence handle goes with the manager; the writer then
        // drains what is left and exits.
        drop(player);
        writer
            .await
            .map_err(|e| CoreError::ShutdownFailed(format!("persistence writer: {}", e)))?;

        info!("Core service stopped");
        Ok(())
    }
}

/// Convenience bootstrapper for desktop hosts.
///
/// Settings are kept in `settings.json` under `data_dir`.
///
/// ```no_run
/// # #[cfg(feature = "desktop-shims")]
/// # async fn example() -> core_service::Result<()> {
/// let mut core = core_service::bootstrap_desktop("/tmp/my-player").await?;
/// core.player_mut().set_volume(0.5);
/// core.shutdown().await?;
/// # Ok(())
/// # }
/// ```
#[cfg(feature = "desktop-shims")]
pub async fn bootstrap_desktop(data_dir: impl Into<std::path::PathBuf>) -> Result<CoreService> {
    let data_dir = data_dir.into();
    let store = bridge_desktop::JsonFileSettingsStore::in_dir(&data_dir).await?;

    let config = CoreConfig::builder()
        .data_dir(data_dir)
        .settings_store(Arc::new(store))
        .build()?;

    CoreService::new(config, PlayerConfig::default()).await
}
