//! Bootstrapping the core service and observing the player through it.

use bridge_desktop::InMemorySettingsStore;
use bridge_traits::{FixedClock, SettingsStore, UserSession};
use chrono::{TimeZone, Utc};
use core_playback::{PlayerConfig, RepeatMode, Track};
use core_runtime::config::CoreConfig;
use core_runtime::events::EventType;
use core_service::{CoreError, CoreService, NotificationKind};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct TestAccount {
    user_id: Mutex<Option<String>>,
    recently_played: Mutex<Vec<String>>,
}

impl TestAccount {
    fn signed_in(id: &str) -> Self {
        Self {
            user_id: Mutex::new(Some(id.to_string())),
            ..Default::default()
        }
    }
}

impl UserSession for TestAccount {
    fn current_user_id(&self) -> Option<String> {
        self.user_id.lock().unwrap().clone()
    }

    fn add_to_recently_played(&self, track_id: &str) {
        self.recently_played.lock().unwrap().push(track_id.to_string());
    }
}

fn track(id: &str) -> Track {
    Track::new(id, format!("Song {}", id), "Artist").with_duration(180.0)
}

fn config(store: Arc<dyn SettingsStore>, account: Arc<TestAccount>) -> CoreConfig {
    let now = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
    CoreConfig::builder()
        .app_name("test-player")
        .settings_store(store)
        .user_session(account)
        .clock(Arc::new(FixedClock(now)))
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_plays_feed_recently_played() {
    let store: Arc<dyn SettingsStore> = Arc::new(InMemorySettingsStore::new());
    let account = Arc::new(TestAccount::signed_in("listener-1"));
    let mut core = CoreService::new(config(store, Arc::clone(&account)), PlayerConfig::default())
        .await
        .unwrap();

    let player = core.player_mut();
    player.play_queue(vec![track("a"), track("b")]);
    player.toggle_play();
    player.toggle_play();
    player.play_next();
    player.play_previous();

    assert_eq!(
        *account.recently_played.lock().unwrap(),
        vec!["a", "b", "a"]
    );

    core.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_events_are_attributed_and_timestamped() {
    let store: Arc<dyn SettingsStore> = Arc::new(InMemorySettingsStore::new());
    let account = Arc::new(TestAccount::signed_in("listener-1"));
    let mut core = CoreService::new(config(store, Arc::clone(&account)), PlayerConfig::default())
        .await
        .unwrap();

    let mut stream = core.events().stream(EventType::TrackPlay);
    core.player_mut().play_track(track("a"));

    let event = stream.try_recv().unwrap();
    assert_eq!(event.user_id.as_deref(), Some("listener-1"));
    assert_eq!(event.timestamp, Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap());

    core.set_user(None);
    core.player_mut().play_track(track("b"));
    assert_eq!(stream.try_recv().unwrap().user_id, None);

    *account.user_id.lock().unwrap() = Some("listener-2".to_string());
    core.refresh_user();
    core.player_mut().play_track(track("c"));
    assert_eq!(
        stream.try_recv().unwrap().user_id.as_deref(),
        Some("listener-2")
    );

    drop(stream);
    core.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_uploads_produce_notifications() {
    let store: Arc<dyn SettingsStore> = Arc::new(InMemorySettingsStore::new());
    let mut core = CoreService::new(
        config(store, Arc::new(TestAccount::default())),
        PlayerConfig::default(),
    )
    .await
    .unwrap();

    core.player_mut().add_uploaded_track(track("u1"));

    let notifications = core.notifications().notifications();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].kind, NotificationKind::Upload);
    assert_eq!(core.notifications().unread_count(), 1);

    core.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_settings_survive_restart() {
    let store: Arc<dyn SettingsStore> = Arc::new(InMemorySettingsStore::new());
    let account = Arc::new(TestAccount::default());

    let mut first = CoreService::new(
        config(Arc::clone(&store), Arc::clone(&account)),
        PlayerConfig::default(),
    )
    .await
    .unwrap();
    first.player_mut().set_volume(0.3);
    first.player_mut().toggle_repeat();
    first.player_mut().add_uploaded_track(track("u1"));
    first.player_mut().play_track(track("a"));
    first.shutdown().await.unwrap();

    let second = CoreService::new(config(store, account), PlayerConfig::default())
        .await
        .unwrap();
    let state = second.player().state();
    assert_eq!(state.volume, 0.3);
    assert_eq!(state.repeat_mode, RepeatMode::All);
    assert_eq!(state.uploaded_tracks.len(), 1);
    assert!(state.current_track.is_none());

    second.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_invalid_player_config_is_rejected() {
    let store: Arc<dyn SettingsStore> = Arc::new(InMemorySettingsStore::new());
    let player_config = PlayerConfig {
        waveform_points: 0,
        ..PlayerConfig::default()
    };

    let result = CoreService::new(config(store, Arc::new(TestAccount::default())), player_config).await;

    assert!(matches!(result, Err(CoreError::Playback(_))));
}

#[tokio::test]
async fn test_bootstrap_desktop_uses_data_dir() {
    let dir = tempfile::tempdir().unwrap();

    let mut core = core_service::bootstrap_desktop(dir.path()).await.unwrap();
    core.player_mut().set_volume(0.65);
    core.shutdown().await.unwrap();

    let contents = std::fs::read_to_string(dir.path().join("settings.json")).unwrap();
    assert!(contents.contains("player-storage"));

    let core = core_service::bootstrap_desktop(dir.path()).await.unwrap();
    assert_eq!(core.player().state().volume, 0.65);
    core.shutdown().await.unwrap();
}
