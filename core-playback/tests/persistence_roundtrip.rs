//! Persisted player state survives a restart; transient state does not.

use bridge_desktop::{InMemorySettingsStore, JsonFileSettingsStore};
use bridge_traits::SettingsStore;
use core_playback::{
    load_persisted_state, PersistenceHandle, PersistenceWriter, PlaybackSessionManager,
    PlayerConfig, RepeatMode, Track, TransportState,
};
use core_runtime::events::EventBus;
use std::sync::Arc;

const KEY: &str = "player-storage";

fn track(id: &str) -> Track {
    Track::new(id, format!("Upload {}", id), "Me")
        .with_duration(95.0)
        .with_audio_source(format!("file:///music/{}.mp3", id))
}

/// Run one "app session": apply `actions`, then shut the writer down.
async fn run_session<F>(store: Arc<dyn SettingsStore>, actions: F) -> PlaybackSessionManager
where
    F: FnOnce(&mut PlaybackSessionManager),
{
    let (handle, receiver) = PersistenceHandle::channel();
    let writer = PersistenceWriter::new(Arc::clone(&store), KEY, receiver).spawn();

    let mut manager = PlaybackSessionManager::new(PlayerConfig::default(), EventBus::new())
        .unwrap()
        .with_persistence(handle);
    if let Some(state) = load_persisted_state(store.as_ref(), KEY).await.unwrap() {
        manager.restore(state);
    }

    actions(&mut manager);

    // Dropping the manager drops the last handle, which ends the writer.
    drop(manager);
    writer.await.unwrap();

    let mut reloaded = PlaybackSessionManager::new(PlayerConfig::default(), EventBus::new()).unwrap();
    if let Some(state) = load_persisted_state(store.as_ref(), KEY).await.unwrap() {
        reloaded.restore(state);
    }
    reloaded
}

#[tokio::test]
async fn test_durable_fields_round_trip() {
    let store: Arc<dyn SettingsStore> = Arc::new(InMemorySettingsStore::new());

    let reloaded = run_session(Arc::clone(&store), |manager| {
        manager.play_queue(vec![track("a"), track("b"), track("c")]);
        manager.set_volume(0.42);
        manager.toggle_repeat();
        manager.toggle_shuffle();
        manager.add_uploaded_track(track("u1"));
        manager.add_uploaded_track(track("u2"));
        manager.play_next();
    })
    .await;

    let state = reloaded.state();
    assert_eq!(state.volume, 0.42);
    assert_eq!(state.repeat_mode, RepeatMode::All);
    assert!(state.shuffle_enabled);
    let uploaded: Vec<&str> = state.uploaded_tracks.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(uploaded, vec!["u2", "u1"]);

    // Transient fields start over
    assert!(state.current_track.is_none());
    assert!(state.queue.is_empty());
    assert!(state.history.is_empty());
    assert_eq!(state.current_time, 0.0);
    assert_eq!(state.transport_state, TransportState::Stopped);
}

#[tokio::test]
async fn test_first_run_uses_defaults() {
    let store = InMemorySettingsStore::new();

    let loaded = load_persisted_state(&store, KEY).await.unwrap();

    assert!(loaded.is_none());
}

#[tokio::test]
async fn test_corrupt_document_falls_back_to_defaults() {
    let store = InMemorySettingsStore::new();
    store.set_string(KEY, "{\"volume\": \"loud\"").await.unwrap();

    let loaded = load_persisted_state(&store, KEY).await.unwrap();

    assert!(loaded.is_none());
}

#[tokio::test]
async fn test_json_file_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();

    {
        let store: Arc<dyn SettingsStore> =
            Arc::new(JsonFileSettingsStore::in_dir(dir.path()).await.unwrap());
        run_session(store, |manager| {
            manager.set_volume(0.8);
            manager.add_uploaded_track(track("disk"));
        })
        .await;
    }

    let reopened = JsonFileSettingsStore::in_dir(dir.path()).await.unwrap();
    let state = load_persisted_state(&reopened, KEY).await.unwrap().unwrap();

    assert_eq!(state.volume, 0.8);
    assert_eq!(state.uploaded_tracks.len(), 1);
    assert_eq!(state.uploaded_tracks[0].id, "disk");
    assert_eq!(state.uploaded_tracks[0].duration, Some(95.0));
}
