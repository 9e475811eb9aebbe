//! # Session Persistence
//!
//! Only a small subset of the session survives a restart: volume, repeat
//! mode, shuffle flag and the uploaded-track list. Everything else resets.
//!
//! Writes are fire-and-forget. The manager sends a snapshot through a
//! [`PersistenceHandle`] and returns immediately; a [`PersistenceWriter`]
//! task drains the channel and writes the newest snapshot to the
//! [`SettingsStore`] as one JSON document.
//!
//! ```text
//! manager ──snapshot──> PersistenceHandle ──mpsc──> PersistenceWriter ──> SettingsStore
//! ```

use crate::error::{PlaybackError, Result};
use crate::types::{RepeatMode, Track};
use bridge_traits::SettingsStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// The durable part of the session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedPlayerState {
    #[serde(default = "default_volume")]
    pub volume: f32,
    #[serde(default)]
    pub repeat_mode: RepeatMode,
    #[serde(default)]
    pub shuffle_enabled: bool,
    #[serde(default)]
    pub uploaded_tracks: Vec<Track>,
}

fn default_volume() -> f32 {
    1.0
}

impl Default for PersistedPlayerState {
    fn default() -> Self {
        Self {
            volume: default_volume(),
            repeat_mode: RepeatMode::Off,
            shuffle_enabled: false,
            uploaded_tracks: Vec::new(),
        }
    }
}

impl PersistedPlayerState {
    /// Bring hand-edited or stale values back into range
    pub fn sanitized(mut self) -> Self {
        self.volume = if self.volume.is_finite() {
            self.volume.clamp(0.0, 1.0)
        } else {
            default_volume()
        };
        self
    }
}

/// Sender side of the persistence channel
///
/// Cheap to clone. Sending never blocks and never needs a runtime.
#[derive(Debug, Clone)]
pub struct PersistenceHandle {
    sender: mpsc::UnboundedSender<PersistedPlayerState>,
}

impl PersistenceHandle {
    /// Create a handle and the receiver a [`PersistenceWriter`] drains
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<PersistedPlayerState>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Queue a snapshot for writing
    pub fn save(&self, state: PersistedPlayerState) -> Result<()> {
        self.sender
            .send(state)
            .map_err(|_| PlaybackError::PersistenceClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Background task writing snapshots to the settings store
pub struct PersistenceWriter {
    store: Arc<dyn SettingsStore>,
    key: String,
    receiver: mpsc::UnboundedReceiver<PersistedPlayerState>,
}

impl PersistenceWriter {
    pub fn new(
        store: Arc<dyn SettingsStore>,
        key: impl Into<String>,
        receiver: mpsc::UnboundedReceiver<PersistedPlayerState>,
    ) -> Self {
        Self {
            store,
            key: key.into(),
            receiver,
        }
    }

    /// Drain the channel until every [`PersistenceHandle`] is dropped
    ///
    /// Snapshots that pile up while a write is in flight are coalesced:
    /// only the newest one is written.
    pub async fn run(mut self) {
        while let Some(mut state) = self.receiver.recv().await {
            let mut skipped = 0usize;
            while let Ok(newer) = self.receiver.try_recv() {
                state = newer;
                skipped += 1;
            }

            match save_persisted_state(self.store.as_ref(), &self.key, &state).await {
                Ok(()) => debug!(
                    key = %self.key,
                    uploaded = state.uploaded_tracks.len(),
                    coalesced = skipped,
                    "Persisted player state"
                ),
                Err(e) => warn!(key = %self.key, error = %e, "Failed to persist player state"),
            }
        }

        debug!(key = %self.key, "Persistence channel closed, writer exiting");
    }

    /// Run on the current tokio runtime
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}

/// Write `state` under `key` as JSON
pub async fn save_persisted_state(
    store: &dyn SettingsStore,
    key: &str,
    state: &PersistedPlayerState,
) -> Result<()> {
    let json = serde_json::to_string(state)?;
    store.set_string(key, &json).await?;
    Ok(())
}

/// Read the persisted state stored under `key`
///
/// Returns `Ok(None)` on first run (missing key) and when the stored
/// document does not parse; the latter is logged and left to be
/// overwritten by the next save.
pub async fn load_persisted_state(
    store: &dyn SettingsStore,
    key: &str,
) -> Result<Option<PersistedPlayerState>> {
    let Some(raw) = store.get_string(key).await? else {
        debug!(key, "No persisted player state, using defaults");
        return Ok(None);
    };

    match serde_json::from_str::<PersistedPlayerState>(&raw) {
        Ok(state) => Ok(Some(state.sanitized())),
        Err(e) => {
            warn!(key, error = %e, "Persisted player state is corrupt, using defaults");
            Ok(None)
        }
    }
}
