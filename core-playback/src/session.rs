//! The playback session: the single mutable record the manager owns.

use crate::config::PlayerConfig;
use crate::history::PlayHistory;
use crate::persistence::PersistedPlayerState;
use crate::queue::PlayQueue;
use crate::types::{RepeatMode, Track, TransportState};
use crate::waveform;

/// Snapshot of everything the player knows.
///
/// Only [`PlaybackSessionManager`](crate::PlaybackSessionManager) mutates a
/// session; everyone else reads it through
/// [`state`](crate::PlaybackSessionManager::state).
#[derive(Debug, Clone)]
pub struct Session {
    /// Track loaded for playback, `None` when stopped with nothing queued
    pub current_track: Option<Track>,
    /// Play-next order, front plays first
    pub queue: PlayQueue,
    /// Most recently played first
    pub history: PlayHistory,
    pub transport_state: TransportState,
    /// Seconds into the current track
    pub current_time: f64,
    /// Length of the current track in seconds, 0 without a track
    pub duration: f64,
    /// 0.0 ..= 1.0
    pub volume: f32,
    pub repeat_mode: RepeatMode,
    pub shuffle_enabled: bool,
    /// Mini-player presentation flag
    pub is_minimized: bool,
    pub waveform_data: Vec<f32>,
    /// Tracks the listener added locally, newest first
    pub uploaded_tracks: Vec<Track>,
}

impl Session {
    /// Fresh session as created at process start
    pub fn new(config: &PlayerConfig) -> Self {
        Self {
            current_track: None,
            queue: PlayQueue::new(),
            history: PlayHistory::new(config.history_limit),
            transport_state: TransportState::Stopped,
            current_time: 0.0,
            duration: 0.0,
            volume: config.default_volume,
            repeat_mode: RepeatMode::Off,
            shuffle_enabled: false,
            is_minimized: true,
            waveform_data: waveform::generate(None, config.waveform_points),
            uploaded_tracks: Vec::new(),
        }
    }

    /// The durable subset of this session
    pub fn persisted(&self) -> PersistedPlayerState {
        PersistedPlayerState {
            volume: self.volume,
            repeat_mode: self.repeat_mode,
            shuffle_enabled: self.shuffle_enabled,
            uploaded_tracks: self.uploaded_tracks.clone(),
        }
    }

    pub fn is_playing(&self) -> bool {
        self.transport_state == TransportState::Playing
    }

    /// Fraction of the current track played, in `[0, 1]`
    pub fn progress(&self) -> f64 {
        if self.duration > 0.0 {
            (self.current_time / self.duration).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}
