//! Core playback types

use serde::{Deserialize, Serialize};
use std::fmt;

/// A playable audio asset.
///
/// Tracks belong to an external catalog; the session keeps them by value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artist: String,
    #[serde(default)]
    pub artist_id: String,
    #[serde(default)]
    pub cover_art: String,
    #[serde(default)]
    pub audio_source: String,
    /// Length in seconds, `None` when unknown
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default)]
    pub genre: String,
    /// Precomputed amplitude envelope, may be empty
    #[serde(default)]
    pub waveform: Vec<f32>,
}

impl Track {
    /// Create a track with the required catalog fields
    pub fn new(id: impl Into<String>, title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artist: artist.into(),
            artist_id: String::new(),
            cover_art: String::new(),
            audio_source: String::new(),
            duration: None,
            genre: String::new(),
            waveform: Vec::new(),
        }
    }

    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration = Some(seconds);
        self
    }

    pub fn with_artist_id(mut self, artist_id: impl Into<String>) -> Self {
        self.artist_id = artist_id.into();
        self
    }

    pub fn with_cover_art(mut self, cover_art: impl Into<String>) -> Self {
        self.cover_art = cover_art.into();
        self
    }

    pub fn with_audio_source(mut self, source: impl Into<String>) -> Self {
        self.audio_source = source.into();
        self
    }

    pub fn with_genre(mut self, genre: impl Into<String>) -> Self {
        self.genre = genre.into();
        self
    }

    /// Known duration if it is usable (finite and positive)
    pub fn known_duration(&self) -> Option<f64> {
        self.duration.filter(|d| d.is_finite() && *d > 0.0)
    }
}

/// Transport state of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportState {
    #[default]
    Stopped,
    Playing,
    Paused,
    /// Waiting on the host to buffer audio
    Loading,
}

impl TransportState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportState::Stopped => "stopped",
            TransportState::Playing => "playing",
            TransportState::Paused => "paused",
            TransportState::Loading => "loading",
        }
    }
}

impl fmt::Display for TransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Repeat mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    /// No repeat - stop when the queue runs out
    #[default]
    Off,
    /// Refill from history when the queue runs out
    All,
    /// Replay the current track
    One,
}

impl RepeatMode {
    /// Next mode in the `off -> all -> one -> off` cycle
    pub fn cycle(self) -> Self {
        match self {
            RepeatMode::Off => RepeatMode::All,
            RepeatMode::All => RepeatMode::One,
            RepeatMode::One => RepeatMode::Off,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RepeatMode::Off => "off",
            RepeatMode::All => "all",
            RepeatMode::One => "one",
        }
    }
}

impl fmt::Display for RepeatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
