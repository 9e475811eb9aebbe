//! # Playback Session Module
//!
//! Owns the player's session state: current track, queue, history,
//! transport state, repeat/shuffle modes and the locally uploaded tracks.
//!
//! ## Overview
//!
//! This module handles:
//! - The playback state machine and its operations ([`PlaybackSessionManager`])
//! - Bounded play history and the play-next queue
//! - Deterministic waveform and duration fallbacks for tracks without metadata
//! - Fire-and-forget persistence of volume, modes and uploaded tracks
//!
//! Every mutation is published on the [`core_runtime::events::EventBus`];
//! analytics, notifications and recently-played tracking subscribe there
//! instead of being called by the manager.

pub mod config;
pub mod duration;
pub mod error;
pub mod history;
pub mod manager;
pub mod persistence;
pub mod queue;
pub mod session;
pub mod types;
pub mod waveform;

pub use config::PlayerConfig;
pub use duration::{DurationEstimator, SeededDurationEstimator};
pub use error::{PlaybackError, Result};
pub use history::PlayHistory;
pub use manager::PlaybackSessionManager;
pub use persistence::{
    load_persisted_state, save_persisted_state, PersistedPlayerState, PersistenceHandle,
    PersistenceWriter,
};
pub use queue::PlayQueue;
pub use session::Session;
pub use types::{RepeatMode, Track, TransportState};
