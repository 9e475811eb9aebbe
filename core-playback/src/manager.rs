//! # Playback Session Manager
//!
//! The only sanctioned mutation surface for the playback [`Session`].
//!
//! ## Overview
//!
//! Every operation mutates the session synchronously and then publishes an
//! event on the [`EventBus`] describing the transition. Operations never
//! fail: invalid indices and empty collections are no-ops, subscriber panics
//! are contained by the bus, and persistence is fire-and-forget.
//!
//! ## State Machine
//!
//! ```text
//!            play_track / play_queue
//!   ┌─────────┐ ───────────────────> ┌─────────┐  set_buffering(true)  ┌─────────┐
//!   │ Stopped │                      │ Playing │ ────────────────────> │ Loading │
//!   └─────────┘ <─────────────────── └─────────┘ <──────────────────── └─────────┘
//!        ^       stop / queue empty     │    ^     set_buffering(false)
//!        │                        pause │    │ resume / toggle_play
//!        │                              v    │
//!        │            stop         ┌─────────┐
//!        └──────────────────────── │ Paused  │
//!                                  └─────────┘
//! ```
//!
//! The one transition not caused by a caller is track completion:
//! [`set_current_time`](PlaybackSessionManager::set_current_time) within the
//! completion threshold of the end publishes `track_complete` and advances
//! as if [`play_next`](PlaybackSessionManager::play_next) had been called.
//!
//! ## Advancing
//!
//! `play_next` applies the first matching rule:
//!
//! 1. Queue not empty: take the front (or a random entry with shuffle).
//! 2. `repeat = all` and history not empty: take the oldest history entry
//!    (or a random one with shuffle). The finished track goes to the front
//!    of history, so history behaves as a ring and every track comes round
//!    again in order.
//! 3. `repeat = one`: replay the current track from the start.
//! 4. Otherwise: move the current track to history and stop.

use crate::config::PlayerConfig;
use crate::duration::{self, DurationEstimator, SeededDurationEstimator};
use crate::error::Result;
use crate::history::PlayHistory;
use crate::persistence::{PersistedPlayerState, PersistenceHandle};
use crate::session::Session;
use crate::types::{RepeatMode, Track, TransportState};
use crate::waveform;
use core_runtime::events::{into_properties, EventBus, EventType, Properties};
use core_runtime::logging::strip_path;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// Where a newly loaded track came from, reported as `source` on
/// `track_play`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlaySource {
    Direct,
    Queue,
    History,
    RepeatOne,
    Previous,
    Resume,
}

impl PlaySource {
    fn as_str(self) -> &'static str {
        match self {
            PlaySource::Direct => "direct",
            PlaySource::Queue => "queue",
            PlaySource::History => "history",
            PlaySource::RepeatOne => "repeat_one",
            PlaySource::Previous => "previous",
            PlaySource::Resume => "resume",
        }
    }
}

/// Why playback moved to another track, reported as `reason` on
/// `track_skip`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SkipReason {
    Next,
    Completed,
    Previous,
}

impl SkipReason {
    fn as_str(self) -> &'static str {
        match self {
            SkipReason::Next => "next",
            SkipReason::Completed => "completed",
            SkipReason::Previous => "previous",
        }
    }
}

/// Owns the playback session and publishes every transition.
pub struct PlaybackSessionManager {
    config: PlayerConfig,
    session: Session,
    events: EventBus,
    persistence: Option<PersistenceHandle>,
    estimator: Arc<dyn DurationEstimator>,
    rng: StdRng,
}

impl PlaybackSessionManager {
    /// Create a manager with a fresh session.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::InvalidConfig` if `config` does not validate.
    pub fn new(config: PlayerConfig, events: EventBus) -> Result<Self> {
        config.ensure_valid()?;

        let rng = match config.shuffle_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let estimator = Arc::new(SeededDurationEstimator::new(
            config.estimated_duration_range_secs.clone(),
        ));

        Ok(Self {
            session: Session::new(&config),
            config,
            events,
            persistence: None,
            estimator,
            rng,
        })
    }

    /// Send durable-field changes to a persistence writer.
    pub fn with_persistence(mut self, handle: PersistenceHandle) -> Self {
        self.persistence = Some(handle);
        self
    }

    /// Replace the fallback used for tracks without a duration.
    pub fn with_duration_estimator(mut self, estimator: Arc<dyn DurationEstimator>) -> Self {
        self.estimator = estimator;
        self
    }

    /// Apply previously persisted settings.
    ///
    /// Used once at start-up; publishes nothing and does not write back.
    pub fn restore(&mut self, state: PersistedPlayerState) {
        let state = state.sanitized();
        debug!(
            volume = state.volume,
            repeat_mode = %state.repeat_mode,
            shuffle = state.shuffle_enabled,
            uploaded = state.uploaded_tracks.len(),
            "Restoring persisted player state"
        );
        self.session.volume = state.volume;
        self.session.repeat_mode = state.repeat_mode;
        self.session.shuffle_enabled = state.shuffle_enabled;
        self.session.uploaded_tracks = state.uploaded_tracks;
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn state(&self) -> &Session {
        &self.session
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.session.current_track.as_ref()
    }

    pub fn queue(&self) -> &[Track] {
        self.session.queue.as_slice()
    }

    pub fn history(&self) -> &PlayHistory {
        &self.session.history
    }

    pub fn transport_state(&self) -> TransportState {
        self.session.transport_state
    }

    pub fn is_playing(&self) -> bool {
        self.session.is_playing()
    }

    pub fn progress(&self) -> f64 {
        self.session.progress()
    }

    pub fn persisted_state(&self) -> PersistedPlayerState {
        self.session.persisted()
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    // ========================================================================
    // Transport
    // ========================================================================

    /// Play `track` now. The previous track, if any, goes to history.
    pub fn play_track(&mut self, track: Track) {
        self.start_track(track, PlaySource::Direct);
        self.session.is_minimized = true;
    }

    /// Play `tracks[0]` and queue the rest. No-op for an empty list.
    pub fn play_queue(&mut self, tracks: Vec<Track>) {
        self.play_queue_from(tracks, 0);
    }

    /// Play `tracks[start_index]` and queue the tracks after it.
    ///
    /// No-op if `start_index` is out of range.
    pub fn play_queue_from(&mut self, mut tracks: Vec<Track>, start_index: usize) {
        if start_index >= tracks.len() {
            debug!(
                start_index,
                len = tracks.len(),
                "play_queue ignored: start index out of range"
            );
            return;
        }

        let total = tracks.len();
        let rest = tracks.split_off(start_index + 1);
        let Some(first) = tracks.pop() else {
            return;
        };

        self.emit_action(
            "play_queue",
            json!({
                "track_count": total,
                "start_index": start_index,
                "first_track_id": first.id,
            }),
        );

        self.session.queue.replace(rest);
        self.start_track(first, PlaySource::Queue);
        self.session.is_minimized = true;
    }

    /// Flip between playing and paused. No-op without a current track.
    ///
    /// `loading` counts as playing, so toggling while buffering pauses.
    pub fn toggle_play(&mut self) {
        if self.session.current_track.is_none() {
            debug!("toggle_play ignored: no current track");
            return;
        }

        if matches!(
            self.session.transport_state,
            TransportState::Playing | TransportState::Loading
        ) {
            self.pause();
        } else {
            self.resume();
        }
    }

    /// Force `paused`. Publishes `track_pause` even when already paused.
    pub fn pause(&mut self) {
        let Some(track) = self.session.current_track.as_ref() else {
            debug!("pause ignored: no current track");
            return;
        };

        let props = with_extra(
            track_properties(track),
            json!({ "position": self.session.current_time }),
        );
        self.session.transport_state = TransportState::Paused;
        self.emit(EventType::TrackPause, props);
    }

    /// Continue playback of the current track.
    ///
    /// No-op without a current track or when already playing.
    pub fn resume(&mut self) {
        let Some(track) = self.session.current_track.as_ref() else {
            debug!("resume ignored: no current track");
            return;
        };
        if self.session.transport_state == TransportState::Playing {
            return;
        }

        let props = with_extra(
            track_properties(track),
            json!({
                "source": PlaySource::Resume.as_str(),
                "position": self.session.current_time,
            }),
        );
        self.session.transport_state = TransportState::Playing;
        self.emit(EventType::TrackPlay, props);
    }

    /// Stop playback and rewind. The current track stays loaded.
    pub fn stop(&mut self) {
        let position = self.session.current_time;
        self.session.current_time = 0.0;
        self.session.transport_state = TransportState::Stopped;

        self.emit_action(
            "stop",
            json!({
                "track_id": self.current_track_id(),
                "position": position,
            }),
        );
    }

    /// Report host buffering: `playing -> loading` and back.
    ///
    /// No-op without a current track or when the state does not change.
    pub fn set_buffering(&mut self, buffering: bool) {
        if self.session.current_track.is_none() {
            return;
        }

        let next = match (self.session.transport_state, buffering) {
            (TransportState::Playing, true) => TransportState::Loading,
            (TransportState::Loading, false) => TransportState::Playing,
            _ => return,
        };

        self.session.transport_state = next;
        self.emit_action(
            "buffering",
            json!({
                "track_id": self.current_track_id(),
                "buffering": buffering,
            }),
        );
    }

    /// Jump to `time` seconds, clamped to `[0, duration]`.
    ///
    /// Non-finite values are ignored.
    pub fn seek_to(&mut self, time: f64) {
        if !time.is_finite() {
            warn!(time, "seek_to ignored: non-finite position");
            return;
        }

        let from = self.session.current_time;
        let position = time.clamp(0.0, self.session.duration.max(0.0));
        self.session.current_time = position;

        self.emit(
            EventType::TrackSeek,
            into_properties(json!({
                "track_id": self.current_track_id(),
                "from": from,
                "position": position,
            })),
        );
    }

    /// Time update from the host's playback clock.
    ///
    /// Reaching the completion threshold publishes `track_complete` and
    /// advances to the next track. Negative and non-finite values are
    /// ignored.
    pub fn set_current_time(&mut self, time: f64) {
        if !time.is_finite() || time < 0.0 {
            trace!(time, "set_current_time ignored");
            return;
        }

        self.session.current_time = time;

        let Some(track) = self.session.current_track.as_ref() else {
            return;
        };
        let duration = self.session.duration;
        if duration <= 0.0 || time < duration - self.config.completion_threshold_secs {
            return;
        }

        let props = with_extra(track_properties(track), json!({ "duration": duration }));
        info!(track_id = %track.id, "Track completed");
        self.emit(EventType::TrackComplete, props);
        self.advance(SkipReason::Completed);
    }

    /// Move to the next track; see the module docs for the rules.
    pub fn play_next(&mut self) {
        self.advance(SkipReason::Next);
    }

    /// Go back one track, or restart the current one when past the
    /// restart threshold.
    pub fn play_previous(&mut self) {
        let has_track = self.session.current_track.is_some();

        if has_track && self.session.current_time > self.config.restart_threshold_secs {
            self.restart_current();
            return;
        }

        if let Some(previous) = self.session.history.pop_recent() {
            let replaced = self.session.current_track.take();
            self.emit_skip(replaced.as_ref(), &previous, SkipReason::Previous);
            if let Some(replaced) = replaced {
                self.session.queue.push_front(replaced);
            }
            self.load_track(previous, PlaySource::Previous);
            return;
        }

        if has_track {
            self.restart_current();
        }
    }

    // ========================================================================
    // Queue & history
    // ========================================================================

    pub fn add_to_queue(&mut self, track: Track) {
        let props = with_extra(
            track_properties(&track),
            json!({
                "action": "add_to_queue",
                "queue_length": self.session.queue.len() + 1,
            }),
        );
        self.session.queue.push(track);
        self.emit(EventType::CustomEvent, props);
    }

    /// Remove the queued track at `index`. Out-of-range indices are ignored.
    pub fn remove_from_queue(&mut self, index: usize) {
        let Some(removed) = self.session.queue.remove(index) else {
            debug!(
                index,
                queue_len = self.session.queue.len(),
                "remove_from_queue ignored: index out of range"
            );
            return;
        };

        self.emit_action(
            "remove_from_queue",
            json!({
                "index": index,
                "track_id": removed.id,
                "queue_length": self.session.queue.len(),
            }),
        );
    }

    /// Reorder the queue. Out-of-range indices are ignored.
    pub fn move_in_queue(&mut self, from: usize, to: usize) {
        if !self.session.queue.move_item(from, to) {
            debug!(from, to, "move_in_queue ignored: index out of range");
            return;
        }

        self.emit_action("move_in_queue", json!({ "from": from, "to": to }));
    }

    pub fn clear_queue(&mut self) {
        let cleared = self.session.queue.len();
        self.session.queue.clear();
        self.emit_action("clear_queue", json!({ "cleared": cleared }));
    }

    pub fn clear_history(&mut self) {
        let cleared = self.session.history.len();
        self.session.history.clear();
        self.emit_action("clear_history", json!({ "cleared": cleared }));
    }

    // ========================================================================
    // Modes & volume
    // ========================================================================

    /// Cycle `off -> all -> one -> off`.
    pub fn toggle_repeat(&mut self) {
        self.session.repeat_mode = self.session.repeat_mode.cycle();
        self.persist();
        self.emit_action(
            "toggle_repeat",
            json!({ "repeat_mode": self.session.repeat_mode.as_str() }),
        );
    }

    pub fn toggle_shuffle(&mut self) {
        self.session.shuffle_enabled = !self.session.shuffle_enabled;
        self.persist();
        self.emit_action(
            "toggle_shuffle",
            json!({ "shuffle_enabled": self.session.shuffle_enabled }),
        );
    }

    /// Set volume, clamped to `[0, 1]`. Non-finite values are ignored.
    pub fn set_volume(&mut self, volume: f32) {
        if !volume.is_finite() {
            warn!(volume, "set_volume ignored: non-finite value");
            return;
        }

        self.session.volume = volume.clamp(0.0, 1.0);
        self.persist();
        self.emit_action("set_volume", json!({ "volume": self.session.volume }));
    }

    // ========================================================================
    // Presentation
    // ========================================================================

    pub fn minimize_player(&mut self) {
        self.session.is_minimized = true;
        self.emit_action("minimize_player", json!({}));
    }

    pub fn maximize_player(&mut self) {
        self.session.is_minimized = false;
        self.emit_action("maximize_player", json!({}));
    }

    /// Unload the current track, stop and minimize.
    pub fn close_player(&mut self) {
        let closed = self.session.current_track.take();
        self.session.transport_state = TransportState::Stopped;
        self.session.current_time = 0.0;
        self.session.duration = 0.0;
        self.session.is_minimized = true;
        self.generate_waveform_data();

        self.emit_action(
            "close_player",
            json!({ "track_id": closed.as_ref().map(|t| t.id.as_str()) }),
        );
    }

    /// Recompute the waveform for the current track.
    pub fn generate_waveform_data(&mut self) {
        let track_id = self.session.current_track.as_ref().map(|t| t.id.as_str());
        self.session.waveform_data = waveform::generate(track_id, self.config.waveform_points);
    }

    // ========================================================================
    // Uploaded tracks
    // ========================================================================

    /// Add a locally uploaded track, newest first.
    ///
    /// A track with the same id is replaced.
    pub fn add_uploaded_track(&mut self, track: Track) {
        self.session.uploaded_tracks.retain(|t| t.id != track.id);

        info!(
            track_id = %track.id,
            file = strip_path(&track.audio_source),
            "Track uploaded"
        );
        let props = with_extra(
            track_properties(&track),
            json!({ "uploaded_count": self.session.uploaded_tracks.len() + 1 }),
        );

        self.session.uploaded_tracks.insert(0, track);
        self.persist();
        self.emit(EventType::TrackUploaded, props);
    }

    /// Remove an uploaded track by id. Unknown ids are ignored.
    pub fn remove_uploaded_track(&mut self, track_id: &str) {
        let before = self.session.uploaded_tracks.len();
        self.session.uploaded_tracks.retain(|t| t.id != track_id);
        if self.session.uploaded_tracks.len() == before {
            debug!(track_id, "remove_uploaded_track ignored: unknown id");
            return;
        }

        self.persist();
        self.emit_action(
            "remove_uploaded_track",
            json!({
                "track_id": track_id,
                "uploaded_count": self.session.uploaded_tracks.len(),
            }),
        );
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// Pick what plays after the current track.
    ///
    /// With `repeat = all` and an empty queue, history is consumed oldest
    /// first rather than most recent first, so a two-track history cycles
    /// instead of bouncing between the same pair.
    fn advance(&mut self, reason: SkipReason) {
        let shuffle = self.session.shuffle_enabled;

        if !self.session.queue.is_empty() {
            let index = if shuffle {
                self.rng.gen_range(0..self.session.queue.len())
            } else {
                0
            };
            if let Some(next) = self.session.queue.remove(index) {
                self.switch_to(next, reason, PlaySource::Queue);
            }
            return;
        }

        if self.session.repeat_mode == RepeatMode::All && !self.session.history.is_empty() {
            let next = if shuffle {
                let index = self.rng.gen_range(0..self.session.history.len());
                self.session.history.take(index)
            } else {
                self.session.history.pop_oldest()
            };
            if let Some(next) = next {
                self.switch_to(next, reason, PlaySource::History);
            }
            return;
        }

        if self.session.repeat_mode == RepeatMode::One {
            if let Some(track) = self.session.current_track.clone() {
                self.emit_skip(Some(&track), &track, reason);
                self.session.current_time = 0.0;
                self.session.transport_state = TransportState::Playing;
                self.emit(
                    EventType::TrackPlay,
                    with_extra(
                        track_properties(&track),
                        json!({ "source": PlaySource::RepeatOne.as_str() }),
                    ),
                );
                return;
            }
        }

        let Some(finished) = self.session.current_track.take() else {
            return;
        };
        info!(track_id = %finished.id, "Queue exhausted, stopping");
        self.session.history.push(finished);
        self.session.transport_state = TransportState::Stopped;
        self.session.current_time = 0.0;
        self.session.duration = 0.0;
        self.generate_waveform_data();
    }

    /// Replace the current track with `next`, recording the old one in
    /// history.
    fn switch_to(&mut self, next: Track, reason: SkipReason, source: PlaySource) {
        let previous = self.session.current_track.take();
        self.emit_skip(previous.as_ref(), &next, reason);
        if let Some(previous) = previous {
            self.session.history.push(previous);
        }
        self.load_track(next, source);
    }

    fn start_track(&mut self, track: Track, source: PlaySource) {
        if let Some(previous) = self.session.current_track.take() {
            self.session.history.push(previous);
        }
        self.load_track(track, source);
    }

    /// Make `track` current, playing from 0, and publish `track_play`.
    fn load_track(&mut self, track: Track, source: PlaySource) {
        let duration = duration::resolve(&track, self.estimator.as_ref());
        let props = with_extra(
            track_properties(&track),
            json!({
                "source": source.as_str(),
                "duration": duration,
                "estimated_duration": track.known_duration().is_none(),
            }),
        );

        info!(
            track_id = %track.id,
            source = source.as_str(),
            duration,
            queue_len = self.session.queue.len(),
            "Playing track"
        );

        self.session.waveform_data = waveform::generate(Some(&track.id), self.config.waveform_points);
        self.session.current_track = Some(track);
        self.session.duration = duration;
        self.session.current_time = 0.0;
        self.session.transport_state = TransportState::Playing;

        self.emit(EventType::TrackPlay, props);
    }

    fn restart_current(&mut self) {
        let position = self.session.current_time;
        self.session.current_time = 0.0;
        self.emit_action(
            "restart",
            json!({
                "track_id": self.current_track_id(),
                "position": position,
            }),
        );
    }

    fn emit_skip(&self, from: Option<&Track>, to: &Track, reason: SkipReason) {
        self.emit(
            EventType::TrackSkip,
            into_properties(json!({
                "track_id": from.map(|t| t.id.as_str()),
                "to_track_id": to.id,
                "position": self.session.current_time,
                "reason": reason.as_str(),
            })),
        );
    }

    fn emit_action(&self, action: &str, extra: Value) {
        let mut props = into_properties(extra);
        props.insert("action".to_string(), Value::from(action));
        self.emit(EventType::CustomEvent, props);
    }

    fn emit(&self, event_type: EventType, properties: Properties) {
        let delivered = self.events.publish(event_type, properties);
        trace!(event_type = %event_type, delivered, "Event published");
    }

    fn persist(&self) {
        let Some(handle) = self.persistence.as_ref() else {
            return;
        };
        if let Err(e) = handle.save(self.session.persisted()) {
            debug!(error = %e, "Player state snapshot dropped");
        }
    }

    fn current_track_id(&self) -> Option<&str> {
        self.session.current_track.as_ref().map(|t| t.id.as_str())
    }
}

impl std::fmt::Debug for PlaybackSessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackSessionManager")
            .field("current_track", &self.current_track_id())
            .field("transport_state", &self.session.transport_state)
            .field("queue_len", &self.session.queue.len())
            .field("history_len", &self.session.history.len())
            .field("persistence", &self.persistence.is_some())
            .finish()
    }
}

fn track_properties(track: &Track) -> Properties {
    into_properties(json!({
        "track_id": track.id,
        "title": track.title,
        "artist": track.artist,
        "artist_id": track.artist_id,
        "genre": track.genre,
    }))
}

fn with_extra(mut props: Properties, extra: Value) -> Properties {
    props.extend(into_properties(extra));
    props
}
