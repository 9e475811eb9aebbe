//! # Player Configuration
//!
//! Tunables for the playback session manager.

use crate::duration::DEFAULT_ESTIMATE_RANGE;
use crate::error::{PlaybackError, Result};
use crate::history::DEFAULT_HISTORY_LIMIT;
use crate::waveform;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Key the persisted player state is stored under.
pub const DEFAULT_SETTINGS_KEY: &str = "player-storage";

/// Player configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Maximum number of tracks kept in history.
    ///
    /// Default: 20.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// `play_previous` restarts the current track instead of going back
    /// once playback is past this point (seconds).
    ///
    /// Default: 3.0.
    #[serde(default = "default_restart_threshold")]
    pub restart_threshold_secs: f64,

    /// A time update within this distance of the end completes the track.
    ///
    /// Default: 0.5.
    #[serde(default = "default_completion_threshold")]
    pub completion_threshold_secs: f64,

    /// Number of points in generated waveforms.
    ///
    /// Default: 150.
    #[serde(default = "default_waveform_points")]
    pub waveform_points: usize,

    /// Volume used on first run, before any persisted value exists.
    ///
    /// Default: 1.0.
    #[serde(default = "default_volume")]
    pub default_volume: f32,

    /// Range for estimated durations of tracks without one (seconds).
    ///
    /// Default: 120..300.
    #[serde(default = "default_estimate_range")]
    pub estimated_duration_range_secs: Range<f64>,

    /// Fixed seed for shuffle picks. `None` seeds from entropy.
    #[serde(default)]
    pub shuffle_seed: Option<u64>,

    /// Settings store key for the persisted subset of the session.
    ///
    /// Default: `"player-storage"`.
    #[serde(default = "default_settings_key")]
    pub settings_key: String,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            history_limit: default_history_limit(),
            restart_threshold_secs: default_restart_threshold(),
            completion_threshold_secs: default_completion_threshold(),
            waveform_points: default_waveform_points(),
            default_volume: default_volume(),
            estimated_duration_range_secs: default_estimate_range(),
            shuffle_seed: None,
            settings_key: default_settings_key(),
        }
    }
}

impl PlayerConfig {
    /// Configuration with a fixed shuffle seed, for reproducible runs.
    pub fn seeded(seed: u64) -> Self {
        Self {
            shuffle_seed: Some(seed),
            ..Default::default()
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.history_limit == 0 {
            return Err("history_limit must be > 0".to_string());
        }

        if !self.restart_threshold_secs.is_finite() || self.restart_threshold_secs < 0.0 {
            return Err("restart_threshold_secs must be a non-negative number".to_string());
        }

        if !self.completion_threshold_secs.is_finite() || self.completion_threshold_secs < 0.0 {
            return Err("completion_threshold_secs must be a non-negative number".to_string());
        }

        if self.waveform_points == 0 {
            return Err("waveform_points must be > 0".to_string());
        }

        if !(0.0..=1.0).contains(&self.default_volume) {
            return Err("default_volume must be between 0.0 and 1.0".to_string());
        }

        let range = &self.estimated_duration_range_secs;
        if !(range.start.is_finite() && range.end.is_finite())
            || range.start <= 0.0
            || range.start >= range.end
        {
            return Err("estimated_duration_range_secs must be a non-empty positive range".to_string());
        }

        if self.settings_key.trim().is_empty() {
            return Err("settings_key cannot be empty".to_string());
        }

        Ok(())
    }

    /// [`validate`](Self::validate) mapped into a [`PlaybackError`].
    pub fn ensure_valid(&self) -> Result<()> {
        self.validate().map_err(PlaybackError::InvalidConfig)
    }
}

fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

fn default_restart_threshold() -> f64 {
    3.0
}

fn default_completion_threshold() -> f64 {
    0.5
}

fn default_waveform_points() -> usize {
    waveform::DEFAULT_POINTS
}

fn default_volume() -> f32 {
    1.0
}

fn default_estimate_range() -> Range<f64> {
    DEFAULT_ESTIMATE_RANGE
}

fn default_settings_key() -> String {
    DEFAULT_SETTINGS_KEY.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = PlayerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.history_limit, 20);
        assert_eq!(config.waveform_points, 150);
        assert_eq!(config.settings_key, "player-storage");
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = PlayerConfig::default();
        config.history_limit = 0;
        assert!(config.validate().is_err());

        let mut config = PlayerConfig::default();
        config.default_volume = 1.5;
        assert!(config.validate().is_err());

        let mut config = PlayerConfig::default();
        config.estimated_duration_range_secs = 300.0..120.0;
        assert!(config.validate().is_err());

        let mut config = PlayerConfig::default();
        config.completion_threshold_secs = f64::NAN;
        assert!(matches!(
            config.ensure_valid(),
            Err(PlaybackError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: PlayerConfig =
            serde_json::from_str(r#"{ "history_limit": 5, "shuffle_seed": 7 }"#).unwrap();

        assert_eq!(config.history_limit, 5);
        assert_eq!(config.shuffle_seed, Some(7));
        assert_eq!(config.restart_threshold_secs, 3.0);
        assert_eq!(config.estimated_duration_range_secs, 120.0..300.0);
    }
}
