//! # Playback Error Types
//!
//! Errors for the fallible set-up paths of the playback core. Session
//! operations themselves never fail; see [`crate::manager`].

use bridge_traits::BridgeError;
use thiserror::Error;

/// Errors that can occur while configuring or persisting the player.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// A `PlayerConfig` value is out of range.
    #[error("Invalid player configuration: {0}")]
    InvalidConfig(String),

    // ========================================================================
    // Persistence Errors
    // ========================================================================
    /// The settings store rejected a read or write.
    #[error("Settings store error: {0}")]
    Storage(#[from] BridgeError),

    /// Persisted player state could not be encoded.
    #[error("Failed to encode player state: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The background writer is gone; snapshots can no longer be saved.
    #[error("Persistence channel closed")]
    PersistenceClosed,
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_convert() {
        let err: PlaybackError = BridgeError::OperationFailed("disk full".to_string()).into();
        assert!(matches!(err, PlaybackError::Storage(_)));
        assert!(err.to_string().contains("disk full"));

        let json_err = serde_json::from_str::<u32>("nope").unwrap_err();
        let err: PlaybackError = json_err.into();
        assert!(matches!(err, PlaybackError::Serialization(_)));
    }

    #[test]
    fn test_error_messages() {
        let config = PlaybackError::InvalidConfig("history_limit must be > 0".to_string());
        assert!(config.to_string().contains("history_limit"));
        assert_eq!(
            PlaybackError::PersistenceClosed.to_string(),
            "Persistence channel closed"
        );
    }
}
