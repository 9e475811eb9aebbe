use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Core initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },

    #[error("Runtime error: {0}")]
    Runtime(core_runtime::Error),

    #[error("Bridge error: {0}")]
    Bridge(#[from] bridge_traits::BridgeError),

    #[error("Playback error: {0}")]
    Playback(#[from] core_playback::PlaybackError),

    #[error("Shutdown failed: {0}")]
    ShutdownFailed(String),
}

impl From<core_runtime::Error> for CoreError {
    fn from(err: core_runtime::Error) -> Self {
        match err {
            core_runtime::Error::CapabilityMissing {
                capability,
                message,
            } => CoreError::CapabilityMissing {
                capability,
                message,
            },
            other => CoreError::Runtime(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_missing_is_lifted() {
        let err = CoreError::from(core_runtime::Error::CapabilityMissing {
            capability: "SettingsStore".to_string(),
            message: "none".to_string(),
        });
        assert!(matches!(err, CoreError::CapabilityMissing { ref capability, .. } if capability == "SettingsStore"));

        let err = CoreError::from(core_runtime::Error::Config("bad".to_string()));
        assert!(matches!(err, CoreError::Runtime(_)));
    }
}
