//! Error types for the recording session

use std::time::Duration;

use crate::engine::Signal;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The engine's API init entry point returned a non-zero code
    #[error("OBS initialization failed (code {code}): {message}")]
    InitializationFailure { code: i32, message: String },

    /// A signal arrived that does not match the current protocol step
    #[error("Unexpected signal: expected {expected_type}/{expected_signal}, got {actual}")]
    ProtocolViolation {
        expected_type: String,
        expected_signal: String,
        actual: Signal,
    },

    /// No signal arrived before the deadline
    #[error("Output signal timeout after {0:?}")]
    Timeout(Duration),

    #[error("OBS session is not initialized")]
    NotInitialized,

    #[error("OBS session is not recording")]
    NotRecording,

    #[error("Exception when shutting down OBS process: {0:#}")]
    ShutdownFailure(#[source] anyhow::Error),

    /// A category, subcategory or parameter is missing from the settings tree
    #[error("Settings lookup failed: {0}")]
    ConfigurationLookup(String),

    #[error("Signal channel closed")]
    SignalChannelClosed,

    #[error("OBS engine call failed: {0:#}")]
    Engine(#[from] anyhow::Error),
}

pub type Result<T, E = SessionError> = std::result::Result<T, E>;
