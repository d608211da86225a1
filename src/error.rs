//! Error types for the wind instrument core.

use thiserror::Error;

use crate::rotation::RotationChannel;

/// Errors surfaced to callers of the instrument core.
///
/// Missing telemetry is not represented here: absent or `NaN` samples keep the
/// previous output and never reach the caller as an error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DisplayError {
    /// Bearing was NaN or infinite; the channel keeps its previous target.
    #[error("Invalid bearing for {channel}: {value}")]
    InvalidBearing { channel: RotationChannel, value: f64 },

    /// Counter-rotating channels follow their primary and cannot be driven directly.
    #[error("Channel {0} is driven by {1}")]
    DrivenChannel(RotationChannel, RotationChannel),

    /// No geometry can ever be produced with this configuration.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl DisplayError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::ConfigurationError(msg.into())
    }
}
