//! Error types for the visualizer core.
use thiserror::Error;

/// Errors raised by the audio pipeline, the visual engine and the controller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VisualizerError {
    /// Band-pass design is infeasible for the given cutoffs and order.
    #[error("invalid filter spec ({low_hz} Hz..{high_hz} Hz, order {order}): {reason}")]
    InvalidFilterSpec {
        low_hz: f32,
        high_hz: f32,
        order: usize,
        reason: String,
    },

    /// Audio block does not have the configured length.
    #[error("invalid block length: expected {expected} samples, got {actual}")]
    InvalidBlockLength { expected: usize, actual: usize },

    /// Read failure or overflow from the audio source; the tick is skipped.
    #[error("transient device read error: {0}")]
    DeviceReadTransient(String),

    /// No input device selected, or the selected one could not be opened.
    #[error("audio device unavailable: {0}")]
    DeviceUnavailable(String),

    /// Configuration rejected by validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Drawing surface has no area to draw on.
    #[error("drawing surface is empty ({width}x{height})")]
    EmptySurface { width: f32, height: f32 },
}

impl VisualizerError {
    /// Per-tick errors degrade to "skip this tick"; everything else is fatal
    /// to the operation that raised it.
    pub fn is_tick_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InvalidFilterSpec { .. }
                | Self::InvalidBlockLength { .. }
                | Self::DeviceReadTransient(_)
                | Self::EmptySurface { .. }
        )
    }
}

/// Result type for visualizer operations.
pub type Result<T> = std::result::Result<T, VisualizerError>;
