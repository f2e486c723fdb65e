//! Live voice-band audio analysis driving procedurally animated visuals.
//!
//! Audio blocks are band-limited to the voice range, reduced to a dominant
//! frequency and a level, mapped to colors and sizes, and turned into
//! short-lived shapes that drift and bounce on a drawing surface.

pub mod audio;
pub mod config;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod visual;

pub use config::{DecorationPolicy, RenderMode, SizeScaling, VisualizerConfig};
pub use engine::{LevelMeter, TickOutcome, TickStats, Visualizer};
pub use error::{Result, VisualizerError};
