//! Visualizer configuration knobs and their validation.

use crate::error::{Result, VisualizerError};

/// Which lineage of visuals the engine renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Four composite archetypes colored by dominant frequency.
    Rich,
    /// Palette-colored strokes with a rotating orientation.
    Simple,
}

/// Level-to-size mapping: `base_size = max(min_size, level / divisor)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizeScaling {
    pub min_size: f32,
    pub divisor: f32,
}

impl SizeScaling {
    pub const RICH: Self = Self {
        min_size: 20.0,
        divisor: 10.0,
    };
    pub const SIMPLE: Self = Self {
        min_size: 10.0,
        divisor: 20.0,
    };
}

impl RenderMode {
    /// Size scaling used by this mode unless overridden.
    pub fn default_scaling(self) -> SizeScaling {
        match self {
            RenderMode::Rich => SizeScaling::RICH,
            RenderMode::Simple => SizeScaling::SIMPLE,
        }
    }
}

/// What happens to the decorative drawables of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecorationPolicy {
    /// Decorations move with the primary and are deleted with it.
    Grouped,
    /// Decorations stay where they were drawn; the surface is cleared periodically.
    Trail,
}

#[derive(Debug, Clone)]
pub struct VisualizerConfig {
    /// Loop cadence (milliseconds).
    pub tick_period_ms: u64,

    /// Hard cap on concurrently tracked entities.
    pub max_entities: usize,

    /// Entity lifetime before forced removal (seconds).
    pub ttl_seconds: f64,

    /// Passband and hue-mapping domain (Hz).
    pub low_freq_hz: f32,
    pub high_freq_hz: f32,

    /// Cap on particles rendered per scatter cluster.
    pub particle_density: usize,

    /// Butterworth prototype order of the band-pass.
    pub filter_order: usize,

    /// Capture rate requested from the device; an unsupported rate falls back
    /// to the device default, and the rate actually opened is what ticks use.
    pub sample_rate_hz: u32,

    /// Samples pulled from the source each tick.
    pub block_size: usize,

    /// Spectrum bins kept for peak picking (256 or 512).
    pub fft_bins: usize,

    pub mode: RenderMode,
    pub size_scaling: SizeScaling,
    pub decorations: DecorationPolicy,

    /// Full-clear period when decorations are left as a trail (seconds).
    pub trail_clear_seconds: f64,

    /// Upper bound on a blocking audio read (milliseconds).
    pub read_timeout_ms: u64,

    /// Seed for the spawner RNG; `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl Default for VisualizerConfig {
    fn default() -> Self {
        Self::for_mode(RenderMode::Rich)
    }
}

impl VisualizerConfig {
    /// Defaults for the given render mode.
    pub fn for_mode(mode: RenderMode) -> Self {
        Self {
            tick_period_ms: 50,
            max_entities: 15,
            ttl_seconds: 1.5,
            low_freq_hz: 300.0,
            high_freq_hz: 3400.0,
            particle_density: 20,
            filter_order: 6,
            sample_rate_hz: 44100,
            block_size: 1024,
            fft_bins: 256,
            mode,
            size_scaling: mode.default_scaling(),
            decorations: DecorationPolicy::Grouped,
            trail_clear_seconds: 5.0,
            read_timeout_ms: 100,
            seed: None,
        }
    }

    /// Reject knob combinations the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(VisualizerError::InvalidConfig(msg));

        if self.tick_period_ms == 0 {
            return fail("tick period must be > 0 ms".to_string());
        }
        if self.max_entities == 0 {
            return fail("max_entities must be at least 1".to_string());
        }
        if !(self.ttl_seconds > 0.0) {
            return fail(format!("ttl must be > 0, got {}", self.ttl_seconds));
        }
        if !(self.low_freq_hz > 0.0 && self.low_freq_hz < self.high_freq_hz) {
            return fail(format!(
                "frequency band must satisfy 0 < low < high, got {}..{}",
                self.low_freq_hz, self.high_freq_hz
            ));
        }
        if self.sample_rate_hz == 0 {
            return fail("sample rate must be > 0 Hz".to_string());
        }
        if self.particle_density == 0 {
            return fail("particle_density must be > 0".to_string());
        }
        if self.block_size == 0 {
            return fail("block_size must be > 0".to_string());
        }
        if self.fft_bins != 256 && self.fft_bins != 512 {
            return fail(format!("fft_bins must be 256 or 512, got {}", self.fft_bins));
        }
        if self.fft_bins > self.block_size {
            return fail(format!(
                "fft_bins ({}) exceeds block size ({})",
                self.fft_bins, self.block_size
            ));
        }
        if !(self.size_scaling.divisor > 0.0 && self.size_scaling.min_size > 0.0) {
            return fail("size scaling needs a positive floor and divisor".to_string());
        }
        if self.decorations == DecorationPolicy::Trail && !(self.trail_clear_seconds > 0.0) {
            return fail("trail clear period must be > 0".to_string());
        }
        Ok(())
    }
}
