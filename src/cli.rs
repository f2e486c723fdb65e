//! Command-line argument parsing.

use clap::{Parser, ValueEnum};

use voiceforms::config::{DecorationPolicy, RenderMode, VisualizerConfig};
use voiceforms::error::Result;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModeArg {
    /// Frequency-colored composite shapes
    Rich,
    /// Palette strokes with a rotating orientation
    Simple,
}

impl From<ModeArg> for RenderMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Rich => RenderMode::Rich,
            ModeArg::Simple => RenderMode::Simple,
        }
    }
}

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "voiceforms")]
#[command(about = "Voice-band audio driving procedural animated visuals", long_about = None)]
pub struct Args {
    /// Render mode
    #[arg(long, value_enum, default_value = "rich")]
    pub mode: ModeArg,

    /// Tick period (milliseconds)
    #[arg(long = "tick-ms", value_name = "MS", default_value = "50")]
    pub tick_ms: u64,

    /// Maximum number of live entities
    #[arg(long, value_name = "N", default_value = "15")]
    pub max_entities: usize,

    /// Entity lifetime (seconds)
    #[arg(long, value_name = "SECS", default_value = "1.5")]
    pub ttl: f64,

    /// Lower passband edge (Hz)
    #[arg(long, value_name = "HZ", default_value = "300")]
    pub low_hz: f32,

    /// Upper passband edge (Hz)
    #[arg(long, value_name = "HZ", default_value = "3400")]
    pub high_hz: f32,

    /// Points per particle cluster
    #[arg(long, value_name = "N", default_value = "20")]
    pub particle_density: usize,

    /// Spectrum bins used for peak picking (256 or 512)
    #[arg(long, value_name = "N", default_value = "256")]
    pub fft_bins: usize,

    /// Butterworth prototype order
    #[arg(long, value_name = "N", default_value = "6")]
    pub filter_order: usize,

    /// Capture rate requested from the device (Hz); unsupported rates fall back to the device default
    #[arg(long, value_name = "HZ", default_value = "44100")]
    pub sample_rate: u32,

    /// Input device index to preselect (see --list-devices)
    #[arg(long, value_name = "INDEX")]
    pub device: Option<usize>,

    /// Leave decorations behind as a trail, clearing the canvas periodically
    #[arg(long)]
    pub trail: bool,

    /// Seed for reproducible visuals
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Print the available input devices and exit
    #[arg(long)]
    pub list_devices: bool,
}

impl Args {
    /// Build a validated visualizer configuration from the flags.
    pub fn to_config(&self) -> Result<VisualizerConfig> {
        let mut config = VisualizerConfig::for_mode(self.mode.into());
        config.tick_period_ms = self.tick_ms;
        config.max_entities = self.max_entities;
        config.ttl_seconds = self.ttl;
        config.low_freq_hz = self.low_hz;
        config.high_freq_hz = self.high_hz;
        config.particle_density = self.particle_density;
        config.fft_bins = self.fft_bins;
        config.filter_order = self.filter_order;
        config.sample_rate_hz = self.sample_rate;
        config.seed = self.seed;
        if self.trail {
            config.decorations = DecorationPolicy::Trail;
        }
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_config() {
        let args = Args::parse_from(["voiceforms"]);
        let config = args.to_config().unwrap();
        let defaults = VisualizerConfig::default();
        assert_eq!(config.tick_period_ms, defaults.tick_period_ms);
        assert_eq!(config.max_entities, defaults.max_entities);
        assert_eq!(config.mode, RenderMode::Rich);
        assert_eq!(config.decorations, DecorationPolicy::Grouped);
        assert_eq!(config.sample_rate_hz, 44100);
        assert!(args.device.is_none());
    }

    #[test]
    fn test_sample_rate_flag() {
        let args = Args::parse_from(["voiceforms", "--sample-rate", "48000"]);
        assert_eq!(args.to_config().unwrap().sample_rate_hz, 48000);
    }

    #[test]
    fn test_simple_mode_and_trail() {
        let args = Args::parse_from(["voiceforms", "--mode", "simple", "--trail", "--seed", "9"]);
        let config = args.to_config().unwrap();
        assert_eq!(config.mode, RenderMode::Simple);
        assert_eq!(config.size_scaling.divisor, 20.0);
        assert_eq!(config.decorations, DecorationPolicy::Trail);
        assert_eq!(config.seed, Some(9));
    }

    #[test]
    fn test_invalid_band_rejected() {
        let args = Args::parse_from(["voiceforms", "--low-hz", "4000", "--high-hz", "300"]);
        assert!(args.to_config().is_err());
    }
}
