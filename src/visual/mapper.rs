use super::color::Rgb;
use crate::config::SizeScaling;
use crate::dsp::SpectralFeatures;

const PRIMARY_SATURATION: f32 = 0.8;
const PRIMARY_VALUE: f32 = 0.9;
const SECONDARY_SATURATION: f32 = 0.7;
const SECONDARY_VALUE: f32 = 0.8;

/// Colors and size derived from one tick's features.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisualStyle {
    pub primary_color: Rgb,
    pub secondary_color: Rgb,
    pub base_size: f32,
    /// Hue of `primary_color` in degrees.
    pub primary_hue: f32,
    /// Complement of `primary_hue` in degrees.
    pub secondary_hue: f32,
}

/// Maps dominant frequency to a complementary color pair and level to size.
#[derive(Debug, Clone, Copy)]
pub struct FeatureToVisualMapper {
    low_freq_hz: f32,
    high_freq_hz: f32,
    scaling: SizeScaling,
}

impl FeatureToVisualMapper {
    pub fn new(low_freq_hz: f32, high_freq_hz: f32, scaling: SizeScaling) -> Self {
        Self {
            low_freq_hz,
            high_freq_hz,
            scaling,
        }
    }

    /// Position of `freq_hz` inside the band, in [0, 1].
    pub fn normalize(&self, freq_hz: f32) -> f32 {
        let span = self.high_freq_hz - self.low_freq_hz;
        if span <= 0.0 {
            return 0.0;
        }
        ((freq_hz - self.low_freq_hz) / span).clamp(0.0, 1.0)
    }

    pub fn base_size(&self, level: f32) -> f32 {
        (level / self.scaling.divisor).max(self.scaling.min_size)
    }

    pub fn map(&self, features: &SpectralFeatures) -> VisualStyle {
        let primary_hue = self.normalize(features.dominant_frequency_hz) * 360.0;
        let secondary_hue = (primary_hue + 180.0) % 360.0;

        VisualStyle {
            primary_color: Rgb::from_hsv(primary_hue, PRIMARY_SATURATION, PRIMARY_VALUE),
            secondary_color: Rgb::from_hsv(secondary_hue, SECONDARY_SATURATION, SECONDARY_VALUE),
            base_size: self.base_size(features.level),
            primary_hue,
            secondary_hue,
        }
    }
}
