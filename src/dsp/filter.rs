use crate::error::{Result, VisualizerError};
use num_complex::Complex64;
use std::f64::consts::PI;

/// Highest prototype order accepted; the band-pass has twice as many poles.
pub const MAX_ORDER: usize = 16;

/// One second-order section, normalized so that `a[0] == 1`.
#[derive(Debug, Clone, Copy)]
struct Biquad {
    b: [f64; 3],
    a: [f64; 3],
}

impl Biquad {
    /// Frequency response at `z^-1 = zinv`.
    fn response(&self, zinv: Complex64) -> Complex64 {
        let zinv2 = zinv * zinv;
        let num = self.b[0] + zinv * self.b[1] + zinv2 * self.b[2];
        let den = self.a[0] + zinv * self.a[1] + zinv2 * self.a[2];
        num / den
    }
}

/// Butterworth band-pass designed by bilinear transform and run as a cascade
/// of second-order sections.
///
/// Each call to [`BandpassFilter::filter`] starts from zero state; no memory
/// is carried between blocks.
#[derive(Debug, Clone)]
pub struct BandpassFilter {
    sections: Vec<Biquad>,
    low_hz: f32,
    high_hz: f32,
    sample_rate: f32,
    order: usize,
}

impl BandpassFilter {
    /// Designs the filter for the passband `[low_hz, high_hz]` at `sample_rate`.
    pub fn design(low_hz: f32, high_hz: f32, sample_rate: f32, order: usize) -> Result<Self> {
        let invalid = |reason: &str| VisualizerError::InvalidFilterSpec {
            low_hz,
            high_hz,
            order,
            reason: reason.to_string(),
        };

        if order == 0 || order > MAX_ORDER {
            return Err(invalid("order must be within 1..=16"));
        }
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(invalid("sample rate must be positive"));
        }
        let nyquist = sample_rate / 2.0;
        if !(low_hz > 0.0 && low_hz < high_hz && high_hz < nyquist) {
            return Err(invalid("cutoffs must satisfy 0 < low < high < nyquist"));
        }

        //
        // Pre-warp the band edges for the bilinear transform.
        //
        let fs = sample_rate as f64;
        let fs2 = 2.0 * fs;
        let w1 = fs2 * (PI * low_hz as f64 / fs).tan();
        let w2 = fs2 * (PI * high_hz as f64 / fs).tan();
        let bandwidth = w2 - w1;
        let center_sq = w1 * w2;

        //
        // Analog low-pass prototype poles, shifted into band-pass pairs and
        // mapped into the z-plane.
        //
        let mut poles = Vec::with_capacity(2 * order);
        for k in 0..order {
            let theta = PI * (2 * k + order + 1) as f64 / (2 * order) as f64;
            let proto = Complex64::new(theta.cos(), theta.sin());
            let half = proto * (bandwidth / 2.0);
            let disc = (half * half - center_sq).sqrt();
            for s in [half + disc, half - disc] {
                poles.push((fs2 + s) / (fs2 - s));
            }
        }

        let sections = pair_sections(&poles);
        if sections.len() != order {
            return Err(invalid("pole pairing failed"));
        }

        //
        // Normalize for unity gain at the digital center frequency.
        //
        let center = 2.0 * (center_sq.sqrt() / fs2).atan();
        let zinv = Complex64::from_polar(1.0, -center);
        let response: Complex64 = sections.iter().map(|s| s.response(zinv)).product();
        let magnitude = response.norm();
        if !(magnitude.is_finite() && magnitude > 0.0) {
            return Err(invalid("degenerate response at center frequency"));
        }
        let per_section = (1.0 / magnitude).powf(1.0 / order as f64);
        let sections = sections
            .into_iter()
            .map(|mut s| {
                s.b.iter_mut().for_each(|b| *b *= per_section);
                s
            })
            .collect();

        Ok(Self {
            sections,
            low_hz,
            high_hz,
            sample_rate,
            order,
        })
    }

    /// Filters one block causally from zero initial state.
    pub fn filter<T>(&self, samples: &[T]) -> Vec<f32>
    where
        T: Copy + Into<f64>,
    {
        let mut state = vec![[0.0f64; 2]; self.sections.len()];
        samples
            .iter()
            .map(|&x| {
                let mut v: f64 = x.into();
                for (s, z) in self.sections.iter().zip(state.iter_mut()) {
                    // Direct form II transposed.
                    let y = s.b[0] * v + z[0];
                    z[0] = s.b[1] * v - s.a[1] * y + z[1];
                    z[1] = s.b[2] * v - s.a[2] * y;
                    v = y;
                }
                v as f32
            })
            .collect()
    }

    /// Magnitude response at `freq_hz`.
    pub fn gain_at(&self, freq_hz: f32) -> f32 {
        let w = 2.0 * PI * freq_hz as f64 / self.sample_rate as f64;
        let zinv = Complex64::from_polar(1.0, -w);
        let h: Complex64 = self.sections.iter().map(|s| s.response(zinv)).product();
        h.norm() as f32
    }

    pub fn band(&self) -> (f32, f32) {
        (self.low_hz, self.high_hz)
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }
}

/// Groups z-plane poles into second-order sections. Every section gets one
/// zero at DC and one at Nyquist.
fn pair_sections(poles: &[Complex64]) -> Vec<Biquad> {
    const IMAG_EPS: f64 = 1e-12;
    let zeros = [1.0, 0.0, -1.0];

    let mut sections: Vec<Biquad> = poles
        .iter()
        .filter(|p| p.im > IMAG_EPS)
        .map(|p| Biquad {
            b: zeros,
            a: [1.0, -2.0 * p.re, p.norm_sqr()],
        })
        .collect();

    let mut reals: Vec<f64> = poles
        .iter()
        .filter(|p| p.im.abs() <= IMAG_EPS)
        .map(|p| p.re)
        .collect();
    reals.sort_by(|a, b| a.total_cmp(b));
    for pair in reals.chunks_exact(2) {
        sections.push(Biquad {
            b: zeros,
            a: [1.0, -(pair[0] + pair[1]), pair[0] * pair[1]],
        });
    }

    sections
}

/// Designs a band-pass and filters `samples` with it in one call.
pub fn apply<T>(
    samples: &[T],
    low_hz: f32,
    high_hz: f32,
    sample_rate: f32,
    order: usize,
) -> Result<Vec<f32>>
where
    T: Copy + Into<f64>,
{
    let filter = BandpassFilter::design(low_hz, high_hz, sample_rate, order)?;
    Ok(filter.filter(samples))
}
