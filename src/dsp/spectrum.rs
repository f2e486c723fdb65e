use crate::error::{Result, VisualizerError};
use lazy_static::lazy_static;
use num_complex::Complex32;
use parking_lot::Mutex;
use rustfft::{Fft, FftPlanner};
use std::collections::HashMap;
use std::sync::Arc;

lazy_static! {
    static ref PLAN_CACHE: Mutex<HashMap<usize, Arc<dyn Fft<f32>>>> = Mutex::new(HashMap::new());
}

/// Returns a forward FFT plan for size `n`, planning it once per process.
pub fn find_plan(n: usize) -> Arc<dyn Fft<f32>> {
    let mut cache = PLAN_CACHE.lock();
    cache
        .entry(n)
        .or_insert_with(|| {
            log::debug!("Planning forward FFT for N={}", n);
            FftPlanner::new().plan_fft_forward(n)
        })
        .clone()
}

/// Frequency of spectrum bin `index` for a block of `block_len` samples.
pub fn bin_frequency(index: usize, sample_rate: f32, block_len: usize) -> f32 {
    (index as f32 * sample_rate / block_len as f32).abs()
}

/// Per-block features feeding the visual mapping.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SpectralFeatures {
    /// Peak-bin frequency, clamped into the band of interest.
    pub dominant_frequency_hz: f32,
    /// Mean absolute amplitude of the filtered time-domain block.
    pub level: f32,
}

/// Picks the dominant frequency and level out of a filtered block.
pub struct SpectralAnalyzer {
    block_len: usize,
    bins: usize,
    low_freq_hz: f32,
    high_freq_hz: f32,
    plan: Arc<dyn Fft<f32>>,
    scratch: Vec<Complex32>,
    magnitudes: Vec<f32>,
}

impl SpectralAnalyzer {
    pub fn new(block_len: usize, bins: usize, low_freq_hz: f32, high_freq_hz: f32) -> Result<Self> {
        if block_len == 0 || bins == 0 || bins > block_len {
            return Err(VisualizerError::InvalidConfig(format!(
                "cannot keep {} bins of a {}-sample block",
                bins, block_len
            )));
        }
        Ok(Self {
            block_len,
            bins,
            low_freq_hz,
            high_freq_hz,
            plan: find_plan(block_len),
            scratch: vec![Complex32::new(0.0, 0.0); block_len],
            magnitudes: vec![0.0; bins],
        })
    }

    pub fn block_len(&self) -> usize {
        self.block_len
    }

    /// Width of one spectrum bin at `sample_rate`.
    pub fn bin_width(&self, sample_rate: f32) -> f32 {
        sample_rate / self.block_len as f32
    }

    /// Magnitudes of the retained bins from the last analysis.
    pub fn magnitudes(&self) -> &[f32] {
        &self.magnitudes
    }

    pub fn analyze(&mut self, filtered: &[f32], sample_rate: f32) -> Result<SpectralFeatures> {
        if filtered.len() != self.block_len {
            return Err(VisualizerError::InvalidBlockLength {
                expected: self.block_len,
                actual: filtered.len(),
            });
        }

        for (slot, &x) in self.scratch.iter_mut().zip(filtered) {
            *slot = Complex32::new(x, 0.0);
        }
        self.plan.process(&mut self.scratch);

        //
        // Peak over the retained bins; ties resolve to the lowest bin.
        //
        let mut peak_index = 0;
        let mut peak = f32::NEG_INFINITY;
        for (i, (mag, c)) in self.magnitudes.iter_mut().zip(&self.scratch).enumerate() {
            *mag = c.norm();
            if *mag > peak {
                peak = *mag;
                peak_index = i;
            }
        }

        let dominant = bin_frequency(peak_index, sample_rate, self.block_len)
            .clamp(self.low_freq_hz, self.high_freq_hz);
        let level = filtered.iter().map(|x| x.abs()).sum::<f32>() / self.block_len as f32;

        log::trace!(
            "peak bin {} of {} -> {:.1} Hz, level {:.1}",
            peak_index,
            self.bins,
            dominant,
            level
        );

        Ok(SpectralFeatures {
            dominant_frequency_hz: dominant,
            level,
        })
    }
}
