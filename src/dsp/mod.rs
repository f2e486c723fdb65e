//! Audio feature pipeline: band-limiting and spectral peak picking.

pub mod filter;
pub mod spectrum;

pub use filter::BandpassFilter;
pub use spectrum::{SpectralAnalyzer, SpectralFeatures};
