//! Tremor DSP - Telemetry Signal Processing
//!
//! This crate turns raw accelerometer payloads into frequency-domain data:
//! - Fixed-width decoding of little-endian (x, y, z) sample blocks
//! - One-sided FFT magnitude spectra
//! - Resampling of each spectrum onto a uniform frequency grid
//!
//! # Architecture
//!
//! Everything here is pure and total. Malformed payloads decode to fewer
//! samples and short series analyse to an empty result; the only fallible
//! step is validating a [`SpectrumConfig`].

mod decoder;
mod error;
mod resample;
mod spectrum;

pub use decoder::{
    decode_payload, decode_triplets, encode_triplets, triplets, AxisSeries, SampleTriplet,
    BLOCK_SIZE,
};
pub use error::DspError;
pub use resample::{frequency_grid, grid_len, interpolate_clamped, MAX_GRID_POINTS};
pub use spectrum::{
    magnitude_spectrum, native_frequencies, SpectralAnalyzer, SpectralResult, SpectrumConfig,
    DEFAULT_FREQUENCY_STEP_HZ, DEFAULT_SAMPLE_RATE_HZ, MIN_SAMPLES,
};
