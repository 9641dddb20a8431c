//! Spectral Analyzer
//!
//! Turns one axis of accelerometer samples into a magnitude spectrum on a
//! fixed frequency grid.
//!
//! # Pipeline
//!
//! ```text
//! samples ──FFT──▶ |X[k]|, k = 0..=n/2 ──lerp──▶ grid 0, step, ..., nyquist
//!                  at k * fs / n
//! ```
//!
//! The transform is the plain unnormalised DFT: no window, no scaling. A
//! constant series of value `v` therefore shows `n * |v|` at 0 Hz.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use rustfft::{num_complex::Complex, Fft, FftPlanner};

use crate::decoder::AxisSeries;
use crate::error::DspError;
use crate::resample::{frequency_grid, grid_len, interpolate_clamped, MAX_GRID_POINTS};

/// Series shorter than this produce an empty result
pub const MIN_SAMPLES: usize = 4;

/// Sampling rate of the reference sensor (Hz)
pub const DEFAULT_SAMPLE_RATE_HZ: f64 = 16384.0;

/// Output grid spacing (Hz)
pub const DEFAULT_FREQUENCY_STEP_HZ: f64 = 0.25;

/// Sampling rate and output grid spacing for one analyzer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectrumConfig {
    sample_rate_hz: f64,
    frequency_step_hz: f64,
}

impl SpectrumConfig {
    pub fn new(sample_rate_hz: f64, frequency_step_hz: f64) -> Result<Self, DspError> {
        if !sample_rate_hz.is_finite() || sample_rate_hz <= 0.0 {
            return Err(DspError::InvalidSampleRate(sample_rate_hz));
        }
        if !frequency_step_hz.is_finite() || frequency_step_hz <= 0.0 {
            return Err(DspError::InvalidStep(frequency_step_hz));
        }
        let nyquist = sample_rate_hz / 2.0;
        if grid_len(nyquist, frequency_step_hz) > MAX_GRID_POINTS {
            return Err(DspError::GridTooLarge {
                step: frequency_step_hz,
                nyquist,
                max: MAX_GRID_POINTS,
            });
        }
        Ok(Self {
            sample_rate_hz,
            frequency_step_hz,
        })
    }

    pub fn sample_rate_hz(&self) -> f64 {
        self.sample_rate_hz
    }

    pub fn frequency_step_hz(&self) -> f64 {
        self.frequency_step_hz
    }

    pub fn nyquist_hz(&self) -> f64 {
        self.sample_rate_hz / 2.0
    }
}

impl Default for SpectrumConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: DEFAULT_SAMPLE_RATE_HZ,
            frequency_step_hz: DEFAULT_FREQUENCY_STEP_HZ,
        }
    }
}

/// A magnitude spectrum on a uniform frequency grid
///
/// `frequencies` and `magnitudes` always have the same length. Both are
/// empty when the source series was too short to analyse.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpectralResult {
    frequencies: Vec<f64>,
    magnitudes: Vec<f64>,
}

impl SpectralResult {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Pair up a grid and its magnitudes; `None` if the lengths differ
    pub fn from_parts(frequencies: Vec<f64>, magnitudes: Vec<f64>) -> Option<Self> {
        (frequencies.len() == magnitudes.len()).then_some(Self {
            frequencies,
            magnitudes,
        })
    }

    pub fn frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    pub fn magnitudes(&self) -> &[f64] {
        &self.magnitudes
    }

    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    /// Frequency and magnitude of the strongest non-DC grid point
    pub fn peak(&self) -> Option<(f64, f64)> {
        self.frequencies
            .iter()
            .zip(&self.magnitudes)
            .skip(1)
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(f, m)| (*f, *m))
    }

    pub fn into_parts(self) -> (Vec<f64>, Vec<f64>) {
        (self.frequencies, self.magnitudes)
    }
}

/// Frequencies of the one-sided DFT bins for an `n`-point transform
pub fn native_frequencies(n: usize, sample_rate_hz: f64) -> Vec<f64> {
    if n == 0 {
        return Vec::new();
    }
    let bin_width = sample_rate_hz / n as f64;
    (0..=n / 2).map(|k| k as f64 * bin_width).collect()
}

/// One-sided magnitude spectrum (`n / 2 + 1` bins) of a real series
///
/// Plans a fresh FFT on every call; use [`SpectralAnalyzer`] for repeated
/// analysis.
pub fn magnitude_spectrum<T>(samples: &[T]) -> Vec<f64>
where
    T: Copy + Into<f64>,
{
    if samples.is_empty() {
        return Vec::new();
    }
    let fft = FftPlanner::<f64>::new().plan_fft_forward(samples.len());
    one_sided_magnitudes(fft.as_ref(), samples)
}

fn one_sided_magnitudes<T>(fft: &dyn Fft<f64>, samples: &[T]) -> Vec<f64>
where
    T: Copy + Into<f64>,
{
    let mut buffer: Vec<Complex<f64>> = samples
        .iter()
        .map(|&s| Complex::new(s.into(), 0.0))
        .collect();
    fft.process(&mut buffer);

    buffer[..samples.len() / 2 + 1]
        .iter()
        .map(|c| c.norm())
        .collect()
}

/// Computes resampled magnitude spectra for a fixed configuration
///
/// The output grid is computed once up front; FFT plans are cached per
/// input length, so steady streams of equal-sized payloads only plan once.
/// The analyzer is `Send + Sync` and can serve several axes concurrently.
pub struct SpectralAnalyzer {
    config: SpectrumConfig,
    grid: Arc<[f64]>,
    plans: Mutex<HashMap<usize, Arc<dyn Fft<f64>>>>,
}

impl SpectralAnalyzer {
    pub fn new(config: SpectrumConfig) -> Self {
        let grid = frequency_grid(config.nyquist_hz(), config.frequency_step_hz()).into();
        Self {
            config,
            grid,
            plans: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &SpectrumConfig {
        &self.config
    }

    /// The output grid every non-empty result uses
    pub fn grid(&self) -> &[f64] {
        &self.grid
    }

    /// Analyse one series
    ///
    /// Returns an empty result when `samples.len() < MIN_SAMPLES`.
    pub fn analyze<T>(&self, samples: &[T]) -> SpectralResult
    where
        T: Copy + Into<f64>,
    {
        let n = samples.len();
        if n < MIN_SAMPLES {
            return SpectralResult::empty();
        }

        let fft = self.plan(n);
        let spectrum = one_sided_magnitudes(fft.as_ref(), samples);
        let native = native_frequencies(n, self.config.sample_rate_hz());

        SpectralResult {
            frequencies: self.grid.to_vec(),
            magnitudes: interpolate_clamped(&native, &spectrum, &self.grid),
        }
    }

    /// Cached forward plan for `n` points; the lock is released before the
    /// transform runs
    fn plan(&self, n: usize) -> Arc<dyn Fft<f64>> {
        let mut plans = self.plans.lock();
        Arc::clone(
            plans
                .entry(n)
                .or_insert_with(|| FftPlanner::<f64>::new().plan_fft_forward(n)),
        )
    }

    /// Analyse all three axes of a decoded payload, in x, y, z order
    pub fn analyze_axes(&self, series: &AxisSeries) -> [SpectralResult; 3] {
        [
            self.analyze(series.x()),
            self.analyze(series.y()),
            self.analyze(series.z()),
        ]
    }
}

impl Default for SpectralAnalyzer {
    fn default() -> Self {
        Self::new(SpectrumConfig::default())
    }
}

impl std::fmt::Debug for SpectralAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpectralAnalyzer")
            .field("config", &self.config)
            .field("grid_len", &self.grid.len())
            .field("cached_plans", &self.plans.lock().len())
            .finish()
    }
}
