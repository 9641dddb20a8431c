//! DSP Error Types

use thiserror::Error;

/// Errors raised while building a spectrum configuration
///
/// Analysis itself never fails; these only guard the parameters
/// handed to [`SpectrumConfig::new`](crate::SpectrumConfig::new).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DspError {
    #[error("Sample rate must be positive and finite, got {0}Hz")]
    InvalidSampleRate(f64),

    #[error("Frequency step must be positive and finite, got {0}Hz")]
    InvalidStep(f64),

    #[error("Frequency step {step}Hz up to {nyquist}Hz needs more than {max} grid points")]
    GridTooLarge { step: f64, nyquist: f64, max: usize },
}
