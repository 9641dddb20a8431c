//! Frequency Grid Resampling
//!
//! Native FFT bins sit at `k * sample_rate / n`, which moves with every
//! payload length. Displays want a fixed grid instead, so each spectrum is
//! mapped onto `0, step, 2*step, ...` up to the Nyquist frequency with
//! piecewise-linear interpolation.

/// Slack applied when counting grid points so that `nyquist / step`
/// landing a hair under an integer does not drop the last point.
const GRID_EPSILON: f64 = 1e-9;

/// Largest grid a [`SpectrumConfig`](crate::SpectrumConfig) will accept
pub const MAX_GRID_POINTS: usize = 1 << 22;

/// Number of points on the uniform grid `0, step, ..., <= nyquist`
///
/// Computed as an integer count rather than by repeated addition so the
/// top of the grid is reproducible. A step wider than `nyquist` gives the
/// single point `0`. Huge ratios saturate at `usize::MAX`.
pub fn grid_len(nyquist: f64, step: f64) -> usize {
    // float -> int `as` saturates
    ((nyquist / step + GRID_EPSILON).floor() as usize).saturating_add(1)
}

/// Uniform frequency grid from 0 Hz up to and including `nyquist`
pub fn frequency_grid(nyquist: f64, step: f64) -> Vec<f64> {
    (0..grid_len(nyquist, step)).map(|k| k as f64 * step).collect()
}

/// Piecewise-linear interpolation of `(xp, fp)` at each of `targets`
///
/// - `xp` must be ascending and the same length as `fp`
/// - targets left of `xp[0]` take `fp[0]`, right of the last point take the
///   last value (clamped, never extrapolated)
/// - empty `xp` yields an empty result
///
/// Targets are expected in ascending order; a moving cursor keeps this
/// linear in `xp.len() + targets.len()`. Unordered targets are still
/// answered correctly, just by restarting the scan.
pub fn interpolate_clamped(xp: &[f64], fp: &[f64], targets: &[f64]) -> Vec<f64> {
    debug_assert_eq!(xp.len(), fp.len());
    let n = xp.len().min(fp.len());
    if n == 0 {
        return Vec::new();
    }

    let first = (xp[0], fp[0]);
    let last = (xp[n - 1], fp[n - 1]);
    let mut cursor = 0;

    targets
        .iter()
        .map(|&x| {
            if x <= first.0 {
                return first.1;
            }
            if x >= last.0 {
                return last.1;
            }

            if xp[cursor] > x {
                cursor = 0;
            }
            // Invariant after the loop: xp[cursor] <= x < xp[cursor + 1]
            while xp[cursor + 1] <= x {
                cursor += 1;
            }

            let (x0, x1) = (xp[cursor], xp[cursor + 1]);
            let (y0, y1) = (fp[cursor], fp[cursor + 1]);
            y0 + (y1 - y0) * (x - x0) / (x1 - x0)
        })
        .collect()
}
