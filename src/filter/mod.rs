//! Post-interpolation smoothing.
//!
//! - [`design`]: Gaussian kernel design, matching
//!   `scipy.ndimage.gaussian_filter1d(truncate=4.0)`.
//! - [`apply`]: overlap-add zero-phase convolution with mirrored edges.

pub mod apply;
pub mod design;

pub use apply::convolve_same;
pub use design::{gaussian_kernel, kernel_radius, DEFAULT_TRUNCATE};

use crate::error::Result;

/// Smooth `x` with a Gaussian of standard deviation `sigma` samples.
pub fn gaussian_smooth(x: &[f64], sigma: f64) -> Result<Vec<f64>> {
    let h = gaussian_kernel(sigma, DEFAULT_TRUNCATE)?;
    convolve_same(x, &h)
}
