//! Gaussian smoothing kernel matching `scipy.ndimage.gaussian_filter1d`.
//!
//! For a standard deviation `sigma` (in samples) and `truncate` (in sigmas):
//!   • radius  r = floor(truncate · sigma + 0.5)
//!   • taps      = 2r + 1  (always odd, centred)
//!   • weights   w[i] = exp(-0.5 · (i - r)² / sigma²), normalised to sum 1
use crate::error::{PrepError, Result};

/// Default truncation used by scipy (kernel spans ±4σ).
pub const DEFAULT_TRUNCATE: f64 = 4.0;

/// Kernel radius in samples.
pub fn kernel_radius(sigma: f64, truncate: f64) -> usize {
    (truncate * sigma + 0.5).floor() as usize
}

/// Design a normalised Gaussian kernel of odd length `2r + 1`.
pub fn gaussian_kernel(sigma: f64, truncate: f64) -> Result<Vec<f64>> {
    if !(sigma.is_finite() && sigma > 0.0) || !(truncate.is_finite() && truncate > 0.0) {
        return Err(PrepError::InvalidParameter(format!(
            "gaussian sigma={sigma}, truncate={truncate}"
        )));
    }
    let r = kernel_radius(sigma, truncate) as isize;
    let inv_two_var = 0.5 / (sigma * sigma);
    let mut h: Vec<f64> = (-r..=r)
        .map(|i| (-(i * i) as f64 * inv_two_var).exp())
        .collect();

    // Unit DC gain.
    let s: f64 = h.iter().sum();
    h.iter_mut().for_each(|v| *v /= s);
    Ok(h)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernel_length_is_odd() {
        for sigma in [0.3_f64, 1.0, 2.0, 3.7, 10.0] {
            let h = gaussian_kernel(sigma, DEFAULT_TRUNCATE).unwrap();
            assert!(h.len() % 2 == 1, "N={} is even for sigma={sigma}", h.len());
            assert_eq!(h.len(), 2 * kernel_radius(sigma, DEFAULT_TRUNCATE) + 1);
        }
    }

    #[test]
    fn kernel_known_length() {
        // scipy: sigma=2, truncate=4 → radius 8 → 17 taps.
        assert_eq!(gaussian_kernel(2.0, 4.0).unwrap().len(), 17);
    }

    #[test]
    fn kernel_dc_gain_unity_and_symmetric() {
        let h = gaussian_kernel(3.0, DEFAULT_TRUNCATE).unwrap();
        approx::assert_abs_diff_eq!(h.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        let n = h.len();
        for i in 0..n / 2 {
            approx::assert_abs_diff_eq!(h[i], h[n - 1 - i], epsilon = 1e-15);
        }
        // Peak at the centre.
        assert!(h[n / 2] > h[n / 2 - 1]);
    }

    #[test]
    fn rejects_non_positive_sigma() {
        assert!(gaussian_kernel(0.0, 4.0).is_err());
        assert!(gaussian_kernel(-1.0, 4.0).is_err());
    }
}
