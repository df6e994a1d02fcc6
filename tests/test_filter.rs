mod common;
use common::max_abs_diff;
use reprep::filter::{convolve_same, gaussian_kernel, gaussian_smooth, kernel_radius, DEFAULT_TRUNCATE};

// ── Kernel ────────────────────────────────────────────────────────────────────

#[test]
fn kernel_is_normalised_and_symmetric() {
    for sigma in [0.5, 1.0, 2.0, 7.3] {
        let h = gaussian_kernel(sigma, DEFAULT_TRUNCATE).unwrap();
        assert_eq!(h.len(), 2 * kernel_radius(sigma, DEFAULT_TRUNCATE) + 1);
        approx::assert_abs_diff_eq!(h.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        let n = h.len();
        for i in 0..n / 2 {
            approx::assert_abs_diff_eq!(h[i], h[n - 1 - i], epsilon = 1e-15);
        }
    }
}

#[test]
fn kernel_peak_at_centre() {
    let h = gaussian_kernel(2.0, DEFAULT_TRUNCATE).unwrap();
    let centre = h.len() / 2;
    assert!(h.iter().all(|&v| v <= h[centre]));
}

#[test]
fn non_positive_sigma_rejected() {
    assert!(gaussian_kernel(0.0, DEFAULT_TRUNCATE).is_err());
    assert!(gaussian_kernel(-1.0, DEFAULT_TRUNCATE).is_err());
}

// ── Smoothing ─────────────────────────────────────────────────────────────────

#[test]
fn constant_signal_unchanged() {
    let x = vec![3.25; 777];
    let y = gaussian_smooth(&x, 2.0).unwrap();
    assert!(max_abs_diff(&x, &y) < 1e-12);
}

#[test]
fn impulse_response_is_the_kernel() {
    let mut x = vec![0.0; 101];
    x[50] = 1.0;
    let h = gaussian_kernel(2.0, DEFAULT_TRUNCATE).unwrap();
    let y = convolve_same(&x, &h).unwrap();
    let r = h.len() / 2;
    assert!(max_abs_diff(&y[50 - r..=50 + r], &h) < 1e-12);
    assert!(y[..50 - r].iter().all(|v| v.abs() < 1e-12));
}

#[test]
fn smoothing_reduces_alternating_noise() {
    let x: Vec<f64> = (0..1000).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
    let y = gaussian_smooth(&x, 2.0).unwrap();
    let peak = y[100..900].iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    assert!(peak < 1e-3, "residual {peak:.2e}");
}

#[test]
fn mirrored_edges_preserve_mean_of_step() {
    // Half-sample mirroring keeps a flat edge flat.
    let x: Vec<f64> = (0..200).map(|i| if i < 100 { 0.0 } else { 1.0 }).collect();
    let y = gaussian_smooth(&x, 3.0).unwrap();
    approx::assert_abs_diff_eq!(y[0], 0.0, epsilon = 1e-12);
    approx::assert_abs_diff_eq!(y[199], 1.0, epsilon = 1e-12);
    approx::assert_abs_diff_eq!(y[99] + y[100], 1.0, epsilon = 1e-12);
}
