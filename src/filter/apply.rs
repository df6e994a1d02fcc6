//! Overlap-add zero-phase FIR convolution.
//!
//! Zero-phase is achieved by shifting the output left by `(N-1)/2` samples.
//! Edges are handled by half-sample symmetric mirroring of the input
//! (`d c b a | a b c d | d c b a`, scipy.ndimage `mode='reflect'`), so a
//! constant signal stays exactly constant up to rounding.
use rustfft::{num_complex::Complex, FftPlanner};

use crate::error::{PrepError, Result};

/// Convolve `x` with the odd-length, centred kernel `h`.
///
/// Returns a vector of the same length as `x`.
pub fn convolve_same(x: &[f64], h: &[f64]) -> Result<Vec<f64>> {
    let n_x = x.len();
    let n_h = h.len();

    if n_h % 2 == 0 {
        return Err(PrepError::InvalidParameter(format!(
            "kernel length {n_h} must be odd"
        )));
    }
    if n_x == 0 {
        return Ok(vec![]);
    }

    // Shift for zero-phase; one kernel radius of mirrored padding suffices.
    let shift = (n_h - 1) / 2;
    let x_ext = reflect_pad(x, shift);
    let n_ext = x_ext.len();

    let n_fft = choose_fft_len(n_h, n_ext);
    let h_fft = fft_of_h(h, n_fft);

    // Overlap-add.
    let n_seg = n_fft - n_h + 1;
    let n_segments = n_ext.div_ceil(n_seg);
    let mut x_filtered = vec![0.0_f64; n_ext];

    let mut planner: FftPlanner<f64> = FftPlanner::new();
    let fft_fwd = planner.plan_fft_forward(n_fft);
    let fft_inv = planner.plan_fft_inverse(n_fft);
    let inv_scale = 1.0 / n_fft as f64;

    for seg_idx in 0..n_segments {
        let start = seg_idx * n_seg;
        let stop = (start + n_seg).min(n_ext);

        let mut buf: Vec<Complex<f64>> = x_ext[start..stop]
            .iter()
            .map(|&v| Complex { re: v, im: 0.0 })
            .chain(std::iter::repeat(Complex::default()))
            .take(n_fft)
            .collect();

        fft_fwd.process(&mut buf);
        for (b, &hf) in buf.iter_mut().zip(h_fft.iter()) {
            *b *= hf;
        }
        fft_inv.process(&mut buf);

        let out_start = start.saturating_sub(shift);
        let out_end = (out_start + n_fft).min(n_ext);
        let prod_start = shift.saturating_sub(start);

        for (o, p) in (out_start..out_end).zip(prod_start..) {
            if p < buf.len() {
                x_filtered[o] += buf[p].re * inv_scale;
            }
        }
    }

    Ok(x_filtered[shift..shift + n_x].to_vec())
}

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Half-sample symmetric padding of `pad` samples on each side.
///
/// Works for any `pad`, including pads longer than the signal (the mirror
/// repeats with period `2n`).
fn reflect_pad(x: &[f64], pad: usize) -> Vec<f64> {
    let n = x.len() as isize;
    let period = 2 * n;
    let mirror = |i: isize| -> f64 {
        let m = i.rem_euclid(period);
        let idx = if m < n { m } else { period - 1 - m };
        x[idx as usize]
    };
    let pad = pad as isize;
    (-pad..n + pad).map(mirror).collect()
}

/// Power-of-two FFT block size minimising the overlap-add operation count:
///   `cost = ceil(n_x / (N - n_h + 1)) * N * (log2(N) + 1) + 4e-5 * N * n_x`
fn choose_fft_len(n_h: usize, n_x: usize) -> usize {
    let min_fft = 2 * n_h - 1;

    let max_pow = ((n_x.max(min_fft)) as f64).log2().ceil() as u32 + 1;
    let min_pow = (min_fft as f64).log2().ceil() as u32;

    let mut best_n = 1_usize << max_pow;
    let mut best_cost = f64::INFINITY;

    for pow in min_pow..=max_pow {
        let n = 1_usize << pow;
        if n < min_fft {
            continue;
        }
        let n_seg = (n - n_h + 1) as f64;
        let cost = (n_x as f64 / n_seg).ceil() * n as f64 * (pow as f64 + 1.0)
            + 4e-5 * n as f64 * n_x as f64;
        if cost < best_cost {
            best_cost = cost;
            best_n = n;
        }
    }
    best_n
}

/// FFT of `h` zero-padded to `n_fft`.
fn fft_of_h(h: &[f64], n_fft: usize) -> Vec<Complex<f64>> {
    let mut buf: Vec<Complex<f64>> = h
        .iter()
        .map(|&v| Complex { re: v, im: 0.0 })
        .chain(std::iter::repeat(Complex::default()))
        .take(n_fft)
        .collect();
    let mut planner: FftPlanner<f64> = FftPlanner::new();
    planner.plan_fft_forward(n_fft).process(&mut buf);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::design::{gaussian_kernel, DEFAULT_TRUNCATE};

    /// Direct-form reference: y[i] = Σ h[k] · x_ext[i + k].
    fn convolve_direct(x: &[f64], h: &[f64]) -> Vec<f64> {
        let r = (h.len() - 1) / 2;
        let x_ext = reflect_pad(x, r);
        (0..x.len())
            .map(|i| h.iter().enumerate().map(|(k, &hk)| hk * x_ext[i + k]).sum())
            .collect()
    }

    #[test]
    fn convolve_preserves_length() {
        let x: Vec<f64> = (0..1024).map(|i| (i as f64 / 50.0).sin()).collect();
        let h = gaussian_kernel(2.0, DEFAULT_TRUNCATE).unwrap();
        assert_eq!(convolve_same(&x, &h).unwrap().len(), x.len());
    }

    #[test]
    fn convolve_matches_direct_form() {
        let x: Vec<f64> = (0..300).map(|i| ((i * 7 % 13) as f64).sqrt()).collect();
        let h = gaussian_kernel(3.0, DEFAULT_TRUNCATE).unwrap();
        let fast = convolve_same(&x, &h).unwrap();
        let slow = convolve_direct(&x, &h);
        for (a, b) in fast.iter().zip(&slow) {
            approx::assert_abs_diff_eq!(a, b, epsilon = 1e-10);
        }
    }

    #[test]
    fn convolve_shorter_than_kernel() {
        let x = [1.0, 2.0, 3.0];
        let h = gaussian_kernel(5.0, DEFAULT_TRUNCATE).unwrap();
        let fast = convolve_same(&x, &h).unwrap();
        let slow = convolve_direct(&x, &h);
        for (a, b) in fast.iter().zip(&slow) {
            approx::assert_abs_diff_eq!(a, b, epsilon = 1e-10);
        }
    }

    #[test]
    fn reflect_pad_is_half_sample_symmetric() {
        let x = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(reflect_pad(&x, 2), vec![2.0, 1.0, 1.0, 2.0, 3.0, 4.0, 4.0, 3.0]);
        // Longer than the signal: the mirror repeats.
        assert_eq!(reflect_pad(&[5.0, 6.0], 3), vec![6.0, 6.0, 5.0, 5.0, 6.0, 6.0, 5.0, 5.0]);
    }

    #[test]
    fn even_kernel_rejected() {
        assert!(convolve_same(&[1.0, 2.0], &[0.5, 0.5]).is_err());
    }
}
