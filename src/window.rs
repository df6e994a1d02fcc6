//! Sliding windows over a shot.
//!
//! A shot of `T` rows is cut into windows of `window` rows starting every
//! `stride` rows; a trailing partial window is dropped:
//!
//! ```text
//! starts = 0, stride, 2·stride, …  while start + window <= T
//! ```
//!
//! Features `[T, F]` become `[W, window, F]`, targets `[T]` become
//! `[W, window]`.
use ndarray::{s, Array2, Array3, ArrayView1, ArrayView2};

use crate::error::{PrepError, Result};

/// Number of windows over `n` rows (`0` if the shot is too short or a
/// parameter is zero).
pub fn window_count(n: usize, window: usize, stride: usize) -> usize {
    if window == 0 || stride == 0 || n < window {
        return 0;
    }
    (n - window) / stride + 1
}

fn check(window: usize, stride: usize) -> Result<()> {
    if window == 0 || stride == 0 {
        return Err(PrepError::InvalidParameter(format!(
            "window {window} / stride {stride} must be positive"
        )));
    }
    Ok(())
}

/// Window `x` (`[T, F]`) into `[W, window, F]`.
pub fn sliding_windows(x: ArrayView2<f32>, window: usize, stride: usize) -> Result<Array3<f32>> {
    check(window, stride)?;
    let (n_t, n_f) = x.dim();
    let n_w = window_count(n_t, window, stride);

    let mut out = Array3::<f32>::zeros((n_w, window, n_f));
    for w in 0..n_w {
        let start = w * stride;
        out.slice_mut(s![w, .., ..])
            .assign(&x.slice(s![start..start + window, ..]));
    }
    Ok(out)
}

/// Window `y` (`[T]`) into `[W, window]`.
pub fn sliding_windows_1d(y: ArrayView1<f32>, window: usize, stride: usize) -> Result<Array2<f32>> {
    check(window, stride)?;
    let n_w = window_count(y.len(), window, stride);

    let mut out = Array2::<f32>::zeros((n_w, window));
    for w in 0..n_w {
        let start = w * stride;
        out.row_mut(w).assign(&y.slice(s![start..start + window]));
    }
    Ok(out)
}
