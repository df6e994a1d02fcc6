//! Resampling of one irregularly-sampled channel onto a regular grid.
//!
//! Algorithm:
//!   1. Drop non-finite samples, sort by time if the source is out of order.
//!   2. Keep samples with `begin <= t <= end`.
//!   3. No samples left → the grid with an all-zero signal (missing-data
//!      placeholder, not an error).
//!   4. `Interpolate`: `np.interp`-style linear interpolation onto the grid
//!      (clamped to the first/last sample outside the sampled range),
//!      optionally followed by a Gaussian smoothing pass.
//!      `BinMean` / `BinMedian`: samples bucketed into the grid's bins
//!      (`pd.cut(..., include_lowest=True)`), aggregated per bin; empty bins
//!      are filled by interpolating between the neighbouring non-empty bins.
//!
//! The grid depends only on `(window, GridSpec)`, so every channel of a shot
//! resampled with the same [`Grid`] shares bit-identical timestamps.
use serde::{Deserialize, Serialize};

use crate::error::{PrepError, Result};
use crate::filter::gaussian_smooth;

// ── Window and grid ────────────────────────────────────────────────────────

/// Time window `[begin, end]` with `end > begin`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResampleWindow {
    begin: f64,
    end: f64,
}

impl ResampleWindow {
    pub fn new(begin: f64, end: f64) -> Result<Self> {
        if !begin.is_finite() || !end.is_finite() || end <= begin {
            return Err(PrepError::InvalidWindow { begin, end });
        }
        Ok(Self { begin, end })
    }

    #[inline]
    pub fn begin(&self) -> f64 {
        self.begin
    }

    #[inline]
    pub fn end(&self) -> f64 {
        self.end
    }

    #[inline]
    pub fn contains(&self, t: f64) -> bool {
        self.begin <= t && t <= self.end
    }
}

/// How the shared grid is spaced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridSpec {
    /// Fixed step in seconds, `arange(begin, end, step)` (end excluded).
    Step(f64),
    /// Fixed number of points, `linspace(begin, end, n)` (end included).
    Length(usize),
}

/// A shared time grid plus the bin edges used by the binned modes.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    time: Vec<f64>,
    edges: Vec<f64>,
}

impl Grid {
    pub fn build(window: &ResampleWindow, spec: GridSpec) -> Result<Self> {
        let (b, e) = (window.begin, window.end);
        match spec {
            GridSpec::Step(dt) => {
                if !(dt.is_finite() && dt > 0.0) {
                    return Err(PrepError::InvalidParameter(format!("step size {dt}")));
                }
                let n = step_count(e - b, dt);
                let time: Vec<f64> = (0..n).map(|i| b + i as f64 * dt).collect();
                let mut edges: Vec<f64> = (0..=n).map(|i| b + i as f64 * dt).collect();
                if let Some(last) = edges.last_mut() {
                    *last = last.min(e);
                }
                Ok(Self { time, edges })
            }
            GridSpec::Length(n) => {
                if n == 0 {
                    return Err(PrepError::InvalidParameter("grid length 0".into()));
                }
                Ok(Self { time: linspace(b, e, n), edges: linspace(b, e, n + 1) })
            }
        }
    }

    #[inline]
    pub fn time(&self) -> &[f64] {
        &self.time
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.time.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Bin index for a sample at `t`: the first bin is closed on both ends,
    /// all others are `(edge_i, edge_i+1]`.
    fn bin_of(&self, t: f64) -> usize {
        let idx = self.edges.partition_point(|&edge| edge < t);
        idx.saturating_sub(1).min(self.time.len() - 1)
    }
}

/// Number of `arange` points: `ceil(span / dt)`, except that a ratio within
/// float error of an integer counts as that integer (6.000000000001 s / 1 ms
/// gives 6000, not 6001).
fn step_count(span: f64, dt: f64) -> usize {
    let ratio = span / dt;
    let rounded = ratio.round();
    let n = if (ratio - rounded).abs() <= 1e-9 * ratio.abs().max(1.0) {
        rounded
    } else {
        ratio.ceil()
    };
    (n as usize).max(1)
}

/// `np.linspace(a, b, n)` with the last point pinned to `b`.
pub fn linspace(a: f64, b: f64, n: usize) -> Vec<f64> {
    match n {
        0 => vec![],
        1 => vec![a],
        _ => {
            let step = (b - a) / (n - 1) as f64;
            let mut v: Vec<f64> = (0..n).map(|i| a + i as f64 * step).collect();
            v[n - 1] = b;
            v
        }
    }
}

// ── Resampling ─────────────────────────────────────────────────────────────

/// Resampling algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResampleMode {
    /// Linear interpolation, optional Gaussian smoothing with `sigma` given
    /// in grid samples.
    Interpolate { smoothing: Option<f64> },
    /// Mean of the samples in each bin.
    BinMean,
    /// Median of the samples in each bin.
    BinMedian,
}

impl Default for ResampleMode {
    fn default() -> Self {
        ResampleMode::Interpolate { smoothing: Some(2.0) }
    }
}

/// Output of [`resample`].
#[derive(Debug, Clone, PartialEq)]
pub struct Resampled {
    pub time: Vec<f64>,
    pub signal: Vec<f64>,
    /// Source samples that fell inside the window (0 → zero placeholder).
    pub in_window: usize,
}

/// Resample `(time, signal)` onto `grid`, using only samples inside `window`.
pub fn resample(
    window: &ResampleWindow,
    time: &[f64],
    signal: &[f64],
    grid: &Grid,
    mode: ResampleMode,
) -> Result<Resampled> {
    if time.len() != signal.len() {
        return Err(PrepError::LengthMismatch {
            what: "resample time vs signal",
            left: time.len(),
            right: signal.len(),
        });
    }

    let (t, y) = restrict(window, time, signal);
    let new_time = grid.time.clone();
    if t.is_empty() {
        return Ok(Resampled {
            signal: vec![0.0; new_time.len()],
            time: new_time,
            in_window: 0,
        });
    }

    let new_signal = match mode {
        ResampleMode::Interpolate { smoothing } => {
            let interpolated = interp(&new_time, &t, &y);
            match smoothing {
                Some(sigma) if sigma > 0.0 => gaussian_smooth(&interpolated, sigma)?,
                _ => interpolated,
            }
        }
        ResampleMode::BinMean => bin_aggregate(grid, &t, &y, mean),
        ResampleMode::BinMedian => bin_aggregate(grid, &t, &y, median),
    };

    Ok(Resampled { time: new_time, signal: new_signal, in_window: t.len() })
}

/// Convenience wrapper: validate the window, build the grid, resample.
pub fn resample_timeseries(
    begin: f64,
    end: f64,
    time: &[f64],
    signal: &[f64],
    spec: GridSpec,
    mode: ResampleMode,
) -> Result<Resampled> {
    let window = ResampleWindow::new(begin, end)?;
    let grid = Grid::build(&window, spec)?;
    resample(&window, time, signal, &grid, mode)
}

/// Number of finite samples with a timestamp inside `window`.
pub fn samples_in_window(window: &ResampleWindow, time: &[f64], signal: &[f64]) -> usize {
    time.iter()
        .zip(signal)
        .filter(|&(&t, &y)| t.is_finite() && y.is_finite() && window.contains(t))
        .count()
}

/// Finite samples inside the window, in ascending time order.
fn restrict(window: &ResampleWindow, time: &[f64], signal: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let mut pairs: Vec<(f64, f64)> = time
        .iter()
        .zip(signal)
        .filter(|&(&t, &y)| t.is_finite() && y.is_finite() && window.contains(t))
        .map(|(&t, &y)| (t, y))
        .collect();
    if pairs.windows(2).any(|w| w[1].0 < w[0].0) {
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
    }
    pairs.into_iter().unzip()
}

/// One-dimensional linear interpolation with `np.interp` semantics.
///
/// `xp` must be non-decreasing and non-empty. Points left of `xp[0]` take
/// `fp[0]`, points right of the last sample take the last value.
pub fn interp(x: &[f64], xp: &[f64], fp: &[f64]) -> Vec<f64> {
    let n = xp.len();
    x.iter()
        .map(|&xi| {
            if xi <= xp[0] {
                return fp[0];
            }
            if xi >= xp[n - 1] {
                return fp[n - 1];
            }
            // xp[j-1] <= xi < xp[j]
            let j = xp.partition_point(|&v| v <= xi);
            let i = j - 1;
            let slope = (fp[j] - fp[i]) / (xp[j] - xp[i]);
            fp[i] + (xi - xp[i]) * slope
        })
        .collect()
}

fn bin_aggregate(grid: &Grid, t: &[f64], y: &[f64], agg: fn(&mut [f64]) -> f64) -> Vec<f64> {
    let mut bins: Vec<Vec<f64>> = vec![Vec::new(); grid.len()];
    for (&ti, &yi) in t.iter().zip(y) {
        bins[grid.bin_of(ti)].push(yi);
    }

    let (filled_t, filled_y): (Vec<f64>, Vec<f64>) = bins
        .iter_mut()
        .zip(&grid.time)
        .filter(|(b, _)| !b.is_empty())
        .map(|(b, &gt)| (gt, agg(b)))
        .unzip();

    interp(&grid.time, &filled_t, &filled_y)
}

fn mean(v: &mut [f64]) -> f64 {
    v.iter().sum::<f64>() / v.len() as f64
}

fn median(v: &mut [f64]) -> f64 {
    v.sort_by(f64::total_cmp);
    let n = v.len();
    if n % 2 == 1 {
        v[n / 2]
    } else {
        0.5 * (v[n / 2 - 1] + v[n / 2])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAIN: ResampleMode = ResampleMode::Interpolate { smoothing: None };

    #[test]
    fn window_must_be_increasing() {
        assert!(matches!(
            ResampleWindow::new(2.0, 2.0),
            Err(PrepError::InvalidWindow { .. })
        ));
        assert!(ResampleWindow::new(3.0, 1.0).is_err());
        assert!(ResampleWindow::new(f64::NAN, 1.0).is_err());
        assert!(ResampleWindow::new(0.0, 1e-3).is_ok());
    }

    #[test]
    fn step_grid_excludes_end() {
        let w = ResampleWindow::new(0.0, 1.0).unwrap();
        let g = Grid::build(&w, GridSpec::Step(0.25)).unwrap();
        assert_eq!(g.time(), &[0.0, 0.25, 0.5, 0.75]);
    }

    #[test]
    fn step_grid_six_seconds_at_one_ms() {
        // Disruption framing: t_d - 1 .. t_d + 5 at 1 ms.
        let t_d = 62.347_f64;
        let w = ResampleWindow::new(t_d - 1.0, t_d + 5.0).unwrap();
        let g = Grid::build(&w, GridSpec::Step(1e-3)).unwrap();
        assert_eq!(g.len(), 6000);
    }

    #[test]
    fn step_grid_keeps_partial_last_step() {
        let w = ResampleWindow::new(0.0, 6.000005).unwrap();
        let g = Grid::build(&w, GridSpec::Step(1e-3)).unwrap();
        assert_eq!(g.len(), 6001);

        let w = ResampleWindow::new(0.0, 500.0004).unwrap();
        let g = Grid::build(&w, GridSpec::Step(1e-3)).unwrap();
        assert_eq!(g.len(), 500_001);
        approx::assert_abs_diff_eq!(g.time()[500_000], 500.0, epsilon = 1e-6);
    }

    #[test]
    fn length_grid_includes_end() {
        let w = ResampleWindow::new(1.0, 2.0).unwrap();
        let g = Grid::build(&w, GridSpec::Length(5)).unwrap();
        assert_eq!(g.time(), &[1.0, 1.25, 1.5, 1.75, 2.0]);
        assert!(Grid::build(&w, GridSpec::Length(0)).is_err());
        assert!(Grid::build(&w, GridSpec::Step(0.0)).is_err());
    }

    #[test]
    fn interp_clamps_outside_range() {
        let y = interp(&[-1.0, 0.5, 3.0], &[0.0, 1.0, 2.0], &[10.0, 20.0, 40.0]);
        assert_eq!(y, vec![10.0, 15.0, 40.0]);
    }

    #[test]
    fn non_finite_samples_are_ignored() {
        let t = [0.0, 1.0, 2.0, 3.0];
        let s = [0.0, f64::NAN, 2.0, 3.0];
        let out = resample_timeseries(0.0, 3.0, &t, &s, GridSpec::Length(4), PLAIN).unwrap();
        assert_eq!(out.in_window, 3);
        assert!(out.signal.iter().all(|v| v.is_finite()));
        approx::assert_abs_diff_eq!(out.signal[1], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn unsorted_source_is_sorted_first() {
        let t = [2.0, 0.0, 1.0];
        let s = [20.0, 0.0, 10.0];
        let out = resample_timeseries(0.0, 2.0, &t, &s, GridSpec::Length(5), PLAIN).unwrap();
        assert_eq!(out.signal, vec![0.0, 5.0, 10.0, 15.0, 20.0]);
    }

    #[test]
    fn bin_mean_averages_within_bins() {
        // Edges 0, 1, 2: bin 0 = [0, 1], bin 1 = (1, 2].
        let t = [0.0, 0.5, 1.0, 1.5, 2.0];
        let s = [1.0, 2.0, 3.0, 10.0, 20.0];
        let out =
            resample_timeseries(0.0, 2.0, &t, &s, GridSpec::Length(2), ResampleMode::BinMean).unwrap();
        assert_eq!(out.signal, vec![2.0, 15.0]);
    }

    #[test]
    fn bin_median_and_empty_bin_fill() {
        // Four bins of width 1; bin 2 = (2, 3] is empty.
        let t = [0.1, 0.2, 0.9, 1.5, 3.5];
        let s = [5.0, 1.0, 3.0, 4.0, 8.0];
        let out =
            resample_timeseries(0.0, 4.0, &t, &s, GridSpec::Length(4), ResampleMode::BinMedian)
                .unwrap();
        assert_eq!(out.signal.len(), 4);
        assert_eq!(out.signal[0], 3.0);
        assert_eq!(out.signal[1], 4.0);
        assert_eq!(out.signal[3], 8.0);
        // Bin centre times are 0, 4/3, 8/3, 4: the empty bin sits between 4 and 8.
        approx::assert_abs_diff_eq!(out.signal[2], 4.0 + (8.0 / 3.0 - 4.0 / 3.0) / (4.0 - 4.0 / 3.0) * 4.0, epsilon = 1e-12);
    }

    #[test]
    fn smoothing_keeps_length_and_constant_level() {
        let t: Vec<f64> = (0..200).map(|i| i as f64 * 0.01).collect();
        let s = vec![4.5; 200];
        let mode = ResampleMode::Interpolate { smoothing: Some(3.0) };
        let out = resample_timeseries(0.0, 1.99, &t, &s, GridSpec::Step(0.005), mode).unwrap();
        assert_eq!(out.time.len(), out.signal.len());
        for &v in &out.signal {
            approx::assert_abs_diff_eq!(v, 4.5, epsilon = 1e-9);
        }
    }
}
