//! Cutting a series into contiguous pieces at given times.
//!
//! Each cut time is snapped to the nearest sample of `time` (minimum of
//! `|time - cut|` over the **whole** array; a cut exactly halfway between two
//! samples goes to the later one), and the piece ending at that sample is
//! emitted. The next piece starts right after it.
//!
//! ```text
//! values = [1, 1, 1, 2, 2, 2, 2, 3, 3, 3]
//! time   = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10]
//! cuts   = [3, 7.5]        →  [[1, 1, 1], [2, 2, 2, 2, 3], [3, 3]]
//! ```
//!
//! Cuts are processed in the order given and are not sorted. With ascending
//! cuts the pieces reconstruct the input exactly. An out-of-order or repeated
//! cut produces an empty piece, and the piece after it restarts from the
//! earlier sample, so pieces overlap.
use crate::error::{PrepError, Result};

/// Index of the sample closest to `cut` (ties resolve to the later index).
pub fn nearest_index(time: &[f64], cut: f64) -> usize {
    let mut best = 0;
    let mut best_d = f64::INFINITY;
    for (i, &t) in time.iter().enumerate() {
        let d = (t - cut).abs();
        if d <= best_d {
            best_d = d;
            best = i;
        }
    }
    best
}

/// Slice boundaries `[start, end)` for every piece, `cuts.len() + 1` of them.
pub fn cut_bounds(time: &[f64], cuts: &[f64]) -> Result<Vec<(usize, usize)>> {
    let n = time.len();
    let mut bounds = Vec::with_capacity(cuts.len() + 1);
    let mut start = 0;

    for &cut in cuts {
        let (first, last) = match (time.first(), time.last()) {
            (Some(&f), Some(&l)) => (f, l),
            _ => return Err(PrepError::OutOfBoundsCut { cut, first: f64::NAN, last: f64::NAN }),
        };
        if !(first..=last).contains(&cut) {
            return Err(PrepError::OutOfBoundsCut { cut, first, last });
        }

        let end = nearest_index(time, cut) + 1;
        bounds.push((start.min(end), end));
        start = end;
    }
    bounds.push((start.min(n), n));
    Ok(bounds)
}

/// Cut `values` at `cuts`, snapping each cut to the nearest sample of `time`.
pub fn segment<'a, T>(values: &'a [T], time: &[f64], cuts: &[f64]) -> Result<Vec<&'a [T]>> {
    check_lengths(values.len(), time.len())?;
    Ok(cut_bounds(time, cuts)?
        .into_iter()
        .map(|(s, e)| &values[s..e])
        .collect())
}

/// Like [`segment`], also returning the matching time pieces.
pub fn segment_with_time<'a, T>(
    values: &'a [T],
    time: &'a [f64],
    cuts: &[f64],
) -> Result<(Vec<&'a [T]>, Vec<&'a [f64]>)> {
    check_lengths(values.len(), time.len())?;
    Ok(cut_bounds(time, cuts)?
        .into_iter()
        .map(|(s, e)| (&values[s..e], &time[s..e]))
        .unzip())
}

fn check_lengths(values: usize, time: usize) -> Result<()> {
    if values != time {
        return Err(PrepError::LengthMismatch { what: "segment values vs time", left: values, right: time });
    }
    Ok(())
}
