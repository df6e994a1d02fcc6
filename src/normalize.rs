//! Global per-feature min-max normalisation.
//!
//! `compute_global_minmax` — per feature, over every row of every shot:
//!   min_f = min(x[:, f]),  max_f = max(x[:, f])
//!   max_f = min_f + 1e-6   when the feature never varies
//!
//! `minmax_normalize_inplace`:
//!   x[:, f] = (x[:, f] - min_f) / (max_f - min_f)
use ndarray::{Array2, Axis};

use crate::error::{PrepError, Result};

/// Floor on `max - min` for a constant feature.
pub const MIN_RANGE: f32 = 1e-6;

/// Per-feature `[min, max]`.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRange {
    pub min: Vec<f32>,
    pub max: Vec<f32>,
}

impl FeatureRange {
    pub fn n_features(&self) -> usize {
        self.min.len()
    }
}

/// Min and max of each column over all `shots` (`[T, F]` each).
///
/// Non-finite values are ignored. A feature with no finite value at all
/// gets `[0, 1e-6]`.
pub fn compute_global_minmax(shots: &[Array2<f32>]) -> Result<FeatureRange> {
    let n_f = match shots.first() {
        Some(x) => x.ncols(),
        None => return Err(PrepError::InvalidParameter("no shots to normalise".into())),
    };
    let mut min = vec![f32::INFINITY; n_f];
    let mut max = vec![f32::NEG_INFINITY; n_f];

    for x in shots {
        if x.ncols() != n_f {
            return Err(PrepError::LengthMismatch { what: "feature count", left: x.ncols(), right: n_f });
        }
        for (f, col) in x.axis_iter(Axis(1)).enumerate() {
            for &v in col.iter().filter(|v| v.is_finite()) {
                min[f] = min[f].min(v);
                max[f] = max[f].max(v);
            }
        }
    }

    for (lo, hi) in min.iter_mut().zip(max.iter_mut()) {
        if !lo.is_finite() {
            *lo = 0.0;
            *hi = 0.0;
        }
        if *hi == *lo {
            *hi = *lo + MIN_RANGE;
        }
    }
    Ok(FeatureRange { min, max })
}

/// Scale `x` (`[T, F]`) into `[0, 1]` per feature.
pub fn minmax_normalize_inplace(x: &mut Array2<f32>, range: &FeatureRange) -> Result<()> {
    if x.ncols() != range.n_features() {
        return Err(PrepError::LengthMismatch {
            what: "feature count",
            left: x.ncols(),
            right: range.n_features(),
        });
    }
    for (f, mut col) in x.axis_iter_mut(Axis(1)).enumerate() {
        let (lo, span) = (range.min[f], range.max[f] - range.min[f]);
        col.mapv_inplace(|v| (v - lo) / span);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn global_range_over_all_shots() {
        let a = array![[1.0_f32, 5.0], [2.0, 5.0]];
        let b = array![[-1.0_f32, 5.0], [4.0, f32::NAN]];
        let r = compute_global_minmax(&[a, b]).unwrap();
        assert_eq!(r.min, vec![-1.0, 5.0]);
        assert_eq!(r.max[0], 4.0);
        approx::assert_abs_diff_eq!(r.max[1], 5.0 + MIN_RANGE, epsilon = 1e-9_f32);
    }

    #[test]
    fn normalized_into_unit_range() {
        let mut x = array![[0.0_f32, 10.0], [5.0, 20.0], [10.0, 30.0]];
        let r = compute_global_minmax(&[x.clone()]).unwrap();
        minmax_normalize_inplace(&mut x, &r).unwrap();
        assert_eq!(x.column(0).to_vec(), vec![0.0, 0.5, 1.0]);
        assert_eq!(x.column(1).to_vec(), vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn constant_feature_maps_to_zero() {
        let mut x = Array2::from_elem((4, 1), 7.0_f32);
        let r = compute_global_minmax(&[x.clone()]).unwrap();
        minmax_normalize_inplace(&mut x, &r).unwrap();
        for &v in x.iter() {
            approx::assert_abs_diff_eq!(v, 0.0, epsilon = 1e-6_f32);
        }
    }

    #[test]
    fn mismatched_feature_count() {
        let a = Array2::<f32>::zeros((2, 2));
        let b = Array2::<f32>::zeros((2, 3));
        assert!(compute_global_minmax(&[a, b]).is_err());
        assert!(compute_global_minmax(&[]).is_err());
    }
}
