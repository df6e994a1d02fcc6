//! Per-timestep binary targets.
//!
//! A shot with a known runaway-electron window gets `1` strictly inside the
//! window and `0` elsewhere; boundary samples are `0`. Every other shot is
//! all-negative. Targets always have the length of the time axis.
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::Result;
use crate::shot::{Interval, ShotId};

/// Positive target: `1` where `start < t < end`.
pub fn build_positive_target(time: &[f64], window: Interval) -> Vec<u8> {
    time.iter().map(|&t| u8::from(window.contains_open(t))).collect()
}

/// Positive target over the union of several windows.
pub fn build_positive_target_union(time: &[f64], windows: &[Interval]) -> Vec<u8> {
    time.iter()
        .map(|&t| u8::from(windows.iter().any(|w| w.contains_open(t))))
        .collect()
}

/// Negative target: all zeros.
pub fn build_negative_target(time: &[f64]) -> Vec<u8> {
    vec![0; time.len()]
}

// ── RE catalogue ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct WindowRow {
    shot: u32,
    start: f64,
    end: f64,
}

/// Known runaway-electron windows, keyed by shot.
#[derive(Debug, Clone, Default)]
pub struct ReCatalogue {
    windows: BTreeMap<ShotId, Vec<Interval>>,
}

impl ReCatalogue {
    /// Load a `shot,start,end` CSV (with header). A shot may appear on
    /// several rows; its windows are unioned.
    pub fn from_csv(path: &Path) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_path(path)?;
        let mut cat = ReCatalogue::default();
        for row in rdr.deserialize() {
            let row: WindowRow = row?;
            cat.insert(ShotId(row.shot), Interval::new(row.start, row.end));
        }
        debug!(shots = cat.windows.len(), path = %path.display(), "loaded RE catalogue");
        Ok(cat)
    }

    pub fn insert(&mut self, shot: ShotId, window: Interval) {
        self.windows.entry(shot).or_default().push(window);
    }

    pub fn windows(&self, shot: ShotId) -> Option<&[Interval]> {
        self.windows.get(&shot).map(Vec::as_slice)
    }

    pub fn is_positive(&self, shot: ShotId) -> bool {
        self.windows.contains_key(&shot)
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Target for `shot` on `time`: positive if catalogued, else negative.
    pub fn target_for(&self, shot: ShotId, time: &[f64]) -> Vec<u8> {
        match self.windows(shot) {
            Some([single]) => build_positive_target(time, *single),
            Some(many) => build_positive_target_union(time, many),
            None => build_negative_target(time),
        }
    }
}

/// Read a headerless list of shot numbers, one per line (blank lines and
/// `#` comments ignored).
pub fn load_shot_list(path: &Path) -> Result<BTreeSet<ShotId>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)?;
    let mut shots = BTreeSet::new();
    for rec in rdr.records() {
        let rec = rec?;
        if let Some(field) = rec.get(0).filter(|f| !f.is_empty()) {
            shots.insert(ShotId::from_file_name(field)?);
        }
    }
    Ok(shots)
}

#[cfg(test)]
mod tests {
    use super::*;

    const AXIS: [f64; 6] = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0];

    #[test]
    fn boundaries_are_excluded() {
        let y = build_positive_target(&AXIS, Interval::new(1.0, 4.0));
        assert_eq!(y, vec![0, 0, 1, 1, 1, 0]);
    }

    #[test]
    fn negative_is_all_zero() {
        assert_eq!(build_negative_target(&[0.0, 1.0, 2.0]), vec![0, 0, 0]);
        assert!(build_negative_target(&[]).is_empty());
    }

    #[test]
    fn window_outside_axis_gives_no_positives() {
        let y = build_positive_target(&AXIS, Interval::new(10.0, 12.0));
        assert_eq!(y, vec![0; 6]);
    }

    #[test]
    fn union_of_windows() {
        let y = build_positive_target_union(
            &AXIS,
            &[Interval::new(-1.0, 1.5), Interval::new(3.5, 9.0)],
        );
        assert_eq!(y, vec![1, 1, 0, 0, 1, 1]);
    }

    #[test]
    fn catalogue_picks_positive_or_negative() {
        let mut cat = ReCatalogue::default();
        cat.insert(ShotId(95135), Interval::new(1.0, 4.0));
        assert_eq!(cat.target_for(ShotId(95135), &AXIS), vec![0, 0, 1, 1, 1, 0]);
        assert_eq!(cat.target_for(ShotId(1), &AXIS), vec![0; 6]);
        assert!(cat.is_positive(ShotId(95135)));
        assert_eq!(cat.len(), 1);
    }
}
