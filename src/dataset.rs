//! Model-ready dataset from the per-shot CSV files.
//!
//! ```text
//! features/<shot>.csv ─┐
//!                      ├─ fixed feature order (absent columns → zeros)
//! targets/<shot>.csv  ─┘  rows != seq_length → skipped
//!        │
//!        ├─ non-finite audit (optionally drop the shot)
//!        ├─ global min-max over all shots
//!        ├─ sliding windows (window / stride)
//!        └─→ dataset.safetensors
//!              x_<i>        [window, F]  f32
//!              y_<i>        [window]     f32
//!              feature_min  [F]          f32
//!              feature_max  [F]          f32
//!              pos_weight   [1]          f32   (n0 / n1, only if any positive)
//!              n_samples    [1]          i32
//! ```
use std::collections::BTreeSet;
use std::fs::File;
use std::path::Path;

use ndarray::{s, Array1, Array2};
use tracing::{info, warn};

use crate::config::DatasetConfig;
use crate::error::{PrepError, Result};
use crate::io::{OutputLayout, StWriter};
use crate::normalize::{compute_global_minmax, minmax_normalize_inplace, FeatureRange};
use crate::shot::ShotId;
use crate::table::ShotTable;
use crate::window::{sliding_windows, sliding_windows_1d};

/// One shot as model input.
#[derive(Debug, Clone, PartialEq)]
pub struct ShotSample {
    pub shot: ShotId,
    /// `[T, F]` in the configured feature order.
    pub x: Array2<f32>,
    /// `[T]`, 0 or 1.
    pub y: Array1<f32>,
}

impl ShotSample {
    pub fn non_finite(&self) -> NonFinite {
        let nans = self.x.iter().filter(|v| v.is_nan()).count();
        let infs = self.x.iter().filter(|v| v.is_infinite()).count();
        NonFinite { shot: self.shot, nans, infs }
    }
}

/// NaN / ±inf counts of one shot's features.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NonFinite {
    pub shot: ShotId,
    pub nans: usize,
    pub infs: usize,
}

impl NonFinite {
    pub fn is_clean(&self) -> bool {
        self.nans == 0 && self.infs == 0
    }
}

/// What happened while loading.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub loaded: usize,
    /// Row count differed from `seq_length`.
    pub wrong_length: Vec<ShotId>,
    /// Shots with non-finite features.
    pub non_finite: Vec<NonFinite>,
    /// Dropped because of `non_finite` (with `drop_non_finite`).
    pub dropped: Vec<ShotId>,
    pub failed: Vec<(ShotId, String)>,
}

/// Shots with both a features and a targets file, ascending.
pub fn list_shots(layout: &OutputLayout) -> Result<Vec<ShotId>> {
    let mut shots = Vec::new();
    for entry in std::fs::read_dir(layout.features_dir())? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("csv") {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Ok(shot) = ShotId::from_file_name(name) else {
            continue;
        };
        if layout.targets_path(shot).exists() {
            shots.push(shot);
        } else {
            warn!(%shot, "features without targets, ignored");
        }
    }
    shots.sort();
    Ok(shots)
}

/// Load one shot. `Ok(None)` when its row count is not `cfg.seq_length`.
pub fn load_shot(layout: &OutputLayout, shot: ShotId, cfg: &DatasetConfig) -> Result<Option<ShotSample>> {
    let table = ShotTable::read_features_csv(File::open(layout.features_path(shot))?)?;
    let n_t = table.n_rows();
    if n_t != cfg.seq_length {
        return Ok(None);
    }

    let mut x = Array2::<f32>::zeros((n_t, cfg.features.len()));
    for (f, &ch) in cfg.features.iter().enumerate() {
        if let Some(col) = table.column(ch) {
            x.column_mut(f).assign(&Array1::from_iter(col.iter().map(|&v| v as f32)));
        }
    }

    let (time, target) = ShotTable::read_target_csv(File::open(layout.targets_path(shot))?)?;
    if time.len() != n_t {
        return Err(PrepError::LengthMismatch { what: "targets vs features", left: time.len(), right: n_t });
    }
    let y = Array1::from_iter(target.into_iter().map(f32::from));
    Ok(Some(ShotSample { shot, x, y }))
}

/// Load every shot under `layout` (or only those in `only`).
///
/// Per-shot read failures are recorded in the report, not returned.
pub fn load_dataset(
    layout: &OutputLayout,
    cfg: &DatasetConfig,
    only: Option<&BTreeSet<ShotId>>,
) -> Result<(Vec<ShotSample>, LoadReport)> {
    let mut report = LoadReport::default();
    let mut samples = Vec::new();

    for shot in list_shots(layout)? {
        if only.is_some_and(|set| !set.contains(&shot)) {
            continue;
        }
        let sample = match load_shot(layout, shot, cfg) {
            Ok(Some(s)) => s,
            Ok(None) => {
                info!(%shot, expected = cfg.seq_length, "unexpected sequence length, skipped");
                report.wrong_length.push(shot);
                continue;
            }
            Err(e) => {
                warn!(%shot, reason = %e, "shot not loaded");
                report.failed.push((shot, e.to_string()));
                continue;
            }
        };

        let nf = sample.non_finite();
        if !nf.is_clean() {
            warn!(%shot, nans = nf.nans, infs = nf.infs, "non-finite features");
            report.non_finite.push(nf);
            if cfg.drop_non_finite {
                report.dropped.push(shot);
                continue;
            }
        }
        samples.push(sample);
    }

    report.loaded = samples.len();
    info!(
        loaded = report.loaded,
        wrong_length = report.wrong_length.len(),
        dropped = report.dropped.len(),
        failed = report.failed.len(),
        "dataset loaded"
    );
    Ok((samples, report))
}

/// Negative-to-positive target ratio, for weighting the positive class.
/// `None` when there is no positive sample.
pub fn class_weight(samples: &[ShotSample]) -> Option<f32> {
    let (mut n0, mut n1) = (0usize, 0usize);
    for s in samples {
        let pos = s.y.iter().filter(|&&v| v > 0.5).count();
        n1 += pos;
        n0 += s.y.len() - pos;
    }
    (n1 > 0).then(|| n0 as f32 / n1 as f32)
}

/// Summary of an export.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportSummary {
    pub n_windows: usize,
    pub range: FeatureRange,
    pub pos_weight: Option<f32>,
}

/// Normalise, window and write `samples` to `path`.
pub fn export_dataset(samples: &[ShotSample], cfg: &DatasetConfig, path: &Path) -> Result<ExportSummary> {
    let xs: Vec<Array2<f32>> = samples.iter().map(|s| s.x.clone()).collect();
    let range = compute_global_minmax(&xs)?;
    let pos_weight = class_weight(samples);

    let mut w = StWriter::new();
    let mut n = 0usize;
    for (mut x, sample) in xs.into_iter().zip(samples) {
        minmax_normalize_inplace(&mut x, &range)?;
        let xw = sliding_windows(x.view(), cfg.window, cfg.stride)?;
        let yw = sliding_windows_1d(sample.y.view(), cfg.window, cfg.stride)?;
        for k in 0..xw.shape()[0] {
            w.add_f32_arr2(&format!("x_{n}"), &xw.slice(s![k, .., ..]).to_owned());
            w.add_f32(&format!("y_{n}"), &yw.row(k).to_vec(), &[cfg.window]);
            n += 1;
        }
    }

    w.add_f32("feature_min", &range.min, &[range.n_features()]);
    w.add_f32("feature_max", &range.max, &[range.n_features()]);
    if let Some(pw) = pos_weight {
        w.add_f32("pos_weight", &[pw], &[1]);
    }
    w.add_i32("n_samples", &[n as i32], &[1]);
    w.write(path)?;

    info!(windows = n, path = %path.display(), ?pos_weight, "dataset exported");
    Ok(ExportSummary { n_windows: n, range, pos_weight })
}
