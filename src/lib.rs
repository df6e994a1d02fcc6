//! # reprep — runaway-electron shot preprocessing
//!
//! `reprep` turns raw tokamak diagnostic records into aligned, labeled
//! per-shot tables for runaway-electron (RE) prediction models.
//!
//! ## Pipeline overview
//!
//! ```text
//! JET_<shot>.mat / .h5
//!   │
//!   ├─ store::BlobStore          list + fetch named blobs
//!   ├─ adapter::RecordReader     bytes → RawNode tree
//!   ├─ adapter::extract_shot()   either layout → ShotRecord
//!   ├─ merge::merge_shot()       window from metadata (t_d − 1 s … t_d + 5 s)
//!   │    └─ resample::resample() per channel, one shared 1 ms grid,
//!   │                            linear interp + Gaussian σ = 2 samples
//!   ├─ label                     1 strictly inside the RE window, else 0
//!   └─ io::write_shot_files()    features/<shot>.csv + targets/<shot>.csv
//!        │
//!        └─→ dataset             fixed feature order, min-max, windows
//!                                → dataset.safetensors
//! ```
//!
//! [`segment`] (historically "Edward") is a standalone helper that cuts a
//! labeled series at given times.
//!
//! ## Quick start
//!
//! ```no_run
//! use reprep::{preprocess_shot, PipelineConfig, ReCatalogue};
//! use reprep::adapter::{read_shot, JsonRecordReader};
//!
//! let bytes = std::fs::read("db/JET_95135.mat.json").unwrap();
//! let cfg = PipelineConfig::default();
//! let record = read_shot(&JsonRecordReader, "JET_95135.mat.json", &bytes, &cfg.channels).unwrap();
//!
//! let catalogue = ReCatalogue::from_csv("re_windows.csv".as_ref()).unwrap();
//! let table = preprocess_shot(&record, &cfg, &catalogue).unwrap();
//! println!("{} rows × {} channels", table.n_rows(), table.n_columns());
//! ```
//!
//! ## Running individual steps
//!
//! ```no_run
//! use reprep::resample::{resample_timeseries, GridSpec, ResampleMode};
//! use reprep::label::build_positive_target;
//! use reprep::segment::segment;
//! use reprep::Interval;
//!
//! let time: Vec<f64> = (0..1000).map(|i| 60.0 + i as f64 * 7e-3).collect();
//! let signal: Vec<f64> = time.iter().map(|t| t.sin()).collect();
//!
//! // 6 s at 1 ms around a disruption at 61.0 s
//! let r = resample_timeseries(60.0, 66.0, &time, &signal, GridSpec::Step(1e-3), ResampleMode::default()).unwrap();
//! assert_eq!(r.time.len(), 6000);
//!
//! let y = build_positive_target(&r.time, Interval::new(61.2, 61.9));
//! let pieces = segment(&y, &r.time, &[61.2, 61.9]).unwrap();
//! assert_eq!(pieces.len(), 3);
//! ```

pub mod adapter;
pub mod batch;
pub mod checkpoint;
pub mod config;
pub mod dataset;
pub mod error;
pub mod filter;
pub mod io;
pub mod label;
pub mod merge;
pub mod normalize;
pub mod resample;
pub mod segment;
pub mod shot;
pub mod store;
pub mod table;
pub mod window;

// ── Crate-root re-exports ─────────────────────────────────────────────────

pub use config::{DatasetConfig, MissingChannelPolicy, PipelineConfig, WindowPolicy};
pub use error::{PrepError, Result};
pub use label::ReCatalogue;
pub use merge::merge_shot;
pub use resample::{GridSpec, ResampleMode, ResampleWindow};
pub use shot::{Channel, ChannelSeries, Interval, ShotId, ShotRecord};
pub use table::ShotTable;

/// Run the **per-shot pipeline** on one extracted record.
///
/// 1. Derive the resample window from the shot metadata
///    ([`PipelineConfig::window`]).
/// 2. Resample every channel in [`PipelineConfig::channels`] onto one
///    shared grid and join them ([`merge_shot`]).
/// 3. Attach the target: positive inside the shot's catalogued RE window(s),
///    all-negative otherwise.
///
/// # Errors
///
/// Any error of [`merge_shot`]; the shot should then be excluded from the
/// output.
pub fn preprocess_shot(record: &ShotRecord, cfg: &PipelineConfig, catalogue: &ReCatalogue) -> Result<ShotTable> {
    let table = merge_shot(record, &cfg.channels, cfg)?;
    let target = catalogue.target_for(record.shot, table.time());
    table.with_target(target)
}
