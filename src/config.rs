//! Pipeline configuration.
//!
//! [`PipelineConfig`] holds every tunable of the per-shot pipeline and
//! [`DatasetConfig`] those of the dataset assembly step. Defaults match the
//! final revision of the preprocessing that produced the training data.
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::resample::{GridSpec, ResampleMode};
use crate::shot::Channel;

/// Where the resample window of a shot is anchored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowPolicy {
    /// `[t_d - before, t_d + after]` around the disruption time `t_d`.
    Disruption { before: f64, after: f64 },
    /// `[ramp_up.start, ramp_down.end]`.
    Discharge,
}

impl Default for WindowPolicy {
    fn default() -> Self {
        WindowPolicy::Disruption { before: 1.0, after: 5.0 }
    }
}

/// What to do with a requested channel that is absent or has no samples in
/// the window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingChannelPolicy {
    /// Omit the column.
    #[default]
    Skip,
    /// Insert an all-zero column.
    ZeroFill,
}

/// Configuration for the per-shot preprocessing pipeline.
///
/// All fields are `pub`, so one can be built with struct-update syntax:
///
/// ```
/// use reprep::{GridSpec, PipelineConfig, WindowPolicy};
///
/// let cfg = PipelineConfig {
///     window: WindowPolicy::Discharge,   // whole discharge instead of t_d - 1 .. t_d + 5
///     grid: GridSpec::Length(4096),
///     ..PipelineConfig::default()
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Channels to extract and resample, in output column order.
    ///
    /// Default: all eight known channels.
    pub channels: Vec<Channel>,

    /// Window anchor.
    ///
    /// Default: [`WindowPolicy::Disruption`] with 1 s before and 5 s after.
    pub window: WindowPolicy,

    /// Grid spacing.
    ///
    /// At the default 1 ms step a 6 s disruption window has **6 000** rows.
    ///
    /// Default: `GridSpec::Step(1e-3)`.
    pub grid: GridSpec,

    /// Resampling algorithm.
    ///
    /// Default: linear interpolation followed by a Gaussian of σ = 2 grid
    /// samples.
    pub mode: ResampleMode,

    /// Default: [`MissingChannelPolicy::Skip`].
    pub missing_channels: MissingChannelPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            channels: Channel::ALL.to_vec(),
            window: WindowPolicy::default(),
            grid: GridSpec::Step(1e-3),
            mode: ResampleMode::default(),
            missing_channels: MissingChannelPolicy::default(),
        }
    }
}

impl PipelineConfig {
    /// Load from a JSON file; absent fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Configuration for turning per-shot CSVs into model input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Feature columns in model order; columns a shot lacks are zero-filled.
    pub features: Vec<Channel>,

    /// Shots whose row count differs are skipped.
    ///
    /// Default: `6000` (6 s at 1 ms).
    pub seq_length: usize,

    /// Sliding-window length in rows. Default: `30`.
    pub window: usize,

    /// Sliding-window stride in rows. Default: `10`.
    pub stride: usize,

    /// Drop shots containing NaN or ±inf instead of only reporting them.
    pub drop_non_finite: bool,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            features: vec![
                Channel::SSXcore,
                Channel::IPLA,
                Channel::DAO_EDG7,
                Channel::RNT,
                Channel::DAI_EDG7,
                Channel::ECE_PF,
            ],
            seq_length: 6000,
            window: 30,
            stride: 10,
            drop_non_finite: true,
        }
    }
}

impl DatasetConfig {
    /// Windows per shot of `seq_length` rows.
    ///
    /// ```
    /// use reprep::DatasetConfig;
    /// assert_eq!(DatasetConfig::default().windows_per_shot(), 598);
    /// ```
    pub fn windows_per_shot(&self) -> usize {
        crate::window::window_count(self.seq_length, self.window, self.stride)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: PipelineConfig =
            serde_json::from_str(r#"{"window": "discharge", "grid": {"length": 100}}"#).unwrap();
        assert_eq!(cfg.window, WindowPolicy::Discharge);
        assert_eq!(cfg.grid, GridSpec::Length(100));
        assert_eq!(cfg.channels.len(), 8);
        assert_eq!(cfg.missing_channels, MissingChannelPolicy::Skip);
    }

    #[test]
    fn mode_from_json() {
        let cfg: PipelineConfig =
            serde_json::from_str(r#"{"mode": {"interpolate": {"smoothing": null}}}"#).unwrap();
        assert_eq!(cfg.mode, ResampleMode::Interpolate { smoothing: None });
        let cfg: PipelineConfig = serde_json::from_str(r#"{"mode": "bin_median"}"#).unwrap();
        assert_eq!(cfg.mode, ResampleMode::BinMedian);
    }
}
