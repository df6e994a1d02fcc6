//! Signal extraction: raw container tree → [`ShotRecord`].
//!
//! Shot files come in two layouts that carry the same information:
//!
//! ```text
//! Legacy (MATLAB struct, .mat)        Hierarchical (HDF5 groups, .h5)
//! ├─ SIG                              ├─ SIG
//! │  ├─ <channel>.signal / .time      │  ├─ <channel>/signal, /time
//! │  └─ time        (shared fallback) │  └─ time
//! ├─ objDIS.disr_ipla_td  [_, t_d]    └─ objDIS
//! └─ Discharge                           ├─ disr_ipla_td
//!    └─ Ramp_up / Flat_top / Ramp_down   └─ Discharge/Ramp_up, ...
//! ```
//!
//! Decoding the binary container itself is done by a [`RecordReader`]; this
//! module only erases the layout difference. Anything missing is recorded as
//! absent and logged, never fatal, except a record with no `SIG` group.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{PrepError, Result};
use crate::shot::{Channel, ChannelSeries, Interval, ShotId, ShotRecord};

// ── Raw tree ──────────────────────────────────────────────────────────────

/// Generic structured record: nested groups of (possibly nested) arrays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawNode {
    /// JSON `null`; stands for NaN inside numeric arrays.
    Null,
    Number(f64),
    Array(Vec<RawNode>),
    Group(BTreeMap<String, RawNode>),
}

impl RawNode {
    /// Child of a group by name.
    pub fn get(&self, key: &str) -> Option<&RawNode> {
        match self {
            RawNode::Group(map) => map.get(key),
            _ => None,
        }
    }

    /// Follow a path of group names.
    pub fn path(&self, keys: &[&str]) -> Option<&RawNode> {
        keys.iter().try_fold(self, |node, k| node.get(k))
    }

    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Depth-first flattening of all numbers, `null` → NaN.
    ///
    /// Returns `None` if a group is found where numbers were expected.
    pub fn flatten(&self) -> Option<Vec<f64>> {
        let mut out = Vec::new();
        self.flatten_into(&mut out).then_some(out)
    }

    fn flatten_into(&self, out: &mut Vec<f64>) -> bool {
        match self {
            RawNode::Null => {
                out.push(f64::NAN);
                true
            }
            RawNode::Number(v) => {
                out.push(*v);
                true
            }
            RawNode::Array(items) => items.iter().all(|n| n.flatten_into(out)),
            RawNode::Group(_) => false,
        }
    }
}

// ── Container format ──────────────────────────────────────────────────────

/// On-disk container, decided by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerFormat {
    /// `.mat` — MATLAB struct layout.
    Mat,
    /// `.h5` / `.hdf5` — hierarchical group layout.
    Hdf5,
}

impl ContainerFormat {
    /// Format of `name`; a trailing `.json` (an exported dump) is looked
    /// through, so `JET_99971.mat.json` is a `.mat` record.
    pub fn from_name(name: &str) -> Result<Self> {
        let base = name.strip_suffix(".json").unwrap_or(name);
        let ext = base.rsplit_once('.').map(|(_, e)| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("mat") => Ok(ContainerFormat::Mat),
            Some("h5") | Some("hdf5") => Ok(ContainerFormat::Hdf5),
            _ => Err(PrepError::UnsupportedContainerFormat(name.to_string())),
        }
    }

    pub fn is_supported(name: &str) -> bool {
        Self::from_name(name).is_ok()
    }
}

/// Where shot metadata lives inside the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Legacy,
    Hierarchical,
}

impl Layout {
    /// Layout for a tree read from a `format` container.
    ///
    /// MATLAB v7.3 `.mat` files are HDF5 underneath and carry the
    /// hierarchical layout; they are recognised by `objDIS/Discharge`
    /// without a top-level `Discharge`.
    pub fn detect(root: &RawNode, format: ContainerFormat) -> Self {
        match format {
            ContainerFormat::Hdf5 => Layout::Hierarchical,
            ContainerFormat::Mat => {
                if !root.has("Discharge") && root.path(&["objDIS", "Discharge"]).is_some() {
                    Layout::Hierarchical
                } else {
                    Layout::Legacy
                }
            }
        }
    }

    fn discharge<'a>(&self, root: &'a RawNode) -> Option<&'a RawNode> {
        match self {
            Layout::Legacy => root.get("Discharge"),
            Layout::Hierarchical => root.path(&["objDIS", "Discharge"]),
        }
    }
}

// ── Reader seam ───────────────────────────────────────────────────────────

/// Decodes the bytes of one shot file into a [`RawNode`] tree.
pub trait RecordReader {
    fn read(&self, name: &str, bytes: &[u8]) -> Result<RawNode>;
}

/// Reads records exported as JSON trees (groups → objects, arrays → lists).
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRecordReader;

impl RecordReader for JsonRecordReader {
    fn read(&self, name: &str, bytes: &[u8]) -> Result<RawNode> {
        let node: RawNode = serde_json::from_slice(bytes)?;
        if !matches!(node, RawNode::Group(_)) {
            return Err(PrepError::MalformedRecord(format!("{name}: top level is not a group")));
        }
        Ok(node)
    }
}

// ── Extraction ────────────────────────────────────────────────────────────

/// Index of `disr_ipla_td` inside its flattened array.
const DISRUPTION_INDEX: usize = 1;

/// Build a [`ShotRecord`] holding `channels` (those present) and metadata.
pub fn extract_shot(
    root: &RawNode,
    format: ContainerFormat,
    shot: ShotId,
    channels: &[Channel],
) -> Result<ShotRecord> {
    let layout = Layout::detect(root, format);
    let sig = root
        .get("SIG")
        .ok_or_else(|| PrepError::MalformedRecord(format!("shot {shot}: no SIG group")))?;

    let mut record = ShotRecord::new(shot);
    for &ch in channels {
        match extract_channel(sig, ch) {
            Ok(Some(series)) => record.insert_channel(ch, series),
            Ok(None) => debug!(%shot, channel = %ch, "channel not in record"),
            Err(e) => warn!(%shot, channel = %ch, error = %e, "channel skipped"),
        }
    }

    record.disruption_time = match root.path(&["objDIS", "disr_ipla_td"]).and_then(RawNode::flatten) {
        Some(v) if v.len() > DISRUPTION_INDEX => Some(v[DISRUPTION_INDEX]),
        Some(_) => {
            warn!(%shot, "disr_ipla_td is too short");
            None
        }
        None => {
            debug!(%shot, "disr_ipla_td not found");
            None
        }
    };

    let discharge = layout.discharge(root);
    let interval = |key: &str| -> Option<Interval> {
        let iv = discharge
            .and_then(|d| d.get(key))
            .and_then(RawNode::flatten)
            .and_then(|v| Interval::from_slice(&v));
        if iv.is_none() {
            debug!(%shot, key, "discharge interval not found");
        }
        iv
    };
    record.ramp_up = interval("Ramp_up");
    record.flat_top = interval("Flat_top");
    record.ramp_down = interval("Ramp_down");

    Ok(record)
}

/// One channel from the `SIG` group. `Ok(None)` when absent.
fn extract_channel(sig: &RawNode, ch: Channel) -> Result<Option<ChannelSeries>> {
    let Some(node) = sig.get(ch.as_str()) else {
        return Ok(None);
    };
    let signal = node
        .get("signal")
        .and_then(RawNode::flatten)
        .ok_or_else(|| PrepError::MalformedRecord(format!("{ch}: no numeric signal")))?;
    let time = node
        .get("time")
        .or_else(|| sig.get("time"))
        .and_then(RawNode::flatten)
        .ok_or_else(|| PrepError::MalformedRecord(format!("{ch}: no time base")))?;
    ChannelSeries::new(time, signal).map(Some)
}

/// Decode and extract in one step, picking the container from `name`.
pub fn read_shot(
    reader: &dyn RecordReader,
    name: &str,
    bytes: &[u8],
    channels: &[Channel],
) -> Result<ShotRecord> {
    let format = ContainerFormat::from_name(name)?;
    let shot = ShotId::from_file_name(name)?;
    let root = reader.read(name, bytes)?;
    extract_shot(&root, format, shot, channels)
}
