//! File output: atomic writes, per-shot CSV files, safetensors export.
//!
//! Every artifact goes through [`write_atomic`]: the bytes land in a
//! temporary file in the destination directory, which is then renamed over
//! the target. A crash mid-write leaves either the old file or no file.
//!
//! Output tree for the per-shot pipeline:
//!
//! ```text
//! <out>/features/<shot>.csv    time,<ch>...
//! <out>/targets/<shot>.csv     time,target
//! ```
use std::collections::HashMap;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{PrepError, Result};
use crate::shot::ShotId;
use crate::table::ShotTable;

// ── Atomic write ──────────────────────────────────────────────────────────

/// Write `path` via a temporary sibling file and rename.
///
/// Parent directories are created as needed.
pub fn write_atomic<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut dyn Write) -> Result<()>,
{
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    {
        let mut w = BufWriter::new(tmp.as_file_mut());
        write(&mut w)?;
        w.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| PrepError::Io(e.error))?;
    Ok(())
}

// ── Per-shot CSV files ────────────────────────────────────────────────────

/// Locations of the per-shot output files under one root.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn features_dir(&self) -> PathBuf {
        self.root.join("features")
    }

    pub fn targets_dir(&self) -> PathBuf {
        self.root.join("targets")
    }

    pub fn features_path(&self, shot: ShotId) -> PathBuf {
        self.features_dir().join(format!("{shot}.csv"))
    }

    pub fn targets_path(&self, shot: ShotId) -> PathBuf {
        self.targets_dir().join(format!("{shot}.csv"))
    }

    /// Both files of `shot` already exist.
    pub fn is_complete(&self, shot: ShotId) -> bool {
        self.features_path(shot).exists() && self.targets_path(shot).exists()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    /// Output was already present; nothing was touched.
    Skipped,
}

/// Persist the features and label files of one shot.
///
/// Nothing is touched when both files exist. Otherwise both are rewritten
/// from `table`, so a pair left half-written by an earlier run never mixes
/// two configurations. The table must carry a target.
pub fn write_shot_files(layout: &OutputLayout, shot: ShotId, table: &ShotTable) -> Result<WriteOutcome> {
    if table.target().is_none() {
        return Err(PrepError::MissingMetadata("target column"));
    }
    if layout.is_complete(shot) {
        debug!(%shot, "outputs exist, skipping");
        return Ok(WriteOutcome::Skipped);
    }
    write_atomic(&layout.features_path(shot), |w| table.write_features_csv(w))?;
    write_atomic(&layout.targets_path(shot), |w| table.write_target_csv(w))?;
    Ok(WriteOutcome::Written)
}

// ── Safetensors ───────────────────────────────────────────────────────────

/// Minimal safetensors writer for `F32` and `I32` tensors.
///
/// ```rust,no_run
/// use reprep::io::StWriter;
/// use std::path::Path;
/// let mut w = StWriter::new();
/// w.add_f32("feature_min", &[0.0, -1.0], &[2]);
/// w.add_i32("n_samples", &[1], &[1]);
/// w.write(Path::new("/tmp/out.safetensors")).unwrap();
/// ```
#[derive(Debug, Default)]
pub struct StWriter {
    entries: Vec<(String, Vec<u8>, &'static str, Vec<usize>)>,
}

impl StWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_f32(&mut self, name: &str, data: &[f32], shape: &[usize]) {
        let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.entries.push((name.to_string(), bytes, "F32", shape.to_vec()));
    }

    pub fn add_f32_arr2(&mut self, name: &str, arr: &ndarray::Array2<f32>) {
        let data: Vec<f32> = arr.iter().copied().collect();
        self.add_f32(name, &data, &[arr.nrows(), arr.ncols()]);
    }

    pub fn add_i32(&mut self, name: &str, data: &[i32], shape: &[usize]) {
        let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.entries.push((name.to_string(), bytes, "I32", shape.to_vec()));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize: `u64` header length, JSON header padded to 8 bytes, data.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut header_map = serde_json::Map::new();
        let mut offset: usize = 0;
        for (name, data, dtype, shape) in &self.entries {
            header_map.insert(
                name.clone(),
                serde_json::json!({
                    "dtype": dtype,
                    "shape": shape,
                    "data_offsets": [offset, offset + data.len()],
                }),
            );
            offset += data.len();
        }
        let hdr_bytes = serde_json::to_vec(&header_map)?;
        let pad = (8 - hdr_bytes.len() % 8) % 8;

        let mut out = Vec::with_capacity(8 + hdr_bytes.len() + pad + offset);
        out.extend_from_slice(&((hdr_bytes.len() + pad) as u64).to_le_bytes());
        out.extend_from_slice(&hdr_bytes);
        out.extend(std::iter::repeat(b' ').take(pad));
        for (_, data, _, _) in &self.entries {
            out.extend_from_slice(data);
        }
        Ok(out)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let bytes = self.to_bytes()?;
        write_atomic(path, |w| Ok(w.write_all(&bytes)?))
    }
}

/// One tensor read back from a safetensors buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct StTensor {
    pub dtype: String,
    pub shape: Vec<usize>,
    pub data: Vec<u8>,
}

impl StTensor {
    /// Little-endian `F32` payload.
    pub fn to_f32(&self) -> Option<Vec<f32>> {
        (self.dtype == "F32").then(|| {
            self.data
                .chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect()
        })
    }

    pub fn to_i32(&self) -> Option<Vec<i32>> {
        (self.dtype == "I32").then(|| {
            self.data
                .chunks_exact(4)
                .map(|b| i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect()
        })
    }
}

#[derive(serde::Deserialize)]
struct StEntry {
    dtype: String,
    shape: Vec<usize>,
    data_offsets: [usize; 2],
}

/// Parse every tensor of a safetensors buffer (`__metadata__` is ignored).
pub fn read_safetensors(bytes: &[u8]) -> Result<HashMap<String, StTensor>> {
    let malformed = |m: &str| PrepError::MalformedRecord(format!("safetensors: {m}"));
    let len_bytes: [u8; 8] = bytes
        .get(..8)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| malformed("file too small"))?;
    let n = u64::from_le_bytes(len_bytes) as usize;
    let header = bytes.get(8..8 + n).ok_or_else(|| malformed("truncated header"))?;
    let mut entries: HashMap<String, serde_json::Value> = serde_json::from_slice(header)?;
    entries.remove("__metadata__");

    let data = &bytes[8 + n..];
    entries
        .into_iter()
        .map(|(name, v)| -> Result<(String, StTensor)> {
            let e: StEntry = serde_json::from_value(v)?;
            let [s, end] = e.data_offsets;
            let raw = data
                .get(s..end)
                .ok_or_else(|| malformed(&format!("{name} out of range")))?;
            Ok((name, StTensor { dtype: e.dtype, shape: e.shape, data: raw.to_vec() }))
        })
        .collect()
}
