//! Batch drivers over a [`BlobStore`].
//!
//! Shots are processed one at a time, start to finish. A failure inside one
//! shot is logged with the shot name and reason, counted in the
//! [`BatchReport`], and the loop moves on; only store-level failures (the
//! listing itself, or a checkpoint that can not be saved) end the run.
//!
//! Three passes share this shape:
//!
//! - [`run_batch`]: features + label CSV per shot, skipping shots whose
//!   files already exist.
//! - [`run_aggregate`]: raw channels into the JSON [`Checkpoint`], skipping
//!   shots already in it, saving after each new one.
//! - [`audit_metadata`]: which shots lack disruption time or ramp intervals.
use std::path::Path;

use tracing::{info, warn};

use crate::adapter::{read_shot, RecordReader};
use crate::checkpoint::Checkpoint;
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::io::{write_shot_files, OutputLayout, WriteOutcome};
use crate::label::ReCatalogue;
use crate::shot::{Channel, ShotId};
use crate::store::BlobStore;

/// Outcome counts of one batch run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub processed: usize,
    /// Output already present.
    pub skipped: usize,
    /// `(blob name, reason)` of every shot that failed.
    pub failed: Vec<(String, String)>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.processed + self.skipped + self.failed.len()
    }

    fn fail(&mut self, name: &str, reason: impl ToString) {
        let reason = reason.to_string();
        warn!(name, %reason, "shot failed");
        self.failed.push((name.to_string(), reason));
    }
}

/// Features and labels for every shot in `store`.
pub fn run_batch(
    store: &dyn BlobStore,
    reader: &dyn RecordReader,
    layout: &OutputLayout,
    cfg: &PipelineConfig,
    catalogue: &ReCatalogue,
) -> Result<BatchReport> {
    let names = store.list()?;
    info!(shots = names.len(), out = %layout.root().display(), "batch started");
    let mut report = BatchReport::default();

    for name in &names {
        let shot = match ShotId::from_file_name(name) {
            Ok(s) => s,
            Err(e) => {
                report.fail(name, e);
                continue;
            }
        };
        if layout.is_complete(shot) {
            report.skipped += 1;
            continue;
        }
        match process_one(store, reader, name, layout, cfg, catalogue) {
            Ok(WriteOutcome::Written) => {
                info!(%shot, positive = catalogue.is_positive(shot), "shot written");
                report.processed += 1;
            }
            Ok(WriteOutcome::Skipped) => report.skipped += 1,
            Err(e) => report.fail(name, e),
        }
    }

    info!(
        processed = report.processed,
        skipped = report.skipped,
        failed = report.failed.len(),
        "batch finished"
    );
    Ok(report)
}

fn process_one(
    store: &dyn BlobStore,
    reader: &dyn RecordReader,
    name: &str,
    layout: &OutputLayout,
    cfg: &PipelineConfig,
    catalogue: &ReCatalogue,
) -> Result<WriteOutcome> {
    let bytes = store.fetch(name)?;
    let record = read_shot(reader, name, &bytes, &cfg.channels)?;
    let table = crate::preprocess_shot(&record, cfg, catalogue)?;
    write_shot_files(layout, record.shot, &table)
}

/// Collect raw `channels` of every shot into the checkpoint at `path`.
pub fn run_aggregate(
    store: &dyn BlobStore,
    reader: &dyn RecordReader,
    channels: &[Channel],
    path: &Path,
) -> Result<BatchReport> {
    let mut checkpoint = Checkpoint::load_or_default(path)?;
    let names = store.list()?;
    let mut report = BatchReport::default();

    for name in &names {
        let shot = match ShotId::from_file_name(name) {
            Ok(s) => s,
            Err(e) => {
                report.fail(name, e);
                continue;
            }
        };
        if checkpoint.contains(shot) {
            report.skipped += 1;
            continue;
        }
        let record = match store.fetch(name).and_then(|b| read_shot(reader, name, &b, channels)) {
            Ok(r) => r,
            Err(e) => {
                report.fail(name, e);
                continue;
            }
        };
        checkpoint.insert_record(&record);
        checkpoint.save(path)?;
        info!(%shot, channels = record.channels.len(), "checkpoint saved");
        report.processed += 1;
    }
    Ok(report)
}

/// Shots missing each piece of metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataAudit {
    pub shots: usize,
    pub missing_disruption_time: Vec<ShotId>,
    pub missing_ramp_up: Vec<ShotId>,
    pub missing_flat_top: Vec<ShotId>,
    pub missing_ramp_down: Vec<ShotId>,
    /// Blobs that could not be read at all.
    pub unreadable: Vec<(String, String)>,
}

impl MetadataAudit {
    /// Shots with every metadata field present and a finite disruption time.
    pub fn complete(&self) -> usize {
        let mut incomplete: Vec<ShotId> = self
            .missing_disruption_time
            .iter()
            .chain(&self.missing_ramp_up)
            .chain(&self.missing_flat_top)
            .chain(&self.missing_ramp_down)
            .copied()
            .collect();
        incomplete.sort();
        incomplete.dedup();
        self.shots - incomplete.len()
    }
}

/// Read every shot and record which metadata it lacks. A NaN disruption
/// time counts as missing.
pub fn audit_metadata(store: &dyn BlobStore, reader: &dyn RecordReader) -> Result<MetadataAudit> {
    let mut audit = MetadataAudit::default();
    for name in store.list()? {
        let record = match store.fetch(&name).and_then(|b| read_shot(reader, &name, &b, &[])) {
            Ok(r) => r,
            Err(e) => {
                warn!(%name, reason = %e, "unreadable");
                audit.unreadable.push((name, e.to_string()));
                continue;
            }
        };
        audit.shots += 1;
        let shot = record.shot;
        if !record.disruption_time.is_some_and(f64::is_finite) {
            audit.missing_disruption_time.push(shot);
        }
        if record.ramp_up.is_none() {
            audit.missing_ramp_up.push(shot);
        }
        if record.flat_top.is_none() {
            audit.missing_flat_top.push(shot);
        }
        if record.ramp_down.is_none() {
            audit.missing_ramp_down.push(shot);
        }
    }
    info!(
        shots = audit.shots,
        complete = audit.complete(),
        unreadable = audit.unreadable.len(),
        "metadata audit"
    );
    Ok(audit)
}
