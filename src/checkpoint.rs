//! Aggregate checkpoint of raw extracted channels.
//!
//! One JSON document maps shot → channel → `{signal, time}`. It is loaded
//! at the start of a run, shots already in it are not fetched again, and it
//! is rewritten atomically after every new shot, so an interrupted run
//! resumes where it stopped.
use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;
use crate::io::write_atomic;
use crate::shot::{Channel, ChannelSeries, ShotId, ShotRecord};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Checkpoint {
    shots: BTreeMap<ShotId, BTreeMap<Channel, ChannelSeries>>,
}

impl Checkpoint {
    /// Load `path`, or start empty if it does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(path = %path.display(), "no checkpoint, starting fresh");
            return Ok(Self::default());
        }
        let bytes = std::fs::read(path)?;
        let cp: Self = serde_json::from_slice(&bytes)?;
        info!(path = %path.display(), shots = cp.len(), "loaded checkpoint");
        Ok(cp)
    }

    /// Atomic rewrite of the whole document.
    pub fn save(&self, path: &Path) -> Result<()> {
        write_atomic(path, |w| Ok(serde_json::to_writer(w, self)?))
    }

    pub fn contains(&self, shot: ShotId) -> bool {
        self.shots.contains_key(&shot)
    }

    /// Store the channels of `record`, replacing any earlier entry.
    pub fn insert_record(&mut self, record: &ShotRecord) {
        self.shots.insert(record.shot, record.channels.clone());
    }

    pub fn channels(&self, shot: ShotId) -> Option<&BTreeMap<Channel, ChannelSeries>> {
        self.shots.get(&shot)
    }

    pub fn shots(&self) -> impl Iterator<Item = ShotId> + '_ {
        self.shots.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.shots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shots.is_empty()
    }
}
