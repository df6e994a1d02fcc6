//! Blob retrieval seam.
//!
//! The pipeline only needs two operations from wherever raw shot files live:
//! list the names and fetch the bytes of one. [`LocalDirStore`] serves a
//! mounted database directory. A session is opened from a [`StoreConfig`]
//! and released when dropped, on every exit path.
use std::cell::Cell;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::adapter::ContainerFormat;
use crate::error::{PrepError, Result};

/// Named byte buffers.
pub trait BlobStore {
    /// Names of the shot files to process, sorted.
    fn list(&self) -> Result<Vec<String>>;

    fn fetch(&self, name: &str) -> Result<Vec<u8>>;
}

/// Store connection parameters, passed at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding the shot files.
    pub root: PathBuf,
    /// Only names containing this tag are listed. Default: `"JET"`.
    pub machine_tag: String,
}

impl StoreConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), machine_tag: "JET".to_string() }
    }

    /// Tagged and in a supported container.
    pub fn accepts(&self, name: &str) -> bool {
        name.contains(&self.machine_tag) && ContainerFormat::is_supported(name)
    }
}

/// Session over a local directory.
#[derive(Debug)]
pub struct LocalDirStore {
    config: StoreConfig,
    fetched: Cell<usize>,
}

impl LocalDirStore {
    pub fn open(config: StoreConfig) -> Result<Self> {
        if !config.root.is_dir() {
            return Err(PrepError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("store root {} is not a directory", config.root.display()),
            )));
        }
        info!(root = %config.root.display(), tag = %config.machine_tag, "store session opened");
        Ok(Self { config, fetched: Cell::new(0) })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }
}

impl BlobStore for LocalDirStore {
    fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.config.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if self.config.accepts(&name) {
                names.push(name);
            } else {
                debug!(name = %name, "not a shot file, ignored");
            }
        }
        names.sort();
        Ok(names)
    }

    fn fetch(&self, name: &str) -> Result<Vec<u8>> {
        if name.contains(['/', '\\']) || name == ".." {
            return Err(PrepError::MalformedRecord(format!("blob name {name:?}")));
        }
        let bytes = std::fs::read(self.config.root.join(name))?;
        self.fetched.set(self.fetched.get() + 1);
        Ok(bytes)
    }
}

impl Drop for LocalDirStore {
    fn drop(&mut self) {
        info!(
            root = %self.config.root.display(),
            fetched = self.fetched.get(),
            "store session released"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_filters_by_tag_and_extension() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["JET_2.h5", "JET_1.mat", "AUG_3.mat", "JET_4.txt", "notes.md"] {
            std::fs::write(dir.path().join(name), b"{}").unwrap();
        }
        std::fs::create_dir(dir.path().join("JET_5.mat")).unwrap();

        let store = LocalDirStore::open(StoreConfig::new(dir.path())).unwrap();
        assert_eq!(store.list().unwrap(), vec!["JET_1.mat", "JET_2.h5"]);
        assert_eq!(store.fetch("JET_1.mat").unwrap(), b"{}");
        assert!(store.fetch("../JET_1.mat").is_err());
    }

    #[test]
    fn open_missing_root_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(LocalDirStore::open(StoreConfig::new(dir.path().join("nope"))).is_err());
    }
}
