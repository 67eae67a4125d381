//! Checkpoint persistence and discovery.
//!
//! A checkpoint is a full CSV snapshot of the finalized prefix of the working
//! table, named by how many records it holds:
//! `<dir>/<prefix>_checkpoint_<count>.csv`. The count in the filename is the
//! only record of progress; there is no separate cursor file. The store only
//! ever writes new files and never deletes old ones.

use crate::error::{CitationError, Result};
use crate::table::{self, Record};
use regex::Regex;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default filename prefix, shared by checkpoints and the final artifact
pub const DEFAULT_PREFIX: &str = "updated_citations";

/// An existing checkpoint on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckpointInfo {
    pub count: usize,
    pub path: PathBuf,
}

/// Writes and loads checkpoints in one directory.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    dir: PathBuf,
    prefix: String,
}

impl CheckpointStore {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the checkpoint holding `count` records.
    pub fn checkpoint_path(&self, count: usize) -> PathBuf {
        self.dir.join(format!("{}_checkpoint_{}.csv", self.prefix, count))
    }

    /// Path of the terminal artifact.
    pub fn final_path(&self) -> PathBuf {
        self.dir.join(format!("{}_final.csv", self.prefix))
    }

    /// Snapshot `records` as the checkpoint for `count`.
    ///
    /// Always rewrites the whole file. `records` must hold exactly `count` rows.
    pub fn write(&self, records: &[Record], count: usize) -> Result<PathBuf> {
        if records.len() != count {
            return Err(CitationError::Store(format!(
                "checkpoint {} given {} records",
                count,
                records.len()
            )));
        }
        let path = self.checkpoint_path(count);
        self.write_to(&path, records)?;
        info!(count, path = %path.display(), "Checkpoint saved at row {}", count);
        Ok(path)
    }

    /// Write the complete table to the terminal artifact.
    pub fn write_final(&self, records: &[Record]) -> Result<PathBuf> {
        let path = self.final_path();
        self.write_to(&path, records)?;
        info!(path = %path.display(), "Final updated data saved");
        Ok(path)
    }

    fn write_to(&self, path: &Path, records: &[Record]) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let rows = table::write_rows(path, records)?;
        info!(rows, path = %path.display(), "Saved {} rows to {}", rows, path.display());
        Ok(())
    }

    /// Records of the checkpoint for `count`, or `None` when it does not exist.
    pub fn load(&self, count: usize) -> Result<Option<Vec<Record>>> {
        let path = self.checkpoint_path(count);
        if !path.is_file() {
            debug!(path = %path.display(), "Checkpoint not found");
            return Ok(None);
        }
        let records = table::read_rows(&path)?;
        Ok(Some(records))
    }

    /// Existing checkpoints, ascending by count.
    pub fn list(&self) -> Result<Vec<CheckpointInfo>> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }
        let pattern = Regex::new(&format!(
            r"^{}_checkpoint_(\d+)\.csv$",
            regex::escape(&self.prefix)
        ))
        .map_err(|e| CitationError::Config(e.to_string()))?;

        let mut found = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(caps) = name.to_str().and_then(|n| pattern.captures(n)) else {
                continue;
            };
            if let Ok(count) = caps[1].parse::<usize>() {
                found.push(CheckpointInfo {
                    count,
                    path: entry.path(),
                });
            }
        }
        found.sort_by_key(|c| c.count);
        Ok(found)
    }

    /// Highest existing checkpoint count.
    pub fn latest(&self) -> Result<Option<usize>> {
        Ok(self.list()?.last().map(|c| c.count))
    }
}
