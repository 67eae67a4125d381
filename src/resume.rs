//! Startup reconciliation between the input table and a saved checkpoint.

use crate::checkpoint::CheckpointStore;
use crate::error::{CitationError, Result};
use crate::table::{self, Table};
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

/// Where a run should pick up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResumePoint {
    /// Start from the first record
    #[default]
    None,
    /// Resume from the checkpoint holding exactly this many records
    At(usize),
    /// Resume from the highest checkpoint on disk
    Latest,
}

impl FromStr for ResumePoint {
    type Err = CitationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "" => Ok(ResumePoint::None),
            "latest" => Ok(ResumePoint::Latest),
            other => other.parse::<usize>().map(ResumePoint::At).map_err(|_| {
                CitationError::Config(format!(
                    "invalid resume point '{}': expected a count, 'latest' or 'none'",
                    s
                ))
            }),
        }
    }
}

impl fmt::Display for ResumePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResumePoint::None => write!(f, "none"),
            ResumePoint::At(count) => write!(f, "{}", count),
            ResumePoint::Latest => write!(f, "latest"),
        }
    }
}

/// Starting cursor plus the reconciled working table.
#[derive(Debug, Clone)]
pub struct ResumePlan {
    pub cursor: usize,
    pub table: Table,
}

/// Decide where to start and overlay the checkpoint prefix onto `table`.
///
/// The checkpoint wins for `[0, cursor)`: it may hold values the input never
/// had. Fails with [`CitationError::Config`] when the resume point is larger
/// than the table, when the checkpoint's row count differs from its key, or
/// when the checkpoint lacks a column the input has.
pub fn plan(mut table: Table, resume: ResumePoint, store: &CheckpointStore) -> Result<ResumePlan> {
    let count = match resume {
        ResumePoint::None => {
            info!("No resume point configured. Starting from the beginning.");
            return Ok(ResumePlan { cursor: 0, table });
        }
        ResumePoint::At(count) => count,
        ResumePoint::Latest => match store.latest()? {
            Some(count) => count,
            None => {
                warn!(dir = %store.dir().display(), "No checkpoint files found. Starting from the beginning.");
                return Ok(ResumePlan { cursor: 0, table });
            }
        },
    };

    if count > table.len() {
        return Err(CitationError::Config(format!(
            "resume point {} exceeds input length {}",
            count,
            table.len()
        )));
    }

    let checkpoint_path = store.checkpoint_path(count);
    let Some(records) = store.load(count)? else {
        warn!(
            path = %checkpoint_path.display(),
            "Checkpoint file not found: {}. Starting from the beginning.",
            checkpoint_path.display()
        );
        return Ok(ResumePlan { cursor: 0, table });
    };

    if records.len() != count {
        return Err(CitationError::Config(format!(
            "checkpoint {} holds {} rows",
            checkpoint_path.display(),
            records.len()
        )));
    }

    let checkpoint_columns = table::union_header(&records);
    let missing: Vec<String> = table
        .columns()
        .into_iter()
        .filter(|c| !checkpoint_columns.contains(c))
        .collect();
    if count > 0 && !missing.is_empty() {
        return Err(CitationError::Config(format!(
            "checkpoint {} is missing input columns: {}",
            checkpoint_path.display(),
            missing.join(", ")
        )));
    }

    table.overwrite_prefix(records);
    info!(cursor = count, "Resumed from checkpoint: {}", checkpoint_path.display());
    Ok(ResumePlan { cursor: count, table })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::DEFAULT_PREFIX;
    use crate::table::{Record, CITED_BY};
    use tempfile::TempDir;

    fn base(n: usize) -> Table {
        Table::new(
            (0..n)
                .map(|i| Record::from_pairs([("title".to_string(), format!("Base {}", i))]))
                .collect(),
        )
    }

    fn checkpoint_rows(n: usize) -> Vec<Record> {
        (0..n)
            .map(|i| {
                Record::from_pairs([
                    ("title".to_string(), format!("Checkpoint {}", i)),
                    (CITED_BY.to_string(), (i * 10).to_string()),
                ])
            })
            .collect()
    }

    #[test]
    fn test_parse_resume_point() -> Result<()> {
        assert_eq!("none".parse::<ResumePoint>()?, ResumePoint::None);
        assert_eq!("LATEST".parse::<ResumePoint>()?, ResumePoint::Latest);
        assert_eq!("1660".parse::<ResumePoint>()?, ResumePoint::At(1660));
        assert!("-3".parse::<ResumePoint>().is_err());
        assert_eq!(ResumePoint::At(40).to_string(), "40");
        Ok(())
    }

    #[test]
    fn test_no_resume_point_starts_at_zero() -> Result<()> {
        let dir = TempDir::new()?;
        let store = CheckpointStore::new(dir.path(), DEFAULT_PREFIX);
        let plan = plan(base(4), ResumePoint::None, &store)?;
        assert_eq!(plan.cursor, 0);
        assert_eq!(plan.table, base(4));
        Ok(())
    }

    #[test]
    fn test_missing_checkpoint_starts_at_zero() -> Result<()> {
        let dir = TempDir::new()?;
        let store = CheckpointStore::new(dir.path(), DEFAULT_PREFIX);
        let plan = plan(base(8), ResumePoint::At(5), &store)?;
        assert_eq!(plan.cursor, 0);
        assert_eq!(plan.table, base(8));
        Ok(())
    }

    #[test]
    fn test_checkpoint_overrides_prefix() -> Result<()> {
        let dir = TempDir::new()?;
        let store = CheckpointStore::new(dir.path(), DEFAULT_PREFIX);
        store.write(&checkpoint_rows(5), 5)?;

        let plan = plan(base(8), ResumePoint::At(5), &store)?;
        assert_eq!(plan.cursor, 5);
        assert_eq!(plan.table.prefix(5), checkpoint_rows(5).as_slice());
        assert_eq!(plan.table.get(5), base(8).get(5));
        assert_eq!(plan.table.len(), 8);
        Ok(())
    }

    #[test]
    fn test_latest_picks_highest() -> Result<()> {
        let dir = TempDir::new()?;
        let store = CheckpointStore::new(dir.path(), DEFAULT_PREFIX);
        store.write(&checkpoint_rows(2), 2)?;
        store.write(&checkpoint_rows(4), 4)?;

        let plan = plan(base(6), ResumePoint::Latest, &store)?;
        assert_eq!(plan.cursor, 4);
        Ok(())
    }

    #[test]
    fn test_resume_point_beyond_table_fails() -> Result<()> {
        let dir = TempDir::new()?;
        let store = CheckpointStore::new(dir.path(), DEFAULT_PREFIX);
        store.write(&checkpoint_rows(5), 5)?;
        let err = plan(base(3), ResumePoint::At(5), &store).expect_err("too short");
        assert!(matches!(err, CitationError::Config(_)));
        Ok(())
    }

    #[test]
    fn test_checkpoint_length_mismatch_fails() -> Result<()> {
        let dir = TempDir::new()?;
        let store = CheckpointStore::new(dir.path(), DEFAULT_PREFIX);
        // A checkpoint file whose content disagrees with its name.
        table::write_rows(&store.checkpoint_path(5), &checkpoint_rows(4))?;
        let err = plan(base(8), ResumePoint::At(5), &store).expect_err("length mismatch");
        assert!(matches!(err, CitationError::Config(_)));
        Ok(())
    }

    #[test]
    fn test_checkpoint_schema_mismatch_fails() -> Result<()> {
        let dir = TempDir::new()?;
        let store = CheckpointStore::new(dir.path(), DEFAULT_PREFIX);
        store.write(&checkpoint_rows(2), 2)?;

        let mut input = base(4);
        if let Some(record) = input.get_mut(0) {
            record.set("doi", "10.1000/xyz");
        }
        let err = plan(input, ResumePoint::At(2), &store).expect_err("schema mismatch");
        assert!(matches!(err, CitationError::Config(_)));
        Ok(())
    }
}
