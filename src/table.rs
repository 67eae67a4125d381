//! Tabular records and CSV persistence.
//!
//! Rows are kept as ordered `(field, value)` pairs so the column order of the
//! input survives to every output file. Fields discovered later (such as
//! `cited_by`) are appended to the record that gains them, and the header of
//! each written file is the union of all field names in first-seen order.

use crate::error::Result;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Derived column holding the citation count ("" when unknown or skipped)
pub const CITED_BY: &str = "cited_by";

/// One row of the working dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(String, String)>,
}

impl Record {
    /// Build a record from ordered name/value pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut record = Self::default();
        for (name, value) in pairs {
            record.set(name, value);
        }
        record
    }

    /// Value of a field, if the record has it.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.as_str())
    }

    /// Set a field, appending it when the record has not seen it before.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(field, _)| *field == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Field names in insertion order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }
}

/// The ordered working set of records; identity is position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    records: Vec<Record>,
}

impl Table {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    /// Read a CSV file with a header row into memory.
    pub fn read_csv(path: &Path) -> Result<Self> {
        Ok(Self::new(read_rows(path)?))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn get(&self, index: usize) -> Option<&Record> {
        self.records.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Record> {
        self.records.get_mut(index)
    }

    /// The first `count` records (clamped to the table length).
    pub fn prefix(&self, count: usize) -> &[Record] {
        &self.records[..count.min(self.records.len())]
    }

    /// Union of field names across all records, first-seen order.
    pub fn columns(&self) -> Vec<String> {
        union_header(&self.records)
    }

    /// Replace records `[0, replacement.len())` position-for-position.
    ///
    /// The caller guarantees `replacement.len() <= self.len()`.
    pub fn overwrite_prefix(&mut self, replacement: Vec<Record>) {
        let count = replacement.len();
        self.records.splice(..count, replacement);
    }
}

/// Union of the field names of `records`, in the order they were first seen.
pub fn union_header(records: &[Record]) -> Vec<String> {
    let mut header: Vec<String> = Vec::new();
    for record in records {
        for name in record.field_names() {
            if !header.iter().any(|h| h == name) {
                header.push(name.to_string());
            }
        }
    }
    header
}

/// Read every row of a CSV file with a header row.
pub fn read_rows(path: &Path) -> Result<Vec<Record>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)?;
    let headers = reader.headers()?.clone();

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        records.push(Record::from_pairs(headers.iter().zip(row.iter())));
    }

    debug!(rows = records.len(), path = %path.display(), "Read CSV");
    Ok(records)
}

/// Write `records` to `path` with a uniform header.
///
/// Every row is emitted with every known field; fields a record lacks are
/// written as empty strings. The file is written to a sibling temp path, synced
/// and renamed into place, so a crash never leaves a truncated artifact under
/// the final name.
pub fn write_rows(path: &Path, records: &[Record]) -> Result<usize> {
    let header = union_header(records);
    let tmp_path = temp_path(path);

    let file = File::create(&tmp_path)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);

    if !header.is_empty() {
        writer.write_record(&header)?;
    }
    for record in records {
        writer.write_record(header.iter().map(|name| record.get(name).unwrap_or("")))?;
    }

    let file = writer
        .into_inner()
        .map_err(|e| crate::error::CitationError::Io(e.into_error()))?;
    file.sync_all()?;
    drop(file);
    fs::rename(&tmp_path, path)?;

    Ok(records.len())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
