//! JSON Lines record sources.
//!
//! Each non-blank line is one JSON object whose members become the record's
//! fields, in document order. Numbers without a fractional part read as
//! integers, other numbers as floats, arrays as multi-valued fields.
//! Gzip input is decompressed transparently (see [`crate::io::compression`]).
//!
//! [`JsonlSource`] re-opens its file for every stream, so it satisfies the
//! restartable-source contract of the two-pass build without buffering.

use crate::error::{Result, TableError};
use crate::io::compression::open_reader;
use crate::record::{Record, RecordSource, RecordStream};
use std::fs::{File, create_dir_all};
use std::io::{BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};

/// A restartable record source over a JSONL file.
#[derive(Clone, Debug)]
pub struct JsonlSource {
    path: PathBuf,
}

impl JsonlSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSource for JsonlSource {
    fn open_stream(&self) -> Result<RecordStream<'_>> {
        let reader = open_reader(&self.path)?;
        let path = self.path.as_path();
        let records = reader
            .lines()
            .enumerate()
            .filter_map(move |(i, line)| parse_line(path, i + 1, line).transpose());
        Ok(Box::new(records))
    }
}

fn parse_line(path: &Path, line_no: usize, line: std::io::Result<String>) -> Result<Option<Record>> {
    let line = line.map_err(|e| TableError::io(path, e))?;
    if line.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(&line).map(Some).map_err(|e| {
        TableError::Record(format!("{} line {line_no}: {e}", path.display()))
    })
}

/// Write records as JSONL, one compact object per line. Parent directories
/// are created as needed.
///
/// # Errors
/// Returns an error if the file cannot be created or written.
pub fn write_jsonl_records(path: impl AsRef<Path>, records: &[Record]) -> Result<usize> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        create_dir_all(parent).map_err(|e| TableError::io(parent, e))?;
    }
    let file = File::create(path).map_err(|e| TableError::io(path, e))?;
    let mut w = BufWriter::new(file);
    for record in records {
        serde_json::to_writer(&mut w, record).map_err(|e| TableError::Json {
            path: path.to_path_buf(),
            source: e,
        })?;
        w.write_all(b"\n").map_err(|e| TableError::io(path, e))?;
    }
    w.flush().map_err(|e| TableError::io(path, e))?;
    Ok(records.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Value;

    #[test]
    fn reads_fields_in_document_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calls.jsonl");
        std::fs::write(
            &path,
            "{\"chrom\":\"1\",\"coord\":5,\"alt\":[\"A\",\"T\"],\"qual\":3.5}\n\n",
        )
        .unwrap();
        let src = JsonlSource::new(&path);
        let records: Vec<Record> = src.open_stream().unwrap().collect::<Result<_>>().unwrap();
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.names().collect::<Vec<_>>(), ["chrom", "coord", "alt", "qual"]);
        assert_eq!(r.get("coord"), Some(&Value::Int(5)));
        assert_eq!(r.get("alt").map(Value::arity), Some(2));
        // A second stream sees the same records.
        assert_eq!(src.open_stream().unwrap().count(), 1);
    }

    #[test]
    fn bad_line_reports_line_number() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.jsonl");
        std::fs::write(&path, "{\"a\":1}\nnot json\n").unwrap();
        let err = JsonlSource::new(&path)
            .open_stream()
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap_err();
        assert!(err.to_string().contains("line 2"), "{err}");
    }
}
