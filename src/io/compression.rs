//! Transparent gzip handling for record inputs and table exports.
//!
//! Inputs are detected by extension first (`.gz`, `.gzip`) and by the gzip
//! magic bytes otherwise, so a bgzipped `calls.jsonl` without a suffix still
//! reads. Multi-member streams (bgzip output) are read to the end.
//! Without the `compression-gzip` feature every file is read as plain text.

use crate::error::{Result, TableError};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// `true` if the path carries a gzip extension.
#[must_use]
pub fn is_gzip_path(path: impl AsRef<Path>) -> bool {
    let name = path.as_ref().to_string_lossy().to_lowercase();
    name.ends_with(".gz") || name.ends_with(".gzip")
}

/// Open `path` for buffered reading, decompressing gzip content when detected.
///
/// # Errors
/// Returns [`TableError::Io`] if the file cannot be opened or its header read,
/// and [`TableError::InvalidArgument`] for gzip input when gzip support is compiled out.
pub fn open_reader(path: impl AsRef<Path>) -> Result<Box<dyn BufRead + Send>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| TableError::io(path, e))?;
    let mut reader = BufReader::new(file);
    let gzip = is_gzip_path(path) || {
        let head = reader.fill_buf().map_err(|e| TableError::io(path, e))?;
        head.starts_with(&GZIP_MAGIC)
    };
    if !gzip {
        return Ok(Box::new(reader));
    }
    wrap_gzip(reader, path)
}

#[cfg(feature = "compression-gzip")]
fn wrap_gzip(reader: BufReader<File>, _path: &Path) -> Result<Box<dyn BufRead + Send>> {
    use flate2::bufread::MultiGzDecoder;
    Ok(Box::new(BufReader::new(MultiGzDecoder::new(reader))))
}

#[cfg(not(feature = "compression-gzip"))]
fn wrap_gzip(_reader: BufReader<File>, path: &Path) -> Result<Box<dyn BufRead + Send>> {
    Err(TableError::InvalidArgument(format!(
        "{} is gzip-compressed; enable the `compression-gzip` feature",
        path.display()
    )))
}

#[cfg(all(test, feature = "compression-gzip"))]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::{Read, Write};

    #[test]
    fn detects_gzip_by_magic_without_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records");
        let mut enc = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        enc.write_all(b"{\"a\":1}\n").unwrap();
        enc.finish().unwrap();

        let mut text = String::new();
        open_reader(&path).unwrap().read_to_string(&mut text).unwrap();
        assert_eq!(text, "{\"a\":1}\n");
    }

    #[test]
    fn plain_files_pass_through() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.jsonl");
        std::fs::write(&path, "x\n").unwrap();
        let mut text = String::new();
        open_reader(&path).unwrap().read_to_string(&mut text).unwrap();
        assert_eq!(text, "x\n");
        assert!(is_gzip_path("a.JSONL.GZ"));
    }
}
