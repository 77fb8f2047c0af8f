//! Store discovery by glob pattern.
//!
//! Per-partition builds drop one store per region or sample next to each
//! other (`out/region_*.store`); merging them starts by expanding a pattern
//! into the matching store directories.
//!
//! ```no_run
//! use irontable::io::glob::expand_glob;
//!
//! let stores = expand_glob("out/region_*.store")?;
//! # Ok::<(), irontable::TableError>(())
//! ```

use crate::error::{Result, TableError};
use crate::store::is_store;
use glob::glob;
use std::path::PathBuf;

/// Expand a glob pattern into the matching published stores, sorted by path.
///
/// Matches that are not published stores (plain files, staging directories,
/// empty directories) are skipped.
///
/// # Errors
/// Returns [`TableError::InvalidArgument`] for a malformed pattern and
/// [`TableError::Io`] if a matched path cannot be read.
pub fn expand_glob(pattern: &str) -> Result<Vec<PathBuf>> {
    let paths = glob(pattern)
        .map_err(|e| TableError::InvalidArgument(format!("invalid glob pattern `{pattern}`: {e}")))?;

    let mut result = Vec::new();
    for entry in paths {
        let path = entry.map_err(|e| {
            let path = e.path().to_path_buf();
            TableError::io(path, std::io::Error::from(e))
        })?;
        if is_store(&path) {
            result.push(path);
        }
    }
    result.sort();
    Ok(result)
}

/// Like [`expand_glob`], but zero matches is an error.
///
/// # Errors
/// As [`expand_glob`], plus [`TableError::InvalidArgument`] when nothing matches.
pub fn expand_glob_required(pattern: &str) -> Result<Vec<PathBuf>> {
    let stores = expand_glob(pattern)?;
    if stores.is_empty() {
        return Err(TableError::InvalidArgument(format!(
            "no stores found matching pattern: {pattern}"
        )));
    }
    Ok(stores)
}
