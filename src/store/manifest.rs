//! The `_store.json` manifest: resolved schemas and row-group sizes of every table.

use crate::error::{Result, TableError};
use crate::schema::TableSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// File name of the manifest inside a store directory.
pub const MANIFEST_FILE: &str = "_store.json";

/// Layout version written into every manifest.
pub const STORE_FORMAT: u32 = 1;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub format: u32,
    pub tables: BTreeMap<String, TableEntry>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            format: STORE_FORMAT,
            tables: BTreeMap::new(),
        }
    }
}

/// Persisted state of one table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TableEntry {
    pub schema: TableSchema,
    /// Row count of each row group, in append order.
    pub row_groups: Vec<u64>,
}

impl TableEntry {
    #[must_use]
    pub fn new(schema: TableSchema) -> Self {
        Self {
            schema,
            row_groups: Vec::new(),
        }
    }

    #[must_use]
    pub fn num_rows(&self) -> u64 {
        self.row_groups.iter().sum()
    }

    /// First row index of every row group.
    #[must_use]
    pub fn row_group_offsets(&self) -> Vec<u64> {
        self.row_groups
            .iter()
            .scan(0u64, |acc, &n| {
                let start = *acc;
                *acc += n;
                Some(start)
            })
            .collect()
    }
}

impl Manifest {
    /// Load the manifest of the store at `dir`.
    ///
    /// # Errors
    /// Returns an I/O error if the manifest is missing and a JSON error if it
    /// does not parse or carries an unknown format version.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(MANIFEST_FILE);
        let f = File::open(&path).map_err(|e| TableError::io(&path, e))?;
        let manifest: Manifest = serde_json::from_reader(BufReader::new(f)).map_err(|e| {
            TableError::Json {
                path: path.clone(),
                source: e,
            }
        })?;
        if manifest.format != STORE_FORMAT {
            return Err(TableError::InvalidArgument(format!(
                "{} has store format {}, expected {STORE_FORMAT}",
                path.display(),
                manifest.format
            )));
        }
        Ok(manifest)
    }

    /// Write the manifest into `dir`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created, serialized, or flushed.
    pub fn save(&self, dir: &Path) -> Result<()> {
        let path = dir.join(MANIFEST_FILE);
        let f = File::create(&path).map_err(|e| TableError::io(&path, e))?;
        let mut w = BufWriter::new(f);
        serde_json::to_writer_pretty(&mut w, self).map_err(|e| TableError::Json {
            path: path.clone(),
            source: e,
        })?;
        w.flush().map_err(|e| TableError::io(&path, e))?;
        w.get_ref()
            .sync_all()
            .map_err(|e| TableError::io(&path, e))?;
        Ok(())
    }
}

/// `true` if `dir` looks like a table store.
#[must_use]
pub fn is_store(dir: &Path) -> bool {
    dir.join(MANIFEST_FILE).is_file()
}
