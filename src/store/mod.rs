//! On-disk table stores.
//!
//! A store is a directory holding a `_store.json` manifest and one Parquet
//! file per table. Each appended [`RowGroup`] becomes exactly one Parquet row
//! group, so chunk boundaries survive a round trip.
//!
//! Stores are write-once from the reader's point of view: a store opened for
//! writing works in a sibling `<name>.staging` directory and only replaces
//! the published directory in [`TableStore::close`]. Dropping a writable
//! store without closing it discards the staging directory, so a failed build
//! or merge never leaves partial output where a reader would find it.
//!
//! ```no_run
//! use irontable::store::{OpenMode, TableStore};
//! # fn main() -> irontable::Result<()> {
//! let store = TableStore::open("calls.store", OpenMode::Read)?;
//! for name in store.list_tables() {
//!     let table = store.read(&name)?;
//!     println!("{name}: {} rows", table.num_rows());
//! }
//! # Ok(())
//! # }
//! ```

pub mod manifest;
pub mod row_group;
pub mod table;

pub use manifest::{MANIFEST_FILE, Manifest, TableEntry, is_store};
pub use row_group::{ColumnValues, RowGroup};
pub use table::Table;

use crate::error::{Result, TableError};
use crate::schema::{TableSchema, validate_table_name};
use arrow::compute::concat_batches;
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::basic::{Compression, ZstdLevel};
use parquet::file::properties::WriterProperties;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// ZSTD level used for every column.
const COMPRESSION_LEVEL: i32 = 9;

/// Upper bound on rows per Parquet row group. Row groups are closed explicitly
/// after every append, so this only has to exceed any sane chunk size.
const MAX_ROW_GROUP_ROWS: usize = 1 << 30;

const READ_BATCH_ROWS: usize = 64 * 1024;

/// How a store is opened.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpenMode {
    /// Read a published store.
    Read,
    /// Build a new store; replaces any published store at the same path on close.
    Create,
    /// Extend a published store (or create it if absent). Existing row groups
    /// are carried over unchanged.
    Append,
}

struct TableWriter {
    writer: ArrowWriter<File>,
}

/// A named collection of append-only tables.
pub struct TableStore {
    path: PathBuf,
    root: PathBuf,
    mode: OpenMode,
    manifest: Manifest,
    /// Manifest of the published store being extended, in [`OpenMode::Append`].
    published: Option<Manifest>,
    writers: BTreeMap<String, TableWriter>,
    committed: bool,
}

impl TableStore {
    /// Open a store at `path` in the given mode.
    ///
    /// # Errors
    /// Returns an error if a store to read does not exist or its manifest is
    /// invalid, or if the staging directory cannot be prepared.
    pub fn open(path: impl AsRef<Path>, mode: OpenMode) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        match mode {
            OpenMode::Read => {
                let manifest = Manifest::load(&path)?;
                Ok(Self {
                    root: path.clone(),
                    path,
                    mode,
                    manifest,
                    published: None,
                    writers: BTreeMap::new(),
                    committed: true,
                })
            }
            OpenMode::Create | OpenMode::Append => {
                let root = staging_path(&path)?;
                if root.exists() {
                    warn!(staging = %root.display(), "removing stale staging directory");
                    fs::remove_dir_all(&root).map_err(|e| TableError::io(&root, e))?;
                }
                if let Some(parent) = path.parent()
                    && !parent.as_os_str().is_empty()
                {
                    fs::create_dir_all(parent).map_err(|e| TableError::io(parent, e))?;
                }
                fs::create_dir_all(&root).map_err(|e| TableError::io(&root, e))?;

                let published = if mode == OpenMode::Append && is_store(&path) {
                    Some(Manifest::load(&path)?)
                } else {
                    None
                };
                let manifest = published.clone().unwrap_or_default();
                debug!(store = %path.display(), ?mode, "opened store for writing");
                Ok(Self {
                    path,
                    root,
                    mode,
                    manifest,
                    published,
                    writers: BTreeMap::new(),
                    committed: false,
                })
            }
        }
    }

    /// Start a new store at `path`.
    ///
    /// # Errors
    /// See [`TableStore::open`].
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        Self::open(path, OpenMode::Create)
    }

    /// Open a published store for reading.
    ///
    /// # Errors
    /// See [`TableStore::open`].
    pub fn open_read(path: impl AsRef<Path>) -> Result<Self> {
        Self::open(path, OpenMode::Read)
    }

    /// Published location of the store.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    /// Names of all tables, sorted.
    #[must_use]
    pub fn list_tables(&self) -> Vec<String> {
        self.manifest.tables.keys().cloned().collect()
    }

    #[must_use]
    pub fn contains(&self, table: &str) -> bool {
        self.manifest.tables.contains_key(table)
    }

    #[must_use]
    pub fn schema(&self, table: &str) -> Option<&TableSchema> {
        self.manifest.tables.get(table).map(|e| &e.schema)
    }

    #[must_use]
    pub fn entry(&self, table: &str) -> Option<&TableEntry> {
        self.manifest.tables.get(table)
    }

    #[must_use]
    pub fn num_rows(&self, table: &str) -> Option<u64> {
        self.entry(table).map(TableEntry::num_rows)
    }

    /// Append a row group to `table`, creating the table with the group's
    /// schema if it does not exist yet. Returns the index of the group's
    /// first row in the table.
    ///
    /// An empty group creates the table but adds no row group.
    ///
    /// # Errors
    /// - [`TableError::InvalidArgument`] if the store is read-only or the name is invalid.
    /// - [`TableError::SchemaMismatch`] if the group's columns disagree with the table.
    /// - [`TableError::WidthOverflow`] if a text value exceeds the table's column width.
    /// - I/O or Parquet errors from writing.
    pub fn append(&mut self, table: &str, group: &RowGroup) -> Result<u64> {
        if self.mode == OpenMode::Read {
            return Err(TableError::InvalidArgument(format!(
                "store {} is open read-only",
                self.path.display()
            )));
        }
        validate_table_name(table)?;

        match self.manifest.tables.get(table) {
            Some(entry) => {
                entry.schema.check_append(table, group.schema())?;
                group.check_widths(table, &entry.schema)?;
            }
            None => {
                self.manifest
                    .tables
                    .insert(table.to_string(), TableEntry::new(group.schema().clone()));
            }
        }
        self.ensure_writer(table)?;

        let entry = self
            .manifest
            .tables
            .get_mut(table)
            .ok_or_else(|| TableError::schema(table, "table vanished from manifest"))?;
        let first_row = entry.num_rows();
        let rows = group.num_rows();
        if rows == 0 {
            return Ok(first_row);
        }

        let writer = self
            .writers
            .get_mut(table)
            .ok_or_else(|| TableError::schema(table, "no open writer"))?;
        writer.writer.write(group.batch())?;
        writer.writer.flush()?;
        entry.row_groups.push(rows as u64);
        debug!(
            table,
            row_group = entry.row_groups.len() - 1,
            first_row,
            rows,
            "appended row group"
        );
        Ok(first_row)
    }

    fn ensure_writer(&mut self, table: &str) -> Result<()> {
        if self.writers.contains_key(table) {
            return Ok(());
        }
        let entry = self
            .manifest
            .tables
            .get(table)
            .ok_or_else(|| TableError::schema(table, "table missing from manifest"))?;
        let file_path = table_file(&self.root, table);
        let file = File::create(&file_path).map_err(|e| TableError::io(&file_path, e))?;
        let mut writer = ArrowWriter::try_new(
            file,
            entry.schema.arrow_schema(),
            Some(writer_properties()?),
        )?;

        // Carry existing row groups of the published table into the new file.
        if let Some(published) = &self.published
            && let Some(old) = published.tables.get(table)
        {
            let old_path = table_file(&self.path, table);
            for i in 0..old.row_groups.len() {
                let batch = read_row_groups(&old_path, table, &old.schema, vec![i])?;
                writer.write(&batch)?;
                writer.flush()?;
            }
            debug!(table, row_groups = old.row_groups.len(), "carried over published rows");
        }

        self.writers
            .insert(table.to_string(), TableWriter { writer });
        Ok(())
    }

    /// Read a whole table, all row groups concatenated.
    ///
    /// # Errors
    /// Returns an error if the table does not exist, is still being written,
    /// or its file cannot be read.
    pub fn read(&self, table: &str) -> Result<Table> {
        let entry = self.readable(table)?;
        let groups: Vec<usize> = (0..entry.row_groups.len()).collect();
        self.read_groups(table, entry, groups)
    }

    /// Read a single row group of a table.
    ///
    /// # Errors
    /// Same as [`TableStore::read`], plus an out-of-range index.
    pub fn read_row_group(&self, table: &str, index: usize) -> Result<Table> {
        let entry = self.readable(table)?;
        if index >= entry.row_groups.len() {
            return Err(TableError::InvalidArgument(format!(
                "table `{table}` has {} row groups, asked for {index}",
                entry.row_groups.len()
            )));
        }
        self.read_groups(table, entry, vec![index])
    }

    fn readable(&self, table: &str) -> Result<&TableEntry> {
        if self.writers.contains_key(table) {
            return Err(TableError::InvalidArgument(format!(
                "table `{table}` is still being written"
            )));
        }
        self.manifest.tables.get(table).ok_or_else(|| {
            TableError::InvalidArgument(format!(
                "no table `{table}` in store {}",
                self.path.display()
            ))
        })
    }

    fn read_groups(&self, table: &str, entry: &TableEntry, groups: Vec<usize>) -> Result<Table> {
        let sizes: Vec<u64> = groups.iter().map(|&i| entry.row_groups[i]).collect();
        let batch = if groups.is_empty() {
            RecordBatch::new_empty(entry.schema.arrow_schema())
        } else {
            let base = match (&self.published, self.mode) {
                // Untouched tables of an append session still live in the published store.
                (Some(p), OpenMode::Append) if p.tables.contains_key(table) => &self.path,
                _ => &self.root,
            };
            read_row_groups(&table_file(base, table), table, &entry.schema, groups)?
        };
        Ok(Table::new(
            table.to_string(),
            entry.schema.clone(),
            batch,
            sizes,
        ))
    }

    /// Finish every table, write the manifest, and publish the store.
    ///
    /// # Errors
    /// Returns an error if a writer cannot be finalized or the staging
    /// directory cannot be moved into place. The published store, if any, is
    /// left untouched on error.
    pub fn close(mut self) -> Result<()> {
        if self.mode == OpenMode::Read {
            return Ok(());
        }
        for (name, w) in std::mem::take(&mut self.writers) {
            w.writer.close()?;
            debug!(table = %name, "closed table file");
        }
        if let Some(published) = &self.published {
            for name in published.tables.keys() {
                let dst = table_file(&self.root, name);
                if !dst.exists() {
                    let src = table_file(&self.path, name);
                    fs::copy(&src, &dst).map_err(|e| TableError::io(&src, e))?;
                }
            }
        }
        self.manifest.save(&self.root)?;
        self.publish()?;
        self.committed = true;
        info!(
            store = %self.path.display(),
            tables = self.manifest.tables.len(),
            "published store"
        );
        Ok(())
    }

    fn publish(&self) -> Result<()> {
        if !self.path.exists() {
            return fs::rename(&self.root, &self.path).map_err(|e| TableError::io(&self.path, e));
        }
        let backup = sibling(&self.path, "replaced")?;
        if backup.exists() {
            fs::remove_dir_all(&backup).map_err(|e| TableError::io(&backup, e))?;
        }
        fs::rename(&self.path, &backup).map_err(|e| TableError::io(&self.path, e))?;
        if let Err(e) = fs::rename(&self.root, &self.path) {
            // Put the previous store back before reporting.
            let _ = fs::rename(&backup, &self.path);
            return Err(TableError::io(&self.path, e));
        }
        fs::remove_dir_all(&backup).map_err(|e| TableError::io(&backup, e))
    }
}

impl Drop for TableStore {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        self.writers.clear();
        if let Err(e) = fs::remove_dir_all(&self.root) {
            warn!(staging = %self.root.display(), error = %e, "could not remove staging directory");
        } else {
            debug!(store = %self.path.display(), "discarded unpublished store");
        }
    }
}

impl std::fmt::Debug for TableStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableStore")
            .field("path", &self.path)
            .field("mode", &self.mode)
            .field("tables", &self.manifest.tables.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

fn writer_properties() -> Result<WriterProperties> {
    Ok(WriterProperties::builder()
        .set_compression(Compression::ZSTD(ZstdLevel::try_new(COMPRESSION_LEVEL)?))
        .set_max_row_group_row_count(Some(MAX_ROW_GROUP_ROWS))
        .build())
}

fn table_file(dir: &Path, table: &str) -> PathBuf {
    dir.join(format!("{table}.parquet"))
}

fn sibling(path: &Path, suffix: &str) -> Result<PathBuf> {
    let name = path.file_name().ok_or_else(|| {
        TableError::InvalidArgument(format!("store path {} has no file name", path.display()))
    })?;
    let mut name = name.to_os_string();
    name.push(format!(".{suffix}"));
    Ok(path.with_file_name(name))
}

/// Working directory of a store opened for writing.
#[must_use]
pub fn staging_path_of(path: &Path) -> Option<PathBuf> {
    staging_path(path).ok()
}

fn staging_path(path: &Path) -> Result<PathBuf> {
    sibling(path, "staging")
}

/// Read the given row groups of a table file and normalize every column to its layout.
fn read_row_groups(
    file_path: &Path,
    table: &str,
    schema: &TableSchema,
    groups: Vec<usize>,
) -> Result<RecordBatch> {
    let file = File::open(file_path).map_err(|e| TableError::io(file_path, e))?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?
        .with_row_groups(groups)
        .with_batch_size(READ_BATCH_ROWS)
        .build()?;

    let arrow_schema = schema.arrow_schema();
    let mut batches = Vec::new();
    for batch in reader {
        let batch = batch?;
        if batch.num_columns() != schema.columns.len() {
            return Err(TableError::schema(
                table,
                format!(
                    "file has {} columns, manifest lists {}",
                    batch.num_columns(),
                    schema.columns.len()
                ),
            ));
        }
        let columns = schema
            .columns
            .iter()
            .zip(batch.columns())
            .map(|(c, a)| table::normalize_column(table, &c.name, &c.layout, a))
            .collect::<Result<Vec<_>>>()?;
        batches.push(RecordBatch::try_new(arrow_schema.clone(), columns)?);
    }
    Ok(concat_batches(&arrow_schema, &batches)?)
}
