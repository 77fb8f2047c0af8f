//! Width reconciliation across stores.
//!
//! Before tables from many stores can be concatenated, every text column of
//! the output needs one width that holds the longest value from any input.
//! A column is text in the output as soon as one input stores it as
//! non-numeric; numeric values of such a column are measured in their
//! canonical text form, the same form the concatenator writes.

use crate::error::{Result, TableError};
use crate::store::TableStore;
use crate::store::table::column_text;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Maximum byte width per `(table, column)` text column.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidthRegistry {
    tables: BTreeMap<String, BTreeMap<String, usize>>,
}

impl WidthRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, table: &str, column: &str) -> Option<usize> {
        self.tables.get(table)?.get(column).copied()
    }

    /// Raise the width of a column to at least `width`.
    pub fn observe(&mut self, table: &str, column: &str, width: usize) {
        let slot = self
            .tables
            .entry(table.to_string())
            .or_default()
            .entry(column.to_string())
            .or_default();
        *slot = (*slot).max(width);
    }

    /// Column widths of one table.
    #[must_use]
    pub fn table(&self, table: &str) -> Option<&BTreeMap<String, usize>> {
        self.tables.get(table)
    }

    pub fn tables(&self) -> impl Iterator<Item = (&str, &BTreeMap<String, usize>)> {
        self.tables.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Column-wise maximum of two registries.
    #[must_use]
    pub fn merge(mut self, other: WidthRegistry) -> Self {
        for (table, columns) in other.tables {
            for (column, width) in columns {
                self.observe(&table, &column, width);
            }
        }
        self
    }
}

/// Columns stored as non-numeric by at least one input, per table.
pub(crate) fn text_columns(stores: &[TableStore]) -> BTreeMap<String, BTreeSet<String>> {
    let mut out: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for store in stores {
        for table in store.list_tables() {
            let columns = out.entry(table.clone()).or_default();
            if let Some(schema) = store.schema(&table) {
                columns.extend(
                    schema
                        .columns
                        .iter()
                        .filter(|c| !c.layout.is_numeric())
                        .map(|c| c.name.clone()),
                );
            }
        }
    }
    out
}

/// Measure one store's contribution. Empty tables contribute nothing.
fn measure(
    store: &TableStore,
    text: &BTreeMap<String, BTreeSet<String>>,
) -> Result<WidthRegistry> {
    let mut registry = WidthRegistry::new();
    for table in store.list_tables() {
        let Some(columns) = text.get(&table) else {
            continue;
        };
        let entry = store
            .entry(&table)
            .ok_or_else(|| TableError::schema(&table, "table missing from manifest"))?;
        for index in 0..entry.row_groups.len() {
            let chunk = store.read_row_group(&table, index)?;
            for (i, col) in chunk.schema().columns.iter().enumerate() {
                if !columns.contains(&col.name) {
                    continue;
                }
                let width = column_text(&table, &col.name, &col.layout, chunk.batch().column(i))?
                    .iter()
                    .map(String::len)
                    .max()
                    .unwrap_or(0);
                registry.observe(&table, &col.name, width);
            }
        }
    }
    debug!(store = %store.path().display(), "measured text widths");
    Ok(registry)
}

/// Compute the text width of every `(table, column)` pair that will be text
/// in a merge of `inputs`.
///
/// Every such pair gets an entry. A column whose table is empty in every
/// input gets width 0, which is exact: there is nothing to store.
///
/// # Errors
/// Returns an error if an input store cannot be opened or read.
pub fn reconcile_widths<P: AsRef<Path>>(inputs: &[P]) -> Result<WidthRegistry> {
    let paths: Vec<PathBuf> = inputs.iter().map(|p| p.as_ref().to_path_buf()).collect();
    let stores = paths
        .iter()
        .map(|p| TableStore::open_read(p))
        .collect::<Result<Vec<_>>>()?;
    let text = text_columns(&stores);
    drop(stores);

    // Each worker opens its own handle; stores are read-only and stable by now.
    let measure_path = |p: &PathBuf| -> Result<WidthRegistry> {
        let store = TableStore::open_read(p)?;
        measure(&store, &text)
    };

    #[cfg(feature = "parallel-io")]
    let measured = {
        use rayon::prelude::*;
        paths
            .par_iter()
            .map(measure_path)
            .try_reduce(WidthRegistry::new, |a, b| Ok(a.merge(b)))?
    };
    #[cfg(not(feature = "parallel-io"))]
    let measured = paths
        .iter()
        .map(measure_path)
        .try_fold(WidthRegistry::new(), |a, b| b.map(|b| a.merge(b)))?;

    let mut registry = measured;
    for (table, columns) in &text {
        for column in columns {
            registry.observe(table, column, 0);
        }
    }
    info!(
        inputs = paths.len(),
        tables = registry.tables.len(),
        "reconciled text widths"
    );
    Ok(registry)
}
