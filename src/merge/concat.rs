//! Concatenation of many stores into one.

use super::widths::{WidthRegistry, text_columns};
use crate::error::{Result, TableError};
use crate::schema::{ColumnLayout, NumericType, StoredColumn, TableSchema};
use crate::store::table::coerce_for_target;
use crate::store::{ColumnValues, RowGroup, Table, TableStore};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Outcome of a concatenation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub inputs: usize,
    /// Rows written per output table.
    pub tables: BTreeMap<String, u64>,
}

/// Work out the output schema of every table present in any input.
///
/// Column order comes from the first input holding the table. Every input
/// must hold the same column set for a table. A column that is non-numeric
/// anywhere becomes text at the registered width; numeric columns widen from
/// integer to float when inputs disagree.
fn plan_schemas(
    inputs: &[(PathBuf, TableStore)],
    registry: &WidthRegistry,
) -> Result<BTreeMap<String, TableSchema>> {
    let text = text_columns_of(inputs);

    let mut numeric: BTreeMap<String, BTreeMap<String, NumericType>> = BTreeMap::new();
    let mut order: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (path, store) in inputs {
        for table in store.list_tables() {
            let schema = store
                .schema(&table)
                .ok_or_else(|| TableError::schema(&table, "table missing from manifest"))?;
            let names: Vec<String> = schema.columns.iter().map(|c| c.name.clone()).collect();
            match order.get(&table) {
                None => {
                    order.insert(table.clone(), names);
                }
                Some(first) => {
                    let a: BTreeSet<&String> = first.iter().collect();
                    let b: BTreeSet<&String> = names.iter().collect();
                    if a != b {
                        let missing: Vec<_> = a.difference(&b).collect();
                        let extra: Vec<_> = b.difference(&a).collect();
                        return Err(TableError::schema(
                            &table,
                            format!(
                                "{} lacks columns {missing:?} and adds columns {extra:?}",
                                path.display()
                            ),
                        ));
                    }
                }
            }
            let widened = numeric.entry(table.clone()).or_default();
            for c in &schema.columns {
                if let ColumnLayout::Numeric { numeric: n } = c.layout {
                    widened
                        .entry(c.name.clone())
                        .and_modify(|t| *t = t.widen(n))
                        .or_insert(n);
                }
            }
        }
    }

    let mut plans = BTreeMap::new();
    for (table, names) in order {
        let text_cols = text.get(&table);
        let columns = names
            .into_iter()
            .map(|name| {
                let is_text = text_cols.is_some_and(|t| t.contains(&name));
                let layout = if is_text {
                    let width = registry.get(&table, &name).ok_or_else(|| {
                        TableError::schema(
                            &table,
                            format!("no reconciled width for text column `{name}`"),
                        )
                    })?;
                    ColumnLayout::Text { width }
                } else {
                    let numeric = numeric
                        .get(&table)
                        .and_then(|m| m.get(&name))
                        .copied()
                        .unwrap_or(NumericType::Float64);
                    ColumnLayout::Numeric { numeric }
                };
                Ok(StoredColumn { name, layout })
            })
            .collect::<Result<Vec<_>>>()?;
        plans.insert(table, TableSchema::new(columns));
    }
    Ok(plans)
}

fn text_columns_of(inputs: &[(PathBuf, TableStore)]) -> BTreeMap<String, BTreeSet<String>> {
    let mut out: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for (_, store) in inputs {
        for (table, cols) in text_columns(std::slice::from_ref(store)) {
            out.entry(table).or_default().extend(cols);
        }
    }
    out
}

/// Concatenate the tables of `inputs`, in the given order, into a new store at `output`.
///
/// Each input row group becomes one output row group, so rows keep their
/// input-then-row order. Non-numeric columns are written as canonical text at
/// the width `registry` records for them.
///
/// # Errors
/// - [`TableError::SchemaMismatch`] if inputs disagree on a table's column set,
///   or a text column has no width in `registry`.
/// - [`TableError::WidthOverflow`] if a value is longer than its registered width.
/// - I/O and storage errors. Nothing is published at `output` on error.
pub fn concatenate_stores<P: AsRef<Path>>(
    inputs: &[P],
    output: impl AsRef<Path>,
    registry: &WidthRegistry,
) -> Result<MergeReport> {
    let opened = inputs
        .iter()
        .map(|p| {
            let path = p.as_ref().to_path_buf();
            TableStore::open_read(&path).map(|s| (path, s))
        })
        .collect::<Result<Vec<_>>>()?;
    let plans = plan_schemas(&opened, registry)?;
    let plans: BTreeMap<String, Arc<TableSchema>> =
        plans.into_iter().map(|(k, v)| (k, Arc::new(v))).collect();

    let mut out = TableStore::create(output.as_ref())?;
    let mut report = MergeReport {
        inputs: opened.len(),
        tables: BTreeMap::new(),
    };

    for (path, store) in &opened {
        for table in store.list_tables() {
            let target = plans
                .get(&table)
                .ok_or_else(|| TableError::schema(&table, "table has no merge plan"))?;
            let entry = store
                .entry(&table)
                .ok_or_else(|| TableError::schema(&table, "table missing from manifest"))?;
            if entry.row_groups.is_empty() {
                let empty = convert_chunk(&table, None, target)?;
                out.append(&table, &empty)?;
                report.tables.entry(table.clone()).or_insert(0);
                continue;
            }
            for index in 0..entry.row_groups.len() {
                let chunk = store.read_row_group(&table, index)?;
                let group = convert_chunk(&table, Some(&chunk), target)?;
                out.append(&table, &group)?;
                *report.tables.entry(table.clone()).or_insert(0) += group.num_rows() as u64;
            }
            debug!(input = %path.display(), table = %table, "concatenated table");
        }
    }
    out.close()?;
    info!(
        output = %output.as_ref().display(),
        inputs = report.inputs,
        tables = report.tables.len(),
        "merged stores"
    );
    Ok(report)
}

/// Re-lay one input chunk (or nothing, for an empty table) under the output schema.
fn convert_chunk(
    table: &str,
    chunk: Option<&Table>,
    target: &Arc<TableSchema>,
) -> Result<RowGroup> {
    let columns = target
        .columns
        .iter()
        .map(|col| {
            let Some(chunk) = chunk else {
                return Ok(ColumnValues::for_layout(&col.layout, 0));
            };
            let i = chunk.schema().position(&col.name).ok_or_else(|| {
                TableError::schema(table, format!("input chunk lacks column `{}`", col.name))
            })?;
            let source = &chunk.schema().columns[i].layout;
            coerce_for_target(table, &col.name, source, &col.layout, chunk.batch().column(i))
        })
        .collect::<Result<Vec<_>>>()?;
    RowGroup::try_new(table, Arc::clone(target), columns)
}
