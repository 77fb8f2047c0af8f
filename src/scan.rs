//! Domain scanner: the first pass of a table build.
//!
//! Encoding has to commit to a fixed dictionary per category column and a
//! fixed width per text column before the first row is written, so the scan
//! consumes one complete stream and records every distinct category value
//! and the longest text value (in bytes). The result is an explicit
//! [`ScanSummary`] value; the write pass only starts once it exists.

use crate::error::Result;
use crate::expand::{cell, missing_value, row_count};
use crate::record::{Record, RecordSource};
use crate::schema::{
    CategoryDomain, ColumnKind, ColumnLayout, StoredColumn, TableSchema, TableSpec,
};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// Running state of a scan. Feed it records with [`observe`](Self::observe)
/// and turn it into a [`ScanSummary`] with [`finish`](Self::finish).
///
/// Accumulators over disjoint partitions of the same table can be combined
/// with [`merge`](Self::merge).
#[derive(Clone, Debug, Default)]
pub struct ScanAccumulator {
    categories: BTreeMap<String, BTreeSet<String>>,
    widths: BTreeMap<String, usize>,
    records: u64,
    rows: u64,
}

impl ScanAccumulator {
    /// Empty accumulator with an entry for every non-numeric column of `spec`,
    /// so columns that never see a value still resolve (to an empty domain or
    /// zero width).
    #[must_use]
    pub fn new(spec: &TableSpec) -> Self {
        let mut acc = Self::default();
        for c in &spec.columns {
            match c.kind {
                ColumnKind::FixedCategoryText => {
                    acc.categories.insert(c.name.clone(), BTreeSet::new());
                }
                ColumnKind::VariableText => {
                    acc.widths.insert(c.name.clone(), 0);
                }
                ColumnKind::Numeric(_) => {}
            }
        }
        acc
    }

    /// Account for one record.
    ///
    /// # Errors
    /// Returns a schema error if the record lacks a column's field, its
    /// multi-valued fields cannot be expanded, or a text column's value is missing.
    pub fn observe(&mut self, spec: &TableSpec, record: &Record) -> Result<()> {
        let n = row_count(spec, record)?;
        for column in &spec.columns {
            if matches!(column.kind, ColumnKind::Numeric(_)) {
                continue;
            }
            for i in 0..n {
                let value = cell(spec, column, record, i)?;
                if value.is_missing() {
                    return Err(missing_value(spec, column));
                }
                let text = value.canonical_string();
                match column.kind {
                    ColumnKind::FixedCategoryText => {
                        if let Some(set) = self.categories.get_mut(&column.name)
                            && !set.contains(&text)
                        {
                            set.insert(text);
                        }
                    }
                    ColumnKind::VariableText => {
                        let w = self.widths.entry(column.name.clone()).or_default();
                        *w = (*w).max(text.len());
                    }
                    ColumnKind::Numeric(_) => {}
                }
            }
        }
        self.records += 1;
        self.rows += n as u64;
        Ok(())
    }

    /// Combine with an accumulator built over another part of the same stream.
    #[must_use]
    pub fn merge(mut self, other: ScanAccumulator) -> Self {
        for (name, values) in other.categories {
            self.categories.entry(name).or_default().extend(values);
        }
        for (name, w) in other.widths {
            let slot = self.widths.entry(name).or_default();
            *slot = (*slot).max(w);
        }
        self.records += other.records;
        self.rows += other.rows;
        self
    }

    #[must_use]
    pub fn finish(self) -> ScanSummary {
        ScanSummary {
            domains: self
                .categories
                .into_iter()
                .map(|(k, v)| (k, CategoryDomain::from_values(v)))
                .collect(),
            widths: self.widths,
            records: self.records,
            rows: self.rows,
        }
    }
}

/// Category domains and text widths of one record stream.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScanSummary {
    pub domains: BTreeMap<String, CategoryDomain>,
    pub widths: BTreeMap<String, usize>,
    /// Records seen.
    pub records: u64,
    /// Rows those records expand into.
    pub rows: u64,
}

impl ScanSummary {
    /// Pin the declared columns of `spec` to the measured domains and widths.
    #[must_use]
    pub fn resolve(&self, spec: &TableSpec) -> TableSchema {
        let columns = spec
            .columns
            .iter()
            .map(|c| StoredColumn {
                name: c.name.clone(),
                layout: match c.kind {
                    ColumnKind::Numeric(numeric) => ColumnLayout::Numeric { numeric },
                    ColumnKind::FixedCategoryText => ColumnLayout::Category {
                        domain: self.domains.get(&c.name).cloned().unwrap_or_default(),
                    },
                    ColumnKind::VariableText => ColumnLayout::Text {
                        width: self.widths.get(&c.name).copied().unwrap_or(0),
                    },
                },
            })
            .collect();
        TableSchema::new(columns)
    }
}

/// Consume one full stream of `source` and measure it against `spec`.
///
/// # Errors
/// Propagates source errors and schema errors from [`ScanAccumulator::observe`].
pub fn scan_domains(source: &dyn RecordSource, spec: &TableSpec) -> Result<ScanSummary> {
    let mut acc = ScanAccumulator::new(spec);
    for record in source.open_stream()? {
        acc.observe(spec, &record?)?;
    }
    let summary = acc.finish();
    for (name, domain) in &summary.domains {
        debug!(table = %spec.name, column = %name, values = domain.len(), "category domain");
    }
    info!(
        table = %spec.name,
        records = summary.records,
        rows = summary.rows,
        "scanned record stream"
    );
    Ok(summary)
}
