//! Chunked table writer: the second pass of a table build.
//!
//! Records are grouped into consecutive batches of at most `chunk_size`
//! records. Each batch is expanded into rows, encoded against the domains
//! and widths the scan measured, and appended to the store as one row group.
//! Rows keep stream order; a batch's first row index is the running row
//! total, which equals `chunk_size * batch` only while no record expands to
//! more or fewer than one row.
//!
//! ```no_run
//! use irontable::{ConvertOptions, convert_to_store, presets, JsonlSource};
//! # fn main() -> irontable::Result<()> {
//! let source = JsonlSource::new("calls.jsonl");
//! let report = convert_to_store(
//!     &source,
//!     &presets::variant_table("snvs"),
//!     "calls.store",
//!     &ConvertOptions::default().chunk_size(5000),
//! )?;
//! println!("{} rows in {} row groups", report.rows, report.row_groups.len());
//! # Ok(())
//! # }
//! ```

use crate::error::{Result, TableError};
use crate::expand::{cell, missing_value, row_count};
use crate::record::{Record, RecordSource, Value};
use crate::region::{Region, RegionFilter};
use crate::scan::{ScanSummary, scan_domains};
use crate::schema::{ColumnLayout, ColumnSpec, NumericType, TableSchema, TableSpec};
use crate::store::{ColumnValues, RowGroup, TableStore};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Records per batch used by the variant conversion tasks.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Caller-supplied score derivation. Variant callers disagree on what "score"
/// means, so the score column can be computed from the raw record instead of
/// copied from a field.
pub type ScoreFn = Arc<dyn Fn(&Record) -> Result<f64> + Send + Sync>;

/// Parameters of a conversion.
#[derive(Clone)]
pub struct ConvertOptions {
    /// Records per row group. Must be positive.
    pub chunk_size: usize,
    /// Only convert records inside this region.
    pub region: Option<Region>,
    /// Fills the table's score column; when unset the column reads its field.
    pub score: Option<ScoreFn>,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            region: None,
            score: None,
        }
    }
}

impl fmt::Debug for ConvertOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConvertOptions")
            .field("chunk_size", &self.chunk_size)
            .field("region", &self.region)
            .field("score", &self.score.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

impl ConvertOptions {
    #[must_use]
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    #[must_use]
    pub fn region(mut self, region: Region) -> Self {
        self.region = Some(region);
        self
    }

    #[must_use]
    pub fn score<F>(mut self, f: F) -> Self
    where
        F: Fn(&Record) -> Result<f64> + Send + Sync + 'static,
    {
        self.score = Some(Arc::new(f));
        self
    }

    fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(TableError::InvalidArgument(
                "chunk size must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Position and size of one stored row group. Batches that expand to no
/// rows are not stored and get no entry, so `index` is the row-group index
/// in the table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RowGroupInfo {
    pub index: usize,
    pub first_row: u64,
    pub rows: u64,
}

/// Outcome of writing one table.
#[derive(Debug, Default)]
pub struct BuildReport {
    pub table: String,
    pub records: u64,
    pub rows: u64,
    pub row_groups: Vec<RowGroupInfo>,
    /// Non-fatal conditions, e.g. [`TableError::EmptyInputRegion`].
    pub warnings: Vec<TableError>,
}

/// Write `spec`'s table into an open store, using domains from a completed scan.
///
/// The table is created even when the stream is empty.
///
/// # Errors
/// - [`TableError::DomainViolation`] if the stream yields a category value the
///   scan did not see.
/// - [`TableError::WidthOverflow`] if it yields text longer than the scan measured.
/// - Schema, source, and storage errors.
pub fn write_table(
    source: &dyn RecordSource,
    spec: &TableSpec,
    summary: &ScanSummary,
    store: &mut TableStore,
    options: &ConvertOptions,
) -> Result<BuildReport> {
    spec.validate()?;
    options.validate()?;
    let schema = Arc::new(summary.resolve(spec));
    let score = match (&options.score, &spec.score_column) {
        (Some(f), Some(column)) => Some((column.as_str(), f)),
        _ => None,
    };

    let mut report = BuildReport {
        table: spec.name.clone(),
        ..BuildReport::default()
    };
    let mut batch: Vec<Record> = Vec::with_capacity(options.chunk_size);
    let mut stream = source.open_stream()?;
    loop {
        let next = stream.next().transpose()?;
        let done = next.is_none();
        if let Some(record) = next {
            batch.push(record);
        }
        if batch.len() == options.chunk_size || (done && !batch.is_empty()) {
            let group = encode_batch(spec, &schema, &batch, score)?;
            let first_row = store.append(&spec.name, &group)?;
            report.records += batch.len() as u64;
            batch.clear();
            // A batch that expands to no rows is not stored as a row group.
            if group.num_rows() > 0 {
                let info = RowGroupInfo {
                    index: report.row_groups.len(),
                    first_row,
                    rows: group.num_rows() as u64,
                };
                debug!(table = %spec.name, row_group = info.index, first_row, rows = info.rows, "wrote batch");
                report.rows += info.rows;
                report.row_groups.push(info);
            }
        }
        if done {
            break;
        }
    }

    if !store.contains(&spec.name) {
        // Zero records still produce the (empty) table.
        let group = encode_batch(spec, &schema, &[], score)?;
        store.append(&spec.name, &group)?;
    }
    info!(
        table = %spec.name,
        records = report.records,
        rows = report.rows,
        row_groups = report.row_groups.len(),
        "wrote table"
    );
    Ok(report)
}

/// Scan `source`, then write `spec`'s table into a new store at `out_path`.
///
/// The store is only published once the whole table is written; on error
/// nothing appears at `out_path`.
///
/// # Errors
/// See [`scan_domains`] and [`write_table`].
pub fn convert_to_store(
    source: &dyn RecordSource,
    spec: &TableSpec,
    out_path: impl AsRef<Path>,
    options: &ConvertOptions,
) -> Result<BuildReport> {
    spec.validate()?;
    options.validate()?;
    let out_path = out_path.as_ref();

    let filtered;
    let source: &dyn RecordSource = match &options.region {
        Some(region) => {
            filtered = RegionFilter::new(source, region.clone());
            &filtered
        }
        None => source,
    };

    let summary = scan_domains(source, spec)?;
    let mut store = TableStore::create(out_path)?;
    let mut report = write_table(source, spec, &summary, &mut store, options)?;
    store.close()?;

    if let Some(region) = &options.region
        && report.records == 0
    {
        warn!(table = %spec.name, %region, "no records in region");
        report.warnings.push(TableError::EmptyInputRegion {
            region: region.to_string(),
        });
    }
    Ok(report)
}

/// One independent build for [`convert_many_par`].
pub struct ConvertJob {
    pub source: Box<dyn RecordSource>,
    pub spec: TableSpec,
    pub out_path: PathBuf,
    pub options: ConvertOptions,
}

/// Run independent builds in parallel, one store per job. Results come back
/// in job order; one failed job does not stop the others.
#[cfg(feature = "parallel-io")]
#[must_use]
pub fn convert_many_par(jobs: Vec<ConvertJob>) -> Vec<Result<BuildReport>> {
    use rayon::prelude::*;
    jobs.into_par_iter()
        .map(|job| convert_to_store(job.source.as_ref(), &job.spec, &job.out_path, &job.options))
        .collect()
}

fn encode_batch(
    spec: &TableSpec,
    schema: &Arc<TableSchema>,
    records: &[Record],
    score: Option<(&str, &ScoreFn)>,
) -> Result<RowGroup> {
    let mut columns: Vec<ColumnValues> = schema
        .columns
        .iter()
        .map(|c| ColumnValues::for_layout(&c.layout, records.len()))
        .collect();

    for record in records {
        let n = row_count(spec, record)?;
        let scored = match score {
            Some((column, f)) if n > 0 => Some((column, f(record)?)),
            _ => None,
        };
        for i in 0..n {
            for ((column, stored), out) in spec.columns.iter().zip(&schema.columns).zip(&mut columns) {
                match scored {
                    Some((score_column, value)) if score_column == column.name => {
                        push_score(spec, column, value, out)?;
                    }
                    _ => {
                        let value = cell(spec, column, record, i)?;
                        push_value(spec, column, &stored.layout, value, out)?;
                    }
                }
            }
        }
    }
    RowGroup::try_new(&spec.name, Arc::clone(schema), columns)
}

fn push_score(
    spec: &TableSpec,
    column: &ColumnSpec,
    value: f64,
    out: &mut ColumnValues,
) -> Result<()> {
    match out {
        ColumnValues::Float(v) => v.push(value),
        // Integral scores only; a fractional score in an integer column is a spec error.
        #[allow(clippy::cast_possible_truncation)]
        ColumnValues::Int(v) if value.fract() == 0.0 => v.push(value as i64),
        _ => {
            return Err(TableError::schema(
                &spec.name,
                format!("score {value} does not fit column `{}`", column.name),
            ));
        }
    }
    Ok(())
}

fn push_value(
    spec: &TableSpec,
    column: &ColumnSpec,
    layout: &ColumnLayout,
    value: &Value,
    out: &mut ColumnValues,
) -> Result<()> {
    match (layout, out) {
        (
            ColumnLayout::Numeric {
                numeric: NumericType::Float64,
            },
            ColumnValues::Float(v),
        ) if value.is_missing() => v.push(f64::NAN),
        _ if value.is_missing() => return Err(missing_value(spec, column)),
        (
            ColumnLayout::Numeric {
                numeric: NumericType::Int64,
            },
            ColumnValues::Int(v),
        ) => v.push(value.as_i64().ok_or_else(|| type_error(spec, column, "an integer", value))?),
        (
            ColumnLayout::Numeric {
                numeric: NumericType::Float64,
            },
            ColumnValues::Float(v),
        ) => v.push(value.as_f64().ok_or_else(|| type_error(spec, column, "a number", value))?),
        (ColumnLayout::Category { domain }, ColumnValues::Codes(v)) => {
            let text = value.canonical_string();
            let code = domain.code_of(&text).ok_or_else(|| TableError::DomainViolation {
                table: spec.name.clone(),
                column: column.name.clone(),
                value: text,
            })?;
            v.push(code);
        }
        (ColumnLayout::Text { .. }, ColumnValues::Text(v)) => v.push(value.canonical_string()),
        (layout, _) => {
            return Err(TableError::schema(
                &spec.name,
                format!("no buffer for {layout} column `{}`", column.name),
            ));
        }
    }
    Ok(())
}

fn type_error(spec: &TableSpec, column: &ColumnSpec, expected: &str, value: &Value) -> TableError {
    TableError::schema(
        &spec.name,
        format!(
            "column `{}` expects {expected}, field `{}` holds {value:?}",
            column.name, column.field
        ),
    )
}
