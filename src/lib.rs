//! # Irontable
//!
//! A **chunked columnar table engine** for genomic event records. Irontable
//! turns streams of variant calls, breakpoint predictions, and similar
//! records into compact, typed, row-group-chunked tables, and merges the
//! per-partition stores a pipeline produces into one.
//!
//! ## Key Features
//!
//! - **Two-pass builds** - a scan pass computes exact category domains and text widths,
//!   a write pass encodes records against them
//! - **Record expansion** - multi-valued fields (alternate alleles, per-library counts)
//!   become one row per element
//! - **Chunked storage** - every batch of records is one row group, rows keep stream order
//! - **Width-reconciling merges** - category and text columns from many stores become
//!   fixed-width text wide enough for every input
//! - **Atomic publication** - a store appears at its path only once it is complete
//! - **I/O integrations** - JSON Lines record sources and TSV exports (optional via feature flags)
//!
//! ## Quick Start
//!
//! ```no_run
//! use irontable::*;
//!
//! # fn main() -> irontable::Result<()> {
//! let calls = VecSource::new(vec![
//!     Record::new()
//!         .with("chrom", "1")
//!         .with("coord", 100i64)
//!         .with("ref", "A")
//!         .with("alt", vec!["T", "G"])
//!         .with("qual", 30.0),
//! ]);
//!
//! let report = convert_to_store(
//!     &calls,
//!     &presets::variant_table("snvs"),
//!     "part_1.store",
//!     &ConvertOptions::default(),
//! )?;
//! assert_eq!(report.rows, 2);
//!
//! let merged = merge_stores(&["part_1.store", "part_2.store"], "all.store")?;
//! println!("{:?}", merged.tables);
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Concepts
//!
//! ### Record sources
//!
//! A [`RecordSource`] hands out independent streams of [`Record`]s on
//! demand. Builds read their input twice, so the source must replay the same
//! records on every [`RecordSource::open_stream`] call.
//!
//! ### Table specs
//!
//! A [`TableSpec`] names a table's columns, the record field each one reads,
//! its [`ColumnKind`], and the fields expanded into one row per element.
//! [`presets`] holds the specs used for variant and breakpoint tables.
//!
//! ### Stores
//!
//! A [`TableStore`] is a directory of tables, each a sequence of row groups
//! under one [`TableSchema`]. Category columns carry their full domain in the
//! schema, so codes are comparable across row groups.
//!
//! ### Merging
//!
//! [`reconcile_widths`] measures, and [`concatenate_stores`] writes.
//! [`merge_stores`] runs both.
//!
//! ## Feature Flags
//!
//! - `io-jsonl` *(default)* - [`JsonlSource`]
//! - `io-tsv` *(default)* - [`io::tsv::export_tsv`]
//! - `compression-gzip` *(default)* - gzip-compressed inputs and exports
//! - `parallel-io` *(default)* - parallel width measurement and [`convert_many_par`]
//! - `cli` *(default)* - the `irontable` binary
//!
//! ## Module Overview
//!
//! - [`record`] - values, records, restartable sources
//! - [`schema`] - table specs and stored layouts
//! - [`scan`] - the domain scan
//! - [`writer`] - the chunked writer and single-table conversion
//! - [`store`] - the on-disk store
//! - [`merge`] - width reconciliation and concatenation
//! - [`region`] - genomic region filters
//! - [`io`] - JSONL sources, TSV export, gzip handling, store globbing
//! - [`testing`] - fixtures and assertions for tests

pub mod error;
mod expand;
pub mod io;
pub mod merge;
pub mod presets;
pub mod record;
pub mod region;
pub mod scan;
pub mod schema;
pub mod store;
pub mod testing;
pub mod writer;

// General re-exports
pub use error::{Result, TableError};
pub use merge::{
    MergeReport, WidthRegistry, concatenate_stores, merge_stores, reconcile_widths, sorted_inputs,
};
pub use record::{Record, RecordSource, RecordStream, Value, VecSource};
pub use region::{Region, RegionFilter};
pub use scan::{ScanAccumulator, ScanSummary, scan_domains};
pub use schema::{
    CategoryDomain, ColumnKind, ColumnLayout, ColumnSpec, NumericType, StoredColumn, TableSchema,
    TableSpec,
};
pub use store::{ColumnValues, OpenMode, RowGroup, Table, TableStore};
pub use writer::{
    BuildReport, ConvertJob, ConvertOptions, DEFAULT_CHUNK_SIZE, RowGroupInfo, ScoreFn,
    convert_to_store, write_table,
};

// Gated re-exports
#[cfg(feature = "parallel-io")]
pub use writer::convert_many_par;

#[cfg(feature = "io-jsonl")]
pub use io::jsonl::{JsonlSource, write_jsonl_records};

#[cfg(feature = "io-tsv")]
pub use io::tsv::{TsvOptions, export_tsv};
