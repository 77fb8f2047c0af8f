//! Error type shared by every table build and merge operation.
//!
//! The first five variants are the engine's own failure kinds; the rest wrap
//! the storage and serialization layers underneath. Nothing in the engine
//! retries: every error surfaces to the immediate caller.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, TableError>;

/// Failures raised while scanning, writing, reading, or merging tables.
#[derive(Debug, Error)]
pub enum TableError {
    /// A row-group or merge input disagrees with an established table schema.
    #[error("schema mismatch in table `{table}`: {detail}")]
    SchemaMismatch { table: String, detail: String },

    /// A category value missing from the domain computed by the scan pass.
    #[error("value `{value}` is not in the category domain of `{table}.{column}`")]
    DomainViolation {
        table: String,
        column: String,
        value: String,
    },

    /// A text value longer than the width registered for its column.
    #[error("value `{value}` ({len} bytes) exceeds width {width} of `{table}.{column}`")]
    WidthOverflow {
        table: String,
        column: String,
        width: usize,
        len: usize,
        value: String,
    },

    /// A region filter matched no records. Reported as a warning, never returned as `Err`.
    #[error("no records in region {region}")]
    EmptyInputRegion { region: String },

    /// Caller supplied an unusable parameter (chunk size, region string, table name).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A record source failed to produce or decode a record.
    #[error("record source error: {0}")]
    Record(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Arrow(#[from] arrow::error::ArrowError),

    #[error(transparent)]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("JSON error in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[cfg(feature = "io-tsv")]
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl TableError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn schema(table: &str, detail: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            table: table.to_string(),
            detail: detail.into(),
        }
    }

    /// `true` for the kinds that abort a build or merge because data and schema disagree.
    #[must_use]
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            Self::SchemaMismatch { .. } | Self::DomainViolation { .. } | Self::WidthOverflow { .. }
        )
    }
}
