//! Column specifications, category domains, and resolved table schemas.
//!
//! A [`TableSpec`] is what a caller declares before any data is seen: column
//! names, which record field feeds each column, and whether the column is
//! numeric, fixed-category text, or variable-width text. Once the scan pass
//! has measured the stream, the spec resolves into a [`TableSchema`] that pins
//! each category domain and text width. The schema is what gets persisted and
//! what every later append is checked against.

use crate::error::{Result, TableError};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Storage type of a numeric column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumericType {
    Int64,
    Float64,
}

impl NumericType {
    /// Common type of two numeric columns; mixed integer/float widens to float.
    #[must_use]
    pub fn widen(self, other: NumericType) -> NumericType {
        if self == other {
            self
        } else {
            NumericType::Float64
        }
    }

    #[must_use]
    pub fn data_type(self) -> DataType {
        match self {
            NumericType::Int64 => DataType::Int64,
            NumericType::Float64 => DataType::Float64,
        }
    }
}

/// Declared kind of a column, fixed when the table is created.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnKind {
    Numeric(NumericType),
    FixedCategoryText,
    VariableText,
}

/// One declared column: its name, the record field feeding it, and its kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    pub field: String,
    pub kind: ColumnKind,
}

impl ColumnSpec {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        let name = name.into();
        Self {
            field: name.clone(),
            name,
            kind,
        }
    }

    #[must_use]
    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, ColumnKind::Numeric(NumericType::Int64))
    }

    #[must_use]
    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, ColumnKind::Numeric(NumericType::Float64))
    }

    #[must_use]
    pub fn category(name: impl Into<String>) -> Self {
        Self::new(name, ColumnKind::FixedCategoryText)
    }

    #[must_use]
    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, ColumnKind::VariableText)
    }

    /// Read this column from a differently named record field.
    #[must_use]
    pub fn from_field(mut self, field: impl Into<String>) -> Self {
        self.field = field.into();
        self
    }
}

/// Declared layout of a table built from a record stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableSpec {
    pub name: String,
    pub columns: Vec<ColumnSpec>,
    /// Multi-valued fields expanded into one row per element. All listed
    /// fields of one record are zipped together.
    pub expand: Vec<String>,
    /// Numeric column filled by the caller's scoring function, when one is set.
    pub score_column: Option<String>,
}

impl TableSpec {
    #[must_use]
    pub fn new(name: impl Into<String>, columns: Vec<ColumnSpec>) -> Self {
        Self {
            name: name.into(),
            columns,
            expand: Vec::new(),
            score_column: None,
        }
    }

    #[must_use]
    pub fn expand(mut self, field: impl Into<String>) -> Self {
        self.expand.push(field.into());
        self
    }

    #[must_use]
    pub fn score_column(mut self, column: impl Into<String>) -> Self {
        self.score_column = Some(column.into());
        self
    }

    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Check names and cross references.
    ///
    /// # Errors
    /// Returns [`TableError::InvalidArgument`] for an empty or path-like table
    /// name, and [`TableError::SchemaMismatch`] for duplicate columns, unknown
    /// expand fields, or a score column that is missing or not numeric.
    pub fn validate(&self) -> Result<()> {
        validate_table_name(&self.name)?;
        if self.columns.is_empty() {
            return Err(TableError::schema(&self.name, "no columns declared"));
        }
        let mut seen = BTreeSet::new();
        for c in &self.columns {
            if c.name.is_empty() {
                return Err(TableError::schema(&self.name, "empty column name"));
            }
            if !seen.insert(c.name.as_str()) {
                return Err(TableError::schema(
                    &self.name,
                    format!("duplicate column `{}`", c.name),
                ));
            }
        }
        for f in &self.expand {
            if !self.columns.iter().any(|c| &c.field == f) {
                return Err(TableError::schema(
                    &self.name,
                    format!("expand field `{f}` feeds no column"),
                ));
            }
        }
        if let Some(score) = &self.score_column {
            match self.column(score) {
                Some(ColumnSpec {
                    kind: ColumnKind::Numeric(_),
                    ..
                }) => {}
                Some(_) => {
                    return Err(TableError::schema(
                        &self.name,
                        format!("score column `{score}` is not numeric"),
                    ));
                }
                None => {
                    return Err(TableError::schema(
                        &self.name,
                        format!("score column `{score}` is not declared"),
                    ));
                }
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn is_expanded(&self, field: &str) -> bool {
        self.expand.iter().any(|f| f == field)
    }
}

/// Table names become file names inside a store.
pub(crate) fn validate_table_name(name: &str) -> Result<()> {
    let bad = name.is_empty()
        || name.starts_with('.')
        || name.starts_with('_')
        || name.contains(['/', '\\', '\0']);
    if bad {
        return Err(TableError::InvalidArgument(format!(
            "invalid table name `{name}`"
        )));
    }
    Ok(())
}

/// The sorted, deduplicated set of values a category column may hold.
///
/// A value's code is its position in the sorted list, so two scans over the
/// same records always assign the same codes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryDomain {
    values: Vec<String>,
}

impl CategoryDomain {
    /// Build a domain from any collection of values; sorts and deduplicates.
    pub fn from_values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: BTreeSet<String> = values.into_iter().map(Into::into).collect();
        Self {
            values: set.into_iter().collect(),
        }
    }

    /// Integer code of `value`, or `None` if it is outside the domain.
    #[must_use]
    pub fn code_of(&self, value: &str) -> Option<i32> {
        self.values
            .binary_search_by(|v| v.as_str().cmp(value))
            .ok()
            .and_then(|i| i32::try_from(i).ok())
    }

    #[must_use]
    pub fn value_of(&self, code: i32) -> Option<&str> {
        usize::try_from(code)
            .ok()
            .and_then(|i| self.values.get(i))
            .map(String::as_str)
    }

    #[must_use]
    pub fn values(&self) -> &[String] {
        &self.values
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Longest value in bytes.
    #[must_use]
    pub fn max_width(&self) -> usize {
        self.values.iter().map(String::len).max().unwrap_or(0)
    }
}

/// Resolved storage layout of one column.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnLayout {
    Numeric { numeric: NumericType },
    Category { domain: CategoryDomain },
    Text { width: usize },
}

impl ColumnLayout {
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnLayout::Numeric { .. })
    }

    /// Arrow type the column is stored as.
    #[must_use]
    pub fn data_type(&self) -> DataType {
        match self {
            ColumnLayout::Numeric { numeric } => numeric.data_type(),
            ColumnLayout::Category { .. } => {
                DataType::Dictionary(Box::new(DataType::Int32), Box::new(DataType::Utf8))
            }
            ColumnLayout::Text { .. } => DataType::Utf8,
        }
    }

    /// Same kind, ignoring text width.
    fn same_kind(&self, other: &ColumnLayout) -> bool {
        match (self, other) {
            (ColumnLayout::Numeric { numeric: a }, ColumnLayout::Numeric { numeric: b }) => a == b,
            (ColumnLayout::Category { domain: a }, ColumnLayout::Category { domain: b }) => a == b,
            (ColumnLayout::Text { .. }, ColumnLayout::Text { .. }) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ColumnLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnLayout::Numeric { numeric } => write!(f, "{numeric:?}"),
            ColumnLayout::Category { domain } => write!(f, "category[{}]", domain.len()),
            ColumnLayout::Text { width } => write!(f, "text({width})"),
        }
    }
}

/// One persisted column.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredColumn {
    pub name: String,
    #[serde(flatten)]
    pub layout: ColumnLayout,
}

/// Resolved, persisted schema of a table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    pub columns: Vec<StoredColumn>,
}

impl TableSchema {
    #[must_use]
    pub fn new(columns: Vec<StoredColumn>) -> Self {
        Self { columns }
    }

    #[must_use]
    pub fn column(&self, name: &str) -> Option<&StoredColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Arrow schema the table's Parquet file is written with.
    #[must_use]
    pub fn arrow_schema(&self) -> SchemaRef {
        let fields: Vec<Field> = self
            .columns
            .iter()
            .map(|c| Field::new(&c.name, c.layout.data_type(), false))
            .collect();
        Arc::new(Schema::new(fields))
    }

    /// Check that rows laid out as `other` can be appended to a table with this schema.
    ///
    /// Columns must match by name, order, and kind, and category domains must
    /// be identical. Text widths may differ; the appended values are checked
    /// against this schema's widths separately.
    ///
    /// # Errors
    /// Returns [`TableError::SchemaMismatch`] describing the first difference.
    pub fn check_append(&self, table: &str, other: &TableSchema) -> Result<()> {
        if self.names() != other.names() {
            return Err(TableError::schema(
                table,
                format!(
                    "columns {:?} do not match existing columns {:?}",
                    other.names(),
                    self.names()
                ),
            ));
        }
        for (have, new) in self.columns.iter().zip(&other.columns) {
            if !have.layout.same_kind(&new.layout) {
                return Err(TableError::schema(
                    table,
                    format!(
                        "column `{}` is {} but the table stores {}",
                        have.name, new.layout, have.layout
                    ),
                ));
            }
        }
        Ok(())
    }
}
