//! Tables read back from a store, and conversion of stored columns to values.

use crate::error::{Result, TableError};
use crate::record::{Value, float_text, int_text};
use crate::schema::{CategoryDomain, ColumnLayout, NumericType, TableSchema};
use arrow::array::{
    Array, ArrayRef, AsArray, DictionaryArray, Float64Array, Int32Array, StringArray,
};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Float64Type, Int32Type, Int64Type};
use arrow::record_batch::RecordBatch;
use std::sync::Arc;

/// A fully materialized table (or a slice of its row groups).
#[derive(Clone, Debug)]
pub struct Table {
    name: String,
    schema: TableSchema,
    batch: RecordBatch,
    row_groups: Vec<u64>,
}

impl Table {
    pub(crate) fn new(
        name: String,
        schema: TableSchema,
        batch: RecordBatch,
        row_groups: Vec<u64>,
    ) -> Self {
        Self {
            name,
            schema,
            batch,
            row_groups,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    /// All rows as one Arrow batch. Category columns are dictionary arrays
    /// whose dictionary is exactly the table's category domain.
    #[must_use]
    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.num_rows() == 0
    }

    /// Row count of each row group, in append order.
    #[must_use]
    pub fn row_group_sizes(&self) -> &[u64] {
        &self.row_groups
    }

    /// First row index of each row group.
    #[must_use]
    pub fn row_group_offsets(&self) -> Vec<u64> {
        let mut start = 0;
        self.row_groups
            .iter()
            .map(|n| {
                let s = start;
                start += n;
                s
            })
            .collect()
    }

    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ArrayRef> {
        self.schema.position(name).map(|i| self.batch.column(i))
    }

    fn require(&self, name: &str) -> Result<(usize, &ColumnLayout)> {
        self.schema
            .columns
            .iter()
            .enumerate()
            .find(|(_, c)| c.name == name)
            .map(|(i, c)| (i, &c.layout))
            .ok_or_else(|| TableError::schema(&self.name, format!("no column `{name}`")))
    }

    /// Typed values of a column.
    ///
    /// # Errors
    /// Returns an error if the column does not exist.
    pub fn values(&self, name: &str) -> Result<Vec<Value>> {
        let (i, layout) = self.require(name)?;
        column_values(&self.name, name, layout, self.batch.column(i))
    }

    /// Canonical text of every value of a column, whatever its stored type.
    ///
    /// # Errors
    /// Returns an error if the column does not exist.
    pub fn column_text(&self, name: &str) -> Result<Vec<String>> {
        let (i, layout) = self.require(name)?;
        column_text(&self.name, name, layout, self.batch.column(i))
    }

    /// Integer codes of a category column.
    ///
    /// # Errors
    /// Returns an error if the column does not exist or is not a category column.
    pub fn category_codes(&self, name: &str) -> Result<Vec<i32>> {
        let (i, layout) = self.require(name)?;
        if !matches!(layout, ColumnLayout::Category { .. }) {
            return Err(TableError::schema(
                &self.name,
                format!("column `{name}` is {layout}, not a category column"),
            ));
        }
        let dict = self.batch.column(i).as_dictionary::<Int32Type>();
        Ok(dict.keys().iter().map(|k| k.unwrap_or(-1)).collect())
    }
}

/// Canonical text of a stored column.
pub(crate) fn column_text(
    table: &str,
    column: &str,
    layout: &ColumnLayout,
    array: &ArrayRef,
) -> Result<Vec<String>> {
    Ok(match layout {
        ColumnLayout::Numeric {
            numeric: NumericType::Int64,
        } => array
            .as_primitive::<Int64Type>()
            .values()
            .iter()
            .map(|v| int_text(*v))
            .collect(),
        ColumnLayout::Numeric {
            numeric: NumericType::Float64,
        } => array
            .as_primitive::<Float64Type>()
            .values()
            .iter()
            .map(|v| float_text(*v))
            .collect(),
        ColumnLayout::Category { domain } => {
            let dict = array.as_dictionary::<Int32Type>();
            dict.keys()
                .iter()
                .map(|k| {
                    k.and_then(|k| domain.value_of(k))
                        .map(str::to_string)
                        .ok_or_else(|| TableError::DomainViolation {
                            table: table.to_string(),
                            column: column.to_string(),
                            value: format!("code {k:?}"),
                        })
                })
                .collect::<Result<Vec<_>>>()?
        }
        ColumnLayout::Text { .. } => array
            .as_string::<i32>()
            .iter()
            .map(|s| s.unwrap_or_default().to_string())
            .collect(),
    })
}

pub(crate) fn column_values(
    table: &str,
    column: &str,
    layout: &ColumnLayout,
    array: &ArrayRef,
) -> Result<Vec<Value>> {
    Ok(match layout {
        ColumnLayout::Numeric {
            numeric: NumericType::Int64,
        } => array
            .as_primitive::<Int64Type>()
            .values()
            .iter()
            .map(|v| Value::Int(*v))
            .collect(),
        ColumnLayout::Numeric {
            numeric: NumericType::Float64,
        } => array
            .as_primitive::<Float64Type>()
            .values()
            .iter()
            .map(|v| Value::Float(*v))
            .collect(),
        ColumnLayout::Category { .. } | ColumnLayout::Text { .. } => {
            column_text(table, column, layout, array)?
                .into_iter()
                .map(Value::Text)
                .collect()
        }
    })
}

/// Bring a column read from Parquet into the exact Arrow shape its layout
/// promises. Category columns are re-keyed against the manifest domain, since
/// the Parquet reader rebuilds dictionaries from whatever values a row group used.
pub(crate) fn normalize_column(
    table: &str,
    column: &str,
    layout: &ColumnLayout,
    array: &ArrayRef,
) -> Result<ArrayRef> {
    match layout {
        ColumnLayout::Numeric { numeric } => Ok(cast(array, &numeric.data_type())?),
        ColumnLayout::Text { .. } => Ok(cast(array, &DataType::Utf8)?),
        ColumnLayout::Category { domain } => {
            let strings = cast(array, &DataType::Utf8)?;
            Ok(Arc::new(encode_category(
                table,
                column,
                domain,
                strings.as_string::<i32>(),
            )?))
        }
    }
}

fn encode_category(
    table: &str,
    column: &str,
    domain: &CategoryDomain,
    strings: &StringArray,
) -> Result<DictionaryArray<Int32Type>> {
    let codes = strings
        .iter()
        .map(|s| {
            let s = s.unwrap_or_default();
            domain
                .code_of(s)
                .ok_or_else(|| TableError::DomainViolation {
                    table: table.to_string(),
                    column: column.to_string(),
                    value: s.to_string(),
                })
        })
        .collect::<Result<Vec<i32>>>()?;
    let values: ArrayRef = Arc::new(StringArray::from(domain.values().to_vec()));
    Ok(DictionaryArray::try_new(Int32Array::from(codes), values)?)
}

/// Convert a stored column into the buffers needed to append it under `target`.
///
/// Numeric columns keep their values (integers widen to float when the target
/// is float). Every other combination goes through canonical text.
pub(crate) fn coerce_for_target(
    table: &str,
    column: &str,
    source: &ColumnLayout,
    target: &ColumnLayout,
    array: &ArrayRef,
) -> Result<crate::store::ColumnValues> {
    use crate::store::ColumnValues;
    Ok(match (source, target) {
        (
            ColumnLayout::Numeric {
                numeric: NumericType::Int64,
            },
            ColumnLayout::Numeric {
                numeric: NumericType::Int64,
            },
        ) => ColumnValues::Int(array.as_primitive::<Int64Type>().values().to_vec()),
        (
            ColumnLayout::Numeric { .. },
            ColumnLayout::Numeric {
                numeric: NumericType::Float64,
            },
        ) => {
            let floats = cast(array, &DataType::Float64)?;
            let floats = floats
                .as_any()
                .downcast_ref::<Float64Array>()
                .ok_or_else(|| TableError::schema(table, format!("column `{column}` is not float")))?;
            ColumnValues::Float(floats.values().to_vec())
        }
        (_, ColumnLayout::Text { .. }) => {
            ColumnValues::Text(column_text(table, column, source, array)?)
        }
        (source, target) => {
            return Err(TableError::schema(
                table,
                format!("cannot store {source} column `{column}` as {target}"),
            ));
        }
    })
}
