//! Row groups: one bounded batch of typed columns ready to append to a table.

use crate::error::{Result, TableError};
use crate::schema::{ColumnLayout, NumericType, TableSchema};
use arrow::array::{
    Array, ArrayRef, DictionaryArray, Float64Array, Int32Array, Int64Array, StringArray,
};
use arrow::datatypes::Int32Type;
use arrow::record_batch::RecordBatch;
use std::sync::Arc;

/// Column data of one row group, before it is turned into Arrow arrays.
#[derive(Clone, Debug, PartialEq)]
pub enum ColumnValues {
    Int(Vec<i64>),
    Float(Vec<f64>),
    /// Category codes into the column's domain.
    Codes(Vec<i32>),
    Text(Vec<String>),
}

impl ColumnValues {
    /// Empty buffer matching a column layout.
    #[must_use]
    pub fn for_layout(layout: &ColumnLayout, capacity: usize) -> Self {
        match layout {
            ColumnLayout::Numeric {
                numeric: NumericType::Int64,
            } => ColumnValues::Int(Vec::with_capacity(capacity)),
            ColumnLayout::Numeric {
                numeric: NumericType::Float64,
            } => ColumnValues::Float(Vec::with_capacity(capacity)),
            ColumnLayout::Category { .. } => ColumnValues::Codes(Vec::with_capacity(capacity)),
            ColumnLayout::Text { .. } => ColumnValues::Text(Vec::with_capacity(capacity)),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            ColumnValues::Int(v) => v.len(),
            ColumnValues::Float(v) => v.len(),
            ColumnValues::Codes(v) => v.len(),
            ColumnValues::Text(v) => v.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A validated batch of rows laid out according to a [`TableSchema`].
#[derive(Clone, Debug)]
pub struct RowGroup {
    schema: Arc<TableSchema>,
    batch: RecordBatch,
}

impl RowGroup {
    /// Build a row group from one [`ColumnValues`] per schema column.
    ///
    /// # Errors
    /// - [`TableError::SchemaMismatch`] if the column count, lengths, or value
    ///   kinds disagree with the schema.
    /// - [`TableError::DomainViolation`] for a code outside its category domain.
    /// - [`TableError::WidthOverflow`] for text longer than its column width.
    pub fn try_new(
        table: &str,
        schema: Arc<TableSchema>,
        columns: Vec<ColumnValues>,
    ) -> Result<Self> {
        if columns.len() != schema.columns.len() {
            return Err(TableError::schema(
                table,
                format!(
                    "row group has {} columns, schema has {}",
                    columns.len(),
                    schema.columns.len()
                ),
            ));
        }
        let rows = columns.first().map_or(0, ColumnValues::len);
        let mut arrays: Vec<ArrayRef> = Vec::with_capacity(columns.len());
        for (col, values) in schema.columns.iter().zip(columns) {
            if values.len() != rows {
                return Err(TableError::schema(
                    table,
                    format!(
                        "column `{}` has {} rows, expected {rows}",
                        col.name,
                        values.len()
                    ),
                ));
            }
            let array: ArrayRef = match (&col.layout, values) {
                (
                    ColumnLayout::Numeric {
                        numeric: NumericType::Int64,
                    },
                    ColumnValues::Int(v),
                ) => Arc::new(Int64Array::from(v)),
                (
                    ColumnLayout::Numeric {
                        numeric: NumericType::Float64,
                    },
                    ColumnValues::Float(v),
                ) => Arc::new(Float64Array::from(v)),
                (ColumnLayout::Category { domain }, ColumnValues::Codes(codes)) => {
                    if let Some(bad) = codes
                        .iter()
                        .find(|&&c| domain.value_of(c).is_none())
                    {
                        return Err(TableError::DomainViolation {
                            table: table.to_string(),
                            column: col.name.clone(),
                            value: format!("code {bad}"),
                        });
                    }
                    let values: ArrayRef = Arc::new(StringArray::from(domain.values().to_vec()));
                    Arc::new(DictionaryArray::<Int32Type>::try_new(
                        Int32Array::from(codes),
                        values,
                    )?)
                }
                (ColumnLayout::Text { width }, ColumnValues::Text(v)) => {
                    check_width(table, &col.name, *width, v.iter().map(String::as_str))?;
                    Arc::new(StringArray::from(v))
                }
                (layout, values) => {
                    return Err(TableError::schema(
                        table,
                        format!(
                            "column `{}` is {layout} but got {} values",
                            col.name,
                            kind_name(&values)
                        ),
                    ));
                }
            };
            arrays.push(array);
        }
        let batch = RecordBatch::try_new(schema.arrow_schema(), arrays)?;
        Ok(Self { schema, batch })
    }

    #[must_use]
    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    #[must_use]
    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    /// Check the text columns of this group against the widths of `target`,
    /// the schema of the table it is being appended to.
    pub(crate) fn check_widths(&self, table: &str, target: &TableSchema) -> Result<()> {
        for (i, col) in target.columns.iter().enumerate() {
            let ColumnLayout::Text { width } = col.layout else {
                continue;
            };
            let Some(strings) = self.batch.column(i).as_any().downcast_ref::<StringArray>()
            else {
                continue;
            };
            check_width(table, &col.name, width, strings.iter().flatten())?;
        }
        Ok(())
    }
}

fn check_width<'a>(
    table: &str,
    column: &str,
    width: usize,
    values: impl Iterator<Item = &'a str>,
) -> Result<()> {
    for v in values {
        if v.len() > width {
            return Err(TableError::WidthOverflow {
                table: table.to_string(),
                column: column.to_string(),
                width,
                len: v.len(),
                value: v.to_string(),
            });
        }
    }
    Ok(())
}

fn kind_name(values: &ColumnValues) -> &'static str {
    match values {
        ColumnValues::Int(_) => "integer",
        ColumnValues::Float(_) => "float",
        ColumnValues::Codes(_) => "category code",
        ColumnValues::Text(_) => "text",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{CategoryDomain, StoredColumn};

    fn schema() -> Arc<TableSchema> {
        Arc::new(TableSchema::new(vec![
            StoredColumn {
                name: "chrom".into(),
                layout: ColumnLayout::Category {
                    domain: CategoryDomain::from_values(["1", "2"]),
                },
            },
            StoredColumn {
                name: "id".into(),
                layout: ColumnLayout::Text { width: 3 },
            },
        ]))
    }

    #[test]
    fn builds_dictionary_and_text_columns() {
        let g = RowGroup::try_new(
            "t",
            schema(),
            vec![
                ColumnValues::Codes(vec![1, 0]),
                ColumnValues::Text(vec!["a".into(), "abc".into()]),
            ],
        )
        .unwrap();
        assert_eq!(g.num_rows(), 2);
    }

    #[test]
    fn rejects_out_of_domain_code_and_wide_text() {
        let err = RowGroup::try_new(
            "t",
            schema(),
            vec![
                ColumnValues::Codes(vec![2]),
                ColumnValues::Text(vec!["a".into()]),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, TableError::DomainViolation { .. }));

        let err = RowGroup::try_new(
            "t",
            schema(),
            vec![
                ColumnValues::Codes(vec![0]),
                ColumnValues::Text(vec!["abcd".into()]),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, TableError::WidthOverflow { width: 3, len: 4, .. }));
    }

    #[test]
    fn rejects_ragged_columns() {
        let err = RowGroup::try_new(
            "t",
            schema(),
            vec![ColumnValues::Codes(vec![0, 1]), ColumnValues::Text(vec![])],
        )
        .unwrap_err();
        assert!(matches!(err, TableError::SchemaMismatch { .. }));
    }
}
