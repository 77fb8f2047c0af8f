//! Expansion of one record into table rows.
//!
//! A record whose expanded fields hold several values (several alternate
//! alleles, several libraries supporting a breakpoint) yields one row per
//! value; every other field is replicated. Both passes of a build go through
//! these functions so the scan measures exactly what the writer will store.

use crate::error::{Result, TableError};
use crate::record::{Record, Value, require};
use crate::schema::{ColumnSpec, TableSpec};

/// Number of rows `record` expands into under `spec`.
///
/// Expanded fields holding multiple values must agree on their length; scalar
/// values count as one and are repeated. An expanded field with zero values
/// produces zero rows.
pub(crate) fn row_count(spec: &TableSpec, record: &Record) -> Result<usize> {
    let mut count: Option<usize> = None;
    for field in &spec.expand {
        let value = require(record, &spec.name, field)?;
        let Value::Multi(values) = value else {
            continue;
        };
        match count {
            None => count = Some(values.len()),
            Some(n) if n == values.len() => {}
            Some(n) => {
                return Err(TableError::schema(
                    &spec.name,
                    format!(
                        "expanded field `{field}` has {} values, expected {n}",
                        values.len()
                    ),
                ));
            }
        }
    }
    Ok(count.unwrap_or(1))
}

/// The value of `column` in row `i` of the expansion of `record`.
pub(crate) fn cell<'r>(
    spec: &TableSpec,
    column: &ColumnSpec,
    record: &'r Record,
    i: usize,
) -> Result<&'r Value> {
    let value = require(record, &spec.name, &column.field)?;
    if let Value::Multi(_) = value {
        if !spec.is_expanded(&column.field) {
            return Err(TableError::schema(
                &spec.name,
                format!(
                    "field `{}` is multi-valued but not expanded",
                    column.field
                ),
            ));
        }
        let element = value.element(i).ok_or_else(|| {
            TableError::schema(
                &spec.name,
                format!("field `{}` has no value {i}", column.field),
            )
        })?;
        if let Value::Multi(_) = element {
            return Err(TableError::schema(
                &spec.name,
                format!("field `{}` holds nested lists", column.field),
            ));
        }
        return Ok(element);
    }
    Ok(value)
}

/// Error for a missing value in a column that cannot store one. Only float
/// columns have a representation (NaN) for missing values.
pub(crate) fn missing_value(spec: &TableSpec, column: &ColumnSpec) -> TableError {
    TableError::schema(
        &spec.name,
        format!(
            "field `{}` is missing a value but column `{}` is not a float column",
            column.field, column.name
        ),
    )
}
