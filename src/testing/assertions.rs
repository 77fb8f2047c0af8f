//! Assertions over stored tables.

use crate::store::TableStore;
use std::path::Path;

/// Assert that a column of a published table holds exactly `expected`, in order,
/// compared by canonical text.
///
/// # Panics
///
/// Panics if the store or table cannot be read, or the values differ.
pub fn assert_table_column(store: impl AsRef<Path>, table: &str, column: &str, expected: &[&str]) {
    let store = store.as_ref();
    let read = TableStore::open_read(store)
        .and_then(|s| s.read(table))
        .unwrap_or_else(|e| panic!("read {table} from {}: {e}", store.display()));
    let actual = read
        .column_text(column)
        .unwrap_or_else(|e| panic!("column {column} of {table}: {e}"));
    assert_eq!(
        actual.len(),
        expected.len(),
        "Row count mismatch in {table}.{column}:\n  Expected: {expected:?}\n  Actual: {actual:?}"
    );
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert_eq!(
            a, e,
            "Mismatch at row {i} of {table}.{column}:\n  Expected: {expected:?}\n  Actual: {actual:?}"
        );
    }
}

/// Assert the row-group sizes of a published table.
///
/// # Panics
///
/// Panics if the table is missing or its row groups differ.
pub fn assert_row_groups(store: impl AsRef<Path>, table: &str, expected: &[u64]) {
    let store = store.as_ref();
    let opened = TableStore::open_read(store)
        .unwrap_or_else(|e| panic!("open {}: {e}", store.display()));
    let entry = opened
        .entry(table)
        .unwrap_or_else(|| panic!("no table {table} in {}", store.display()));
    assert_eq!(
        entry.row_groups, expected,
        "Row-group sizes of {table} differ"
    );
}
