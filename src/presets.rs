//! Table specs for the record kinds the variant pipelines produce.
//!
//! Field names follow the records a VCF/breakpoint parser hands over
//! (`chrom`, `coord`, `ref`, `alt`, `qual`, ...); column names follow the
//! tables downstream consumers read.

use crate::schema::{ColumnSpec, TableSpec};

/// Variant calls: one row per alternate allele.
///
/// | column | kind     | field  |
/// |--------|----------|--------|
/// | chrom  | category | chrom  |
/// | coord  | int      | coord  |
/// | ref    | category | ref    |
/// | alt    | category | alt (expanded) |
/// | score  | float    | qual, or the caller's score function |
#[must_use]
pub fn variant_table(name: impl Into<String>) -> TableSpec {
    TableSpec::new(
        name,
        vec![
            ColumnSpec::category("chrom"),
            ColumnSpec::int("coord"),
            ColumnSpec::category("ref"),
            ColumnSpec::category("alt"),
            ColumnSpec::float("score").from_field("qual"),
        ],
    )
    .expand("alt")
    .score_column("score")
}

/// Structural variant breakpoints, one row per prediction.
#[must_use]
pub fn breakpoint_table(name: impl Into<String>) -> TableSpec {
    TableSpec::new(
        name,
        vec![
            ColumnSpec::text("prediction_id"),
            ColumnSpec::category("chromosome_1"),
            ColumnSpec::category("chromosome_2"),
            ColumnSpec::category("strand_1"),
            ColumnSpec::category("strand_2"),
            ColumnSpec::int("position_1"),
            ColumnSpec::int("position_2"),
            ColumnSpec::int("qual"),
        ],
    )
}

/// Per-library read support of each breakpoint. Records carry parallel
/// lists `library`, `num_spanning`, `num_split`, expanded together.
#[must_use]
pub fn breakpoint_library_table(name: impl Into<String>) -> TableSpec {
    TableSpec::new(
        name,
        vec![
            ColumnSpec::text("prediction_id"),
            ColumnSpec::category("library"),
            ColumnSpec::int("num_spanning"),
            ColumnSpec::int("num_split"),
        ],
    )
    .expand("library")
    .expand("num_spanning")
    .expand("num_split")
}

/// Mean mappability around each variant position.
#[must_use]
pub fn mappability_table(name: impl Into<String>) -> TableSpec {
    TableSpec::new(
        name,
        vec![
            ColumnSpec::category("chrom"),
            ColumnSpec::int("coord"),
            ColumnSpec::float("mappability"),
        ],
    )
}

/// Look a preset up by its CLI name.
#[must_use]
pub fn by_name(kind: &str, table: &str) -> Option<TableSpec> {
    match kind {
        "variant" => Some(variant_table(table)),
        "breakpoint" => Some(breakpoint_table(table)),
        "breakpoint_library" => Some(breakpoint_library_table(table)),
        "mappability" => Some(mappability_table(table)),
        _ => None,
    }
}
