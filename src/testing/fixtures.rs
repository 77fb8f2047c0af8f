//! Pre-built record sets for common test scenarios.

use crate::record::{Record, VecSource};

/// One variant call record with the fields [`crate::presets::variant_table`] reads.
#[must_use]
pub fn variant(chrom: &str, coord: i64, reference: &str, alts: &[&str], qual: f64) -> Record {
    Record::new()
        .with("chrom", chrom)
        .with("coord", coord)
        .with("ref", reference)
        .with("alt", alts.to_vec())
        .with("qual", qual)
}

/// Three calls on chromosome 1; the second has two alternate alleles, so
/// the variant table holds four rows.
///
/// # Example
///
/// ```
/// use irontable::testing::sample_variants;
///
/// assert_eq!(sample_variants().len(), 3);
/// ```
#[must_use]
pub fn sample_variants() -> VecSource {
    VecSource::new(sample_variant_records())
}

/// The records behind [`sample_variants`].
#[must_use]
pub fn sample_variant_records() -> Vec<Record> {
    vec![
        variant("1", 100, "A", &["T"], 30.0),
        variant("1", 200, "G", &["C", "G"], 12.5),
        variant("1", 300, "C", &["A"], 99.0),
    ]
}

/// Variant calls spread over `chroms`, `per_chrom` calls each, one alt per call.
#[must_use]
pub fn variants_on(chroms: &[&str], per_chrom: i64) -> VecSource {
    const BASES: [&str; 4] = ["A", "C", "G", "T"];
    let mut records = Vec::new();
    for chrom in chroms {
        for i in 0..per_chrom {
            let base = usize::try_from(i).unwrap_or(0) % BASES.len();
            records.push(variant(
                chrom,
                (i + 1) * 10,
                BASES[base],
                &[BASES[(base + 1) % BASES.len()]],
                f64::from(u32::try_from(i).unwrap_or(0)) + 0.5,
            ));
        }
    }
    VecSource::new(records)
}

/// Breakpoint-library records: each prediction carries parallel per-library lists.
#[must_use]
pub fn sample_breakpoint_libraries() -> VecSource {
    VecSource::new(vec![
        Record::new()
            .with("prediction_id", "bp1")
            .with("library", vec!["lib_a", "lib_b"])
            .with("num_spanning", vec![4i64, 0])
            .with("num_split", vec![2i64, 1]),
        Record::new()
            .with("prediction_id", "bp22")
            .with("library", vec!["lib_b"])
            .with("num_spanning", vec![7i64])
            .with("num_split", vec![3i64]),
    ])
}
