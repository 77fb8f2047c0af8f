//! Merging many stores into one.
//!
//! A merge runs in two steps:
//!
//! 1. [`reconcile_widths`] reads every input and records, per table and text
//!    column, the longest canonical value anywhere.
//! 2. [`concatenate_stores`] writes every input table, in input order, into
//!    one output store at those widths.
//!
//! Columns that are categories in one input and text (or numbers) in another
//! are written as text; integer columns meeting float columns become float.
//! [`merge_stores`] runs both steps. Input order is the caller's: use
//! [`sorted_inputs`] to put keyed partitions in a deterministic order first.

pub mod concat;
pub mod widths;

pub use concat::{MergeReport, concatenate_stores};
pub use widths::{WidthRegistry, reconcile_widths};

use crate::error::Result;
use std::path::{Path, PathBuf};

/// Order `(key, path)` pairs by key. Equal keys keep their given order.
#[must_use]
pub fn sorted_inputs<K, P, I>(inputs: I) -> Vec<PathBuf>
where
    K: Ord,
    P: Into<PathBuf>,
    I: IntoIterator<Item = (K, P)>,
{
    let mut keyed: Vec<(K, PathBuf)> = inputs.into_iter().map(|(k, p)| (k, p.into())).collect();
    keyed.sort_by(|a, b| a.0.cmp(&b.0));
    keyed.into_iter().map(|(_, p)| p).collect()
}

/// Reconcile widths across `inputs`, then concatenate them into `output`.
///
/// # Errors
/// See [`reconcile_widths`] and [`concatenate_stores`].
pub fn merge_stores<P: AsRef<Path>>(inputs: &[P], output: impl AsRef<Path>) -> Result<MergeReport> {
    let registry = reconcile_widths(inputs)?;
    concatenate_stores(inputs, output, &registry)
}
