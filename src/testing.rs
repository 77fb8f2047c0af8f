//! Testing utilities for table builds and merges.
//!
//! Fixtures produce small, deterministic record sets shaped like the
//! variant and breakpoint records the presets expect; assertions compare
//! stored tables against expected column text with readable failures.
//!
//! ```no_run
//! use irontable::testing::*;
//! use irontable::{ConvertOptions, convert_to_store, presets};
//!
//! # fn main() -> irontable::Result<()> {
//! let dir = tempfile::tempdir().unwrap();
//! let out = dir.path().join("calls.store");
//! convert_to_store(&sample_variants(), &presets::variant_table("snvs"), &out, &ConvertOptions::default())?;
//! assert_table_column(&out, "snvs", "alt", &["T", "C", "G", "A"]);
//! # Ok(())
//! # }
//! ```

pub mod assertions;
pub mod fixtures;

pub use assertions::*;
pub use fixtures::*;
