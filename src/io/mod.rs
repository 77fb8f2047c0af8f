//! Record inputs, store discovery, and table exports.

pub mod compression;
pub mod glob;

#[cfg_attr(docsrs, doc(cfg(feature = "io-jsonl")))]
#[cfg(feature = "io-jsonl")]
pub mod jsonl;

#[cfg_attr(docsrs, doc(cfg(feature = "io-tsv")))]
#[cfg(feature = "io-tsv")]
pub mod tsv;
