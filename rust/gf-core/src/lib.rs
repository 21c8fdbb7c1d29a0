//! gf-core: vocabulary tables, frequency indexing, and sparse row matrices.
//!
//! These are the leaf building blocks for feature definitions:
//! - [`BiLookup`]: bijective key <-> column index table (a feature vocabulary)
//! - [`FrequencyIndex`]: key counting, pruning, and deterministic index assignment
//! - [`SparseVector`] / [`SparseMatrix`]: sparse rows and cartesian row composition

pub mod bilookup;
pub mod frequency;
pub mod sparse;

pub use bilookup::{BiLookup, LookupError};
pub use frequency::{FrequencyError, FrequencyIndex};
pub use sparse::{row_product_cat, SparseError, SparseMatrix, SparseRow, SparseVector};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");


#[cfg(test)]
mod bilookup_tests;
#[cfg(test)]
mod frequency_tests;
