//! gf-features: feature definitions, feature sets, and per-example feature matrices.

pub mod builder;
pub mod config;
pub mod definition;
pub mod persist;
pub mod schema;
pub mod set;

pub use builder::{BuildProgress, Datum, FeatureMatrixBuilder, FeatureMatrixCollection};
pub use config::{Config, ConfigError};
pub use definition::{
    Encoding, Extractors, FeatureDefinition, FeatureError, FeatureKind, FeatureParams, FeatureSpec,
};
pub use persist::{
    feature_file_name, load_collection, load_feature_set, metadata_file_name, save_collection,
    save_feature_set,
};
pub use schema::{reserved_slots, Symbol, FEATURE_FILE_PREFIX, RESERVED_SYMBOL_COUNT};
pub use set::{FeatureSet, FeatureSetMeta};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");


#[cfg(test)]
mod testutil;

#[cfg(test)]
mod builder_tests;
