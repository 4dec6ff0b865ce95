//! Fatal failure categories of an aggregation run.
//!
//! Every category aborts the run; there are no retries and no partial
//! catalog writes. The variants exist so callers and tests can tell the
//! categories apart after the `anyhow` wrapping.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AggregatorError {
    /// Any transport or HTTP failure, unclassified.
    #[error("request to {url} failed: {reason}")]
    Network { url: String, reason: String },

    /// The downloaded binary carries no recoverable embedded version.
    #[error("no embedded version found in {class_name}.{field_name}")]
    Extraction {
        class_name: String,
        field_name: String,
    },

    /// The catalog file exists but cannot be parsed against the schema.
    #[error("catalog file {path} cannot be parsed: {reason}")]
    CorruptCatalog { path: String, reason: String },

    /// A pre-release numeric key cannot be derived from a version string.
    #[error("cannot derive a numeric key from version {version}")]
    Validation { version: String },
}
