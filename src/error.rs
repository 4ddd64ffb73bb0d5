//! Error types for the quietpath library.
//!
//! Import degrades gracefully (unknown or malformed attributes are logged
//! and skipped), so most codec problems never surface here. The variants
//! below are the hard failures: broken files, integrity violations and
//! invalid arguments that callers must handle.

use thiserror::Error;

/// Main error type for quietpath operations
#[derive(Debug, Error)]
pub enum Error {
    /// Structurally broken graph file (bad XML, missing element ids,
    /// edge endpoints that reference no node)
    #[error("invalid graph file: {0}")]
    Graph(String),

    /// Underlying XML reader/writer failure
    #[error("XML error: {0}")]
    Xml(String),

    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Geometry attribute that is not valid WKT
    #[error("invalid WKT geometry: {0}")]
    Wkt(String),

    /// Wire value that is not a valid literal for its attribute type
    #[error("invalid literal: {0}")]
    Literal(String),

    /// Unsupported dB cost table version (only 2 and 3 exist)
    #[error("dB cost table version must be 2 or 3, got {0}")]
    UnknownCostVersion(u8),

    /// dB level outside the cost table domain [40, 79]
    #[error("no cost coefficient for {0} dB (table covers 40..=79)")]
    DbOutOfRange(i32),

    /// Sum of noise exposures disagrees with the edge length beyond the
    /// 0.5 m tolerance
    #[error("total noise exposure {exposed} does not match edge length {length}")]
    ExposureLengthMismatch { length: f64, exposed: f64 },

    /// Invalid or unreadable configuration
    #[error("configuration error: {0}")]
    Config(String),
}

/// Convenience result type for quietpath operations
pub type Result<T> = std::result::Result<T, Error>;

/// Adapter for the several error types quick-xml produces.
pub(crate) fn xml_err(err: impl std::fmt::Display) -> Error {
    Error::Xml(err.to_string())
}
