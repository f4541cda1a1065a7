//! Error types for geosoft

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for geosoft operations
pub type Result<T> = std::result::Result<T, GeoSoftError>;

/// Error types that can occur in geosoft
#[derive(Debug, Error)]
pub enum GeoSoftError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// I/O error with file context
    #[error("Failed to {operation} {}: {source}", path.display())]
    File {
        /// File the operation was applied to
        path: PathBuf,
        /// Operation that failed (e.g. "open", "create")
        operation: &'static str,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Compression/decompression error
    #[error("Compression error: {0}")]
    Compression(String),

    /// A required section never occurred in the stream
    #[error("Section '{0}' not found")]
    MissingSection(String),

    /// A table delimiter or column marker was not found inside a section
    #[error("Marker '{marker}' not found in {section} section (line {line})")]
    MissingMarker {
        /// Marker that was expected
        marker: String,
        /// Section that was being parsed
        section: String,
        /// Line where the search stopped
        line: usize,
    },

    /// Parser operation invoked from the wrong cursor state
    #[error("{operation} requires {expected}, but cursor is at {found}")]
    CursorState {
        /// Operation that was called
        operation: &'static str,
        /// Required state
        expected: String,
        /// Actual state
        found: String,
    },

    /// Malformed table row (only raised under strict row policy)
    #[error("Invalid row at line {line}: {msg}")]
    Row {
        /// Line number where error occurred
        line: usize,
        /// Error message
        msg: String,
    },

    /// Vector length does not match the store dimensionality
    #[error("Vector length mismatch: store holds {expected} values, got {actual}")]
    VectorLength {
        /// Store dimensionality
        expected: usize,
        /// Length supplied by the caller
        actual: usize,
    },

    /// More samples requested than the store contains
    #[error("Vector store exhausted after {count} samples")]
    StoreExhausted {
        /// Number of samples in the store
        count: usize,
    },

    /// Store files are inconsistent or truncated
    #[error("Corrupt vector store: {0}")]
    CorruptStore(String),

    /// Platform snapshot could not be restored
    #[error("Invalid platform snapshot: {0}")]
    Snapshot(String),

    /// Invalid run configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GeoSoftError {
    /// Attach a file path and operation name to an I/O error
    pub(crate) fn file(
        path: impl Into<PathBuf>,
        operation: &'static str,
        source: std::io::Error,
    ) -> Self {
        Self::File {
            path: path.into(),
            operation,
            source,
        }
    }
}
