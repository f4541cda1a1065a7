//! Output destinations for side files (platform snapshots, exported tables)
//!
//! `DataSink` is the write counterpart to [`DataSource`](crate::io::DataSource).
//!
//! ```no_run
//! use geosoft::io::DataSink;
//!
//! let sink = DataSink::from_path("GPL570.snapshot.json.gz");
//! assert!(sink.is_compressed());
//! ```

use std::path::{Path, PathBuf};

/// Output destination for streaming writes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSink {
    /// Write to a local file path
    ///
    /// `.gz`, `.gzip` and `.bgz` paths are gzip-compressed.
    Local(PathBuf),

    /// Write to standard output (never compressed)
    Stdout,
}

impl DataSink {
    /// Create a sink from a file path
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        Self::Local(path.as_ref().to_path_buf())
    }

    /// Create a sink for standard output
    pub fn stdout() -> Self {
        Self::Stdout
    }

    /// Get the file extension if this is a local file sink
    pub(crate) fn extension(&self) -> Option<&str> {
        match self {
            Self::Local(path) => path.extension().and_then(|s| s.to_str()),
            Self::Stdout => None,
        }
    }

    /// Check if this sink represents a compressed output
    pub fn is_compressed(&self) -> bool {
        matches!(self.extension(), Some("gz") | Some("bgz") | Some("gzip"))
    }
}
