//! geosoft: streaming SOFT family parser and per-sample vector store
//!
//! # Overview
//!
//! GEO publishes every series as a SOFT "family" file: one text file (often
//! gzipped, often several gigabytes) holding the platform description and the data
//! table of every sample. geosoft reads such files forward-only, builds a dense
//! probe index from the Platform section, extracts one numeric array per Sample
//! section, and writes those arrays to a compact binary store.
//!
//! ## Key Features
//!
//! - **Streaming**: memory bounded by one line, the platform index and one sample
//! - **Transparent gzip**: compression detected from magic bytes, decoded as a stream
//! - **Typed navigation**: the parser position is an explicit [`soft::SectionCursor`]
//! - **Pluggable formats**: Affymetrix signal/presence, SAGE and MPSS counts, genotype calls
//! - **Exact storage**: vectors round-trip bit-for-bit through [`vectors`]
//!
//! ## Quick Start
//!
//! ```no_run
//! use geosoft::{export_family, DataSource, RunConfig};
//!
//! # fn main() -> geosoft::Result<()> {
//! let config = RunConfig::builder().adapter_options("format=affymetrix")?.build();
//! let source = DataSource::from_path("GSE2034_family.soft.gz");
//! let summary = export_family(source, &config, "GSE2034")?;
//!
//! println!(
//!     "{}: {} samples x {} probes",
//!     summary.platform, summary.samples_exported, summary.probes
//! );
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`soft`]: SOFT section navigation and table parsing
//! - [`platform`]: probe/external-id index, snapshots, probe/transcript tables
//! - [`sample`]: per-format sample table extraction
//! - [`vectors`]: binary per-sample vector store
//! - [`pipeline`]: family file to vector store export
//! - [`registry`]: dense string-to-index registry
//! - [`config`]: run configuration and adapter options
//! - [`io`]: compressed input/output
//!
//! ## Logging
//!
//! geosoft emits [`tracing`] events and never installs a subscriber.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod error;
pub mod io;
pub mod pipeline;
pub mod platform;
pub mod registry;
pub mod sample;
pub mod soft;
pub mod table;
pub mod vectors;

// Re-export commonly used types
pub use config::{AdapterOptions, FormatKind, PlatformSource, RowPolicy, RunConfig};
pub use error::{GeoSoftError, Result};
pub use io::{DataSink, DataSource};
pub use pipeline::{export_family, ExportSummary};
pub use platform::Platform;
pub use registry::IdentifierRegistry;
pub use sample::{SampleAdapter, SampleData, SampleReader};
pub use soft::SoftParser;
pub use vectors::{VectorStoreReader, VectorStoreWriter};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
