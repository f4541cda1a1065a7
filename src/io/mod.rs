//! I/O module: compression-aware sources and sinks
//!
//! SOFT files are read strictly front to back, so every reader here is a
//! `BufRead` stream with bounded buffering regardless of file size.

pub mod compression;
pub mod sink;

pub use compression::{CompressedReader, CompressedWriter, DataSource, Encoding, MMAP_THRESHOLD};
pub use sink::DataSink;
