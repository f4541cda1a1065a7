//! Append-only binary store of per-sample vectors.
//!
//! A store is a pair of files sharing a base path:
//!
//! ```text
//! <base>.gsv  data       "GSVD" | version u16 | vector length u32
//!                        then per sample: id length u32 | id (UTF-8) | length × f32
//! <base>.gsi  directory  "GSVI" | version u16 | vector length u32 | count u32
//!                        then per sample: id length u32 | id (UTF-8)
//! ```
//!
//! All integers and floats are little-endian. Every vector in a store has the same
//! length, normally the platform's probe count, and samples are read back in the
//! order they were appended. The directory is written only when the writer is
//! closed; a reader rebuilds it from the data file when it is missing.
//!
//! # Example
//!
//! ```no_run
//! use geosoft::vectors::{VectorStoreReader, VectorStoreWriter};
//!
//! # fn main() -> geosoft::Result<()> {
//! let mut writer = VectorStoreWriter::create("GSE2034", 3)?;
//! writer.append_sample(&[1.0, 2.0, 3.0], "GSM36777")?;
//! writer.append_sample(&[0.5, f32::NAN, 0.0], "GSM36778")?;
//! writer.close()?;
//!
//! let mut reader = VectorStoreReader::open("GSE2034")?;
//! let mut signal = reader.allocate_signal_array();
//! while reader.remaining() > 0 {
//!     let id = reader.read_next_sample(&mut signal)?;
//!     println!("{id}: {:?}", signal);
//! }
//! # Ok(())
//! # }
//! ```

mod reader;
mod writer;

pub use reader::VectorStoreReader;
pub use writer::{StoreSummary, VectorStoreWriter};

use crate::error::{GeoSoftError, Result};
use std::ffi::OsString;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

/// Data file magic bytes
pub const DATA_MAGIC: &[u8; 4] = b"GSVD";
/// Directory file magic bytes
pub const DIRECTORY_MAGIC: &[u8; 4] = b"GSVI";
/// Layout version written by this crate
pub const STORE_VERSION: u16 = 1;
/// Data file extension
pub const DATA_EXTENSION: &str = "gsv";
/// Directory file extension
pub const DIRECTORY_EXTENSION: &str = "gsi";

/// Bytes before the first record of either file
const HEADER_LEN: u64 = 10;

/// Longest sample id accepted when reading (guards allocations on corrupt input)
const MAX_ID_LEN: usize = 64 * 1024;

/// Data and directory paths derived from a store base path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    /// `<base>.gsv`
    pub data: PathBuf,
    /// `<base>.gsi`
    pub directory: PathBuf,
}

impl StorePaths {
    /// Append the store extensions to `base` (an existing extension is kept)
    pub fn from_base<P: AsRef<Path>>(base: P) -> Self {
        let with_extension = |extension: &str| {
            let mut path = OsString::from(base.as_ref().as_os_str());
            path.push(".");
            path.push(extension);
            PathBuf::from(path)
        };
        Self {
            data: with_extension(DATA_EXTENSION),
            directory: with_extension(DIRECTORY_EXTENSION),
        }
    }
}

fn write_header<W: Write>(writer: &mut W, magic: &[u8; 4], vector_len: u32) -> io::Result<()> {
    writer.write_all(magic)?;
    writer.write_all(&STORE_VERSION.to_le_bytes())?;
    writer.write_all(&vector_len.to_le_bytes())
}

/// Read and validate a file header, returning the vector length
fn read_header<R: Read>(reader: &mut R, magic: &[u8; 4]) -> Result<usize> {
    let mut found = [0u8; 4];
    reader.read_exact(&mut found).map_err(truncated)?;
    if &found != magic {
        return Err(GeoSoftError::CorruptStore(format!(
            "bad magic: expected {:?}, got {:?}",
            String::from_utf8_lossy(magic),
            String::from_utf8_lossy(&found)
        )));
    }

    let mut version = [0u8; 2];
    reader.read_exact(&mut version).map_err(truncated)?;
    let version = u16::from_le_bytes(version);
    if version != STORE_VERSION {
        return Err(GeoSoftError::CorruptStore(format!(
            "unsupported version {version} (expected {STORE_VERSION})"
        )));
    }

    Ok(read_u32(reader)? as usize)
}

fn read_u32<R: Read>(reader: &mut R) -> Result<u32> {
    let mut bytes = [0u8; 4];
    reader.read_exact(&mut bytes).map_err(truncated)?;
    Ok(u32::from_le_bytes(bytes))
}

/// Read a u32, or `None` when the reader is already at end of file
fn read_u32_or_eof<R: Read>(reader: &mut R) -> Result<Option<u32>> {
    let mut bytes = [0u8; 4];
    let mut filled = 0;
    while filled < bytes.len() {
        match reader.read(&mut bytes[filled..]) {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => return Err(GeoSoftError::CorruptStore("truncated record header".to_string())),
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(Some(u32::from_le_bytes(bytes)))
}

/// Read `len` bytes of UTF-8 id text
fn read_id<R: Read>(reader: &mut R, len: u32, buffer: &mut Vec<u8>) -> Result<String> {
    let len = len as usize;
    if len > MAX_ID_LEN {
        return Err(GeoSoftError::CorruptStore(format!(
            "sample id length {len} exceeds {MAX_ID_LEN}"
        )));
    }
    buffer.clear();
    buffer.resize(len, 0);
    reader.read_exact(buffer).map_err(truncated)?;
    std::str::from_utf8(buffer)
        .map(str::to_string)
        .map_err(|e| GeoSoftError::CorruptStore(format!("sample id is not UTF-8: {e}")))
}

fn write_id<W: Write>(writer: &mut W, id: &str) -> Result<()> {
    let len = u32::try_from(id.len()).map_err(|_| {
        GeoSoftError::CorruptStore(format!("sample id of {} bytes is too long", id.len()))
    })?;
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(id.as_bytes())?;
    Ok(())
}

fn truncated(error: io::Error) -> GeoSoftError {
    if error.kind() == io::ErrorKind::UnexpectedEof {
        GeoSoftError::CorruptStore("unexpected end of file".to_string())
    } else {
        GeoSoftError::Io(error)
    }
}
