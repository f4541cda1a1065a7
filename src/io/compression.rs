//! Compression-aware input and output for SOFT files and side tables
//!
//! GEO distributes SOFT family files gzip-compressed and they routinely decompress
//! to several gigabytes, so everything here is a stream: gzip members are decoded
//! incrementally and nothing is buffered beyond the reader's block.
//!
//! # Input
//!
//! - [`DataSource`] names where bytes come from
//! - [`CompressedReader`] sniffs the first bytes and transparently decodes gzip
//!   (including multi-member / bgzip files); zip archives are rejected
//!
//! # Output
//!
//! - [`CompressedWriter`] writes plain or gzip output depending on the
//!   [`DataSink`] extension

use crate::error::{GeoSoftError, Result};
use crate::io::DataSink;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use memmap2::Mmap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// Memory-mapped file threshold (50 MB)
///
/// Below this size the page-table setup costs more than buffered reads save.
pub const MMAP_THRESHOLD: u64 = 50 * 1024 * 1024;

/// Gzip magic bytes
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Zip local file header magic (`PK\x03\x04`)
const ZIP_MAGIC: [u8; 4] = [b'P', b'K', 0x03, 0x04];

/// Input source abstraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    /// Local file path
    Local(PathBuf),
}

impl DataSource {
    /// Create a local file data source
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        DataSource::Local(path.as_ref().to_path_buf())
    }

    /// Path of the source
    pub fn path(&self) -> &Path {
        match self {
            DataSource::Local(path) => path,
        }
    }

    /// Open the data source and return a buffered reader over the raw bytes
    pub fn open(&self) -> Result<Box<dyn BufRead + Send>> {
        match self {
            DataSource::Local(path) => open_local_file(path),
        }
    }
}

/// Open a local file, memory-mapping it when it is large
fn open_local_file(path: &Path) -> Result<Box<dyn BufRead + Send>> {
    let metadata = std::fs::metadata(path).map_err(|e| GeoSoftError::file(path, "stat", e))?;

    if metadata.len() >= MMAP_THRESHOLD {
        open_mmap_file(path)
    } else {
        let file = File::open(path).map_err(|e| GeoSoftError::file(path, "open", e))?;
        Ok(Box::new(BufReader::new(file)))
    }
}

fn open_mmap_file(path: &Path) -> Result<Box<dyn BufRead + Send>> {
    let file = File::open(path).map_err(|e| GeoSoftError::file(path, "open", e))?;
    // SAFETY: the map is read-only and the file is not modified while a parse runs.
    let mmap = unsafe { Mmap::map(&file) }.map_err(|e| GeoSoftError::file(path, "map", e))?;
    Ok(Box::new(io::Cursor::new(mmap)))
}

/// Compression format detected from leading bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Uncompressed text
    Plain,
    /// Gzip (one or more members)
    Gzip,
    /// Zip archive (unsupported)
    Zip,
}

impl Encoding {
    /// Detect the encoding from the first bytes of a stream
    pub fn sniff(prefix: &[u8]) -> Self {
        if prefix.starts_with(&GZIP_MAGIC) {
            Encoding::Gzip
        } else if prefix.starts_with(&ZIP_MAGIC) {
            Encoding::Zip
        } else {
            Encoding::Plain
        }
    }
}

/// Buffered reader that decodes gzip input transparently
///
/// # Example
///
/// ```no_run
/// use geosoft::io::compression::{CompressedReader, DataSource};
/// use std::io::BufRead;
///
/// # fn main() -> geosoft::Result<()> {
/// let reader = CompressedReader::new(DataSource::from_path("GSE1234_family.soft.gz"))?;
/// for line in reader.lines() {
///     let _line = line?;
/// }
/// # Ok(())
/// # }
/// ```
pub struct CompressedReader {
    inner: Box<dyn BufRead + Send>,
    encoding: Encoding,
}

impl CompressedReader {
    /// Open a data source, sniffing its compression
    pub fn new(source: DataSource) -> Result<Self> {
        let reader = source.open()?;
        Self::from_reader(reader)
            .map_err(|e| match e {
                GeoSoftError::Io(io) => GeoSoftError::file(source.path(), "read", io),
                other => other,
            })
    }

    /// Wrap an already-open buffered reader, sniffing its compression
    pub fn from_reader(mut reader: Box<dyn BufRead + Send>) -> Result<Self> {
        let encoding = {
            let peeked = reader.fill_buf()?;
            Encoding::sniff(&peeked[..peeked.len().min(ZIP_MAGIC.len())])
        };

        match encoding {
            Encoding::Gzip => Ok(Self {
                inner: Box::new(BufReader::new(MultiGzDecoder::new(reader))),
                encoding,
            }),
            Encoding::Zip => Err(GeoSoftError::Compression(
                "zip archives are not supported; extract the SOFT file or recompress with gzip"
                    .to_string(),
            )),
            Encoding::Plain => Ok(Self { inner: reader, encoding }),
        }
    }

    /// Encoding detected when the reader was opened
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Get the inner buffered reader
    pub fn into_inner(self) -> Box<dyn BufRead + Send> {
        self.inner
    }
}

impl Read for CompressedReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl BufRead for CompressedReader {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.inner.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        self.inner.consume(amt)
    }
}

/// Writer with extension-driven gzip compression
///
/// Call [`finish`](CompressedWriter::finish) to finalize the gzip trailer; `Drop`
/// only performs a best-effort flush.
pub enum CompressedWriter {
    /// Uncompressed writer with buffering
    Plain(Option<BufWriter<Box<dyn Write>>>),

    /// Gzip compressed writer (default level)
    Gzip(Option<GzEncoder<BufWriter<Box<dyn Write>>>>),
}

impl CompressedWriter {
    /// Create a writer for a sink; `.gz`/`.gzip` paths are gzip-compressed
    pub fn new(sink: DataSink) -> Result<Self> {
        let compressed = sink.is_compressed();
        match sink {
            DataSink::Local(path) => {
                let file = File::create(&path).map_err(|e| GeoSoftError::file(&path, "create", e))?;
                if compressed {
                    Ok(Self::new_gzip(Box::new(file)))
                } else {
                    Ok(Self::new_plain(Box::new(file)))
                }
            }
            DataSink::Stdout => Ok(Self::new_plain(Box::new(io::stdout()))),
        }
    }

    /// Create a plain (uncompressed) writer
    pub fn new_plain(writer: Box<dyn Write>) -> Self {
        Self::Plain(Some(BufWriter::new(writer)))
    }

    /// Create a gzip compressed writer
    pub fn new_gzip(writer: Box<dyn Write>) -> Self {
        Self::Gzip(Some(GzEncoder::new(BufWriter::new(writer), Compression::default())))
    }

    /// Finish writing and consume the writer
    pub fn finish(mut self) -> io::Result<()> {
        match &mut self {
            Self::Plain(w) => match w.take() {
                Some(mut writer) => writer.flush(),
                None => Ok(()),
            },
            Self::Gzip(w) => match w.take() {
                Some(encoder) => encoder.finish()?.flush(),
                None => Ok(()),
            },
        }
    }
}

impl Write for CompressedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Plain(Some(w)) => w.write(buf),
            Self::Gzip(Some(w)) => w.write(buf),
            _ => Err(io::Error::new(io::ErrorKind::Other, "Cannot write to finished writer")),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Plain(Some(w)) => w.flush(),
            Self::Gzip(Some(w)) => w.flush(),
            _ => Ok(()),
        }
    }
}

impl Drop for CompressedWriter {
    fn drop(&mut self) {
        // Best-effort; finish() reports errors
        let _ = self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_sniff_encoding() {
        assert_eq!(Encoding::sniff(&[0x1f, 0x8b, 0x08]), Encoding::Gzip);
        assert_eq!(Encoding::sniff(b"PK\x03\x04"), Encoding::Zip);
        assert_eq!(Encoding::sniff(b"^DATABASE"), Encoding::Plain);
        assert_eq!(Encoding::sniff(b""), Encoding::Plain);
    }

    #[test]
    fn test_plain_passthrough() {
        let input = Cursor::new(b"^SERIES = GSE1\n".to_vec());
        let reader = CompressedReader::from_reader(Box::new(input)).unwrap();
        assert_eq!(reader.encoding(), Encoding::Plain);
        let lines: Vec<String> = reader.lines().collect::<io::Result<_>>().unwrap();
        assert_eq!(lines, vec!["^SERIES = GSE1"]);
    }

    #[test]
    fn test_gzip_decoded() {
        let compressed = gzip(b"line one\nline two\n");
        let reader = CompressedReader::from_reader(Box::new(Cursor::new(compressed))).unwrap();
        assert_eq!(reader.encoding(), Encoding::Gzip);
        let lines: Vec<String> = reader.lines().collect::<io::Result<_>>().unwrap();
        assert_eq!(lines, vec!["line one", "line two"]);
    }

    #[test]
    fn test_multi_member_gzip() {
        let mut compressed = gzip(b"first\n");
        compressed.extend(gzip(b"second\n"));
        let reader = CompressedReader::from_reader(Box::new(Cursor::new(compressed))).unwrap();
        let lines: Vec<String> = reader.lines().collect::<io::Result<_>>().unwrap();
        assert_eq!(lines, vec!["first", "second"]);
    }

    #[test]
    fn test_zip_rejected() {
        let input = Cursor::new(b"PK\x03\x04rest".to_vec());
        let result = CompressedReader::from_reader(Box::new(input));
        assert!(matches!(result, Err(GeoSoftError::Compression(_))));
    }

    #[test]
    fn test_missing_file_has_context() {
        let result = CompressedReader::new(DataSource::from_path("/nonexistent/GSE0_family.soft"));
        match result {
            Err(GeoSoftError::File { path, operation, .. }) => {
                assert_eq!(path, PathBuf::from("/nonexistent/GSE0_family.soft"));
                assert_eq!(operation, "stat");
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected an error"),
        }
    }

    #[test]
    fn test_gzip_writer_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.txt.gz");

        let mut writer = CompressedWriter::new(DataSink::from_path(&path)).unwrap();
        writer.write_all(b"A1\tNM_001\n").unwrap();
        writer.finish().unwrap();

        let reader = CompressedReader::new(DataSource::from_path(&path)).unwrap();
        assert_eq!(reader.encoding(), Encoding::Gzip);
        let lines: Vec<String> = reader.lines().collect::<io::Result<_>>().unwrap();
        assert_eq!(lines, vec!["A1\tNM_001"]);
    }
}
