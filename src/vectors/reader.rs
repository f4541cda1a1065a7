//! Vector store reader.

use super::{
    read_header, read_id, read_u32, read_u32_or_eof, truncated, StorePaths, DATA_MAGIC,
    DIRECTORY_MAGIC, HEADER_LEN,
};
use crate::error::{GeoSoftError, Result};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;
use tracing::{debug, warn};

/// Sequential reader over a vector store.
///
/// The sample ids are known up front from the directory file; vectors are then read
/// strictly in append order with [`read_next_sample`](Self::read_next_sample).
pub struct VectorStoreReader {
    paths: StorePaths,
    data: BufReader<File>,
    vector_len: usize,
    ids: Vec<String>,
    position: usize,
    record: Vec<u8>,
    id_buffer: Vec<u8>,
}

impl VectorStoreReader {
    /// Open the store at `base`.
    ///
    /// The directory file is read if present; otherwise the sample ids are
    /// recovered by scanning the data file once.
    pub fn open<P: AsRef<Path>>(base: P) -> Result<Self> {
        let paths = StorePaths::from_base(base);
        let mut data = open_file(&paths.data)?;
        let vector_len = read_header(&mut data, DATA_MAGIC)?;

        let ids = match File::open(&paths.directory) {
            Ok(file) => read_directory(BufReader::new(file), vector_len)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(
                    path = %paths.directory.display(),
                    "directory file missing, scanning data file"
                );
                scan_data(open_file(&paths.data)?, vector_len)?
            }
            Err(e) => return Err(GeoSoftError::file(&paths.directory, "open", e)),
        };

        // One record's values must fit in the data file
        let data_len = data
            .get_ref()
            .metadata()
            .map_err(|e| GeoSoftError::file(&paths.data, "stat", e))?
            .len();
        let values_len = (vector_len as u64).saturating_mul(4);
        if !ids.is_empty() && values_len > data_len.saturating_sub(HEADER_LEN) {
            return Err(GeoSoftError::CorruptStore(format!(
                "vector length {vector_len} does not fit in a data file of {data_len} bytes"
            )));
        }

        debug!(
            path = %paths.data.display(),
            samples = ids.len(),
            vector_len,
            "opened vector store"
        );
        Ok(Self {
            paths,
            data,
            vector_len,
            ids,
            position: 0,
            record: Vec::new(),
            id_buffer: Vec::new(),
        })
    }

    /// Sample ids in store order
    pub fn sample_ids(&self) -> &[String] {
        &self.ids
    }

    /// Number of values per vector
    pub fn vector_len(&self) -> usize {
        self.vector_len
    }

    /// Samples not yet read
    pub fn remaining(&self) -> usize {
        self.ids.len() - self.position
    }

    /// Zeroed buffer sized for [`read_next_sample`](Self::read_next_sample)
    pub fn allocate_signal_array(&self) -> Vec<f32> {
        vec![0.0; self.vector_len]
    }

    /// Paths of the store files
    pub fn paths(&self) -> &StorePaths {
        &self.paths
    }

    /// Read the next vector into `signal` and return its sample id
    pub fn read_next_sample(&mut self, signal: &mut [f32]) -> Result<&str> {
        if self.position >= self.ids.len() {
            return Err(GeoSoftError::StoreExhausted { count: self.ids.len() });
        }
        if signal.len() != self.vector_len {
            return Err(GeoSoftError::VectorLength {
                expected: self.vector_len,
                actual: signal.len(),
            });
        }

        let id_len = read_u32(&mut self.data)?;
        let id = read_id(&mut self.data, id_len, &mut self.id_buffer)?;
        let expected = &self.ids[self.position];
        if &id != expected {
            return Err(GeoSoftError::CorruptStore(format!(
                "record {} is '{id}' but the directory lists '{expected}'",
                self.position
            )));
        }

        self.record.resize(self.vector_len * 4, 0);
        self.data.read_exact(&mut self.record).map_err(truncated)?;
        for (value, bytes) in signal.iter_mut().zip(self.record.chunks_exact(4)) {
            *value = f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        }

        self.position += 1;
        Ok(&self.ids[self.position - 1])
    }

    /// Release the store files
    pub fn close(self) {
        if self.remaining() > 0 {
            debug!(
                path = %self.paths.data.display(),
                unread = self.remaining(),
                "closed vector store early"
            );
        }
    }
}

fn open_file(path: &Path) -> Result<BufReader<File>> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|e| GeoSoftError::file(path, "open", e))
}

fn read_directory<R: Read>(mut reader: R, vector_len: usize) -> Result<Vec<String>> {
    let directory_len = read_header(&mut reader, DIRECTORY_MAGIC)?;
    if directory_len != vector_len {
        return Err(GeoSoftError::CorruptStore(format!(
            "directory vector length {directory_len} does not match data file {vector_len}"
        )));
    }

    let count = read_u32(&mut reader)? as usize;
    let mut ids = Vec::with_capacity(count.min(1 << 16));
    let mut buffer = Vec::new();
    for _ in 0..count {
        let len = read_u32(&mut reader)?;
        ids.push(read_id(&mut reader, len, &mut buffer)?);
    }
    Ok(ids)
}

/// Recover the sample ids by walking every record of the data file
fn scan_data<R: Read>(mut reader: R, vector_len: usize) -> Result<Vec<String>> {
    read_header(&mut reader, DATA_MAGIC)?;

    let record_len = (vector_len * 4) as u64;
    let mut ids = Vec::new();
    let mut buffer = Vec::new();
    while let Some(len) = read_u32_or_eof(&mut reader)? {
        ids.push(read_id(&mut reader, len, &mut buffer)?);
        let skipped = io::copy(&mut (&mut reader).take(record_len), &mut io::sink())?;
        if skipped != record_len {
            return Err(GeoSoftError::CorruptStore(format!(
                "record {} is truncated ({skipped} of {record_len} bytes)",
                ids.len() - 1
            )));
        }
    }
    Ok(ids)
}
