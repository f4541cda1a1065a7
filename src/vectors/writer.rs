//! Vector store writer.

use super::{write_header, write_id, StorePaths, DATA_MAGIC, DIRECTORY_MAGIC};
use crate::error::{GeoSoftError, Result};
use crate::platform::Platform;
use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::Path;
use tracing::{debug, info, warn};

/// What a closed writer produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSummary {
    /// Files written
    pub paths: StorePaths,
    /// Number of samples appended
    pub samples: usize,
    /// Length of every vector
    pub vector_len: usize,
}

/// Appends fixed-length sample vectors to a store.
///
/// The directory file is written only by [`close`](Self::close). A writer that is
/// dropped without `close` flushes the data file and leaves no directory.
pub struct VectorStoreWriter {
    paths: StorePaths,
    data: BufWriter<File>,
    vector_len: usize,
    ids: Vec<String>,
    record: Vec<u8>,
    finished: bool,
}

impl VectorStoreWriter {
    /// Create (or truncate) the store at `base` for vectors of `vector_len` values.
    ///
    /// A directory file left by an earlier store at `base` is removed.
    pub fn create<P: AsRef<Path>>(base: P, vector_len: usize) -> Result<Self> {
        let paths = StorePaths::from_base(base);
        let header_len = u32::try_from(vector_len).map_err(|_| {
            GeoSoftError::Config(format!("vector length {vector_len} does not fit in u32"))
        })?;

        match fs::remove_file(&paths.directory) {
            Ok(()) => debug!(path = %paths.directory.display(), "removed stale store directory"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(GeoSoftError::file(&paths.directory, "remove", e)),
        }

        let file =
            File::create(&paths.data).map_err(|e| GeoSoftError::file(&paths.data, "create", e))?;
        let mut data = BufWriter::new(file);
        write_header(&mut data, DATA_MAGIC, header_len)
            .map_err(|e| GeoSoftError::file(&paths.data, "write", e))?;

        debug!(path = %paths.data.display(), vector_len, "created vector store");
        Ok(Self {
            paths,
            data,
            vector_len,
            ids: Vec::new(),
            record: Vec::with_capacity(vector_len * 4 + 64),
            finished: false,
        })
    }

    /// Create a store whose vectors are indexed by `platform`'s probes
    pub fn for_platform<P: AsRef<Path>>(base: P, platform: &Platform) -> Result<Self> {
        Self::create(base, platform.probe_count())
    }

    /// Append one sample. Ids need not be unique.
    pub fn append_sample(&mut self, vector: &[f32], id: &str) -> Result<()> {
        if vector.len() != self.vector_len {
            return Err(GeoSoftError::VectorLength {
                expected: self.vector_len,
                actual: vector.len(),
            });
        }

        self.record.clear();
        write_id(&mut self.record, id)?;
        for value in vector {
            self.record.extend_from_slice(&value.to_le_bytes());
        }
        self.data
            .write_all(&self.record)
            .map_err(|e| GeoSoftError::file(&self.paths.data, "write", e))?;

        self.ids.push(id.to_string());
        Ok(())
    }

    /// Number of samples appended so far
    pub fn samples_written(&self) -> usize {
        self.ids.len()
    }

    /// Vector length of this store
    pub fn vector_len(&self) -> usize {
        self.vector_len
    }

    /// Paths of the store files
    pub fn paths(&self) -> &StorePaths {
        &self.paths
    }

    /// Flush the data file and write the directory
    pub fn close(mut self) -> Result<StoreSummary> {
        self.finish()?;
        info!(
            path = %self.paths.data.display(),
            samples = self.ids.len(),
            vector_len = self.vector_len,
            "closed vector store"
        );
        Ok(StoreSummary {
            paths: self.paths.clone(),
            samples: self.ids.len(),
            vector_len: self.vector_len,
        })
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        self.data
            .flush()
            .map_err(|e| GeoSoftError::file(&self.paths.data, "flush", e))?;

        let directory = &self.paths.directory;
        let file =
            File::create(directory).map_err(|e| GeoSoftError::file(directory, "create", e))?;
        let mut writer = BufWriter::new(file);

        // vector_len was range-checked on create
        let count = u32::try_from(self.ids.len()).map_err(|_| {
            GeoSoftError::CorruptStore(format!("{} samples exceed u32", self.ids.len()))
        })?;
        write_header(&mut writer, DIRECTORY_MAGIC, self.vector_len as u32)
            .and_then(|_| writer.write_all(&count.to_le_bytes()))
            .map_err(|e| GeoSoftError::file(directory, "write", e))?;
        for id in &self.ids {
            write_id(&mut writer, id)?;
        }
        writer.flush().map_err(|e| GeoSoftError::file(directory, "flush", e))?;
        Ok(())
    }
}

impl Drop for VectorStoreWriter {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Err(e) = self.data.flush() {
            warn!(
                path = %self.paths.data.display(),
                error = %e,
                "failed to flush vector store on drop"
            );
        }
        warn!(
            path = %self.paths.data.display(),
            samples = self.ids.len(),
            "vector store dropped without close; directory not written"
        );
    }
}
