//! Precomputed probe -> transcript relationship tables.
//!
//! Platform tables often carry stale or missing GenBank accessions. When a curated
//! mapping exists it can replace the second platform column: the table is a
//! tab-delimited `probe<TAB>transcript` file (gzip allowed, `#` comments skipped).

use crate::error::{GeoSoftError, Result};
use crate::io::{CompressedReader, CompressedWriter, DataSink, DataSource};
use crate::table::{TabDelimitedParser, TabDelimitedRecord};
use std::collections::HashMap;
use std::io::Write;
use tracing::info;

/// One `probe -> transcript` row
#[derive(Debug, Clone, PartialEq, Eq)]
struct RelationshipRow {
    probe: String,
    transcript: String,
}

impl TabDelimitedRecord for RelationshipRow {
    fn from_line(line: &str, line_number: usize) -> Result<Self> {
        let mut fields = line.split('\t');
        match (fields.next(), fields.next()) {
            (Some(probe), Some(transcript)) if !probe.is_empty() && !transcript.is_empty() => {
                Ok(Self {
                    probe: probe.to_string(),
                    transcript: transcript.trim().to_string(),
                })
            }
            _ => Err(GeoSoftError::Row {
                line: line_number,
                msg: "expected probe<TAB>transcript".to_string(),
            }),
        }
    }

    fn to_line(&self) -> String {
        format!("{}\t{}", self.probe, self.transcript)
    }
}

/// Probe id -> transcript id lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeTranscriptTable {
    transcripts: HashMap<String, String>,
}

impl ProbeTranscriptTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a table from a tab-delimited source.
    ///
    /// A probe listed twice keeps its first transcript.
    pub fn load(source: DataSource) -> Result<Self> {
        let reader = CompressedReader::new(source)?;
        let mut table = Self::new();
        for row in TabDelimitedParser::<_, RelationshipRow>::new(reader) {
            let row = row?;
            table.transcripts.entry(row.probe).or_insert(row.transcript);
        }
        info!(probes = table.len(), "loaded probe/transcript table");
        Ok(table)
    }

    /// Write the table as tab-delimited text, sorted by probe id
    pub fn write(&self, sink: DataSink) -> Result<()> {
        let mut rows: Vec<RelationshipRow> = self
            .transcripts
            .iter()
            .map(|(probe, transcript)| RelationshipRow {
                probe: probe.clone(),
                transcript: transcript.clone(),
            })
            .collect();
        rows.sort_by(|a, b| a.probe.cmp(&b.probe));

        let mut writer = CompressedWriter::new(sink)?;
        for row in &rows {
            writeln!(writer, "{}", row.to_line())?;
        }
        writer.finish()?;
        Ok(())
    }

    /// Add a relationship, replacing any previous transcript for the probe
    pub fn insert(&mut self, probe: impl Into<String>, transcript: impl Into<String>) {
        self.transcripts.insert(probe.into(), transcript.into());
    }

    /// Transcript for a probe
    pub fn transcript_for(&self, probe: &str) -> Option<&str> {
        self.transcripts.get(probe).map(String::as_str)
    }

    /// Number of probes in the table
    pub fn len(&self) -> usize {
        self.transcripts.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.transcripts.is_empty()
    }
}
