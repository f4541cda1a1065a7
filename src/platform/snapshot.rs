//! Versioned platform snapshots.
//!
//! Batch tools process many series against one platform; re-parsing a GPL table
//! each time is wasted work. A [`PlatformSnapshot`] flattens a [`Platform`] into
//! ordered identifier lists plus `(probe, external)` index pairs, and restoring it
//! rebuilds exactly the same indices.
//!
//! Snapshots are stored as JSON; a `.gz` sink compresses them.
//!
//! ```no_run
//! use geosoft::io::{DataSink, DataSource};
//! use geosoft::platform::Platform;
//!
//! # fn main() -> geosoft::Result<()> {
//! let mut platform = Platform::new("GPL570");
//! platform.register_probe("1007_s_at", Some("U48705"));
//! platform.write_snapshot(DataSink::from_path("GPL570.json.gz"))?;
//!
//! let restored = Platform::read_snapshot(DataSource::from_path("GPL570.json.gz"))?;
//! assert_eq!(restored.probe_count(), 1);
//! # Ok(())
//! # }
//! ```

use super::Platform;
use crate::error::{GeoSoftError, Result};
use crate::io::{CompressedReader, CompressedWriter, DataSink, DataSource};
use crate::soft::SectionProperties;
use serde::{Deserialize, Serialize};
use std::io::Write;
use tracing::debug;

/// Current snapshot schema version
pub const SNAPSHOT_VERSION: u32 = 1;

/// Serializable form of a [`Platform`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformSnapshot {
    /// Schema version, checked on restore
    pub version: u32,
    /// Platform accession
    pub accession: String,
    /// External id type name
    pub external_id_type: Option<String>,
    /// Column descriptions in file order
    pub columns: Vec<(String, String)>,
    /// Section properties in file order
    pub properties: Vec<(String, Vec<String>)>,
    /// Probe ids in index order
    pub probe_ids: Vec<String>,
    /// External ids in index order
    pub external_ids: Vec<String>,
    /// `(probe index, external index)` pairs
    pub edges: Vec<(u32, u32)>,
}

impl Platform {
    /// Flatten the platform into a snapshot
    pub fn snapshot(&self) -> PlatformSnapshot {
        let edges = self
            .probe_external
            .iter()
            .enumerate()
            .filter_map(|(probe, external)| {
                external.map(|external| (probe as u32, external as u32))
            })
            .collect();

        PlatformSnapshot {
            version: SNAPSHOT_VERSION,
            accession: self.accession.clone(),
            external_id_type: self.external_id_type.clone(),
            columns: self.columns.clone(),
            properties: self
                .properties
                .iter()
                .map(|(key, values)| (key.to_string(), values.to_vec()))
                .collect(),
            probe_ids: self.probes.iter().map(str::to_string).collect(),
            external_ids: self.externals.iter().map(str::to_string).collect(),
            edges,
        }
    }

    /// Rebuild a platform from a snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`GeoSoftError::Snapshot`] for an unknown version, duplicate ids,
    /// or edges that point outside the id lists.
    pub fn restore(snapshot: PlatformSnapshot) -> Result<Self> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(GeoSoftError::Snapshot(format!(
                "unsupported version {} (expected {})",
                snapshot.version, SNAPSHOT_VERSION
            )));
        }

        let mut platform = Platform::new(snapshot.accession);
        platform.external_id_type = snapshot.external_id_type;
        platform.columns = snapshot.columns;
        let mut properties = SectionProperties::new();
        for (key, values) in snapshot.properties {
            for value in values {
                properties.push(&key, value);
            }
        }
        platform.properties = properties;

        for id in &snapshot.probe_ids {
            platform.probes.register(id);
        }
        for id in &snapshot.external_ids {
            platform.externals.register(id);
        }
        if platform.probes.len() != snapshot.probe_ids.len() {
            return Err(GeoSoftError::Snapshot("duplicate probe ids".to_string()));
        }
        if platform.externals.len() != snapshot.external_ids.len() {
            return Err(GeoSoftError::Snapshot("duplicate external ids".to_string()));
        }

        platform.probe_external = vec![None; platform.probes.len()];
        for (probe, external) in snapshot.edges {
            let (probe, external) = (probe as usize, external as usize);
            if probe >= platform.probes.len() || external >= platform.externals.len() {
                return Err(GeoSoftError::Snapshot(format!(
                    "edge ({probe}, {external}) out of range"
                )));
            }
            if platform.probe_external[probe].replace(external).is_some() {
                return Err(GeoSoftError::Snapshot(format!(
                    "probe {probe} mapped more than once"
                )));
            }
        }

        Ok(platform)
    }

    /// Write the platform snapshot as JSON
    pub fn write_snapshot(&self, sink: DataSink) -> Result<()> {
        let mut writer = CompressedWriter::new(sink)?;
        serde_json::to_writer(&mut writer, &self.snapshot())?;
        writer.write_all(b"\n")?;
        writer.finish()?;
        debug!(accession = %self.accession, probes = self.probe_count(), "wrote platform snapshot");
        Ok(())
    }

    /// Read a platform back from a JSON snapshot
    pub fn read_snapshot(source: DataSource) -> Result<Self> {
        let reader = CompressedReader::new(source)?;
        let snapshot: PlatformSnapshot = serde_json::from_reader(reader)?;
        Self::restore(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn platform() -> Platform {
        let mut platform = Platform::new("GPL96");
        platform.set_external_id_type(Some("GenBank".to_string()));
        platform.push_column("ID".to_string(), "GenBank".to_string());
        let mut properties = SectionProperties::new();
        properties.push("title", "HG-U133A".to_string());
        properties.push("organism", "Homo sapiens".to_string());
        platform.set_properties(properties);
        platform.register_probe("p1", Some("e1"));
        platform.register_probe("p2", None);
        platform.register_probe("p3", Some("e1"));
        platform.register_probe("p4", Some("e2"));
        platform
    }

    #[test]
    fn test_restore_rebuilds_identical_platform() {
        let original = platform();
        let restored = Platform::restore(original.snapshot()).unwrap();
        assert_eq!(restored, original);
    }

    #[test]
    fn test_snapshot_edges_skip_unmapped_probes() {
        let snapshot = platform().snapshot();
        assert_eq!(snapshot.edges, vec![(0, 0), (2, 0), (3, 1)]);
        assert_eq!(snapshot.probe_ids, vec!["p1", "p2", "p3", "p4"]);
    }

    #[test]
    fn test_rejects_unknown_version() {
        let mut snapshot = platform().snapshot();
        snapshot.version = 99;
        assert!(matches!(Platform::restore(snapshot), Err(GeoSoftError::Snapshot(_))));
    }

    #[test]
    fn test_rejects_out_of_range_edge() {
        let mut snapshot = platform().snapshot();
        snapshot.edges.push((1, 17));
        assert!(matches!(Platform::restore(snapshot), Err(GeoSoftError::Snapshot(_))));
    }

    #[test]
    fn test_rejects_duplicate_edge() {
        let mut snapshot = platform().snapshot();
        snapshot.edges.push((0, 1));
        assert!(matches!(Platform::restore(snapshot), Err(GeoSoftError::Snapshot(_))));
    }

    #[test]
    fn test_file_roundtrip_compressed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("GPL96.json.gz");
        let original = platform();

        original.write_snapshot(DataSink::from_path(&path)).unwrap();
        let restored = Platform::read_snapshot(DataSource::from_path(&path)).unwrap();
        assert_eq!(restored, original);
    }
}
