//! Indexed platform model.
//!
//! A GEO platform (GPL) lists every probe on an array together with the external
//! (transcript) identifier it measures. [`Platform`] turns that table into the
//! addressing scheme used by every per-sample array: probe ids and external ids each
//! get a dense index from an [`IdentifierRegistry`], and each probe index points at
//! the index of its external id.
//!
//! # Example
//!
//! ```
//! use geosoft::platform::Platform;
//!
//! let mut platform = Platform::new("GPL570");
//! platform.register_probe("1007_s_at", Some("U48705"));
//! platform.register_probe("1053_at", Some("M87338"));
//! platform.register_probe("117_at", Some("U48705"));
//!
//! assert_eq!(platform.probe_count(), 3);
//! assert_eq!(
//!     platform.external_index_for_probe("1007_s_at"),
//!     platform.external_index_for_probe("117_at"),
//! );
//! ```

mod relationships;
mod snapshot;

pub use relationships::ProbeTranscriptTable;
pub use snapshot::{PlatformSnapshot, SNAPSHOT_VERSION};

use crate::registry::IdentifierRegistry;
use crate::soft::SectionProperties;
use tracing::warn;

/// Probe/external-id index built from a Platform section.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Platform {
    accession: String,
    external_id_type: Option<String>,
    columns: Vec<(String, String)>,
    properties: SectionProperties,
    probes: IdentifierRegistry,
    externals: IdentifierRegistry,
    /// External index per probe index
    probe_external: Vec<Option<usize>>,
}

impl Platform {
    /// Create an empty platform for the given accession (e.g. `GPL570`)
    pub fn new(accession: impl Into<String>) -> Self {
        Self {
            accession: accession.into(),
            ..Self::default()
        }
    }

    /// Register a probe and its external id.
    ///
    /// Known ids keep their indices. A probe keeps the first external id it was
    /// registered with; a later, different external id is ignored. Returns the
    /// probe index.
    pub fn register_probe(&mut self, probe_id: &str, external_id: Option<&str>) -> usize {
        let probe_index = self.probes.register(probe_id);
        if probe_index == self.probe_external.len() {
            self.probe_external.push(None);
        }

        if let Some(external_id) = external_id {
            let external_index = self.externals.register(external_id);
            match self.probe_external[probe_index] {
                None => self.probe_external[probe_index] = Some(external_index),
                Some(existing) if existing != external_index => {
                    warn!(
                        probe = probe_id,
                        kept = self.externals.id_at(existing).unwrap_or_default(),
                        ignored = external_id,
                        "probe already mapped to a different external id"
                    );
                }
                Some(_) => {}
            }
        }

        probe_index
    }

    /// Platform accession (the Platform section attribute)
    pub fn accession(&self) -> &str {
        &self.accession
    }

    /// Name of the external id type, from the `#ID` column line
    pub fn external_id_type(&self) -> Option<&str> {
        self.external_id_type.as_deref()
    }

    pub(crate) fn set_external_id_type(&mut self, name: Option<String>) {
        self.external_id_type = name;
    }

    /// Column descriptions (`#NAME = description`) in file order
    pub fn columns(&self) -> &[(String, String)] {
        &self.columns
    }

    pub(crate) fn push_column(&mut self, name: String, description: String) {
        self.columns.push((name, description));
    }

    /// Section properties (`!Platform_title`, ...)
    pub fn properties(&self) -> &SectionProperties {
        &self.properties
    }

    /// Replace the section properties
    pub fn set_properties(&mut self, properties: SectionProperties) {
        self.properties = properties;
    }

    /// Number of registered probes; the length of every per-sample array
    pub fn probe_count(&self) -> usize {
        self.probes.len()
    }

    /// Number of distinct external ids
    pub fn external_count(&self) -> usize {
        self.externals.len()
    }

    /// Index of a probe id
    pub fn probe_index(&self, probe_id: &str) -> Option<usize> {
        self.probes.index_of(probe_id)
    }

    /// Probe id at an index
    pub fn probe_id_at(&self, index: usize) -> Option<&str> {
        self.probes.id_at(index)
    }

    /// External id at an external index
    pub fn external_id_at(&self, index: usize) -> Option<&str> {
        self.externals.id_at(index)
    }

    /// Index of an external id
    pub fn external_index(&self, external_id: &str) -> Option<usize> {
        self.externals.index_of(external_id)
    }

    /// External index mapped from a probe id
    pub fn external_index_for_probe(&self, probe_id: &str) -> Option<usize> {
        self.probe_index(probe_id).and_then(|index| self.external_index_at(index))
    }

    /// External index mapped from a probe index
    pub fn external_index_at(&self, probe_index: usize) -> Option<usize> {
        self.probe_external.get(probe_index).copied().flatten()
    }

    /// Probe indices that map to an external index, in probe order
    pub fn probes_for_external(&self, external_index: usize) -> Vec<usize> {
        self.probe_external
            .iter()
            .enumerate()
            .filter(|(_, mapped)| **mapped == Some(external_index))
            .map(|(probe, _)| probe)
            .collect()
    }

    /// Probe registry
    pub fn probes(&self) -> &IdentifierRegistry {
        &self.probes
    }

    /// External id registry
    pub fn externals(&self) -> &IdentifierRegistry {
        &self.externals
    }
}
