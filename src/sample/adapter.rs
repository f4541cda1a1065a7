//! Configuration-selected sample format.

use super::{
    AffymetrixFormat, AffymetrixLayout, ColumnNames, CountFormat, CountLayout, GenotypeArray,
    GenotypeFormat, GenotypeLayout, RowError, SampleFormat, SignalArray,
};
use crate::config::{AdapterOptions, FormatKind};
use std::borrow::Cow;

/// The closed set of sample formats, chosen once per run
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SampleAdapter {
    /// Signal + presence
    Affymetrix(AffymetrixFormat),
    /// SAGE / MPSS counts
    Counts(CountFormat),
    /// Genotype calls
    Genotype(GenotypeFormat),
}

/// Layout of whichever format is active
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterLayout {
    /// Signal + presence
    Affymetrix(AffymetrixLayout),
    /// Counts
    Counts(CountLayout),
    /// Genotype calls
    Genotype(GenotypeLayout),
}

/// Output of whichever format is active
#[derive(Debug, Clone, PartialEq)]
pub enum SampleData {
    /// Signal + presence
    Signal(SignalArray),
    /// Counts
    Counts(Vec<u32>),
    /// Genotype calls
    Genotypes(GenotypeArray),
}

impl SampleData {
    /// Numeric vector for the vector store: signal, counts, or two-bit genotype codes
    pub fn as_vector(&self) -> Cow<'_, [f32]> {
        match self {
            SampleData::Signal(array) => Cow::Borrowed(&array.signal),
            SampleData::Counts(counts) => Cow::Owned(counts.iter().map(|c| *c as f32).collect()),
            SampleData::Genotypes(array) => {
                Cow::Owned((0..array.len()).map(|i| f32::from(array.code(i))).collect())
            }
        }
    }

    /// Number of probes
    pub fn len(&self) -> usize {
        match self {
            SampleData::Signal(array) => array.len(),
            SampleData::Counts(counts) => counts.len(),
            SampleData::Genotypes(array) => array.len(),
        }
    }

    /// Whether the array has no probes
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SampleAdapter {
    /// Select the format named by the adapter options
    pub fn from_options(options: &AdapterOptions) -> Self {
        match options.format {
            FormatKind::Affymetrix => SampleAdapter::Affymetrix(
                AffymetrixFormat::new().with_presence_threshold(options.presence_threshold),
            ),
            FormatKind::Detection => SampleAdapter::Affymetrix(
                AffymetrixFormat::detection_required()
                    .with_presence_threshold(options.presence_threshold),
            ),
            FormatKind::Sage => SampleAdapter::Counts(CountFormat::sage()),
            FormatKind::Mpss => SampleAdapter::Counts(CountFormat::mpss()),
            FormatKind::Genotype => SampleAdapter::Genotype(GenotypeFormat::new()),
        }
    }
}

impl SampleFormat for SampleAdapter {
    type Layout = AdapterLayout;
    type Output = SampleData;

    fn allocate(&self, probe_count: usize) -> SampleData {
        match self {
            SampleAdapter::Affymetrix(format) => SampleData::Signal(format.allocate(probe_count)),
            SampleAdapter::Counts(format) => SampleData::Counts(format.allocate(probe_count)),
            SampleAdapter::Genotype(format) => SampleData::Genotypes(format.allocate(probe_count)),
        }
    }

    fn resolve_columns(&self, columns: &ColumnNames) -> Option<AdapterLayout> {
        match self {
            SampleAdapter::Affymetrix(format) => {
                format.resolve_columns(columns).map(AdapterLayout::Affymetrix)
            }
            SampleAdapter::Counts(format) => {
                format.resolve_columns(columns).map(AdapterLayout::Counts)
            }
            SampleAdapter::Genotype(format) => {
                format.resolve_columns(columns).map(AdapterLayout::Genotype)
            }
        }
    }

    fn parse_row(
        &self,
        layout: &AdapterLayout,
        fields: &[&str],
        probe_index: usize,
        output: &mut SampleData,
    ) -> Result<(), RowError> {
        match (self, layout, output) {
            (
                SampleAdapter::Affymetrix(format),
                AdapterLayout::Affymetrix(layout),
                SampleData::Signal(output),
            ) => format.parse_row(layout, fields, probe_index, output),
            (
                SampleAdapter::Counts(format),
                AdapterLayout::Counts(layout),
                SampleData::Counts(output),
            ) => format.parse_row(layout, fields, probe_index, output),
            (
                SampleAdapter::Genotype(format),
                AdapterLayout::Genotype(layout),
                SampleData::Genotypes(output),
            ) => format.parse_row(layout, fields, probe_index, output),
            // Layout and output are always created by the same adapter
            _ => Err(RowError::ColumnsUnresolved),
        }
    }
}
