//! Per-sample table extraction.
//!
//! A Sample section's data table starts with a column header followed by one row
//! per probe. How a row turns into stored values depends on the instrument:
//!
//! - [`AffymetrixFormat`]: float signal plus a presence bit
//! - [`CountFormat`]: SAGE tag counts or MPSS signature counts
//! - [`GenotypeFormat`]: two-bit genotype calls
//!
//! Each format implements [`SampleFormat`]: it resolves the columns it needs from
//! the header into a layout value and writes one row at a time into an output
//! array addressed by probe index. [`SampleReader`] drives a format for one sample
//! against one [`Platform`]: it owns the output, resolves probe ids, and keeps
//! [`SampleParseStats`].
//!
//! [`SampleAdapter`] is the closed set of formats selected from configuration.
//!
//! # Example
//!
//! ```
//! use geosoft::platform::Platform;
//! use geosoft::sample::{AffymetrixFormat, RowOutcome, SampleReader};
//!
//! let mut platform = Platform::new("GPL1");
//! platform.register_probe("A1", Some("NM_001"));
//! platform.register_probe("A2", Some("NM_002"));
//!
//! let mut sample = SampleReader::new(&platform, AffymetrixFormat::new());
//! sample.set_column_names("ID_REF\tVALUE\tABS_CALL");
//! assert!(sample.can_parse());
//!
//! assert_eq!(sample.parse("A2\t812.5\tP"), RowOutcome::Written);
//! assert_eq!(sample.parse("Z9\t1.0\tA"), RowOutcome::UnknownProbe);
//!
//! let data = sample.into_data();
//! assert_eq!(data.signal, vec![0.0, 812.5]);
//! assert_eq!(data.present, vec![false, true]);
//! ```

mod adapter;
mod affymetrix;
mod counts;
mod genotype;

pub use adapter::{AdapterLayout, SampleAdapter, SampleData};
pub use affymetrix::{AffymetrixFormat, AffymetrixLayout, SignalArray, DETECTION_P_THRESHOLD};
pub use counts::{CountFormat, CountLayout};
pub use genotype::{GenotypeArray, GenotypeCall, GenotypeFormat, GenotypeLayout};

use crate::platform::Platform;
use thiserror::Error;

/// Why a single row could not be stored
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowError {
    /// Row is shorter than the column it needs
    #[error("missing {column} field (row has {found} fields)")]
    MissingField {
        /// Column that was needed
        column: &'static str,
        /// Number of fields in the row
        found: usize,
    },

    /// Field could not be converted
    #[error("invalid {column} value '{token}'")]
    InvalidValue {
        /// Column the token came from
        column: &'static str,
        /// Offending token
        token: String,
    },

    /// `parse` called before the header resolved to a usable layout
    #[error("column layout not resolved")]
    ColumnsUnresolved,
}

/// Result of feeding one data row to a [`SampleReader`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    /// Value(s) stored at the probe's index
    Written,
    /// First token is not a probe of the platform; nothing stored
    UnknownProbe,
    /// Empty line; nothing stored
    Blank,
    /// Row did not have the expected shape; nothing stored
    Malformed(RowError),
}

/// Per-sample row counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SampleParseStats {
    /// Rows fed to `parse`
    pub rows: usize,
    /// Rows whose values were stored
    pub written: usize,
    /// Rows naming probes the platform does not know
    pub unknown_probes: usize,
    /// Rows that were malformed
    pub malformed: usize,
}

/// Ordered column names from a sample table header
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnNames {
    names: Vec<String>,
}

impl ColumnNames {
    /// Parse a header line
    pub fn parse(header: &str) -> Self {
        Self {
            names: split_row(header).into_iter().map(|name| name.trim().to_string()).collect(),
        }
    }

    /// Position of a column (case-insensitive)
    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|column| column.eq_ignore_ascii_case(name))
    }

    /// Position of the first of `names` that is present
    pub fn position_any(&self, names: &[&str]) -> Option<usize> {
        names.iter().find_map(|name| self.position(name))
    }

    /// Column names in order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the header had no columns
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Split a table row into fields.
///
/// Tab-delimited rows keep empty cells in place; rows without tabs are split on
/// runs of whitespace.
pub fn split_row(line: &str) -> Vec<&str> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.contains('\t') {
        line.split('\t').collect()
    } else {
        line.split_whitespace().collect()
    }
}

/// A sample table format.
pub trait SampleFormat {
    /// Column positions resolved from a header
    type Layout;
    /// Per-sample array filled by [`parse_row`](SampleFormat::parse_row)
    type Output;

    /// Allocate a default-initialized output for `probe_count` probes
    fn allocate(&self, probe_count: usize) -> Self::Output;

    /// Resolve the columns this format needs; `None` when it cannot read the table
    fn resolve_columns(&self, columns: &ColumnNames) -> Option<Self::Layout>;

    /// Store the values of one row at `probe_index`
    fn parse_row(
        &self,
        layout: &Self::Layout,
        fields: &[&str],
        probe_index: usize,
        output: &mut Self::Output,
    ) -> Result<(), RowError>;
}

/// Fetch a field by position or report it missing
pub(crate) fn field<'a>(
    fields: &[&'a str],
    position: usize,
    column: &'static str,
) -> Result<&'a str, RowError> {
    fields
        .get(position)
        .map(|token| token.trim())
        .ok_or(RowError::MissingField {
            column,
            found: fields.len(),
        })
}

/// Drives one [`SampleFormat`] over one sample table.
pub struct SampleReader<'p, F: SampleFormat> {
    platform: &'p Platform,
    format: F,
    columns: Option<ColumnNames>,
    layout: Option<F::Layout>,
    data: F::Output,
    stats: SampleParseStats,
}

impl<'p, F: SampleFormat> SampleReader<'p, F> {
    /// Create a reader with an output sized to the platform's probe count
    pub fn new(platform: &'p Platform, format: F) -> Self {
        let data = format.allocate(platform.probe_count());
        Self {
            platform,
            format,
            columns: None,
            layout: None,
            data,
            stats: SampleParseStats::default(),
        }
    }

    /// Record the table's column header and resolve the format's layout
    pub fn set_column_names(&mut self, header: &str) {
        let columns = ColumnNames::parse(header);
        self.layout = self.format.resolve_columns(&columns);
        self.columns = Some(columns);
    }

    /// Whether the recorded columns can be read by this format
    pub fn can_parse(&self) -> bool {
        self.layout.is_some()
    }

    /// Parse one data row.
    ///
    /// The first field is the probe id; only rows for probes known to the platform
    /// are stored.
    pub fn parse(&mut self, line: &str) -> RowOutcome {
        let fields = split_row(line);
        if fields.iter().all(|field| field.trim().is_empty()) {
            return RowOutcome::Blank;
        }
        self.stats.rows += 1;

        let Some(layout) = self.layout.as_ref() else {
            self.stats.malformed += 1;
            return RowOutcome::Malformed(RowError::ColumnsUnresolved);
        };

        let Some(probe_index) = self.platform.probe_index(fields[0].trim()) else {
            self.stats.unknown_probes += 1;
            return RowOutcome::UnknownProbe;
        };

        match self.format.parse_row(layout, &fields, probe_index, &mut self.data) {
            Ok(()) => {
                self.stats.written += 1;
                RowOutcome::Written
            }
            Err(error) => {
                self.stats.malformed += 1;
                RowOutcome::Malformed(error)
            }
        }
    }

    /// Platform this sample is addressed by
    pub fn platform(&self) -> &'p Platform {
        self.platform
    }

    /// Format driving this reader
    pub fn format(&self) -> &F {
        &self.format
    }

    /// Columns recorded by [`set_column_names`](Self::set_column_names)
    pub fn columns(&self) -> Option<&ColumnNames> {
        self.columns.as_ref()
    }

    /// Row counters so far
    pub fn stats(&self) -> SampleParseStats {
        self.stats
    }

    /// Output filled so far
    pub fn data(&self) -> &F::Output {
        &self.data
    }

    /// Take the filled output
    pub fn into_data(self) -> F::Output {
        self.data
    }
}
