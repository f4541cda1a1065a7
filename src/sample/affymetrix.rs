//! Signal + presence tables (Affymetrix MAS5-style and detection-call tables).
//!
//! `VALUE` holds the probe's signal. The presence bit comes from a call column
//! when one exists (`ABS_CALL` or `DETECTION`): `P` and `M` are present, `A` is
//! absent, and numeric detection p-values are present below
//! [`DETECTION_P_THRESHOLD`]. Without a call column, or when a call token is
//! unrecognized, a probe is present when its signal is above the presence
//! threshold.

use super::{field, ColumnNames, RowError, SampleFormat};
use crate::config::DEFAULT_PRESENCE_THRESHOLD;

/// Detection p-values below this count as present
pub const DETECTION_P_THRESHOLD: f32 = 0.05;

/// Signal and presence bits, addressed by probe index
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalArray {
    /// Signal per probe
    pub signal: Vec<f32>,
    /// Presence call per probe
    pub present: Vec<bool>,
}

impl SignalArray {
    /// All-zero, all-absent array for `probe_count` probes
    pub fn new(probe_count: usize) -> Self {
        Self {
            signal: vec![0.0; probe_count],
            present: vec![false; probe_count],
        }
    }

    /// Number of probes
    pub fn len(&self) -> usize {
        self.signal.len()
    }

    /// Whether the array has no probes
    pub fn is_empty(&self) -> bool {
        self.signal.is_empty()
    }

    /// Number of probes called present
    pub fn present_count(&self) -> usize {
        self.present.iter().filter(|p| **p).count()
    }
}

/// Column positions for a signal table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AffymetrixLayout {
    /// `VALUE` column
    pub value: usize,
    /// Call column, if any
    pub call: Option<usize>,
}

/// Signal + presence format
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffymetrixFormat {
    presence_threshold: f32,
    require_detection: bool,
}

impl Default for AffymetrixFormat {
    fn default() -> Self {
        Self::new()
    }
}

impl AffymetrixFormat {
    /// `ID_REF` + `VALUE`, with an optional call column
    pub fn new() -> Self {
        Self {
            presence_threshold: DEFAULT_PRESENCE_THRESHOLD,
            require_detection: false,
        }
    }

    /// `ID_REF` + `VALUE` + `DETECTION`, all required
    pub fn detection_required() -> Self {
        Self {
            require_detection: true,
            ..Self::new()
        }
    }

    /// Threshold used when there is no usable call
    pub fn with_presence_threshold(self, presence_threshold: f32) -> Self {
        Self {
            presence_threshold,
            ..self
        }
    }

    /// Threshold used when there is no usable call
    pub fn presence_threshold(&self) -> f32 {
        self.presence_threshold
    }
}

/// Interpret a call token; `None` when unrecognized
fn parse_call(token: &str) -> Option<bool> {
    match token {
        t if t.eq_ignore_ascii_case("P") || t.eq_ignore_ascii_case("M") => Some(true),
        t if t.eq_ignore_ascii_case("A") => Some(false),
        t => t.parse::<f32>().ok().filter(|p| p.is_finite()).map(|p| p < DETECTION_P_THRESHOLD),
    }
}

impl SampleFormat for AffymetrixFormat {
    type Layout = AffymetrixLayout;
    type Output = SignalArray;

    fn allocate(&self, probe_count: usize) -> SignalArray {
        SignalArray::new(probe_count)
    }

    fn resolve_columns(&self, columns: &ColumnNames) -> Option<AffymetrixLayout> {
        columns.position("ID_REF")?;
        let value = columns.position("VALUE")?;
        let call = if self.require_detection {
            Some(columns.position("DETECTION")?)
        } else {
            columns.position_any(&["ABS_CALL", "DETECTION"])
        };
        Some(AffymetrixLayout { value, call })
    }

    fn parse_row(
        &self,
        layout: &AffymetrixLayout,
        fields: &[&str],
        probe_index: usize,
        output: &mut SignalArray,
    ) -> Result<(), RowError> {
        let token = field(fields, layout.value, "VALUE")?;
        let signal: f32 = token.parse().map_err(|_| RowError::InvalidValue {
            column: "VALUE",
            token: token.to_string(),
        })?;

        let call = layout
            .call
            .and_then(|position| fields.get(position))
            .and_then(|token| parse_call(token.trim()));
        let present = call.unwrap_or(signal > self.presence_threshold);

        output.signal[probe_index] = signal;
        output.present[probe_index] = present;
        Ok(())
    }
}
