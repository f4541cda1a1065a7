//! Genotype call tables (SNP arrays).
//!
//! Each probe's call is packed into two bit planes. The two-bit code is
//! `bit1 << 1 | bit2`, each bit read from its own plane:
//!
//! | call | bit1 | bit2 | code |
//! |---|---|---|---|
//! | no call | 0 | 0 | 0 |
//! | AA | 0 | 1 | 1 |
//! | AB | 1 | 0 | 2 |
//! | BB | 1 | 1 | 3 |
//!
//! A freshly allocated array therefore reads as "no call" everywhere.

use super::{field, ColumnNames, RowError, SampleFormat};

/// Genotype call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum GenotypeCall {
    /// No call
    #[default]
    NoCall,
    /// Homozygous A
    AA,
    /// Heterozygous
    AB,
    /// Homozygous B
    BB,
}

impl GenotypeCall {
    /// Parse a call token (case-insensitive)
    pub fn from_token(token: &str) -> Option<Self> {
        let token = token.trim();
        if token.eq_ignore_ascii_case("AA") {
            Some(Self::AA)
        } else if token.eq_ignore_ascii_case("AB") || token.eq_ignore_ascii_case("BA") {
            Some(Self::AB)
        } else if token.eq_ignore_ascii_case("BB") {
            Some(Self::BB)
        } else if ["NC", "NoCall", "No Call", "NN", "--"]
            .iter()
            .any(|nc| token.eq_ignore_ascii_case(nc))
        {
            Some(Self::NoCall)
        } else {
            None
        }
    }

    /// Two-bit code
    pub fn code(self) -> u8 {
        match self {
            Self::NoCall => 0b00,
            Self::AA => 0b01,
            Self::AB => 0b10,
            Self::BB => 0b11,
        }
    }

    /// Call from its two bits
    pub fn from_bits(bit1: bool, bit2: bool) -> Self {
        match (bit1, bit2) {
            (false, false) => Self::NoCall,
            (false, true) => Self::AA,
            (true, false) => Self::AB,
            (true, true) => Self::BB,
        }
    }

    fn bits(self) -> (bool, bool) {
        let code = self.code();
        (code & 0b10 != 0, code & 0b01 != 0)
    }
}

/// Two bit planes of genotype calls, addressed by probe index
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenotypeArray {
    bit1: Vec<bool>,
    bit2: Vec<bool>,
}

impl GenotypeArray {
    /// All no-call array for `probe_count` probes
    pub fn new(probe_count: usize) -> Self {
        Self {
            bit1: vec![false; probe_count],
            bit2: vec![false; probe_count],
        }
    }

    /// Store a call
    pub fn set(&mut self, probe_index: usize, call: GenotypeCall) {
        let (bit1, bit2) = call.bits();
        self.bit1[probe_index] = bit1;
        self.bit2[probe_index] = bit2;
    }

    /// Call at a probe index
    pub fn call(&self, probe_index: usize) -> GenotypeCall {
        GenotypeCall::from_bits(self.bit1[probe_index], self.bit2[probe_index])
    }

    /// Two-bit code at a probe index
    pub fn code(&self, probe_index: usize) -> u8 {
        self.call(probe_index).code()
    }

    /// Number of probes
    pub fn len(&self) -> usize {
        self.bit1.len()
    }

    /// Whether the array has no probes
    pub fn is_empty(&self) -> bool {
        self.bit1.is_empty()
    }
}

/// Column positions for a genotype table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenotypeLayout {
    /// Call column
    pub value: usize,
}

/// `ID_REF` + `VALUE` genotype calls
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenotypeFormat;

impl GenotypeFormat {
    /// Create the format
    pub fn new() -> Self {
        Self
    }
}

impl SampleFormat for GenotypeFormat {
    type Layout = GenotypeLayout;
    type Output = GenotypeArray;

    fn allocate(&self, probe_count: usize) -> GenotypeArray {
        GenotypeArray::new(probe_count)
    }

    fn resolve_columns(&self, columns: &ColumnNames) -> Option<GenotypeLayout> {
        columns.position("ID_REF")?;
        let value = columns.position("VALUE")?;
        Some(GenotypeLayout { value })
    }

    fn parse_row(
        &self,
        layout: &GenotypeLayout,
        fields: &[&str],
        probe_index: usize,
        output: &mut GenotypeArray,
    ) -> Result<(), RowError> {
        let token = field(fields, layout.value, "VALUE")?;
        let call = GenotypeCall::from_token(token).ok_or_else(|| RowError::InvalidValue {
            column: "VALUE",
            token: token.to_string(),
        })?;
        output.set(probe_index, call);
        Ok(())
    }
}
