//! Section cursor state.
//!
//! The parser's position is a plain value: which section it is in, which phase of
//! that section, and where the section started. Every transition consumes the old
//! cursor and returns the next one, so the legal moves are exactly the methods
//! below and can be tested without any input.

use crate::error::{GeoSoftError, Result};
use std::fmt;

/// Kind of a `^` section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKind {
    /// `^DATABASE`
    Database,
    /// `^SERIES`
    Series,
    /// `^PLATFORM`
    Platform,
    /// `^SAMPLE`
    Sample,
    /// Any other section name
    Other,
}

impl SectionKind {
    /// Classify a section name as written after `^` (case-insensitive)
    pub fn from_name(name: &str) -> Self {
        let name = name.trim();
        if name.eq_ignore_ascii_case("database") {
            Self::Database
        } else if name.eq_ignore_ascii_case("series") {
            Self::Series
        } else if name.eq_ignore_ascii_case("platform") {
            Self::Platform
        } else if name.eq_ignore_ascii_case("sample") {
            Self::Sample
        } else {
            Self::Other
        }
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Database => "DATABASE",
            Self::Series => "SERIES",
            Self::Platform => "PLATFORM",
            Self::Sample => "SAMPLE",
            Self::Other => "OTHER",
        };
        f.write_str(name)
    }
}

/// Position within a section
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    /// Scanning for a section
    #[default]
    Unknown,
    /// Positioned on a section delimiter line
    StartOfSection,
    /// Properties consumed; positioned at the section body
    AfterProperties,
}

/// Explicit parser state between calls
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionCursor {
    section: Option<SectionKind>,
    name: String,
    attribute: String,
    phase: Phase,
    start_line: usize,
    exhausted: bool,
}

impl SectionCursor {
    /// Cursor before any section has been found
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter a section whose delimiter line is `^<name> = <attribute>`
    pub fn enter(self, name: &str, attribute: &str, line: usize) -> Self {
        Self {
            section: Some(SectionKind::from_name(name)),
            name: name.trim().to_ascii_lowercase(),
            attribute: attribute.trim().to_string(),
            phase: Phase::StartOfSection,
            start_line: line,
            exhausted: false,
        }
    }

    /// Section properties have been read
    pub fn after_properties(self) -> Self {
        Self {
            phase: Phase::AfterProperties,
            ..self
        }
    }

    /// End of stream reached while scanning; no section is current
    pub fn exhaust(self) -> Self {
        Self {
            section: None,
            name: String::new(),
            attribute: String::new(),
            phase: Phase::Unknown,
            start_line: self.start_line,
            exhausted: true,
        }
    }

    /// Current section kind
    pub fn section(&self) -> Option<SectionKind> {
        self.section
    }

    /// Current section name, lowercased (the property prefix without `!` and `_`)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Text after `=` on the section delimiter line
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// Current phase
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Line number of the current section delimiter
    pub fn start_line(&self) -> usize {
        self.start_line
    }

    /// Whether the stream has been fully consumed
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Fail unless the cursor is inside a section of `kind`
    pub fn require_section(&self, kind: SectionKind, operation: &'static str) -> Result<()> {
        if self.section == Some(kind) {
            Ok(())
        } else {
            Err(GeoSoftError::CursorState {
                operation,
                expected: format!("{kind} section"),
                found: self.describe(),
            })
        }
    }

    /// Fail unless the cursor is in `phase`
    pub fn require_phase(&self, phase: Phase, operation: &'static str) -> Result<()> {
        if self.section.is_some() && self.phase == phase {
            Ok(())
        } else {
            Err(GeoSoftError::CursorState {
                operation,
                expected: format!("{phase:?}"),
                found: self.describe(),
            })
        }
    }

    fn describe(&self) -> String {
        match self.section {
            Some(kind) => format!("{kind} section ({:?}, line {})", self.phase, self.start_line),
            None if self.exhausted => "end of stream".to_string(),
            None => "no section".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_kind_from_name() {
        assert_eq!(SectionKind::from_name("SAMPLE"), SectionKind::Sample);
        assert_eq!(SectionKind::from_name("Platform "), SectionKind::Platform);
        assert_eq!(SectionKind::from_name("database"), SectionKind::Database);
        assert_eq!(SectionKind::from_name("SERIES"), SectionKind::Series);
        assert_eq!(SectionKind::from_name("ANNOTATION"), SectionKind::Other);
    }

    #[test]
    fn test_transitions() {
        let cursor = SectionCursor::new();
        assert_eq!(cursor.phase(), Phase::Unknown);
        assert!(cursor.require_section(SectionKind::Sample, "parse_sample_data").is_err());

        let cursor = cursor.enter("SAMPLE", " GSM1 ", 12);
        assert_eq!(cursor.section(), Some(SectionKind::Sample));
        assert_eq!(cursor.name(), "sample");
        assert_eq!(cursor.attribute(), "GSM1");
        assert_eq!(cursor.phase(), Phase::StartOfSection);
        assert_eq!(cursor.start_line(), 12);
        assert!(cursor.require_section(SectionKind::Sample, "parse_sample_data").is_ok());
        assert!(cursor.require_phase(Phase::StartOfSection, "section_attribute").is_ok());

        let cursor = cursor.after_properties();
        assert_eq!(cursor.phase(), Phase::AfterProperties);
        assert_eq!(cursor.section(), Some(SectionKind::Sample));
        assert!(cursor.require_phase(Phase::StartOfSection, "section_attribute").is_err());

        let cursor = cursor.exhaust();
        assert!(cursor.is_exhausted());
        assert_eq!(cursor.section(), None);
        assert_eq!(cursor.phase(), Phase::Unknown);
    }

    #[test]
    fn test_wrong_section_error_names_operation() {
        let cursor = SectionCursor::new().enter("PLATFORM", "GPL1", 3);
        match cursor.require_section(SectionKind::Sample, "parse_sample_data") {
            Err(GeoSoftError::CursorState { operation, expected, found }) => {
                assert_eq!(operation, "parse_sample_data");
                assert_eq!(expected, "SAMPLE section");
                assert!(found.starts_with("PLATFORM section"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
