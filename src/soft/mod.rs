//! SOFT family file parsing.
//!
//! SOFT ("Simple Omnibus Format in Text") family files hold one `^DATABASE`
//! section, usually one `^SERIES`, one `^PLATFORM` and many `^SAMPLE` sections:
//!
//! ```text
//! ^PLATFORM = GPL96
//! !Platform_title = [HG-U133A] Affymetrix Human Genome U133A Array
//! #ID = Affymetrix probe set ID
//! #GB_ACC = GenBank accession
//! !platform_table_begin
//! ID	GB_ACC
//! 1007_s_at	U48705
//! !platform_table_end
//! ^SAMPLE = GSM1001
//! !Sample_title = liver, replicate 1
//! #ID_REF =
//! #VALUE = MAS5 signal
//! !sample_table_begin
//! ID_REF	VALUE	ABS_CALL
//! 1007_s_at	2201.3	P
//! !sample_table_end
//! ```
//!
//! [`SoftParser`] walks such a file forward-only, one line at a time, so files of
//! several gigabytes are processed with memory bounded by one line plus the
//! platform index and one sample array.

mod cursor;
mod parser;
mod properties;

pub use cursor::{Phase, SectionCursor, SectionKind};
pub use parser::SoftParser;
pub use properties::SectionProperties;

/// Section delimiter line prefix
pub const SECTION_MARKER: char = '^';
/// Property line prefix
pub const PROPERTY_MARKER: char = '!';
/// Column description line prefix
pub const COLUMN_MARKER: char = '#';
/// Start of a platform table
pub const PLATFORM_TABLE_BEGIN: &str = "!platform_table_begin";
/// End of a platform table
pub const PLATFORM_TABLE_END: &str = "!platform_table_end";
/// Start of a sample table
pub const SAMPLE_TABLE_BEGIN: &str = "!sample_table_begin";
/// End of a sample table
pub const SAMPLE_TABLE_END: &str = "!sample_table_end";

/// Case-insensitive ASCII prefix test
pub(crate) fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    text.len() >= prefix.len()
        && text.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

/// Whether `line` is the given marker line, ignoring case and surrounding blanks
pub(crate) fn is_marker(line: &str, marker: &str) -> bool {
    line.trim().eq_ignore_ascii_case(marker)
}

/// Split `key = value` on the first `=`, trimming both sides; a line without `=`
/// is all key
pub(crate) fn split_assignment(text: &str) -> (&str, &str) {
    match text.split_once('=') {
        Some((key, value)) => (key.trim(), value.trim()),
        None => (text.trim(), ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_with_ignore_case() {
        assert!(starts_with_ignore_case("SAMPLE = GSM1", "sample"));
        assert!(starts_with_ignore_case("Platform", "PLAT"));
        assert!(!starts_with_ignore_case("SERIES", "SERIESX"));
        assert!(!starts_with_ignore_case("", "a"));
    }

    #[test]
    fn test_is_marker() {
        assert!(is_marker("!Sample_Table_Begin \r", SAMPLE_TABLE_BEGIN));
        assert!(!is_marker("!sample_table_begins", SAMPLE_TABLE_BEGIN));
    }

    #[test]
    fn test_split_assignment() {
        assert_eq!(split_assignment(" title = a = b "), ("title", "a = b"));
        assert_eq!(split_assignment("flag"), ("flag", ""));
    }
}
