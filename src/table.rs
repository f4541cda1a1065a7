//! Generic tab-delimited side-table parsing.
//!
//! Side tables (such as precomputed probe/transcript relationships) are plain
//! tab-delimited files with `#` comments. The [`TabDelimitedRecord`] trait defines
//! how one line becomes a record, and [`TabDelimitedParser`] streams records with
//! constant memory.
//!
//! ```
//! use geosoft::table::{TabDelimitedParser, TabDelimitedRecord};
//! use geosoft::Result;
//!
//! #[derive(Debug, PartialEq)]
//! struct Pair {
//!     left: String,
//!     right: String,
//! }
//!
//! impl TabDelimitedRecord for Pair {
//!     fn from_line(line: &str, line_number: usize) -> Result<Self> {
//!         let mut fields = line.split('\t');
//!         match (fields.next(), fields.next()) {
//!             (Some(left), Some(right)) => Ok(Pair {
//!                 left: left.to_string(),
//!                 right: right.to_string(),
//!             }),
//!             _ => Err(geosoft::GeoSoftError::Row {
//!                 line: line_number,
//!                 msg: "expected two fields".to_string(),
//!             }),
//!         }
//!     }
//!
//!     fn to_line(&self) -> String {
//!         format!("{}\t{}", self.left, self.right)
//!     }
//! }
//!
//! let data = "# probe\ttranscript\nA1\tNM_001\n";
//! let parser = TabDelimitedParser::<_, Pair>::new(data.as_bytes());
//! let records: Vec<_> = parser.collect::<Result<_>>().unwrap();
//! assert_eq!(records[0].right, "NM_001");
//! ```

use crate::error::Result;
use std::io::BufRead;
use std::marker::PhantomData;

/// Types that can be parsed from a tab-delimited line.
pub trait TabDelimitedRecord: Sized {
    /// Parse a record from a line without its trailing newline.
    ///
    /// `line_number` is 1-based and is meant for error reporting.
    fn from_line(line: &str, line_number: usize) -> Result<Self>;

    /// Serialize this record to a line without a trailing newline.
    fn to_line(&self) -> String;
}

/// Streaming parser for tab-delimited side tables.
///
/// Skips empty lines and lines starting with `#`.
pub struct TabDelimitedParser<R: BufRead, T: TabDelimitedRecord> {
    reader: R,
    line_buf: String,
    line_number: usize,
    _phantom: PhantomData<T>,
}

impl<R: BufRead, T: TabDelimitedRecord> TabDelimitedParser<R, T> {
    /// Creates a new parser from a buffered reader.
    pub fn new(reader: R) -> Self {
        TabDelimitedParser {
            reader,
            line_buf: String::with_capacity(256),
            line_number: 0,
            _phantom: PhantomData,
        }
    }

    /// Returns the current line number (1-based).
    pub fn line_number(&self) -> usize {
        self.line_number
    }
}

impl<R: BufRead, T: TabDelimitedRecord> Iterator for TabDelimitedParser<R, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.line_buf.clear();

            match self.reader.read_line(&mut self.line_buf) {
                Ok(0) => return None,
                Ok(_) => {
                    self.line_number += 1;
                    let line = self.line_buf.trim_end_matches(['\n', '\r']);

                    if line.trim().is_empty() || line.starts_with('#') {
                        continue;
                    }

                    return Some(T::from_line(line, self.line_number));
                }
                Err(e) => return Some(Err(e.into())),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GeoSoftError;

    #[derive(Debug, PartialEq)]
    struct Row {
        id: String,
        value: u32,
    }

    impl TabDelimitedRecord for Row {
        fn from_line(line: &str, line_number: usize) -> Result<Self> {
            let fields: Vec<_> = line.split('\t').collect();
            if fields.len() < 2 {
                return Err(GeoSoftError::Row {
                    line: line_number,
                    msg: format!("expected 2 fields, got {}", fields.len()),
                });
            }
            Ok(Row {
                id: fields[0].to_string(),
                value: fields[1].parse().map_err(|e| GeoSoftError::Row {
                    line: line_number,
                    msg: format!("{}", e),
                })?,
            })
        }

        fn to_line(&self) -> String {
            format!("{}\t{}", self.id, self.value)
        }
    }

    #[test]
    fn test_parse_skips_comments_and_blank_lines() {
        let data = "# header\n\nA\t1\r\n# mid\nB\t2\n";
        let parser = TabDelimitedParser::<_, Row>::new(data.as_bytes());
        let rows: Vec<_> = parser.collect::<Result<_>>().unwrap();
        assert_eq!(rows, vec![Row { id: "A".into(), value: 1 }, Row { id: "B".into(), value: 2 }]);
    }

    #[test]
    fn test_error_reports_line_number() {
        let data = "A\t1\nB\n";
        let mut parser = TabDelimitedParser::<_, Row>::new(data.as_bytes());
        assert!(parser.next().unwrap().is_ok());
        match parser.next().unwrap() {
            Err(GeoSoftError::Row { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(parser.line_number(), 2);
    }

    #[test]
    fn test_to_line_round_trip() {
        let row = Row { id: "X".into(), value: 9 };
        assert_eq!(Row::from_line(&row.to_line(), 1).unwrap(), row);
    }
}
