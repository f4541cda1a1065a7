//! Integer count tables (SAGE tags, MPSS signatures).

use super::{field, ColumnNames, RowError, SampleFormat};

/// Column positions for a count table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountLayout {
    /// Count column
    pub value: usize,
}

/// Count format with configurable id/count column names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountFormat {
    id_column: &'static str,
    count_column: &'static str,
}

impl CountFormat {
    /// SAGE libraries: `TAG` + `COUNT`
    pub fn sage() -> Self {
        Self {
            id_column: "TAG",
            count_column: "COUNT",
        }
    }

    /// MPSS libraries: `ID_REF` + `VALUE`
    pub fn mpss() -> Self {
        Self {
            id_column: "ID_REF",
            count_column: "VALUE",
        }
    }

    /// Name of the id column
    pub fn id_column(&self) -> &'static str {
        self.id_column
    }

    /// Name of the count column
    pub fn count_column(&self) -> &'static str {
        self.count_column
    }
}

/// Integer tokens as-is; non-negative decimals rounded to the nearest count
fn parse_count(token: &str) -> Option<u32> {
    if let Ok(count) = token.parse::<u32>() {
        return Some(count);
    }
    let value: f64 = token.parse().ok()?;
    let in_range = value.is_finite() && value >= 0.0 && value <= f64::from(u32::MAX);
    in_range.then(|| value.round() as u32)
}

impl SampleFormat for CountFormat {
    type Layout = CountLayout;
    type Output = Vec<u32>;

    fn allocate(&self, probe_count: usize) -> Vec<u32> {
        vec![0; probe_count]
    }

    fn resolve_columns(&self, columns: &ColumnNames) -> Option<CountLayout> {
        columns.position(self.id_column)?;
        let value = columns.position(self.count_column)?;
        Some(CountLayout { value })
    }

    fn parse_row(
        &self,
        layout: &CountLayout,
        fields: &[&str],
        probe_index: usize,
        output: &mut Vec<u32>,
    ) -> Result<(), RowError> {
        let token = field(fields, layout.value, self.count_column)?;
        output[probe_index] = parse_count(token).ok_or_else(|| RowError::InvalidValue {
            column: self.count_column,
            token: token.to_string(),
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("17"), Some(17));
        assert_eq!(parse_count("3.6"), Some(4));
        assert_eq!(parse_count("-1"), None);
        assert_eq!(parse_count("inf"), None);
        assert_eq!(parse_count("many"), None);
    }

    #[test]
    fn test_sage_and_mpss_columns() {
        let sage = CountFormat::sage();
        assert_eq!(
            sage.resolve_columns(&ColumnNames::parse("TAG\tCOUNT")),
            Some(CountLayout { value: 1 })
        );
        assert_eq!(sage.resolve_columns(&ColumnNames::parse("ID_REF\tVALUE")), None);

        let mpss = CountFormat::mpss();
        assert_eq!(
            mpss.resolve_columns(&ColumnNames::parse("ID_REF\tVALUE")),
            Some(CountLayout { value: 1 })
        );
    }

    #[test]
    fn test_parse_row_writes_count() {
        let format = CountFormat::sage();
        let mut output = format.allocate(2);
        format.parse_row(&CountLayout { value: 1 }, &["AAAAAAAAAA", "12"], 1, &mut output).unwrap();
        assert_eq!(output, vec![0, 12]);

        let error = format
            .parse_row(&CountLayout { value: 1 }, &["AAAAAAAAAA", "x"], 0, &mut output)
            .unwrap_err();
        assert_eq!(
            error,
            RowError::InvalidValue {
                column: "COUNT",
                token: "x".to_string()
            }
        );
    }
}
