//! Forward-only SOFT section/table parser.

use super::{
    is_marker, split_assignment, starts_with_ignore_case, Phase, SectionCursor, SectionKind,
    SectionProperties, COLUMN_MARKER, PLATFORM_TABLE_BEGIN, PLATFORM_TABLE_END, PROPERTY_MARKER,
    SAMPLE_TABLE_BEGIN, SAMPLE_TABLE_END, SECTION_MARKER,
};
use crate::config::RowPolicy;
use crate::error::{GeoSoftError, Result};
use crate::io::{CompressedReader, DataSource};
use crate::platform::{Platform, ProbeTranscriptTable};
use crate::sample::{RowOutcome, SampleFormat, SampleReader};
use std::io::BufRead;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Streaming SOFT family parser.
///
/// The parser keeps exactly one line of look-ahead. Navigation calls
/// ([`skip_to_section`](Self::skip_to_section) and friends) report a missing
/// section as `Ok(false)`; table calls made from the wrong section fail with
/// [`GeoSoftError::CursorState`].
///
/// Lines are decoded as UTF-8; invalid bytes (Latin-1 author names are common in
/// older submissions) become U+FFFD instead of failing the parse.
///
/// # Example
///
/// ```no_run
/// use geosoft::sample::{AffymetrixFormat, SampleReader};
/// use geosoft::soft::SoftParser;
///
/// # fn main() -> geosoft::Result<()> {
/// let mut parser = SoftParser::from_path("GSE2034_family.soft.gz")?;
///
/// if !parser.skip_to_platform_section()? {
///     return Err(geosoft::GeoSoftError::MissingSection("PLATFORM".to_string()));
/// }
/// let platform = parser.parse_platform()?;
///
/// while parser.skip_to_sample_section()? {
///     let accession = parser.section_attribute()?;
///     let properties = parser.parse_section_properties()?;
///
///     let mut sample = SampleReader::new(&platform, AffymetrixFormat::new());
///     if parser.parse_sample_data(&mut sample)? {
///         let data = sample.into_data();
///         let title = properties.first("title");
///         println!("{accession} {title:?}: {} present", data.present_count());
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub struct SoftParser<R: BufRead> {
    reader: R,
    /// Source file, for error context
    path: Option<PathBuf>,
    raw: Vec<u8>,
    line: String,
    /// `line` is a pushed-back line that the next fetch returns again
    held: bool,
    /// The held line is the delimiter of the section the cursor is in
    header_held: bool,
    line_number: usize,
    cursor: SectionCursor,
    row_policy: RowPolicy,
}

impl SoftParser<CompressedReader> {
    /// Open a SOFT file from a data source (gzip is decoded transparently)
    pub fn open(source: DataSource) -> Result<Self> {
        let path = source.path().to_path_buf();
        let mut parser = Self::new(CompressedReader::new(source)?);
        parser.path = Some(path);
        Ok(parser)
    }

    /// Open a SOFT file from a path
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open(DataSource::from_path(path))
    }
}

impl<R: BufRead> SoftParser<R> {
    /// Create a parser over a buffered reader
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            path: None,
            raw: Vec::with_capacity(1024),
            line: String::with_capacity(1024),
            held: false,
            header_held: false,
            line_number: 0,
            cursor: SectionCursor::new(),
            row_policy: RowPolicy::default(),
        }
    }

    /// Set how malformed table rows are handled
    pub fn with_row_policy(mut self, row_policy: RowPolicy) -> Self {
        self.row_policy = row_policy;
        self
    }

    /// Current cursor state
    pub fn cursor(&self) -> &SectionCursor {
        &self.cursor
    }

    /// Number of lines read so far (1-based number of the current line)
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Make the next line current. Returns `false` at end of stream.
    fn fetch(&mut self) -> Result<bool> {
        self.header_held = false;
        if self.held {
            self.held = false;
            return Ok(true);
        }

        self.raw.clear();
        let read = self.reader.read_until(b'\n', &mut self.raw).map_err(|e| match &self.path {
            Some(path) => GeoSoftError::file(path, "read", e),
            None => GeoSoftError::Io(e),
        })?;
        if read == 0 {
            return Ok(false);
        }

        self.line.clear();
        match std::str::from_utf8(&self.raw) {
            Ok(text) => self.line.push_str(text),
            Err(_) => self.line.push_str(&String::from_utf8_lossy(&self.raw)),
        }
        let trimmed = self.line.trim_end_matches(['\n', '\r']).len();
        self.line.truncate(trimmed);
        self.line_number += 1;
        Ok(true)
    }

    /// Push the current line back so the next fetch returns it
    fn hold(&mut self) {
        self.held = true;
    }

    /// Drop the current section's delimiter line if it is still pending
    fn consume_header(&mut self) {
        if self.header_held {
            self.held = false;
            self.header_held = false;
        }
    }

    /// Scan forward to the next section whose name starts with `name`
    /// (case-insensitive).
    ///
    /// On success the cursor is at the start of that section. When the stream ends
    /// first, returns `false` and every later navigation call also returns `false`.
    pub fn skip_to_section(&mut self, name: &str) -> Result<bool> {
        if self.cursor.is_exhausted() {
            return Ok(false);
        }
        self.consume_header();

        while self.fetch()? {
            let Some(header) = self.line.strip_prefix(SECTION_MARKER) else {
                continue;
            };
            if !starts_with_ignore_case(header, name) {
                continue;
            }

            let (section_name, attribute) = split_assignment(header);
            debug!(section = section_name, attribute, line = self.line_number, "entered section");
            self.cursor =
                std::mem::take(&mut self.cursor).enter(section_name, attribute, self.line_number);
            self.hold();
            self.header_held = true;
            return Ok(true);
        }

        debug!(
            section = name,
            lines = self.line_number,
            "end of stream while scanning for section"
        );
        self.cursor = std::mem::take(&mut self.cursor).exhaust();
        Ok(false)
    }

    /// Skip to the next `^DATABASE` section
    pub fn skip_to_database_section(&mut self) -> Result<bool> {
        self.skip_to_section("DATABASE")
    }

    /// Skip to the next `^SERIES` section
    pub fn skip_to_series_section(&mut self) -> Result<bool> {
        self.skip_to_section("SERIES")
    }

    /// Skip to the next `^PLATFORM` section
    pub fn skip_to_platform_section(&mut self) -> Result<bool> {
        self.skip_to_section("PLATFORM")
    }

    /// Skip to the next `^SAMPLE` section
    pub fn skip_to_sample_section(&mut self) -> Result<bool> {
        self.skip_to_section("SAMPLE")
    }

    /// Text after `=` on the current section's delimiter line, trimmed.
    ///
    /// Only valid right after entering a section; consumes the delimiter line.
    pub fn section_attribute(&mut self) -> Result<String> {
        self.cursor.require_phase(Phase::StartOfSection, "section_attribute")?;
        self.consume_header();
        Ok(self.cursor.attribute().to_string())
    }

    /// Read the `!<section>_key = value` lines that follow a section delimiter.
    ///
    /// Stops at the first line that is not a property of this section; that line
    /// stays current for the next call.
    pub fn parse_section_properties(&mut self) -> Result<SectionProperties> {
        self.cursor.require_phase(Phase::StartOfSection, "parse_section_properties")?;
        self.consume_header();

        let prefix = format!("{PROPERTY_MARKER}{}_", self.cursor.name());
        let mut properties = SectionProperties::new();

        while self.fetch()? {
            if !starts_with_ignore_case(&self.line, &prefix) {
                self.hold();
                break;
            }
            let (key, value) = split_assignment(&self.line[prefix.len()..]);
            if key.eq_ignore_ascii_case("table_begin") || key.eq_ignore_ascii_case("table_end") {
                self.hold();
                break;
            }
            properties.push(key, value.to_string());
        }

        self.cursor = std::mem::take(&mut self.cursor).after_properties();
        Ok(properties)
    }

    /// Build the indexed platform from the current Platform section's table
    pub fn parse_platform(&mut self) -> Result<Platform> {
        self.parse_platform_with(None)
    }

    /// Build the indexed platform, taking external ids from `relationships` where
    /// it lists a probe and from the second table column otherwise.
    pub fn parse_platform_with(
        &mut self,
        relationships: Option<&ProbeTranscriptTable>,
    ) -> Result<Platform> {
        self.cursor.require_section(SectionKind::Platform, "parse_platform")?;
        self.consume_header();

        let mut platform = Platform::new(self.cursor.attribute());

        // Column descriptions up to the table
        loop {
            if !self.fetch()? {
                return Err(self.missing_marker(PLATFORM_TABLE_BEGIN));
            }
            if self.line.starts_with(SECTION_MARKER) {
                self.hold();
                return Err(self.missing_marker(PLATFORM_TABLE_BEGIN));
            }
            if is_marker(&self.line, PLATFORM_TABLE_BEGIN) {
                break;
            }
            if let Some(column) = self.line.strip_prefix(COLUMN_MARKER) {
                let (name, description) = split_assignment(column);
                if name.eq_ignore_ascii_case("ID")
                    && platform.external_id_type().is_none()
                    && !description.is_empty()
                {
                    platform.set_external_id_type(Some(description.to_string()));
                }
                platform.push_column(name.to_string(), description.to_string());
            }
        }

        let header_name = platform
            .columns()
            .first()
            .map(|(name, _)| name.clone())
            .unwrap_or_else(|| "ID".to_string());
        let mut first_row = true;
        let mut skipped = 0usize;

        loop {
            if !self.fetch()? {
                warn!(platform = platform.accession(), "platform table not terminated");
                break;
            }
            if is_marker(&self.line, PLATFORM_TABLE_END) {
                break;
            }
            if self.line.starts_with(SECTION_MARKER) {
                warn!(
                    platform = platform.accession(),
                    line = self.line_number,
                    "platform table not terminated"
                );
                self.hold();
                break;
            }

            let mut fields = self.line.split('\t');
            let probe = fields.next().unwrap_or_default().trim();
            let external = fields.next().map(str::trim);

            if std::mem::take(&mut first_row) && probe.eq_ignore_ascii_case(&header_name) {
                continue;
            }

            let Some(external) = external.filter(|_| !probe.is_empty()) else {
                if self.row_policy == RowPolicy::Strict {
                    return Err(GeoSoftError::Row {
                        line: self.line_number,
                        msg: "platform row needs probe<TAB>external id".to_string(),
                    });
                }
                skipped += 1;
                continue;
            };

            let external = relationships
                .and_then(|table| table.transcript_for(probe))
                .or_else(|| Some(external).filter(|e| !e.is_empty()));
            platform.register_probe(probe, external);
        }

        self.cursor = std::mem::take(&mut self.cursor).after_properties();
        info!(
            platform = platform.accession(),
            probes = platform.probe_count(),
            external_ids = platform.external_count(),
            skipped,
            "parsed platform table"
        );
        Ok(platform)
    }

    /// Feed the current Sample section's table to `sample`.
    ///
    /// Returns `Ok(false)` when the section has no table (the next section or the
    /// end of stream comes first) or when the format cannot parse the table's
    /// column header; the remaining lines are left for the next section scan.
    /// Otherwise every row up to `!sample_table_end` is parsed and `Ok(true)` is
    /// returned.
    pub fn parse_sample_data<F: SampleFormat>(
        &mut self,
        sample: &mut SampleReader<'_, F>,
    ) -> Result<bool> {
        self.cursor.require_section(SectionKind::Sample, "parse_sample_data")?;
        self.consume_header();

        loop {
            if !self.fetch()? {
                debug!(sample = self.cursor.attribute(), "sample section has no table");
                return Ok(false);
            }
            if self.line.starts_with(SECTION_MARKER) {
                debug!(
                    sample = self.cursor.attribute(),
                    line = self.line_number,
                    "sample section has no table"
                );
                self.hold();
                return Ok(false);
            }
            if is_marker(&self.line, SAMPLE_TABLE_BEGIN) {
                break;
            }
        }

        if !self.fetch()? {
            warn!(sample = self.cursor.attribute(), "sample table has no column header");
            return Ok(false);
        }
        if is_marker(&self.line, SAMPLE_TABLE_END) || self.line.starts_with(SECTION_MARKER) {
            warn!(
                sample = self.cursor.attribute(),
                line = self.line_number,
                "sample table has no column header"
            );
            self.hold();
            return Ok(false);
        }
        sample.set_column_names(&self.line);
        if !sample.can_parse() {
            warn!(
                sample = self.cursor.attribute(),
                columns = %self.line,
                "sample columns not supported by format"
            );
            return Ok(false);
        }

        loop {
            if !self.fetch()? {
                warn!(sample = self.cursor.attribute(), "sample table not terminated");
                break;
            }
            if is_marker(&self.line, SAMPLE_TABLE_END) {
                break;
            }
            if self.line.starts_with(SECTION_MARKER) {
                warn!(
                    sample = self.cursor.attribute(),
                    line = self.line_number,
                    "sample table not terminated"
                );
                self.hold();
                break;
            }

            if let RowOutcome::Malformed(error) = sample.parse(&self.line) {
                if self.row_policy == RowPolicy::Strict {
                    return Err(GeoSoftError::Row {
                        line: self.line_number,
                        msg: error.to_string(),
                    });
                }
            }
        }

        let stats = sample.stats();
        if stats.malformed > 0 || stats.unknown_probes > 0 {
            warn!(
                sample = self.cursor.attribute(),
                malformed = stats.malformed,
                unknown_probes = stats.unknown_probes,
                "skipped sample rows"
            );
        }
        debug!(
            sample = self.cursor.attribute(),
            rows = stats.rows,
            written = stats.written,
            "parsed sample table"
        );
        self.cursor = std::mem::take(&mut self.cursor).after_properties();
        Ok(true)
    }

    fn missing_marker(&self, marker: &str) -> GeoSoftError {
        GeoSoftError::MissingMarker {
            marker: marker.to_string(),
            section: self.cursor.section().map(|kind| kind.to_string()).unwrap_or_default(),
            line: self.line_number,
        }
    }
}
