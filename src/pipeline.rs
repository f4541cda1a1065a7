//! SOFT family export: platform, then every sample, into a vector store.

use crate::config::{PlatformSource, RunConfig};
use crate::error::{GeoSoftError, Result};
use crate::io::DataSource;
use crate::platform::{Platform, ProbeTranscriptTable};
use crate::sample::{SampleAdapter, SampleReader};
use crate::soft::SoftParser;
use crate::vectors::{StoreSummary, VectorStoreWriter};
use std::io::BufRead;
use std::path::Path;
use tracing::{debug, info, warn};

/// Suffix of the negated companion vector written per sample
pub const NEGATIVE_SUFFIX: &str = "-neg";

/// Outcome of [`export_family`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    /// Platform accession the vectors are indexed by
    pub platform: String,
    /// Vector length
    pub probes: usize,
    /// Sample sections found
    pub samples_seen: usize,
    /// Samples exported
    pub samples_exported: usize,
    /// Samples whose table the configured format could not read
    pub samples_skipped: usize,
    /// Store files and record count (companions included)
    pub store: StoreSummary,
}

/// Export every sample of a SOFT family file to the vector store at `store_base`.
///
/// The platform comes from [`RunConfig::platform_source`] when set, otherwise from
/// the family file's own Platform section, which must then exist.
pub fn export_family<P: AsRef<Path>>(
    source: DataSource,
    config: &RunConfig,
    store_base: P,
) -> Result<ExportSummary> {
    let mut parser = SoftParser::open(source)?.with_row_policy(config.row_policy());

    let platform = match config.platform_source() {
        Some(PlatformSource::Snapshot(path)) => {
            Platform::read_snapshot(DataSource::from_path(path))?
        }
        Some(PlatformSource::Soft(path)) => {
            let mut platform_parser =
                SoftParser::from_path(path)?.with_row_policy(config.row_policy());
            read_platform(&mut platform_parser, config.relationships())?
        }
        None => read_platform(&mut parser, config.relationships())?,
    };

    let adapter = SampleAdapter::from_options(config.adapter());
    let negatives = config.adapter().negative_companions;
    let mut writer = VectorStoreWriter::for_platform(store_base, &platform)?;
    let mut negated = Vec::new();
    let mut samples_seen = 0usize;
    let mut samples_skipped = 0usize;

    while parser.skip_to_sample_section()? {
        samples_seen += 1;
        let accession = parser.section_attribute()?;
        let properties = parser.parse_section_properties()?;
        debug!(
            sample = %accession,
            title = properties.first("title").unwrap_or_default(),
            "exporting sample"
        );

        let mut sample = SampleReader::new(&platform, adapter);
        if !parser.parse_sample_data(&mut sample)? {
            samples_skipped += 1;
            continue;
        }

        let data = sample.into_data();
        let vector = data.as_vector();
        writer.append_sample(&vector, &accession)?;

        if negatives {
            negated.clear();
            negated.extend(vector.iter().map(|value| -value));
            writer.append_sample(&negated, &format!("{accession}{NEGATIVE_SUFFIX}"))?;
        }
    }

    let samples_exported = samples_seen - samples_skipped;
    if samples_skipped > 0 {
        warn!(
            skipped = samples_skipped,
            seen = samples_seen,
            "samples not readable with configured format"
        );
    }
    let store = writer.close()?;

    info!(
        platform = platform.accession(),
        probes = platform.probe_count(),
        samples = samples_exported,
        vectors = store.samples,
        "exported family"
    );
    Ok(ExportSummary {
        platform: platform.accession().to_string(),
        probes: platform.probe_count(),
        samples_seen,
        samples_exported,
        samples_skipped,
        store,
    })
}

fn read_platform<R: BufRead>(
    parser: &mut SoftParser<R>,
    relationships: Option<&ProbeTranscriptTable>,
) -> Result<Platform> {
    if !parser.skip_to_platform_section()? {
        return Err(GeoSoftError::MissingSection("PLATFORM".to_string()));
    }
    let properties = parser.parse_section_properties()?;
    let mut platform = parser.parse_platform_with(relationships)?;
    platform.set_properties(properties);
    Ok(platform)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::DataSink;
    use crate::vectors::VectorStoreReader;
    use std::fs;
    use tempfile::TempDir;

    const FAMILY: &str = "\
^DATABASE = GeoMiame
!Database_name = Gene Expression Omnibus (GEO)
^PLATFORM = GPL1
!Platform_title = Test array
#ID = GenBank
!platform_table_begin
A1\tNM_001
A2\tNM_002
!platform_table_end
^SAMPLE = GSM1
!Sample_title = first
!sample_table_begin
ID_REF\tVALUE\tABS_CALL
A1\t10.5\tP
A2\t0\tA
!sample_table_end
^SAMPLE = GSM2
!Sample_title = counts only
!sample_table_begin
TAG\tCOUNT
A1\t3
!sample_table_end
^SAMPLE = GSM3
!sample_table_begin
ID_REF\tVALUE
A2\t7.25
!sample_table_end
";

    fn write_family(dir: &TempDir, text: &str) -> DataSource {
        let path = dir.path().join("family.soft");
        fs::write(&path, text).unwrap();
        DataSource::from_path(path)
    }

    fn read_all(base: &Path) -> Vec<(String, Vec<f32>)> {
        let mut reader = VectorStoreReader::open(base).unwrap();
        let mut signal = reader.allocate_signal_array();
        let mut samples = Vec::new();
        while reader.remaining() > 0 {
            let id = reader.read_next_sample(&mut signal).unwrap().to_string();
            samples.push((id, signal.clone()));
        }
        samples
    }

    #[test]
    fn test_export_skips_unreadable_samples() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("store");
        let config = RunConfig::default();
        let summary = export_family(write_family(&dir, FAMILY), &config, &base).unwrap();

        assert_eq!(summary.platform, "GPL1");
        assert_eq!(summary.probes, 2);
        assert_eq!(summary.samples_seen, 3);
        assert_eq!(summary.samples_exported, 2);
        assert_eq!(summary.samples_skipped, 1);
        assert_eq!(
            read_all(&base),
            vec![("GSM1".to_string(), vec![10.5, 0.0]), ("GSM3".to_string(), vec![0.0, 7.25])]
        );
    }

    #[test]
    fn test_sample_without_table_is_skipped() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("store");
        let text = FAMILY.replace(
            "^SAMPLE = GSM1",
            "^SAMPLE = GSM0\n!Sample_title = metadata only\n^SAMPLE = GSM1",
        );
        let config = RunConfig::default();
        let summary = export_family(write_family(&dir, &text), &config, &base).unwrap();

        assert_eq!(summary.samples_seen, 4);
        assert_eq!(summary.samples_skipped, 2);
        let ids: Vec<String> = read_all(&base).into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["GSM1", "GSM3"]);
    }

    #[test]
    fn test_negative_companions() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("store");
        let config = RunConfig::builder().adapter_options("negatives").unwrap().build();
        let summary = export_family(write_family(&dir, FAMILY), &config, &base).unwrap();

        assert_eq!(summary.store.samples, 4);
        let samples = read_all(&base);
        assert_eq!(samples[1], ("GSM1-neg".to_string(), vec![-10.5, -0.0]));
        assert_eq!(samples[3].0, "GSM3-neg");
    }

    #[test]
    fn test_count_format() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("store");
        let config = RunConfig::builder().adapter_options("format=sage").unwrap().build();
        let summary = export_family(write_family(&dir, FAMILY), &config, &base).unwrap();

        assert_eq!(summary.samples_exported, 1);
        assert_eq!(read_all(&base), vec![("GSM2".to_string(), vec![3.0, 0.0])]);
    }

    #[test]
    fn test_missing_platform_is_fatal() {
        let dir = TempDir::new().unwrap();
        let text = FAMILY.replace("^PLATFORM = GPL1", "^SERIES = GSE1");
        let base = dir.path().join("store");
        let result = export_family(write_family(&dir, &text), &RunConfig::default(), base);
        assert!(matches!(
            result,
            Err(GeoSoftError::MissingSection(section)) if section == "PLATFORM"
        ));
    }

    #[test]
    fn test_platform_from_snapshot() {
        let dir = TempDir::new().unwrap();
        let mut platform = Platform::new("GPL1");
        // Reversed probe order changes the vector layout
        platform.register_probe("A2", Some("NM_002"));
        platform.register_probe("A1", Some("NM_001"));
        let snapshot = dir.path().join("GPL1.json");
        platform.write_snapshot(DataSink::from_path(&snapshot)).unwrap();

        let text = FAMILY.replace("^PLATFORM = GPL1", "^SERIES = GSE1");
        let config = RunConfig::builder()
            .platform_source(PlatformSource::from_path(&snapshot))
            .build();
        let base = dir.path().join("store");
        export_family(write_family(&dir, &text), &config, &base).unwrap();

        assert_eq!(read_all(&base)[0], ("GSM1".to_string(), vec![0.0, 10.5]));
    }
}
