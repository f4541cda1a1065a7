//! Integration tests for the export pipeline and the vector store
//!
//! These tests run complete family → platform → samples → store exports and read
//! the stores back.

use flate2::write::GzEncoder;
use flate2::Compression;
use geosoft::platform::ProbeTranscriptTable;
use geosoft::vectors::{StorePaths, VectorStoreReader, VectorStoreWriter};
use geosoft::{export_family, DataSink, DataSource, GeoSoftError, Platform, RunConfig};
use std::fs::File;
use std::io::Write;
use std::sync::Once;
use tempfile::TempDir;

static TRACING: Once = Once::new();

fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

const FAMILY: &str = "\
^DATABASE = GeoMiame
!Database_name = Gene Expression Omnibus (GEO)
^SERIES = GSE100
!Series_title = Liver time course
!Series_sample_id = GSM101
!Series_sample_id = GSM102
^PLATFORM = GPL100
!Platform_title = Test array
#ID = Affymetrix probe set ID
#GB_ACC = GenBank accession
!platform_table_begin
ID\tGB_ACC
1007_s_at\tU48705
1053_at\tM87338
117_at\tX51757
!platform_table_end
^SAMPLE = GSM101
!Sample_title = liver 0h
!sample_table_begin
ID_REF\tVALUE\tABS_CALL
1007_s_at\t2201.3\tP
1053_at\t148.5\tA
117_at\t95.2\tM
!sample_table_end
^SAMPLE = GSM102
!Sample_title = liver 6h
!sample_table_begin
ID_REF\tVALUE\tABS_CALL
117_at\t80.0\tP
1007_s_at\t1999.9\tP
1053_at\tnull\tA
!sample_table_end
";

fn write_gzip_family(dir: &TempDir) -> DataSource {
    let path = dir.path().join("GSE100_family.soft.gz");
    let mut encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
    encoder.write_all(FAMILY.as_bytes()).unwrap();
    encoder.finish().unwrap();
    DataSource::from_path(path)
}

fn read_store(base: &std::path::Path) -> Vec<(String, Vec<f32>)> {
    let mut reader = VectorStoreReader::open(base).unwrap();
    let mut signal = reader.allocate_signal_array();
    let mut samples = Vec::new();
    while reader.remaining() > 0 {
        let id = reader.read_next_sample(&mut signal).unwrap().to_string();
        samples.push((id, signal.clone()));
    }
    reader.close();
    samples
}

/// Gzipped family with default configuration
#[test]
fn test_export_gzip_family() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("GSE100");

    let summary = export_family(write_gzip_family(&dir), &RunConfig::default(), &base).unwrap();
    assert_eq!(summary.platform, "GPL100");
    assert_eq!(summary.probes, 3);
    assert_eq!(summary.samples_exported, 2);
    assert_eq!(summary.store.paths, StorePaths::from_base(&base));

    let samples = read_store(&base);
    assert_eq!(samples.len(), 2);
    assert_eq!(samples[0], ("GSM101".to_string(), vec![2201.3, 148.5, 95.2]));
    // The malformed `null` row is skipped, not fatal
    assert_eq!(samples[1], ("GSM102".to_string(), vec![1999.9, 0.0, 80.0]));
}

/// Strict row policy turns the malformed row into an error
#[test]
fn test_export_strict_rejects_malformed_rows() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let config = RunConfig::builder().adapter_options("strict").unwrap().build();

    let result = export_family(write_gzip_family(&dir), &config, dir.path().join("strict"));
    assert!(matches!(result, Err(GeoSoftError::Row { .. })));
}

/// JSON configuration with a relative platform snapshot and relationship table
#[test]
fn test_export_with_json_config() {
    init_tracing();
    let dir = TempDir::new().unwrap();

    // Snapshot from a first pass over the family's own platform
    let mut parser = geosoft::SoftParser::open(write_gzip_family(&dir)).unwrap();
    assert!(parser.skip_to_platform_section().unwrap());
    let platform = parser.parse_platform().unwrap();
    platform
        .write_snapshot(DataSink::from_path(dir.path().join("GPL100.json.gz")))
        .unwrap();

    let mut relationships = ProbeTranscriptTable::new();
    relationships.insert("1007_s_at", "NM_001");
    relationships.write(DataSink::from_path(dir.path().join("probes.tsv"))).unwrap();

    let config_path = dir.path().join("run.json");
    std::fs::write(
        &config_path,
        r#"{
            "platform": "GPL100.json.gz",
            "relationships": "probes.tsv",
            "adapter": "format=affymetrix; negatives"
        }"#,
    )
    .unwrap();
    let config = RunConfig::from_json_path(&config_path).unwrap();
    assert_eq!(config.relationships().and_then(|t| t.transcript_for("1007_s_at")), Some("NM_001"));

    let base = dir.path().join("with_config");
    let summary = export_family(write_gzip_family(&dir), &config, &base).unwrap();
    assert_eq!(summary.store.samples, 4);

    let ids: Vec<String> = read_store(&base).into_iter().map(|(id, _)| id).collect();
    assert_eq!(ids, vec!["GSM101", "GSM101-neg", "GSM102", "GSM102-neg"]);
}

/// Unknown configuration keys are rejected
#[test]
fn test_config_rejects_unknown_keys() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("bad.json");
    std::fs::write(&config_path, r#"{ "adapter": "", "colour": "blue" }"#).unwrap();
    assert!(matches!(RunConfig::from_json_path(&config_path), Err(GeoSoftError::Json(_))));
}

/// Store written directly from a platform, including special float values
#[test]
fn test_store_preserves_special_values() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().join("special");
    let mut platform = Platform::new("GPL1");
    for probe in ["a", "b", "c", "d"] {
        platform.register_probe(probe, None);
    }

    let nan = f32::from_bits(0x7fc0_1234);
    let vector = [nan, f32::INFINITY, -0.0, f32::MIN_POSITIVE / 2.0];
    let mut writer = VectorStoreWriter::for_platform(&base, &platform).unwrap();
    writer.append_sample(&vector, "S1").unwrap();
    assert!(matches!(
        writer.append_sample(&vector[..3], "S2"),
        Err(GeoSoftError::VectorLength { expected: 4, actual: 3 })
    ));
    assert_eq!(writer.close().unwrap().samples, 1);

    let mut reader = VectorStoreReader::open(&base).unwrap();
    let mut signal = reader.allocate_signal_array();
    assert_eq!(reader.read_next_sample(&mut signal).unwrap(), "S1");
    let bits: Vec<u32> = signal.iter().map(|v| v.to_bits()).collect();
    let expected: Vec<u32> = vector.iter().map(|v| v.to_bits()).collect();
    assert_eq!(bits, expected);
    assert!(matches!(
        reader.read_next_sample(&mut signal),
        Err(GeoSoftError::StoreExhausted { count: 1 })
    ));
}

/// A truncated gzip family fails with the file name and operation attached
#[test]
fn test_truncated_gzip_names_file() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let source = write_gzip_family(&dir);
    let path = source.path().to_path_buf();
    let bytes = std::fs::read(&path).unwrap();
    std::fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();

    let base = dir.path().join("truncated");
    let error = export_family(source, &RunConfig::default(), base).unwrap_err();
    match &error {
        GeoSoftError::File { path: failed, operation, .. } => {
            assert_eq!(failed, &path);
            assert_eq!(*operation, "read");
        }
        other => panic!("expected a file read error, got {other:?}"),
    }
    assert!(error.to_string().contains("GSE100_family.soft.gz"));
}
