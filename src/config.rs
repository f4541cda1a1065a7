//! Run configuration.
//!
//! A [`RunConfig`] is built once per run and passed by reference to every component
//! that needs it. It carries where the platform description comes from, an optional
//! precomputed probe/transcript table, and the adapter options that pick and tune the
//! sample format.
//!
//! # Adapter option string
//!
//! A `key=value` list separated by `,` or `;`:
//!
//! | key | values | default |
//! |---|---|---|
//! | `format` | `affymetrix`, `detection`, `sage`, `mpss`, `genotype` | `affymetrix` |
//! | `threshold` | presence threshold for signal-only tables | `0.0` |
//! | `strict` | bare flag or `true`/`false`: malformed rows become errors | `false` |
//! | `negatives` | bare flag or `true`/`false`: also export negated companion samples | `false` |
//!
//! ```
//! use geosoft::config::{AdapterOptions, FormatKind, RowPolicy};
//!
//! let options = AdapterOptions::parse("format=detection; threshold=50, strict")?;
//! assert_eq!(options.format, FormatKind::Detection);
//! assert_eq!(options.presence_threshold, 50.0);
//! assert_eq!(options.row_policy, RowPolicy::Strict);
//! # Ok::<(), geosoft::GeoSoftError>(())
//! ```

use crate::error::{GeoSoftError, Result};
use crate::io::DataSource;
use crate::platform::ProbeTranscriptTable;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Presence threshold used when a table has no call column
pub const DEFAULT_PRESENCE_THRESHOLD: f32 = 0.0;

/// What to do with rows that do not have the expected shape
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RowPolicy {
    /// Skip the row and keep going
    #[default]
    Lenient,
    /// Fail with [`GeoSoftError::Row`]
    Strict,
}

/// Sample table format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FormatKind {
    /// `ID_REF` + `VALUE`, optional call column
    #[default]
    Affymetrix,
    /// `ID_REF` + `VALUE` + `DETECTION`
    Detection,
    /// `TAG` + `COUNT`
    Sage,
    /// `ID_REF` + `VALUE` integer counts
    Mpss,
    /// `ID_REF` + `VALUE` genotype calls
    Genotype,
}

impl FromStr for FormatKind {
    type Err = GeoSoftError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "affymetrix" | "affy" => Ok(Self::Affymetrix),
            "detection" => Ok(Self::Detection),
            "sage" => Ok(Self::Sage),
            "mpss" => Ok(Self::Mpss),
            "genotype" | "snp" => Ok(Self::Genotype),
            other => Err(GeoSoftError::Config(format!("unknown sample format '{other}'"))),
        }
    }
}

impl fmt::Display for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Affymetrix => "affymetrix",
            Self::Detection => "detection",
            Self::Sage => "sage",
            Self::Mpss => "mpss",
            Self::Genotype => "genotype",
        };
        f.write_str(name)
    }
}

/// Options parsed from the adapter option string
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdapterOptions {
    /// Sample table format
    pub format: FormatKind,
    /// Presence threshold for tables without a call column
    pub presence_threshold: f32,
    /// Malformed row handling
    pub row_policy: RowPolicy,
    /// Also export a negated companion vector per sample
    pub negative_companions: bool,
}

impl Default for AdapterOptions {
    fn default() -> Self {
        Self {
            format: FormatKind::default(),
            presence_threshold: DEFAULT_PRESENCE_THRESHOLD,
            row_policy: RowPolicy::default(),
            negative_companions: false,
        }
    }
}

impl AdapterOptions {
    /// Parse an option string; an empty string yields the defaults
    pub fn parse(options: &str) -> Result<Self> {
        let mut parsed = Self::default();

        for item in options.split([',', ';']).map(str::trim).filter(|s| !s.is_empty()) {
            let (key, value) = match item.split_once('=') {
                Some((key, value)) => (key.trim(), Some(value.trim())),
                None => (item, None),
            };

            match key.to_ascii_lowercase().as_str() {
                "format" => {
                    parsed.format = value
                        .ok_or_else(|| GeoSoftError::Config("format needs a value".to_string()))?
                        .parse()?;
                }
                "threshold" => {
                    let value = value.ok_or_else(|| {
                        GeoSoftError::Config("threshold needs a value".to_string())
                    })?;
                    parsed.presence_threshold = value
                        .parse()
                        .map_err(|_| GeoSoftError::Config(format!("invalid threshold '{value}'")))?;
                }
                "strict" => {
                    parsed.row_policy = if parse_flag(key, value)? {
                        RowPolicy::Strict
                    } else {
                        RowPolicy::Lenient
                    };
                }
                "negatives" => parsed.negative_companions = parse_flag(key, value)?,
                other => {
                    return Err(GeoSoftError::Config(format!("unknown adapter option '{other}'")))
                }
            }
        }

        Ok(parsed)
    }
}

fn parse_flag(key: &str, value: Option<&str>) -> Result<bool> {
    match value.map(str::to_ascii_lowercase).as_deref() {
        None | Some("true") | Some("yes") | Some("1") => Ok(true),
        Some("false") | Some("no") | Some("0") => Ok(false),
        Some(other) => Err(GeoSoftError::Config(format!("invalid value '{other}' for {key}"))),
    }
}

/// Where the platform description is read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformSource {
    /// JSON platform snapshot (`.json` or `.json.gz`)
    Snapshot(PathBuf),
    /// SOFT file containing a Platform section
    Soft(PathBuf),
}

impl PlatformSource {
    /// Classify a path by its name
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if name.ends_with(".json") || name.ends_with(".json.gz") {
            Self::Snapshot(path.to_path_buf())
        } else {
            Self::Soft(path.to_path_buf())
        }
    }

    /// Data source for the underlying file
    pub fn data_source(&self) -> DataSource {
        match self {
            Self::Snapshot(path) | Self::Soft(path) => DataSource::from_path(path),
        }
    }
}

/// On-disk form of a [`RunConfig`]
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RunConfigFile {
    platform: Option<PathBuf>,
    relationships: Option<PathBuf>,
    adapter: String,
}

/// Immutable per-run configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunConfig {
    platform_source: Option<PlatformSource>,
    relationships: Option<ProbeTranscriptTable>,
    adapter: AdapterOptions,
}

impl RunConfig {
    /// Start building a configuration
    pub fn builder() -> RunConfigBuilder {
        RunConfigBuilder::default()
    }

    /// Load a configuration from a JSON file.
    ///
    /// ```json
    /// {
    ///     "platform": "GPL570.json.gz",
    ///     "relationships": "probes.tsv",
    ///     "adapter": "format=affymetrix"
    /// }
    /// ```
    ///
    /// Relative paths are resolved against the config file's directory.
    pub fn from_json_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| GeoSoftError::file(path, "read", e))?;
        let file: RunConfigFile = serde_json::from_str(&text)?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));

        let mut builder = Self::builder().adapter_options(&file.adapter)?;
        if let Some(platform) = file.platform {
            builder = builder.platform_source(PlatformSource::from_path(base.join(platform)));
        }
        if let Some(relationships) = file.relationships {
            let source = DataSource::from_path(base.join(relationships));
            builder = builder.relationships(ProbeTranscriptTable::load(source)?);
        }
        Ok(builder.build())
    }

    /// Platform description source, if the platform is not read from the SOFT file itself
    pub fn platform_source(&self) -> Option<&PlatformSource> {
        self.platform_source.as_ref()
    }

    /// Precomputed probe/transcript table
    pub fn relationships(&self) -> Option<&ProbeTranscriptTable> {
        self.relationships.as_ref()
    }

    /// Adapter options
    pub fn adapter(&self) -> &AdapterOptions {
        &self.adapter
    }

    /// Malformed row handling
    pub fn row_policy(&self) -> RowPolicy {
        self.adapter.row_policy
    }
}

/// Builder for [`RunConfig`]
#[derive(Debug, Default)]
pub struct RunConfigBuilder {
    config: RunConfig,
}

impl RunConfigBuilder {
    /// Read the platform from a separate source
    pub fn platform_source(mut self, source: PlatformSource) -> Self {
        self.config.platform_source = Some(source);
        self
    }

    /// Use a precomputed probe/transcript table
    pub fn relationships(mut self, table: ProbeTranscriptTable) -> Self {
        self.config.relationships = Some(table);
        self
    }

    /// Parse and apply an adapter option string
    pub fn adapter_options(mut self, options: &str) -> Result<Self> {
        self.config.adapter = AdapterOptions::parse(options)?;
        Ok(self)
    }

    /// Apply already-parsed adapter options
    pub fn adapter(mut self, options: AdapterOptions) -> Self {
        self.config.adapter = options;
        self
    }

    /// Finish building
    pub fn build(self) -> RunConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_options_are_defaults() {
        assert_eq!(AdapterOptions::parse("").unwrap(), AdapterOptions::default());
        assert_eq!(AdapterOptions::parse(" ; , ").unwrap(), AdapterOptions::default());
    }

    #[test]
    fn test_parse_all_options() {
        let options =
            AdapterOptions::parse("format=genotype;threshold=2.5;strict=false;negatives").unwrap();
        assert_eq!(options.format, FormatKind::Genotype);
        assert_eq!(options.presence_threshold, 2.5);
        assert_eq!(options.row_policy, RowPolicy::Lenient);
        assert!(options.negative_companions);
    }

    #[test]
    fn test_rejects_unknown_option() {
        assert!(matches!(AdapterOptions::parse("colour=blue"), Err(GeoSoftError::Config(_))));
        assert!(matches!(AdapterOptions::parse("format=illumina"), Err(GeoSoftError::Config(_))));
        assert!(matches!(AdapterOptions::parse("threshold=high"), Err(GeoSoftError::Config(_))));
        assert!(matches!(AdapterOptions::parse("strict=maybe"), Err(GeoSoftError::Config(_))));
    }

    #[test]
    fn test_format_kind_display_roundtrip() {
        for kind in [
            FormatKind::Affymetrix,
            FormatKind::Detection,
            FormatKind::Sage,
            FormatKind::Mpss,
            FormatKind::Genotype,
        ] {
            assert_eq!(kind.to_string().parse::<FormatKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_platform_source_classification() {
        assert!(matches!(PlatformSource::from_path("GPL570.json.gz"), PlatformSource::Snapshot(_)));
        assert!(matches!(PlatformSource::from_path("GPL570.json"), PlatformSource::Snapshot(_)));
        assert!(matches!(
            PlatformSource::from_path("GPL570_family.soft.gz"),
            PlatformSource::Soft(_)
        ));
    }

    #[test]
    fn test_from_json_path_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("probes.tsv"), "A1\tNM_1\n").unwrap();
        let config_path = dir.path().join("run.json");
        std::fs::write(
            &config_path,
            r#"{
                "platform": "GPL1.json",
                "relationships": "probes.tsv",
                "adapter": "format=sage"
            }"#,
        )
        .unwrap();

        let config = RunConfig::from_json_path(&config_path).unwrap();
        assert_eq!(
            config.platform_source(),
            Some(&PlatformSource::Snapshot(dir.path().join("GPL1.json")))
        );
        assert_eq!(config.relationships().unwrap().transcript_for("A1"), Some("NM_1"));
        assert_eq!(config.adapter().format, FormatKind::Sage);
    }

    #[test]
    fn test_from_json_path_rejects_unknown_fields() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("run.json");
        std::fs::write(&config_path, r#"{ "platfrom": "GPL1.json" }"#).unwrap();
        assert!(matches!(RunConfig::from_json_path(&config_path), Err(GeoSoftError::Json(_))));
    }
}
