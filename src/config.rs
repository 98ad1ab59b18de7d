/// Run configuration loaded from a TOML file.
///
/// Every section is optional; omitted keys fall back to the defaults below.
///
/// ```toml
/// [source]
/// mode = "file"
///
/// [file]
/// laureates = "./data/nobel.csv"
/// country_lookup = "./data/country_fixed.csv"
///
/// [report]
/// filter_continent = "Asia"
/// ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::analysis::aggregates::GenderMarkers;
use crate::ingest::nobel_api::NOBEL_API_URL;
use crate::model::{DEFAULT_PAGE_SIZE, PipelineError};

pub const DEFAULT_CONFIG_PATH: &str = "nobel.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    /// Paged laureates API; continent comes with each record.
    Api,
    /// Flat laureate CSV joined against the country lookup CSV.
    File,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub api: ApiConfig,
    pub file: FileConfig,
    pub output: OutputConfig,
    pub report: ReportConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub mode: SourceMode,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            mode: SourceMode::Api,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub endpoint: String,
    pub page_size: usize,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: NOBEL_API_URL.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub laureates: PathBuf,
    pub country_lookup: PathBuf,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            laureates: PathBuf::from("./data/nobel.csv"),
            country_lookup: PathBuf::from("./data/country_fixed.csv"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Flat table, overwritten on every run.
    pub table: PathBuf,
    /// Directory receiving the aggregate tables.
    pub report_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            table: PathBuf::from("./output/nobel_laureates.csv"),
            report_dir: PathBuf::from("./output/report"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub filter_continent: String,
    /// Gender labels differ between sources; `None` picks the source default.
    pub female_marker: Option<String>,
    pub male_marker: Option<String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            filter_continent: "Asia".to_string(),
            female_marker: None,
            male_marker: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Used when `RUST_LOG` is not set.
    pub level: String,
    /// Optional plain-text log file, appended to.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl Config {
    pub fn from_toml(contents: &str) -> Result<Self, PipelineError> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let contents = fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml(&contents)
    }

    /// Loads `path`, or returns defaults when `path` is the default location
    /// and nothing is there.
    pub fn load_or_default(path: &Path) -> Result<Self, PipelineError> {
        if path == Path::new(DEFAULT_CONFIG_PATH) && !path.exists() {
            return Ok(Self::default());
        }
        Self::load(path)
    }

    fn validate(&self) -> Result<(), PipelineError> {
        if self.api.page_size == 0 {
            return Err(PipelineError::Config("api.page_size must be at least 1".to_string()));
        }
        if self.report.filter_continent.trim().is_empty() {
            return Err(PipelineError::Config(
                "report.filter_continent must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Gender labels for the configured source. The API reports lower-case
    /// values, the flat-file export capitalized ones.
    pub fn gender_markers(&self) -> GenderMarkers {
        let (female, male) = match self.source.mode {
            SourceMode::Api => ("female", "male"),
            SourceMode::File => ("Female", "Male"),
        };
        GenderMarkers {
            female: self
                .report
                .female_marker
                .clone()
                .unwrap_or_else(|| female.to_string()),
            male: self
                .report
                .male_marker
                .clone()
                .unwrap_or_else(|| male.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.source.mode, SourceMode::Api);
        assert_eq!(config.api.page_size, 100);
        assert_eq!(config.api.endpoint, NOBEL_API_URL);
        assert_eq!(config.report.filter_continent, "Asia");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_sections_merge_with_defaults() {
        let config = Config::from_toml(
            r#"
            [source]
            mode = "file"

            [file]
            laureates = "/tmp/nobel.csv"

            [report]
            filter_continent = "Europe"
            "#,
        )
        .unwrap();
        assert_eq!(config.source.mode, SourceMode::File);
        assert_eq!(config.file.laureates, PathBuf::from("/tmp/nobel.csv"));
        assert_eq!(config.file.country_lookup, PathBuf::from("./data/country_fixed.csv"));
        assert_eq!(config.report.filter_continent, "Europe");
    }

    #[test]
    fn test_unknown_mode_is_rejected() {
        let err = Config::from_toml("[source]\nmode = \"ftp\"\n").unwrap_err();
        assert!(matches!(err, PipelineError::Toml(_)));
    }

    #[test]
    fn test_zero_page_size_is_rejected() {
        let err = Config::from_toml("[api]\npage_size = 0\n").unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn test_gender_markers_follow_source_unless_overridden() {
        let api = Config::default();
        assert_eq!(api.gender_markers().female, "female");

        let file = Config::from_toml("[source]\nmode = \"file\"\n").unwrap();
        assert_eq!(file.gender_markers().female, "Female");
        assert_eq!(file.gender_markers().male, "Male");

        let custom =
            Config::from_toml("[source]\nmode = \"file\"\n[report]\nfemale_marker = \"F\"\n").unwrap();
        assert_eq!(custom.gender_markers().female, "F");
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let err = Config::load_or_default(Path::new("/nonexistent/custom.toml")).unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }
}
