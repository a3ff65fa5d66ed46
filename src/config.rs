//! Site configuration.
//!
//! Defaults match the published site layout (`data/Papers.csv` and
//! `CITATION.cff` next to the page). A JSON file can override any field;
//! missing fields keep their defaults.

use crate::aggregate::AggregationConfig;
use crate::chart::DEFAULT_SURFACE_ID;
use crate::citation::DEFAULT_CITATION_KEY;
use crate::error::{PaperlensError, Result};
use crate::export::{DEFAULT_FILE_STEM, DEFAULT_SHEET_NAME};
use crate::source::Source;
use crate::table::TableColumns;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Default dataset location, relative to the site root
pub const DEFAULT_DATA_PATH: &str = "data/Papers.csv";

/// Default citation metadata location, relative to the site root
pub const DEFAULT_CITATION_PATH: &str = "CITATION.cff";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SiteConfig {
    pub data: Source,
    pub citation: Source,
    /// Records with an empty value in this column are dropped
    pub id_column: String,
    pub columns: TableColumns,
    pub page_length: usize,
    pub page_lengths: Vec<usize>,
    pub citation_key: String,
    pub export_stem: String,
    pub sheet_name: String,
    pub chart_surface: String,
    pub aggregation: AggregationConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            data: Source::parse(DEFAULT_DATA_PATH),
            citation: Source::parse(DEFAULT_CITATION_PATH),
            id_column: "ID".to_string(),
            columns: TableColumns::default(),
            page_length: 5,
            page_lengths: vec![5, 10, 25, 50, 100],
            citation_key: DEFAULT_CITATION_KEY.to_string(),
            export_stem: DEFAULT_FILE_STEM.to_string(),
            sheet_name: DEFAULT_SHEET_NAME.to_string(),
            chart_surface: DEFAULT_SURFACE_ID.to_string(),
            aggregation: AggregationConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Load a JSON config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: SiteConfig = serde_json::from_str(&content)?;
        config.validate()?;
        info!(path = ?path, "Loaded config");
        Ok(config)
    }

    /// `path` if given, else `~/.config/paperlens/config.json` if it exists, else defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }
        match default_config_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.id_column.trim().is_empty() {
            return Err(PaperlensError::Config("id_column must not be empty".to_string()));
        }
        if self.page_lengths.is_empty() || self.page_lengths.contains(&0) {
            return Err(PaperlensError::Config(
                "page_lengths must be non-empty and positive".to_string(),
            ));
        }
        if !self.page_lengths.contains(&self.page_length) {
            return Err(PaperlensError::Config(format!(
                "page_length {} is not one of {:?}",
                self.page_length, self.page_lengths
            )));
        }
        Ok(())
    }
}

/// Per-user config location
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("paperlens").join("config.json"))
}
