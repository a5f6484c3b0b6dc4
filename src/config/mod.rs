//! Configuration loading and management.

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::bugginess::{FileFilter, DEFAULT_PROJECTS};
use crate::core::{Error, Result};

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Cold-start Proportion sampling.
    pub cold_start: ColdStartConfig,
    /// Ticket to commit linking.
    pub linker: LinkerConfig,
    /// Method labeling.
    pub labeling: LabelingConfig,
    /// Output configuration.
    pub output: OutputConfig,
}

impl Config {
    /// Load configuration from an explicit file path.
    ///
    /// Errors if the file does not exist. Use this for explicit `--config` flags.
    /// Env vars with `SZZ_` prefix override file values.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::Config(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        let config: Self = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file_exact(path))
            .merge(Env::prefixed("SZZ_").split("__"))
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from directory, looking for szz.toml or .szz/szz.toml.
    ///
    /// Missing files are silently skipped (defaults are used).
    /// Env vars with `SZZ_` prefix override file/default values.
    pub fn load_default(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let config: Self = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(dir.join("szz.toml")))
            .merge(Toml::file(dir.join(".szz/szz.toml")))
            .merge(Env::prefixed("SZZ_").split("__"))
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Create default config file content.
    pub fn default_toml() -> &'static str {
        include_str!("default_config.toml")
    }

    fn validate(&self) -> Result<()> {
        if let Some(p) = self.cold_start.proportion {
            if !p.is_finite() || p <= 0.0 {
                return Err(Error::config(format!(
                    "cold_start.proportion must be a positive number, got {p}"
                )));
            }
        }
        if self.linker.extensions.is_empty() {
            return Err(Error::config("linker.extensions must not be empty"));
        }
        Ok(())
    }
}

/// Cold-start Proportion configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColdStartConfig {
    /// Reference project keys.
    pub projects: Vec<String>,
    /// Directory holding `<KEY>.json` metadata of the reference projects.
    pub metadata_dir: PathBuf,
    /// Fixed Proportion; skips sampling when set.
    pub proportion: Option<f64>,
}

impl Default for ColdStartConfig {
    fn default() -> Self {
        Self {
            projects: DEFAULT_PROJECTS.iter().map(|p| p.to_string()).collect(),
            metadata_dir: PathBuf::from("metadata"),
            proportion: None,
        }
    }
}

/// Linker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkerConfig {
    /// Extensions of files recorded as fixed files.
    pub extensions: Vec<String>,
    /// Path fragments excluded from fixed files.
    pub exclude_path_fragments: Vec<String>,
    /// Run the same-author heuristic after message linking.
    pub heuristic: bool,
}

impl Default for LinkerConfig {
    fn default() -> Self {
        let filter = FileFilter::default();
        Self {
            extensions: filter.extensions,
            exclude_path_fragments: filter.exclude_path_fragments,
            heuristic: true,
        }
    }
}

impl LinkerConfig {
    pub fn file_filter(&self) -> FileFilter {
        FileFilter {
            extensions: self.extensions.clone(),
            exclude_path_fragments: self.exclude_path_fragments.clone(),
        }
    }
}

/// Labeling configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelingConfig {
    /// Include one event per labeled method in reports.
    pub record_events: bool,
}

/// Output configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default output format.
    pub format: OutputFormat,
}

/// Output format.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// JSON format.
    Json,
    /// Markdown format.
    Markdown,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "md" | "markdown" => Ok(Self::Markdown),
            _ => Err(format!("Unknown format: {s}. Use 'text', 'json', or 'md'")),
        }
    }
}
