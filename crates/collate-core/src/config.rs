//! Configuration parsing and validation
//!
//! This module handles loading and validating report project files.
//!
//! # Configuration Files
//!
//! - `collate.yaml` - Project root configuration
//! - the template, either a CSV file whose header row is the template or an
//!   inline header list
//! - input tables, as CSV files or directories of them

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::automap::DEFAULT_THRESHOLD;
use crate::connectors::{CsvTableSource, SinkConfig, TableSource};
use crate::error::{Error, Result};
use crate::report::ReportConfig;
use crate::table::Table;
use crate::transforms::TransformKind;

/// Name of the project file looked up inside a project directory
pub const PROJECT_FILE: &str = "collate.yaml";

/// Root project configuration from `collate.yaml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name
    pub name: String,

    /// Path of a CSV file whose header row is the template
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,

    /// Inline template headers, used when `template` is unset
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub template_headers: Vec<String>,

    /// Input CSV files or directories
    #[serde(default)]
    pub inputs: Vec<String>,

    /// Field delimiter of the input files
    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    /// Where the report is written
    #[serde(default)]
    pub output: SinkConfig,

    /// Automatic mapping of unmapped template columns
    #[serde(default)]
    pub auto_map: AutoMapConfig,

    /// Pipeline configuration
    #[serde(default)]
    pub report: ReportConfig,
}

fn default_delimiter() -> char {
    ','
}

/// Auto-mapping settings
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AutoMapConfig {
    /// Fill unmapped template columns before running
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Minimum similarity (exclusive) for a match
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

impl Default for AutoMapConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            threshold: default_threshold(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

/// Main configuration container
#[derive(Debug, Clone)]
pub struct Config {
    /// Project configuration
    pub project: ProjectConfig,

    /// Base path of the project
    pub base_path: PathBuf,
}

impl Config {
    /// Load configuration from a directory
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the project directory or a project file
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let config = Config::load("./monthly-contacts")?;
    /// println!("Project: {}", config.project.name);
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let (config_path, base_path) = if path.is_dir() {
            (path.join(PROJECT_FILE), path.to_path_buf())
        } else {
            (
                path.to_path_buf(),
                path.parent().unwrap_or(Path::new(".")).to_path_buf(),
            )
        };

        if !config_path.exists() {
            return Err(Error::ConfigNotFound {
                path: config_path.display().to_string(),
            });
        }

        let contents = std::fs::read_to_string(&config_path)?;
        let project: ProjectConfig = serde_yaml::from_str(&contents)?;
        debug!(path = %config_path.display(), project = %project.name, "loaded project config");

        Ok(Self { project, base_path })
    }

    /// Resolve a project-relative path
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        self.base_path.join(path)
    }

    /// Template headers, from the template file's header row or the inline list
    pub fn load_template(&self) -> Result<Vec<String>> {
        let Some(template) = &self.project.template else {
            return Ok(self.project.template_headers.clone());
        };

        let path = self.resolve(template);
        if !path.exists() {
            return Err(Error::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let table = CsvTableSource::new(&path).with_delimiter(self.delimiter()?).load();
        if let Some(error) = table.error {
            return Err(Error::invalid(format!(
                "template '{}' could not be read: {}",
                path.display(),
                error
            )));
        }
        Ok(table.headers)
    }

    /// Every input CSV file, in configured order; directories contribute
    /// their `.csv` files sorted by path.
    pub fn input_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        for input in &self.project.inputs {
            let path = self.resolve(input);
            if path.is_dir() {
                let mut found = Vec::new();
                for entry in WalkDir::new(&path) {
                    let entry = entry?;
                    if entry.file_type().is_file()
                        && entry
                            .path()
                            .extension()
                            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
                    {
                        found.push(entry.into_path());
                    }
                }
                found.sort();
                files.extend(found);
            } else if path.exists() {
                files.push(path);
            } else {
                return Err(Error::ConfigNotFound {
                    path: path.display().to_string(),
                });
            }
        }

        Ok(files)
    }

    /// Load every input table. Files that fail to parse become failed tables.
    pub fn load_tables(&self) -> Result<Vec<Table>> {
        let delimiter = self.delimiter()?;
        let tables: Vec<Table> = self
            .input_files()?
            .iter()
            .map(|path| CsvTableSource::new(path).with_delimiter(delimiter).load())
            .collect();
        info!(tables = tables.len(), "loaded input tables");
        Ok(tables)
    }

    /// The field delimiter as the single byte the CSV reader needs
    fn delimiter(&self) -> Result<u8> {
        u8::try_from(self.project.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| {
                Error::invalid(format!(
                    "delimiter '{}' must be a single ASCII character",
                    self.project.delimiter
                ))
            })
    }

    /// Check the project for mistakes the pipeline would silently tolerate.
    pub fn validate(&self) -> Result<()> {
        let project = &self.project;

        if project.name.trim().is_empty() {
            return Err(Error::invalid("project name must not be empty"));
        }
        if project.template.is_none() && project.template_headers.is_empty() {
            return Err(Error::invalid(
                "either 'template' or 'template_headers' must be set",
            ));
        }
        if project.inputs.is_empty() {
            return Err(Error::invalid("at least one input is required"));
        }
        self.delimiter()?;
        if !(0.0..=1.0).contains(&project.auto_map.threshold) {
            return Err(Error::invalid(format!(
                "auto_map.threshold must be between 0 and 1, got {}",
                project.auto_map.threshold
            )));
        }

        validate_report(&project.report)
    }
}

/// Check a report config for rules that would be no-ops at run time.
pub fn validate_report(report: &ReportConfig) -> Result<()> {
    if let Some(dedupe) = &report.dedupe
        && dedupe.key_columns.is_empty()
    {
        return Err(Error::invalid("dedupe.keyColumns must not be empty"));
    }

    for transform in &report.transforms {
        if transform.kind != TransformKind::Replace {
            continue;
        }
        let Some(pattern) = transform.search_value() else {
            return Err(Error::invalid(format!(
                "replace transform on '{}' needs params.searchValue",
                transform.column
            )));
        };
        if let Err(e) = Regex::new(pattern) {
            return Err(Error::invalid(format!(
                "replace transform on '{}' has an invalid pattern: {}",
                transform.column, e
            )));
        }
    }

    for field in &report.derived_fields {
        if field.kind.is_binary() && field.source_columns.len() < 2 {
            return Err(Error::invalid(format!(
                "derived field '{}' needs two source columns",
                field.name
            )));
        }
    }

    Ok(())
}
