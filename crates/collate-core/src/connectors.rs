//! Table sources and sinks
//!
//! Sources turn files into [`Table`]s; sinks serialize a [`ReportOutput`].
//! A source never fails outright: a file that cannot be parsed becomes a
//! table with no rows and an error message, which the pipeline skips.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::pipeline::ReportOutput;
use crate::table::{Row, Table};

/// Trait for table sources
pub trait TableSource {
    /// Load the table; parse failures are reported through [`Table::error`]
    fn load(&self) -> Table;
}

/// Trait for report sinks
pub trait TableSink {
    /// Write headers and rows of `output`
    fn write(&mut self, output: &ReportOutput) -> Result<()>;
}

/// Sink configuration from YAML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SinkConfig {
    /// Delimited text file
    Csv(FileSinkConfig),

    /// One JSON object per line
    Jsonl(FileSinkConfig),
}

/// File sink configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileSinkConfig {
    /// Output path, relative to the project directory
    pub path: String,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self::Csv(FileSinkConfig {
            path: "out/merged-report.csv".to_string(),
        })
    }
}

impl SinkConfig {
    /// Configured output path
    pub fn path(&self) -> &str {
        match self {
            Self::Csv(f) | Self::Jsonl(f) => &f.path,
        }
    }

    /// Open the sink, resolving its path against `base`
    pub fn open(&self, base: &Path) -> Box<dyn TableSink> {
        let path = base.join(self.path());
        match self {
            Self::Csv(_) => Box::new(CsvTableSink::new(path)),
            Self::Jsonl(_) => Box::new(JsonlTableSink::new(path)),
        }
    }
}

// ============================================================================
// CSV source
// ============================================================================

/// Reads a delimited text file with a header row
#[derive(Debug, Clone)]
pub struct CsvTableSource {
    path: PathBuf,
    delimiter: u8,
}

impl CsvTableSource {
    /// Create a comma-delimited source
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            delimiter: b',',
        }
    }

    /// Use a different field delimiter
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Parse a table from any reader
    pub fn read_from<R: Read>(name: &str, reader: R, delimiter: u8) -> Table {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .from_reader(reader);

        let headers = match reader.headers() {
            Ok(record) => unique_headers(record.iter()),
            Err(e) => return Table::failed(name, Vec::new(), e.to_string()),
        };

        let mut rows = Vec::new();
        for result in reader.records() {
            match result {
                Ok(record) => {
                    let row: Row = headers
                        .iter()
                        .zip(record.iter())
                        .map(|(h, cell)| (h.clone(), serde_json::Value::String(cell.to_string())))
                        .collect();
                    rows.push(row);
                }
                Err(e) => {
                    warn!(table = name, error = %e, "failed to parse table");
                    return Table::failed(name, headers, e.to_string());
                }
            }
        }

        debug!(table = name, rows = rows.len(), columns = headers.len(), "loaded table");
        Table::new(name, headers, rows)
    }
}

impl TableSource for CsvTableSource {
    fn load(&self) -> Table {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string());

        match File::open(&self.path) {
            Ok(file) => Self::read_from(&name, file, self.delimiter),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to open table");
                Table::failed(name, Vec::new(), e.to_string())
            }
        }
    }
}

/// Strip a UTF-8 BOM and surrounding whitespace; suffix repeated names with
/// `_1`, `_2`, ... so every header is unique.
fn unique_headers<'a>(raw: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.map(|h| {
        let base = h.trim_start_matches('\u{feff}').trim().to_string();
        let mut name = base.clone();
        let mut n = 0;
        while !seen.insert(name.clone()) {
            n += 1;
            name = format!("{base}_{n}");
        }
        name
    })
    .collect()
}

// ============================================================================
// Sinks
// ============================================================================

fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Writes the report as CSV
#[derive(Debug, Clone)]
pub struct CsvTableSink {
    path: PathBuf,
}

impl CsvTableSink {
    /// Create a CSV sink
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TableSink for CsvTableSink {
    fn write(&mut self, output: &ReportOutput) -> Result<()> {
        create_parent(&self.path)?;
        let csv_err = |source| Error::Csv {
            path: self.path.clone(),
            source,
        };

        let mut writer = csv::Writer::from_path(&self.path).map_err(csv_err)?;
        writer.write_record(&output.headers).map_err(csv_err)?;
        for row in &output.rows {
            writer.write_record(output.text_record(row)).map_err(csv_err)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Writes the report as JSON lines, keys in header order
#[derive(Debug, Clone)]
pub struct JsonlTableSink {
    path: PathBuf,
}

impl JsonlTableSink {
    /// Create a JSONL sink
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TableSink for JsonlTableSink {
    fn write(&mut self, output: &ReportOutput) -> Result<()> {
        create_parent(&self.path)?;
        let mut writer = BufWriter::new(File::create(&self.path)?);
        for row in &output.rows {
            let line = serde_json::to_string(row)?;
            writeln!(writer, "{}", line)?;
        }
        writer.flush()?;
        Ok(())
    }
}
