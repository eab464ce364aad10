//! Collate Core Library
//!
//! This crate provides the core functionality for Collate:
//! - Header similarity and column auto-mapping
//! - The report pipeline (map, transform, derive, filter, dedupe, format)
//! - Table sources and report sinks
//! - Project configuration parsing and validation
//! - A heuristic interpreter for free-text report instructions
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Tables    │────▶│  Pipeline   │────▶│    Sink     │
//! │   (CSV)     │     │   Engine    │     │  CSV/JSONL  │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!                            ▲
//!                     ┌─────────────┐
//!                     │ ReportConfig│
//!                     │   (YAML)    │
//!                     └─────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use collate_core::{Config, run_pipeline};
//!
//! let config = Config::load("./monthly-contacts")?;
//! let template = config.load_template()?;
//! let tables = config.load_tables()?;
//! if let Some(output) = run_pipeline(&template, &tables, &config.project.report) {
//!     println!("{} rows", output.rows.len());
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod automap;
pub mod config;
pub mod connectors;
pub mod error;
pub mod interpreter;
pub mod pipeline;
pub mod report;
pub mod similarity;
pub mod table;
pub mod transforms;

pub use automap::{auto_map, fill_missing_mappings};
pub use config::{Config, ProjectConfig};
pub use error::{Error, Result};
pub use interpreter::{HeuristicInterpreter, InstructionInterpreter, merge_with_config};
pub use pipeline::{PipelineStats, ReportOutput, run_pipeline};
pub use report::ReportConfig;
pub use similarity::similarity;
pub use table::{Row, Table};
