//! CLI command implementations

pub mod init;
pub mod interpret;
pub mod map;
pub mod run;
pub mod validate;

use anyhow::{Context, Result};
use collate_core::{Config, Table};

/// A loaded project: configuration, template headers and input tables
pub struct Project {
    pub config: Config,
    pub template: Vec<String>,
    pub tables: Vec<Table>,
}

impl Project {
    /// Load configuration, template and input tables
    pub fn load(config_path: &str) -> Result<Self> {
        tracing::info!("Loading configuration from {}", config_path);
        let config = Config::load(config_path).context("Failed to load configuration")?;
        tracing::info!("Project: {}", config.project.name);

        let template = config.load_template().context("Failed to load template")?;
        let tables = config
            .load_tables()
            .context("Failed to load input tables")?;

        Ok(Self {
            config,
            template,
            tables,
        })
    }
}
