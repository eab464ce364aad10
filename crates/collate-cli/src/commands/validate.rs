//! Validate configuration command

use anyhow::{Context, Result};
use collate_core::Config;

/// Run the validate command
pub async fn run(config_path: &str) -> Result<()> {
    tracing::info!("Validating configuration: {}", config_path);

    let config = Config::load(config_path).context("Failed to load configuration")?;
    tracing::info!("✓ Project: {}", config.project.name);

    config.validate().context("Configuration is invalid")?;

    let template = config.load_template().context("Failed to load template")?;
    tracing::info!("✓ Template: {} column(s)", template.len());

    let tables = config
        .load_tables()
        .context("Failed to load input tables")?;
    let mut failed = 0;
    for table in &tables {
        match &table.error {
            Some(error) => {
                failed += 1;
                tracing::warn!("✗ {}: {}", table.name, error);
            }
            None => tracing::info!("✓ {}: {} row(s)", table.name, table.row_count()),
        }
    }

    if tables.is_empty() {
        anyhow::bail!("No input tables found");
    }
    if failed > 0 {
        anyhow::bail!("{} input table(s) could not be parsed", failed);
    }

    tracing::info!("✓ Configuration is valid");
    Ok(())
}
