//! Show what the instruction interpreter makes of a piece of text

use anyhow::{Context, Result};
use collate_core::automap::source_headers;
use collate_core::{HeuristicInterpreter, InstructionInterpreter, ReportConfig, merge_with_config};

use super::Project;

/// Print the report configuration inferred from `text` as YAML
pub async fn run(config_path: &str, text: &str) -> Result<()> {
    let project = Project::load(config_path)?;
    let sources = source_headers(&project.tables);

    let parsed = HeuristicInterpreter.interpret(text, &project.template, &sources);
    let report = merge_with_config(parsed, &ReportConfig::default());

    let yaml = serde_yaml::to_string(&report).context("Failed to serialize configuration")?;
    print!("{}", yaml);
    Ok(())
}
