//! Suggest column mappings

use anyhow::Result;
use collate_core::automap::{source_headers, suggest};

use super::Project;

/// Print the best source header for every template header
pub async fn run(config_path: &str, threshold: Option<f64>) -> Result<()> {
    let project = Project::load(config_path)?;
    let threshold = threshold.unwrap_or(project.config.project.auto_map.threshold);
    if !(0.0..=1.0).contains(&threshold) {
        anyhow::bail!("Threshold must be between 0 and 1, got {}", threshold);
    }

    let sources = source_headers(&project.tables);
    let suggestions = suggest(&project.template, &sources, threshold);

    println!("{:<28} {:<28} SCORE", "TEMPLATE", "SOURCE");
    for header in &project.template {
        match suggestions.iter().find(|s| &s.template_header == header) {
            Some(s) => println!("{:<28} {:<28} {:.2}", header, s.source_header, s.score),
            None => println!("{:<28} {:<28} -", header, "(unmatched)"),
        }
    }

    tracing::info!(
        "{} of {} template column(s) matched",
        suggestions.len(),
        project.template.len()
    );
    Ok(())
}
