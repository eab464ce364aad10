//! Build the report

use anyhow::{Context, Result};
use clap::ValueEnum;
use std::path::Path;

use collate_core::automap::{fill_missing_mappings, source_headers};
use collate_core::connectors::{FileSinkConfig, SinkConfig, TableSink};
use collate_core::interpreter::instruction_text;
use collate_core::{HeuristicInterpreter, InstructionInterpreter, merge_with_config, run_pipeline};

use super::Project;

/// Report file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Comma-separated values
    Csv,
    /// One JSON object per line
    Jsonl,
}

/// Overrides for a single run
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub output: Option<String>,
    pub format: Option<OutputFormat>,
    pub auto_map: bool,
    pub instructions: Option<String>,
}

/// Run the report pipeline and write the result
pub async fn run(config_path: &str, options: RunOptions) -> Result<()> {
    let Project {
        config,
        template,
        tables,
    } = Project::load(config_path)?;

    if let Err(e) = config.validate() {
        tracing::warn!("{}", e);
    }

    let mut report = config.project.report.clone();

    let text = options
        .instructions
        .clone()
        .unwrap_or_else(|| instruction_text(&report));
    if !text.trim().is_empty() {
        let parsed = HeuristicInterpreter.interpret(&text, &template, &source_headers(&tables));
        report = merge_with_config(parsed, &report);
        tracing::info!("Applied instructions");
    }

    if options.auto_map && config.project.auto_map.enabled {
        let before = report.column_mappings.len();
        report = fill_missing_mappings(&report, &template, &tables, config.project.auto_map.threshold);
        tracing::info!(
            "Auto-mapped {} column(s)",
            report.column_mappings.len() - before
        );
    }

    let task = tokio::task::spawn_blocking(move || run_pipeline(&template, &tables, &report));

    let output = tokio::select! {
        joined = task => joined.context("Pipeline task failed")?,
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl+C")?;
            anyhow::bail!("Interrupted before the report was written");
        }
    };

    let Some(output) = output else {
        anyhow::bail!("Nothing to build: the template has no headers or there are no input tables");
    };

    let (sink_config, base) = resolve_sink(&config.project.output, &config.base_path, &options);
    let mut sink = sink_config.open(base);
    sink.write(&output).context("Failed to write report")?;

    let stats = output.stats;
    tracing::info!(
        "✓ Wrote {} row(s) to {} ({} mapped, {} filtered, {} duplicate(s) removed, {} table(s) skipped)",
        stats.rows_output,
        base.join(sink_config.path()).display(),
        stats.rows_mapped,
        stats.rows_filtered,
        stats.rows_deduplicated,
        stats.tables_skipped
    );
    Ok(())
}

/// Apply command-line overrides to the configured sink. An overridden path
/// is relative to the working directory, a configured one to the project.
fn resolve_sink<'a>(
    configured: &SinkConfig,
    project_dir: &'a Path,
    options: &RunOptions,
) -> (SinkConfig, &'a Path) {
    let base = if options.output.is_some() {
        Path::new(".")
    } else {
        project_dir
    };

    let file = FileSinkConfig {
        path: options
            .output
            .clone()
            .unwrap_or_else(|| configured.path().to_string()),
    };

    let sink = match options.format {
        Some(OutputFormat::Csv) => SinkConfig::Csv(file),
        Some(OutputFormat::Jsonl) => SinkConfig::Jsonl(file),
        None => match configured {
            SinkConfig::Csv(_) => SinkConfig::Csv(file),
            SinkConfig::Jsonl(_) => SinkConfig::Jsonl(file),
        },
    };

    (sink, base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn configured() -> SinkConfig {
        SinkConfig::Csv(FileSinkConfig {
            path: "out/report.csv".to_string(),
        })
    }

    #[rstest]
    #[case::configured(None, None, false, "out/report.csv", "/proj")]
    #[case::output_and_format(Some("report.jsonl"), Some(OutputFormat::Jsonl), true, "report.jsonl", ".")]
    #[case::format_only(None, Some(OutputFormat::Jsonl), true, "out/report.csv", "/proj")]
    #[case::output_only(Some("merged.csv"), None, false, "merged.csv", ".")]
    fn test_resolve_sink(
        #[case] output: Option<&str>,
        #[case] format: Option<OutputFormat>,
        #[case] jsonl: bool,
        #[case] path: &str,
        #[case] base: &str,
    ) {
        let options = RunOptions {
            output: output.map(str::to_string),
            format,
            ..Default::default()
        };
        let (sink, resolved) = resolve_sink(&configured(), Path::new("/proj"), &options);
        assert_eq!(matches!(sink, SinkConfig::Jsonl(_)), jsonl);
        assert_eq!(sink.path(), path);
        assert_eq!(resolved, Path::new(base));
    }
}
