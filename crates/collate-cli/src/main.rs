//! Collate CLI
//!
//! Developer tool for building merged reports from CSV files.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::run::{OutputFormat, RunOptions};

/// Collate - merge CSV files into one report shaped by a template
#[derive(Parser)]
#[command(name = "collate")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file or project directory
    #[arg(short, long, default_value = "collate.yaml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new report project
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: String,

        /// Project name (defaults to directory name)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Build the report
    Run {
        /// Write the report here instead of the configured output
        #[arg(short, long)]
        output: Option<String>,

        /// Output format (defaults to the configured one)
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Do not fill unmapped template columns automatically
        #[arg(long)]
        no_auto_map: bool,

        /// Free-text instructions merged into the report configuration
        #[arg(short, long)]
        instructions: Option<String>,
    },

    /// Validate configuration without running
    Validate,

    /// Suggest template-to-source column mappings
    Map {
        /// Minimum similarity for a suggestion (defaults to the configured one)
        #[arg(short, long)]
        threshold: Option<f64>,
    },

    /// Show the configuration inferred from free-text instructions
    Interpret {
        /// Instruction text
        text: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging; stdout is reserved for command output
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Init { path, name } => {
            commands::init::run(&path, name.as_deref()).await?;
        }
        Commands::Run {
            output,
            format,
            no_auto_map,
            instructions,
        } => {
            let options = RunOptions {
                output,
                format,
                auto_map: !no_auto_map,
                instructions,
            };
            commands::run::run(&cli.config, options).await?;
        }
        Commands::Validate => {
            commands::validate::run(&cli.config).await?;
        }
        Commands::Map { threshold } => {
            commands::map::run(&cli.config, threshold).await?;
        }
        Commands::Interpret { text } => {
            commands::interpret::run(&cli.config, &text).await?;
        }
    }

    Ok(())
}
