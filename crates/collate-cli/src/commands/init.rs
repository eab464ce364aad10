//! Initialize a new report project

use anyhow::Result;
use std::fs;
use std::path::Path;

use collate_core::config::PROJECT_FILE;

/// Run the init command
pub async fn run(path: &str, name: Option<&str>) -> Result<()> {
    let project_dir = Path::new(path);

    // Create directory if it doesn't exist
    if !project_dir.exists() {
        fs::create_dir_all(project_dir)?;
    }

    // Get absolute path for deriving name
    let abs_path = project_dir.canonicalize()?;

    // Derive project name from directory name if not provided
    let project_name = match name {
        Some(n) => n.to_string(),
        None => abs_path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("Could not determine project name from path"))?,
    };

    // Check if already initialized
    if project_dir.join(PROJECT_FILE).exists() {
        anyhow::bail!(
            "Directory '{}' already contains a {}",
            project_dir.display(),
            PROJECT_FILE
        );
    }

    tracing::info!("Creating new Collate project: {}", project_name);

    fs::create_dir_all(project_dir.join("templates"))?;
    fs::create_dir_all(project_dir.join("data"))?;

    let config = format!(
        r#"# Collate Project Configuration
name: {project_name}

# Header row of this file defines the report columns
template: templates/contacts.csv

# Files or directories (walked for *.csv)
inputs:
  - data

output:
  type: csv
  path: out/merged-report.csv

# Fill template columns without a mapping by header similarity
auto_map:
  enabled: true
  threshold: 0.6

report:
  quickPrompt: ""
  columnMappings:
    - templateColumn: Name
      sourceColumn: full_name
  transforms:
    - column: Email
      type: trim
    - column: Email
      type: lowercase
  dedupe:
    keyColumns: [Email]
    strategy: first
  outputOptions:
    includeSourceFile: true
    templateColumnOrder: true
"#
    );
    fs::write(project_dir.join(PROJECT_FILE), config)?;

    fs::write(
        project_dir.join("templates/contacts.csv"),
        "Name,Email,Phone,Company\n",
    )?;

    let crm = r#"full_name,email,phone,company
Alice Johnson, Alice@Example.com ,555-0100,Acme
Bob Smith,bob@example.com,555-0101,Globex
"#;
    fs::write(project_dir.join("data/crm.csv"), crm)?;

    let legacy = r#"full_name,email,phone,company
Alice J.,alice@example.com,,Acme Corp
Carol Williams,carol@example.com,555-0102,Initech
"#;
    fs::write(project_dir.join("data/legacy.csv"), legacy)?;

    let gitignore = r#"# Generated reports
out/

# IDE
.idea/
.vscode/
*.swp
"#;
    fs::write(project_dir.join(".gitignore"), gitignore)?;

    tracing::info!(
        "✓ Created project '{}' at {}",
        project_name,
        abs_path.display()
    );
    tracing::info!("");
    tracing::info!("Next steps:");
    if path != "." {
        tracing::info!("  cd {}", project_dir.display());
    }
    tracing::info!("  collate validate    # Check configuration");
    tracing::info!("  collate map         # Review column suggestions");
    tracing::info!("  collate run         # Build the report");

    Ok(())
}
