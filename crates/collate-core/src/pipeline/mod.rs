//! Report pipeline
//!
//! Turns source tables into one output table shaped by a template. Stages run
//! in a fixed order, and each finishes over the whole row set before the next
//! starts:
//!
//! ```text
//! map -> transform -> derive -> filter -> dedupe -> format
//! ```
//!
//! The map stage copies cells out of the caller's tables. Every later stage
//! consumes the previous stage's records and returns new ones, so nothing the
//! caller holds is modified.
//!
//! Bad cell data never fails a run: unparseable numbers and dates pass
//! through unchanged and arithmetic on missing values falls back to identity
//! elements.

mod datetime;
mod dedupe;
mod derive;
mod filter;
mod transform;

pub use datetime::parse_to_iso;
pub use dedupe::dedupe_key;
pub use filter::matches;

use std::collections::HashSet;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::report::{OutputOptions, ReportConfig, SOURCE_FILE_COLUMN};
use crate::table::{Row, Table};

/// A row in flight, plus the table it came from
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Record {
    /// Origin table, recorded only when the output asks for it
    pub(crate) source: Option<String>,
    pub(crate) fields: Row,
}

impl Record {
    pub(crate) fn new(fields: Row) -> Self {
        Self {
            source: None,
            fields,
        }
    }
}

/// Row counts observed during a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    /// Tables handed to the pipeline
    pub tables: usize,
    /// Tables skipped because they failed to parse or were empty
    pub tables_skipped: usize,
    /// Rows produced by the map stage
    pub rows_mapped: usize,
    /// Rows removed by filters
    pub rows_filtered: usize,
    /// Rows removed by dedupe
    pub rows_deduplicated: usize,
    /// Rows in the output
    pub rows_output: usize,
}

/// Result of a pipeline run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportOutput {
    /// Output column order
    pub headers: Vec<String>,
    /// Output rows, each holding exactly `headers`
    pub rows: Vec<Row>,
    /// Row counts per stage
    #[serde(skip)]
    pub stats: PipelineStats,
}

impl ReportOutput {
    /// Cell values of `row` in header order, rendered as text
    pub fn text_record(&self, row: &Row) -> Vec<String> {
        self.headers
            .iter()
            .map(|h| crate::table::opt_cell_text(row.get(h)).into_owned())
            .collect()
    }
}

/// Run the full pipeline.
///
/// Returns `None` when there is nothing to build: the template has no
/// headers, or no tables were supplied. Tables that failed to parse are
/// skipped and reported in [`PipelineStats::tables_skipped`].
pub fn run_pipeline(
    template: &[String],
    tables: &[Table],
    config: &ReportConfig,
) -> Option<ReportOutput> {
    if template.is_empty() {
        warn!("template has no headers, nothing to build");
        return None;
    }
    if tables.is_empty() {
        warn!("no input tables supplied");
        return None;
    }

    let mut stats = PipelineStats {
        tables: tables.len(),
        ..Default::default()
    };

    let mut records = map_rows(tables, config, &mut stats);
    stats.rows_mapped = records.len();
    debug!(rows = records.len(), "map stage complete");

    for t in &config.transforms {
        records = transform::apply_transform(records, t);
    }
    debug!(transforms = config.transforms.len(), "transform stage complete");

    for field in &config.derived_fields {
        records = derive::apply_derived(records, field);
    }
    debug!(derived = config.derived_fields.len(), "derive stage complete");

    let before = records.len();
    for f in &config.filters {
        records = filter::apply_filter(records, f);
    }
    stats.rows_filtered = before - records.len();
    debug!(removed = stats.rows_filtered, "filter stage complete");

    if let Some(rule) = config.active_dedupe() {
        let before = records.len();
        records = dedupe::dedupe(records, rule);
        stats.rows_deduplicated = before - records.len();
        debug!(removed = stats.rows_deduplicated, strategy = ?rule.strategy, "dedupe stage complete");
    }

    let (headers, rows) = format_rows(records, template, config.output_options);
    stats.rows_output = rows.len();

    info!(
        tables = stats.tables,
        skipped = stats.tables_skipped,
        mapped = stats.rows_mapped,
        output = stats.rows_output,
        "pipeline finished"
    );

    Some(ReportOutput {
        headers,
        rows,
        stats,
    })
}

/// Copy mapped cells out of every usable table, in table then row order.
fn map_rows(tables: &[Table], config: &ReportConfig, stats: &mut PipelineStats) -> Vec<Record> {
    let mut records = Vec::new();

    for table in tables {
        if !table.is_usable() {
            match &table.error {
                Some(error) => {
                    warn!(table = %table.name, %error, "skipping table that failed to parse")
                }
                None => debug!(table = %table.name, "skipping empty table"),
            }
            stats.tables_skipped += 1;
            continue;
        }

        let active: Vec<_> = config
            .column_mappings
            .iter()
            .filter(|m| m.applies_to(&table.name))
            .collect();

        for source_row in &table.rows {
            let fields: Row = active
                .iter()
                .map(|m| {
                    let value = match source_row.get(&m.source_column) {
                        None | Some(Value::Null) => Value::String(String::new()),
                        Some(v) => v.clone(),
                    };
                    (m.template_column.clone(), value)
                })
                .collect();

            records.push(Record {
                source: config
                    .output_options
                    .include_source_file
                    .then(|| table.name.clone()),
                fields,
            });
        }
    }

    records
}

/// Project records onto the template and resolve the output column order.
fn format_rows(
    records: Vec<Record>,
    template: &[String],
    options: OutputOptions,
) -> (Vec<String>, Vec<Row>) {
    let headers = resolve_headers(records.first(), template, options);

    let rows = records
        .into_iter()
        .map(|record| {
            headers
                .iter()
                .map(|header| {
                    let value = if options.include_source_file && header == SOURCE_FILE_COLUMN {
                        Value::String(record.source.clone().unwrap_or_default())
                    } else {
                        match record.fields.get(header) {
                            None | Some(Value::Null) => Value::String(String::new()),
                            Some(v) => v.clone(),
                        }
                    };
                    (header.clone(), value)
                })
                .collect()
        })
        .collect();

    (headers, rows)
}

/// Template order, or the first row's column order with any template
/// headers it lacks appended. `SourceFile` always comes last when enabled.
fn resolve_headers(first: Option<&Record>, template: &[String], options: OutputOptions) -> Vec<String> {
    let mut headers: Vec<String> = match (options.template_column_order, first) {
        (false, Some(record)) => {
            let wanted: HashSet<&str> = template.iter().map(String::as_str).collect();
            let mut ordered: Vec<String> = record
                .fields
                .keys()
                .filter(|k| wanted.contains(k.as_str()))
                .cloned()
                .collect();
            let present: HashSet<String> = ordered.iter().cloned().collect();
            ordered.extend(template.iter().filter(|h| !present.contains(*h)).cloned());
            ordered
        }
        _ => template.to_vec(),
    };

    if options.include_source_file && !headers.iter().any(|h| h == SOURCE_FILE_COLUMN) {
        headers.push(SOURCE_FILE_COLUMN.to_string());
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{ColumnMapping, DedupeRule, DedupeStrategy, Filter, FilterOperator};
    use crate::table::row_from_pairs;
    use crate::transforms::{DerivedField, DerivedKind, Transform, TransformKind};
    use serde_json::json;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn contacts() -> Table {
        Table::new(
            "contacts.csv",
            headers(&["Name", "Email"]),
            vec![
                row_from_pairs([("Name", "Alice"), ("Email", "a@x.com")]),
                row_from_pairs([("Name", "alice"), ("Email", "a@x.com")]),
            ],
        )
    }

    fn identity_config() -> ReportConfig {
        ReportConfig {
            column_mappings: vec![
                ColumnMapping::new("Name", "Name"),
                ColumnMapping::new("Email", "Email"),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_template_is_no_output() {
        assert!(run_pipeline(&[], &[contacts()], &identity_config()).is_none());
    }

    #[test]
    fn test_no_tables_is_no_output() {
        assert!(run_pipeline(&headers(&["Name"]), &[], &identity_config()).is_none());
    }

    #[test]
    fn test_failed_and_empty_tables_are_skipped() {
        let tables = vec![
            Table::failed("bad.csv", vec![], "boom"),
            contacts(),
            Table::new("empty.csv", headers(&["Name"]), vec![]),
        ];
        let out = run_pipeline(&headers(&["Name", "Email"]), &tables, &identity_config()).unwrap();
        assert_eq!(out.rows.len(), 2);
        assert_eq!(out.stats.tables_skipped, 2);
    }

    #[test]
    fn test_map_preserves_row_count_and_order() {
        let second = Table::new(
            "more.csv",
            headers(&["Name"]),
            vec![row_from_pairs([("Name", "Zed")])],
        );
        let out = run_pipeline(
            &headers(&["Name", "Email"]),
            &[contacts(), second],
            &identity_config(),
        )
        .unwrap();
        assert_eq!(out.stats.rows_mapped, 3);
        let names: Vec<_> = out.rows.iter().map(|r| r["Name"].clone()).collect();
        assert_eq!(names, vec![json!("Alice"), json!("alice"), json!("Zed")]);
        // missing source cell becomes empty
        assert_eq!(out.rows[2]["Email"], json!(""));
    }

    #[test]
    fn test_file_scoped_mappings() {
        let legacy = Table::new(
            "legacy.csv",
            headers(&["mail"]),
            vec![row_from_pairs([("mail", "old@x.com")])],
        );
        let config = ReportConfig {
            column_mappings: vec![
                ColumnMapping::new("Email", "Email").for_file("contacts.csv"),
                ColumnMapping::new("Email", "mail").for_file("legacy.csv"),
            ],
            ..Default::default()
        };
        let out = run_pipeline(&headers(&["Email"]), &[contacts(), legacy], &config).unwrap();
        let emails: Vec<_> = out.rows.iter().map(|r| r["Email"].clone()).collect();
        assert_eq!(emails, vec![json!("a@x.com"), json!("a@x.com"), json!("old@x.com")]);
    }

    #[test]
    fn test_source_file_column() {
        let mut config = identity_config();
        config.output_options.include_source_file = true;
        let out = run_pipeline(&headers(&["Name", "Email"]), &[contacts()], &config).unwrap();
        assert_eq!(out.headers, headers(&["Name", "Email", "SourceFile"]));
        assert_eq!(out.rows[0]["SourceFile"], json!("contacts.csv"));
    }

    #[test]
    fn test_format_drops_columns_outside_template() {
        let mut config = identity_config();
        config.derived_fields.push(
            DerivedField::new("Label", DerivedKind::Concat, ["Name", "Email"]).with_separator(" "),
        );
        let out = run_pipeline(&headers(&["Email"]), &[contacts()], &config).unwrap();
        assert_eq!(out.headers, headers(&["Email"]));
        assert!(out.rows[0].get("Label").is_none());
        assert!(out.rows[0].get("Name").is_none());
    }

    #[test]
    fn test_derived_field_fills_template_column() {
        let mut config = identity_config();
        config.derived_fields.push(
            DerivedField::new("Label", DerivedKind::Concat, ["Name", "Email"]).with_separator(" "),
        );
        let out = run_pipeline(&headers(&["Label"]), &[contacts()], &config).unwrap();
        assert_eq!(out.rows[0]["Label"], json!("Alice a@x.com"));
    }

    #[test]
    fn test_first_row_column_order() {
        let config = ReportConfig {
            column_mappings: vec![
                ColumnMapping::new("Email", "Email"),
                ColumnMapping::new("Name", "Name"),
            ],
            output_options: OutputOptions {
                include_source_file: true,
                template_column_order: false,
            },
            ..Default::default()
        };
        let template = headers(&["Name", "Phone", "Email"]);
        let out = run_pipeline(&template, &[contacts()], &config).unwrap();
        assert_eq!(out.headers, headers(&["Email", "Name", "Phone", "SourceFile"]));
        assert_eq!(out.rows[0]["Phone"], json!(""));
    }

    #[test]
    fn test_stage_order_transform_before_filter_before_dedupe() {
        let mut config = identity_config();
        config.transforms.push(Transform::new("Name", TransformKind::Uppercase));
        config.filters.push(Filter::new("Name", FilterOperator::Equals, "ALICE"));
        config.dedupe = Some(DedupeRule::new(["Name"], DedupeStrategy::First));
        let out = run_pipeline(&headers(&["Name", "Email"]), &[contacts()], &config).unwrap();
        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.stats.rows_filtered, 0);
        assert_eq!(out.stats.rows_deduplicated, 1);
    }

    #[test]
    fn test_caller_tables_are_not_modified() {
        let tables = vec![contacts()];
        let snapshot = tables.clone();
        let mut config = identity_config();
        config.transforms.push(Transform::new("Name", TransformKind::Uppercase));
        let _ = run_pipeline(&headers(&["Name"]), &tables, &config);
        assert_eq!(tables, snapshot);
    }

    #[test]
    fn test_text_record_follows_headers() {
        let out = run_pipeline(&headers(&["Email", "Name"]), &[contacts()], &identity_config()).unwrap();
        assert_eq!(out.text_record(&out.rows[0]), vec!["a@x.com", "Alice"]);
    }
}
