//! Report configuration
//!
//! A [`ReportConfig`] describes one pipeline run: how source columns map onto
//! the template, which transforms, derived fields, filters and dedupe rule
//! apply, and how the output is laid out. It is plain data; the pipeline
//! borrows it and never mutates it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::transforms::{DerivedField, Transform};

/// Name of the output column carrying a row's origin table
pub const SOURCE_FILE_COLUMN: &str = "SourceFile";

/// Association from a template column to a source column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMapping {
    /// Output column
    pub template_column: String,

    /// Column read from the source row
    pub source_column: String,

    /// Restrict the mapping to rows from this table; any table when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
}

impl ColumnMapping {
    /// Create a mapping that applies to every source table
    pub fn new(template_column: impl Into<String>, source_column: impl Into<String>) -> Self {
        Self {
            template_column: template_column.into(),
            source_column: source_column.into(),
            source_file: None,
        }
    }

    /// Scope the mapping to a single source table
    pub fn for_file(mut self, source_file: impl Into<String>) -> Self {
        self.source_file = Some(source_file.into());
        self
    }

    /// Whether the mapping applies to rows from `table`
    pub fn applies_to(&self, table: &str) -> bool {
        self.source_file.as_deref().is_none_or(|f| f == table)
    }
}

/// Filter comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterOperator {
    /// Case-insensitive equality
    Equals,
    /// Case-insensitive inequality
    NotEquals,
    /// Case-insensitive substring match
    Contains,
    /// Negated case-insensitive substring match
    NotContains,
    /// Numeric comparison; non-numeric never matches
    GreaterThan,
    /// Numeric comparison; non-numeric never matches
    LessThan,
    /// Missing, null, or whitespace only
    IsEmpty,
    /// Anything but [`FilterOperator::IsEmpty`]
    IsNotEmpty,
}

/// A row predicate; rows must pass every filter in the config
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    /// Column tested
    pub column: String,

    /// Comparison
    pub operator: FilterOperator,

    /// Right-hand side: a string or a number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl Filter {
    /// Create a filter comparing against `value`
    pub fn new(column: impl Into<String>, operator: FilterOperator, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            operator,
            value: Some(value.into()),
        }
    }

    /// Create a filter with no right-hand side (`is-empty`, `is-not-empty`)
    pub fn unary(column: impl Into<String>, operator: FilterOperator) -> Self {
        Self {
            column: column.into(),
            operator,
            value: None,
        }
    }
}

/// Which row survives when several share a dedupe key
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DedupeStrategy {
    /// Keep the first row seen
    #[default]
    First,
    /// Keep the content of the last row seen
    Last,
    /// Combine rows field by field, earliest non-empty value wins
    Merge,
}

/// Duplicate-removal rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DedupeRule {
    /// Columns forming the key, in order
    pub key_columns: Vec<String>,

    /// Survivor selection
    #[serde(default)]
    pub strategy: DedupeStrategy,
}

impl DedupeRule {
    /// Create a dedupe rule
    pub fn new<I, S>(key_columns: I, strategy: DedupeStrategy) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            key_columns: key_columns.into_iter().map(Into::into).collect(),
            strategy,
        }
    }
}

/// Output layout options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputOptions {
    /// Append a `SourceFile` column naming each row's origin table
    #[serde(default)]
    pub include_source_file: bool,

    /// Order columns by the template; otherwise by the first output row
    #[serde(default = "default_true")]
    pub template_column_order: bool,
}

fn default_true() -> bool {
    true
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            include_source_file: false,
            template_column_order: true,
        }
    }
}

/// Everything the pipeline needs for one run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportConfig {
    /// Free-text instructions (consumed by an instruction interpreter)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,

    /// Short free-text prompt (consumed by an instruction interpreter)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quick_prompt: Option<String>,

    /// Template column mappings
    #[serde(default)]
    pub column_mappings: Vec<ColumnMapping>,

    /// Column transforms, applied in order
    #[serde(default)]
    pub transforms: Vec<Transform>,

    /// Row filters, ANDed
    #[serde(default)]
    pub filters: Vec<Filter>,

    /// Optional dedupe rule
    #[serde(default)]
    pub dedupe: Option<DedupeRule>,

    /// Derived fields, applied in order
    #[serde(default)]
    pub derived_fields: Vec<DerivedField>,

    /// Output layout
    #[serde(default)]
    pub output_options: OutputOptions,
}

impl ReportConfig {
    /// Whether `template_column` has at least one mapping
    pub fn is_mapped(&self, template_column: &str) -> bool {
        self.column_mappings
            .iter()
            .any(|m| m.template_column == template_column)
    }

    /// Dedupe rule, if one is configured with at least one key column
    pub fn active_dedupe(&self) -> Option<&DedupeRule> {
        self.dedupe.as_ref().filter(|d| !d.key_columns.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transforms::TransformKind;

    #[test]
    fn test_parse_full_report_config() {
        let yaml = r#"
columnMappings:
  - templateColumn: Name
    sourceColumn: full_name
  - templateColumn: Email
    sourceColumn: mail
    sourceFile: legacy.csv
transforms:
  - column: Name
    type: trim
filters:
  - column: Age
    operator: greater-than
    value: 18
  - column: Email
    operator: is-not-empty
dedupe:
  keyColumns: [Email]
  strategy: merge
derivedFields:
  - name: Label
    type: concat
    sourceColumns: [Name, Email]
    separator: " / "
outputOptions:
  includeSourceFile: true
  templateColumnOrder: false
"#;
        let config: ReportConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.column_mappings.len(), 2);
        assert_eq!(
            config.column_mappings[1].source_file.as_deref(),
            Some("legacy.csv")
        );
        assert_eq!(config.transforms[0].kind, TransformKind::Trim);
        assert_eq!(config.filters[0].operator, FilterOperator::GreaterThan);
        assert_eq!(config.filters[0].value, Some(Value::from(18)));
        assert!(config.filters[1].value.is_none());
        assert_eq!(config.dedupe.as_ref().unwrap().strategy, DedupeStrategy::Merge);
        assert_eq!(config.derived_fields[0].separator.as_deref(), Some(" / "));
        assert!(config.output_options.include_source_file);
        assert!(!config.output_options.template_column_order);
    }

    #[test]
    fn test_parse_empty_config_uses_defaults() {
        let config: ReportConfig = serde_yaml::from_str("{}").unwrap();
        assert!(config.column_mappings.is_empty());
        assert!(config.dedupe.is_none());
        assert!(!config.output_options.include_source_file);
        assert!(config.output_options.template_column_order);
    }

    #[test]
    fn test_mapping_scope() {
        let any = ColumnMapping::new("Name", "name");
        let scoped = ColumnMapping::new("Name", "nm").for_file("b.csv");
        assert!(any.applies_to("a.csv"));
        assert!(scoped.applies_to("b.csv"));
        assert!(!scoped.applies_to("a.csv"));
    }

    #[test]
    fn test_dedupe_without_keys_is_inactive() {
        let config = ReportConfig {
            dedupe: Some(DedupeRule::new(Vec::<String>::new(), DedupeStrategy::First)),
            ..Default::default()
        };
        assert!(config.active_dedupe().is_none());
    }

    #[test]
    fn test_roundtrip_through_json() {
        let config = ReportConfig {
            column_mappings: vec![ColumnMapping::new("Email", "email")],
            filters: vec![Filter::new("Email", FilterOperator::Contains, "x.com")],
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"columnMappings\""));
        assert!(json.contains("\"operator\":\"contains\""));
        let back: ReportConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
