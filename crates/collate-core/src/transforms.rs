//! Transform and derived-field configuration
//!
//! Transforms rewrite a single column in place. Derived fields compute a new
//! column from other columns. Both are applied by the pipeline in the order
//! they are listed.
//!
//! # Example
//!
//! ```yaml
//! transforms:
//!   - column: Email
//!     type: lowercase
//!   - column: Phone
//!     type: replace
//!     params:
//!       searchValue: "[^0-9]"
//!       replaceValue: ""
//!
//! derivedFields:
//!   - name: Full Name
//!     type: concat
//!     sourceColumns: [First, Last]
//!     separator: " "
//! ```

use serde::{Deserialize, Serialize};

/// Built-in column transforms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransformKind {
    /// Strip leading and trailing whitespace
    Trim,
    /// Lowercase the text
    Lowercase,
    /// Uppercase the text
    Uppercase,
    /// Parse the leading numeric prefix into a number
    NumberParse,
    /// Parse a calendar date/time into an ISO-8601 instant
    DateParse,
    /// Regex search and replace over the whole value
    Replace,
}

/// Optional transform parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformParams {
    /// Regex pattern for `replace`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_value: Option<String>,

    /// Replacement text for `replace` (empty when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replace_value: Option<String>,

    /// Input layout for `date-parse`, a chrono `strftime` pattern tried before
    /// the built-in layouts. The output is always RFC 3339.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_format: Option<String>,
}

/// A single column transform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Column to rewrite
    pub column: String,

    /// What to do with it
    #[serde(rename = "type")]
    pub kind: TransformKind,

    /// Kind-specific parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<TransformParams>,
}

impl Transform {
    /// Create a transform without parameters
    pub fn new(column: impl Into<String>, kind: TransformKind) -> Self {
        Self {
            column: column.into(),
            kind,
            params: None,
        }
    }

    /// Create a `replace` transform
    pub fn replace(
        column: impl Into<String>,
        search: impl Into<String>,
        replacement: impl Into<String>,
    ) -> Self {
        Self {
            column: column.into(),
            kind: TransformKind::Replace,
            params: Some(TransformParams {
                search_value: Some(search.into()),
                replace_value: Some(replacement.into()),
                date_format: None,
            }),
        }
    }

    /// Regex pattern of a `replace` transform, if set
    pub fn search_value(&self) -> Option<&str> {
        self.params.as_ref()?.search_value.as_deref()
    }

    /// Replacement text, defaulting to empty
    pub fn replace_value(&self) -> &str {
        self.params
            .as_ref()
            .and_then(|p| p.replace_value.as_deref())
            .unwrap_or("")
    }

    /// Explicit date format, if set
    pub fn date_format(&self) -> Option<&str> {
        self.params.as_ref()?.date_format.as_deref()
    }
}

/// Ways of computing a derived field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DerivedKind {
    /// Join the source values with a separator
    Concat,
    /// First non-empty source value, else the default
    Fallback,
    /// Sum of all sources
    Add,
    /// First source minus the second
    Subtract,
    /// Product of all sources
    Multiply,
    /// First source divided by the second
    Divide,
}

impl DerivedKind {
    /// Whether the kind reads exactly two operands
    pub fn is_binary(&self) -> bool {
        matches!(self, Self::Subtract | Self::Divide)
    }
}

/// A computed output column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedField {
    /// Column written by the field
    pub name: String,

    /// How the value is computed
    #[serde(rename = "type")]
    pub kind: DerivedKind,

    /// Columns read, in order
    #[serde(default)]
    pub source_columns: Vec<String>,

    /// Separator for `concat`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub separator: Option<String>,

    /// Value used by `fallback` when every source is empty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

impl DerivedField {
    /// Create a derived field with no separator or default
    pub fn new<I, S>(name: impl Into<String>, kind: DerivedKind, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            kind,
            source_columns: sources.into_iter().map(Into::into).collect(),
            separator: None,
            default_value: None,
        }
    }

    /// Set the concat separator
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = Some(separator.into());
        self
    }

    /// Set the fallback default
    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default_value = Some(default.into());
        self
    }
}
