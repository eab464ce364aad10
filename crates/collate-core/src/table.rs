//! Tables and cell values
//!
//! A [`Table`] is what a table source hands to the pipeline: a name, an
//! ordered header list and rows keyed by column name. Cells are plain JSON
//! scalars so numbers produced by transforms keep their type.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single row: column name to cell value, in insertion order
pub type Row = serde_json::Map<String, Value>;

/// A named table of rows
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Table name (the source file name for file-backed tables)
    pub name: String,

    /// Ordered, unique header names
    #[serde(default)]
    pub headers: Vec<String>,

    /// Row data
    #[serde(default)]
    pub rows: Vec<Row>,

    /// Parse error reported by the table source, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Table {
    /// Create a table from headers and rows
    pub fn new(name: impl Into<String>, headers: Vec<String>, rows: Vec<Row>) -> Self {
        Self {
            name: name.into(),
            headers,
            rows,
            error: None,
        }
    }

    /// Create a table standing in for a source that failed to parse
    pub fn failed(name: impl Into<String>, headers: Vec<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            headers,
            rows: Vec::new(),
            error: Some(error.into()),
        }
    }

    /// Get the number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Whether the pipeline should read rows from this table
    pub fn is_usable(&self) -> bool {
        self.error.is_none() && !self.rows.is_empty()
    }
}

/// Build a row of string cells from `(column, value)` pairs.
pub fn row_from_pairs<K, V, I>(pairs: I) -> Row
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), Value::String(v.into())))
        .collect()
}

/// String form of a cell. Null renders as the empty string.
pub fn cell_text(value: &Value) -> Cow<'_, str> {
    match value {
        Value::Null => Cow::Borrowed(""),
        Value::String(s) => Cow::Borrowed(s.as_str()),
        Value::Bool(b) => Cow::Owned(b.to_string()),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Cow::Owned(i.to_string())
            } else if let Some(u) = n.as_u64() {
                Cow::Owned(u.to_string())
            } else {
                Cow::Owned(format_number(n.as_f64().unwrap_or_default()))
            }
        }
        other => Cow::Owned(other.to_string()),
    }
}

/// String form of an optional cell; a missing cell is the empty string.
pub fn opt_cell_text(value: Option<&Value>) -> Cow<'_, str> {
    value.map(cell_text).unwrap_or(Cow::Borrowed(""))
}

/// A cell that is missing, null, or the empty string
pub fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

/// Render a float the way a spreadsheet user expects: integral values
/// without a trailing `.0`.
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        "0".to_string()
    } else if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e21 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

/// Convert a float into a cell. Non-finite results become null.
pub fn number_cell(value: f64) -> Value {
    serde_json::Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

static NUMERIC_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(?:Infinity|(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][+-]?\d+)?)")
        .expect("numeric prefix pattern is valid")
});

/// Parse the leading numeric prefix of `text` (`"12.5kg"` is `12.5`).
///
/// Leading whitespace is skipped. Returns `None` when no digits lead the text.
pub fn parse_number_prefix(text: &str) -> Option<f64> {
    let trimmed = text.trim_start();
    let prefix = NUMERIC_PREFIX.find(trimmed)?.as_str();
    prefix.parse::<f64>().ok()
}

/// Numeric value of a cell, using [`parse_number_prefix`] for text.
pub fn cell_number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_number_prefix(s),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case("42", Some(42.0))]
    #[case("  3.5kg", Some(3.5))]
    #[case("-1e3x", Some(-1000.0))]
    #[case(".25", Some(0.25))]
    #[case("1e", Some(1.0))]
    #[case("abc", None)]
    #[case("", None)]
    #[case("Infinity", Some(f64::INFINITY))]
    fn test_parse_number_prefix(#[case] input: &str, #[case] expected: Option<f64>) {
        assert_eq!(parse_number_prefix(input), expected);
    }

    #[test]
    fn test_cell_text_renders_scalars() {
        assert_eq!(cell_text(&Value::Null), "");
        assert_eq!(cell_text(&json!("a")), "a");
        assert_eq!(cell_text(&json!(7)), "7");
        assert_eq!(cell_text(&json!(2.0)), "2");
        assert_eq!(cell_text(&json!(2.5)), "2.5");
        assert_eq!(cell_text(&json!(true)), "true");
    }

    #[test]
    fn test_is_blank() {
        assert!(is_blank(None));
        assert!(is_blank(Some(&Value::Null)));
        assert!(is_blank(Some(&json!(""))));
        assert!(!is_blank(Some(&json!(" "))));
        assert!(!is_blank(Some(&json!(0))));
    }

    #[test]
    fn test_number_cell_drops_non_finite() {
        assert_eq!(number_cell(1.5), json!(1.5));
        assert_eq!(number_cell(f64::NAN), Value::Null);
    }

    #[test]
    fn test_failed_table_is_not_usable() {
        let table = Table::failed("broken.csv", vec![], "unexpected quote");
        assert!(!table.is_usable());
        assert_eq!(table.row_count(), 0);

        let ok = Table::new(
            "ok.csv",
            vec!["a".into()],
            vec![row_from_pairs([("a", "1")])],
        );
        assert!(ok.is_usable());
    }
}
