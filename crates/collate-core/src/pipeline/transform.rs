//! Transform stage

use regex::{Captures, Regex};
use serde_json::Value;
use tracing::warn;

use super::Record;
use super::datetime::parse_to_iso;
use crate::table::{cell_number, cell_text, number_cell};
use crate::transforms::{Transform, TransformKind};

/// A transform ready to run over every row
enum CellOp<'a> {
    Trim,
    Lowercase,
    Uppercase,
    NumberParse,
    DateParse { format: Option<&'a str> },
    Replace { pattern: Regex, replacement: &'a str },
}

impl<'a> CellOp<'a> {
    /// Prepare a transform; `None` makes the whole stage a no-op.
    fn prepare(transform: &'a Transform) -> Option<Self> {
        let op = match transform.kind {
            TransformKind::Trim => Self::Trim,
            TransformKind::Lowercase => Self::Lowercase,
            TransformKind::Uppercase => Self::Uppercase,
            TransformKind::NumberParse => Self::NumberParse,
            TransformKind::DateParse => Self::DateParse {
                format: transform.date_format(),
            },
            TransformKind::Replace => {
                let search = transform.search_value()?;
                match Regex::new(search) {
                    Ok(pattern) => Self::Replace {
                        pattern,
                        replacement: transform.replace_value(),
                    },
                    Err(e) => {
                        warn!(column = %transform.column, pattern = %search, error = %e, "invalid replace pattern, skipping transform");
                        return None;
                    }
                }
            }
        };
        Some(op)
    }

    fn apply(&self, cell: &Value) -> Value {
        match self {
            Self::Trim => Value::String(cell_text(cell).trim().to_string()),
            Self::Lowercase => Value::String(cell_text(cell).to_lowercase()),
            Self::Uppercase => Value::String(cell_text(cell).to_uppercase()),
            Self::NumberParse => match cell_number(Some(cell)) {
                Some(n) if n.is_finite() => number_cell(n),
                _ => cell.clone(),
            },
            Self::DateParse { format } => match parse_to_iso(&cell_text(cell), *format) {
                Some(iso) => Value::String(iso),
                None => cell.clone(),
            },
            Self::Replace {
                pattern,
                replacement,
            } => Value::String(
                pattern
                    .replace_all(&cell_text(cell), |caps: &Captures<'_>| {
                        expand_replacement(caps, replacement)
                    })
                    .into_owned(),
            ),
        }
    }
}

/// Expand a replacement string for one match. `$1`..`$99` insert a capture
/// group, `$&` the whole match and `$$` a single dollar. A `$` that names no
/// existing group is copied as is, so `$5` and `$0.00` stay literal.
fn expand_replacement(caps: &Captures<'_>, replacement: &str) -> String {
    let group = |n: usize| caps.get(n).map_or("", |m| m.as_str());
    let digit = |b: Option<&u8>| {
        b.filter(|b| b.is_ascii_digit())
            .map(|b| usize::from(b - b'0'))
    };
    let groups = caps.len() - 1;
    let bytes = replacement.as_bytes();

    let mut out = String::with_capacity(replacement.len());
    let mut pending = 0;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'$' {
            i += 1;
            continue;
        }
        let (len, text) = match bytes.get(i + 1) {
            Some(&b'$') => (2, "$"),
            Some(&b'&') => (2, group(0)),
            _ => match (digit(bytes.get(i + 1)), digit(bytes.get(i + 2))) {
                (Some(tens), Some(ones)) if (1..=groups).contains(&(tens * 10 + ones)) => {
                    (3, group(tens * 10 + ones))
                }
                (Some(n), _) if (1..=groups).contains(&n) => (2, group(n)),
                _ => {
                    i += 1;
                    continue;
                }
            },
        };
        out.push_str(&replacement[pending..i]);
        out.push_str(text);
        i += len;
        pending = i;
    }
    out.push_str(&replacement[pending..]);
    out
}

/// Apply one transform to every record. Missing and null cells pass through.
pub(super) fn apply_transform(records: Vec<Record>, transform: &Transform) -> Vec<Record> {
    let Some(op) = CellOp::prepare(transform) else {
        return records;
    };

    records
        .into_iter()
        .map(|mut record| {
            if let Some(cell) = record.fields.get_mut(&transform.column)
                && !cell.is_null()
            {
                *cell = op.apply(cell);
            }
            record
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn records(cells: &[Value]) -> Vec<Record> {
        cells
            .iter()
            .map(|v| Record::new([("col".to_string(), v.clone())].into_iter().collect()))
            .collect()
    }

    fn run(transform: Transform, cells: &[Value]) -> Vec<Value> {
        apply_transform(records(cells), &transform)
            .into_iter()
            .map(|r| r.fields.get("col").cloned().unwrap_or(Value::Null))
            .collect()
    }

    #[test]
    fn test_string_ops() {
        assert_eq!(
            run(Transform::new("col", TransformKind::Trim), &[json!("  a b  ")]),
            vec![json!("a b")]
        );
        assert_eq!(
            run(Transform::new("col", TransformKind::Uppercase), &[json!("Alice")]),
            vec![json!("ALICE")]
        );
        assert_eq!(
            run(Transform::new("col", TransformKind::Lowercase), &[json!("MiXeD")]),
            vec![json!("mixed")]
        );
    }

    #[test]
    fn test_string_ops_stringify_numbers() {
        assert_eq!(
            run(Transform::new("col", TransformKind::Trim), &[json!(12)]),
            vec![json!("12")]
        );
    }

    #[test]
    fn test_number_parse_keeps_unparseable() {
        let out = run(
            Transform::new("col", TransformKind::NumberParse),
            &[json!("12.5kg"), json!("n/a"), json!(""), json!(3)],
        );
        assert_eq!(out, vec![json!(12.5), json!("n/a"), json!(""), json!(3.0)]);
    }

    #[test]
    fn test_date_parse_keeps_unparseable() {
        let out = run(
            Transform::new("col", TransformKind::DateParse),
            &[json!("2024-01-15"), json!("someday")],
        );
        assert_eq!(out, vec![json!("2024-01-15T00:00:00.000Z"), json!("someday")]);
    }

    #[test]
    fn test_replace_is_global_regex() {
        let out = run(
            Transform::replace("col", r"[^0-9]", ""),
            &[json!("(555) 123-4567")],
        );
        assert_eq!(out, vec![json!("5551234567")]);
    }

    #[rstest]
    #[case("free", "$5", "free", "$5")]
    #[case("N/A", "$0.00", "N/A", "$0.00")]
    #[case(r"(\d+)", "$1USD", "12", "12USD")]
    #[case(r"(\w+) (\w+)", "$2, $1", "Ada Lovelace", "Lovelace, Ada")]
    #[case(r"\d+", "[$&]", "a1b22", "a[1]b[22]")]
    #[case("x", "$$", "axb", "a$b")]
    #[case("(a)", "$12", "a", "a2")]
    #[case("(a)(b)?", "<$2>", "a", "<>")]
    #[case("-", "$name", "a-b", "a$nameb")]
    fn test_replace_value_expansion(
        #[case] search: &str,
        #[case] replacement: &str,
        #[case] input: &str,
        #[case] expected: &str,
    ) {
        let out = run(Transform::replace("col", search, replacement), &[json!(input)]);
        assert_eq!(out, vec![json!(expected)]);
    }

    #[test]
    fn test_replace_without_search_is_noop() {
        let transform = Transform::new("col", TransformKind::Replace);
        assert_eq!(run(transform, &[json!("keep me")]), vec![json!("keep me")]);
    }

    #[test]
    fn test_replace_with_invalid_pattern_is_noop() {
        let out = run(Transform::replace("col", "(unclosed", "x"), &[json!("(unclosed")]);
        assert_eq!(out, vec![json!("(unclosed")]);
    }

    #[test]
    fn test_missing_and_null_cells_pass_through() {
        let mut rows = records(&[Value::Null]);
        rows.push(Record::new(Default::default()));
        let out = apply_transform(rows, &Transform::new("col", TransformKind::Uppercase));
        assert_eq!(out[0].fields.get("col"), Some(&Value::Null));
        assert!(out[1].fields.get("col").is_none());
    }
}
