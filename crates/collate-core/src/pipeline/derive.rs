//! Derive stage

use serde_json::Value;

use super::Record;
use crate::table::{Row, cell_number, is_blank, number_cell, opt_cell_text};
use crate::transforms::{DerivedField, DerivedKind};

/// Compute one derived field on every record.
pub(super) fn apply_derived(records: Vec<Record>, field: &DerivedField) -> Vec<Record> {
    records
        .into_iter()
        .map(|mut record| {
            let value = compute(&record.fields, field);
            record.fields.insert(field.name.clone(), value);
            record
        })
        .collect()
}

fn compute(row: &Row, field: &DerivedField) -> Value {
    let sources = &field.source_columns;
    match field.kind {
        DerivedKind::Concat => {
            let separator = field.separator.as_deref().unwrap_or("");
            let parts: Vec<_> = sources
                .iter()
                .map(|c| opt_cell_text(row.get(c)))
                .collect();
            Value::String(parts.join(separator))
        }
        DerivedKind::Fallback => sources
            .iter()
            .map(|c| row.get(c))
            .find(|v| !is_blank(*v))
            .flatten()
            .cloned()
            .unwrap_or_else(|| Value::String(field.default_value.clone().unwrap_or_default())),
        DerivedKind::Add => number_cell(sources.iter().map(|c| operand(row, c, 0.0)).sum()),
        DerivedKind::Multiply => {
            number_cell(sources.iter().map(|c| operand(row, c, 1.0)).product())
        }
        DerivedKind::Subtract => match sources.as_slice() {
            [a, b, ..] => number_cell(operand(row, a, 0.0) - operand(row, b, 0.0)),
            _ => number_cell(0.0),
        },
        DerivedKind::Divide => match sources.as_slice() {
            [a, b, ..] => {
                let divisor = operand(row, b, 1.0);
                if divisor == 0.0 {
                    number_cell(0.0)
                } else {
                    number_cell(operand(row, a, 0.0) / divisor)
                }
            }
            _ => number_cell(0.0),
        },
    }
}

/// Numeric value of `row[column]`, or `default` when missing or non-numeric
fn operand(row: &Row, column: &str, default: f64) -> f64 {
    cell_number(row.get(column))
        .filter(|n| n.is_finite())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::row_from_pairs;
    use serde_json::json;

    fn derive(field: DerivedField, row: Row) -> Value {
        let out = apply_derived(vec![Record::new(row)], &field);
        out[0].fields.get(&field.name).cloned().unwrap()
    }

    #[test]
    fn test_concat_with_separator() {
        let row = row_from_pairs([("First", "Ada"), ("Last", "Lovelace")]);
        let field = DerivedField::new("Full", DerivedKind::Concat, ["First", "Last"]).with_separator(" ");
        assert_eq!(derive(field, row), json!("Ada Lovelace"));
    }

    #[test]
    fn test_concat_missing_is_empty() {
        let row = row_from_pairs([("First", "Ada")]);
        let field = DerivedField::new("Full", DerivedKind::Concat, ["First", "Middle", "Last"])
            .with_separator("-");
        assert_eq!(derive(field, row), json!("Ada--"));
    }

    #[test]
    fn test_fallback_order_and_default() {
        let row = row_from_pairs([("Work", ""), ("Home", "home@x.com")]);
        let field = DerivedField::new("Email", DerivedKind::Fallback, ["Missing", "Work", "Home"]);
        assert_eq!(derive(field, row.clone()), json!("home@x.com"));

        let field = DerivedField::new("Email", DerivedKind::Fallback, ["Work"]).with_default("none");
        assert_eq!(derive(field, row.clone()), json!("none"));

        let field = DerivedField::new("Email", DerivedKind::Fallback, ["Work"]);
        assert_eq!(derive(field, row), json!(""));
    }

    #[test]
    fn test_add_and_multiply_identities() {
        let row = row_from_pairs([("a", "2"), ("b", "x"), ("c", "4.5")]);
        let add = DerivedField::new("sum", DerivedKind::Add, ["a", "b", "c", "missing"]);
        assert_eq!(derive(add, row.clone()), json!(6.5));

        let mul = DerivedField::new("prod", DerivedKind::Multiply, ["a", "b", "c", "missing"]);
        assert_eq!(derive(mul, row), json!(9.0));
    }

    #[test]
    fn test_subtract_uses_first_two() {
        let row = row_from_pairs([("a", "10"), ("b", "3"), ("c", "100")]);
        let field = DerivedField::new("diff", DerivedKind::Subtract, ["a", "b", "c"]);
        assert_eq!(derive(field, row), json!(7.0));
    }

    #[test]
    fn test_divide_by_zero_yields_zero() {
        let row = row_from_pairs([("a", "10"), ("b", "0")]);
        let field = DerivedField::new("ratio", DerivedKind::Divide, ["a", "b"]);
        assert_eq!(derive(field, row), json!(0.0));
    }

    #[test]
    fn test_divide() {
        let row = row_from_pairs([("a", "10"), ("b", "4")]);
        let field = DerivedField::new("ratio", DerivedKind::Divide, ["a", "b"]);
        assert_eq!(derive(field, row), json!(2.5));
    }

    #[test]
    fn test_binary_kinds_need_two_sources() {
        let row = row_from_pairs([("a", "10")]);
        let sub = DerivedField::new("x", DerivedKind::Subtract, ["a"]);
        assert_eq!(derive(sub, row.clone()), json!(0.0));
        let div = DerivedField::new("x", DerivedKind::Divide, ["a"]);
        assert_eq!(derive(div, row), json!(0.0));
    }

    #[test]
    fn test_derived_field_overwrites_existing_column() {
        let row = row_from_pairs([("a", "1"), ("total", "stale")]);
        let field = DerivedField::new("total", DerivedKind::Add, ["a"]);
        assert_eq!(derive(field, row), json!(1.0));
    }
}
