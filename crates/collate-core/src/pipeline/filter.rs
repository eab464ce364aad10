//! Filter stage

use serde_json::Value;

use super::Record;
use crate::report::{Filter, FilterOperator};
use crate::table::{Row, cell_number, opt_cell_text};

/// Keep only records that satisfy `filter`.
pub(super) fn apply_filter(records: Vec<Record>, filter: &Filter) -> Vec<Record> {
    records
        .into_iter()
        .filter(|record| matches(&record.fields, filter))
        .collect()
}

/// Whether `row` satisfies `filter`
pub fn matches(row: &Row, filter: &Filter) -> bool {
    let cell = row.get(&filter.column);
    let expected = filter.value.as_ref();

    match filter.operator {
        FilterOperator::Equals => lowered(cell) == lowered(expected),
        FilterOperator::NotEquals => lowered(cell) != lowered(expected),
        FilterOperator::Contains => lowered(cell).contains(&lowered(expected)),
        FilterOperator::NotContains => !lowered(cell).contains(&lowered(expected)),
        FilterOperator::GreaterThan => compare(cell, expected, |a, b| a > b),
        FilterOperator::LessThan => compare(cell, expected, |a, b| a < b),
        FilterOperator::IsEmpty => is_empty(cell),
        FilterOperator::IsNotEmpty => !is_empty(cell),
    }
}

fn lowered(value: Option<&Value>) -> String {
    opt_cell_text(value).to_lowercase()
}

/// Numeric comparison; a missing right-hand side counts as zero and a
/// non-numeric side never matches.
fn compare(cell: Option<&Value>, expected: Option<&Value>, op: impl Fn(f64, f64) -> bool) -> bool {
    let rhs = match expected {
        None => Some(0.0),
        Some(v) => cell_number(Some(v)),
    };
    match (cell_number(cell), rhs) {
        (Some(a), Some(b)) => op(a, b),
        _ => false,
    }
}

fn is_empty(cell: Option<&Value>) -> bool {
    opt_cell_text(cell).trim().is_empty()
}
