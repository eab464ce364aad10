//! Dedupe stage
//!
//! Rows are grouped by key in scan order. Every strategy emits one row per
//! key at the position where the key was first seen; the strategy only
//! decides what that row contains.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use super::Record;
use crate::report::{DedupeRule, DedupeStrategy};
use crate::table::{Row, is_blank, opt_cell_text};

/// Joins key parts; ASCII unit separator, which CSV data practically never holds
const KEY_SEPARATOR: &str = "\u{1f}";

/// Collapse records sharing a key according to `rule`.
pub(super) fn dedupe(records: Vec<Record>, rule: &DedupeRule) -> Vec<Record> {
    let mut kept: Vec<Record> = Vec::with_capacity(records.len());
    let mut positions: HashMap<String, usize> = HashMap::new();

    for record in records {
        match positions.entry(dedupe_key(&record.fields, &rule.key_columns)) {
            Entry::Vacant(slot) => {
                slot.insert(kept.len());
                kept.push(record);
            }
            Entry::Occupied(slot) => {
                let existing = &mut kept[*slot.get()];
                match rule.strategy {
                    DedupeStrategy::First => {}
                    DedupeStrategy::Last => *existing = record,
                    DedupeStrategy::Merge => {
                        *existing = merge(std::mem::take(existing), record);
                    }
                }
            }
        }
    }

    kept
}

/// Key of `row` over `columns`; missing cells contribute the empty string.
pub fn dedupe_key(row: &Row, columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| opt_cell_text(row.get(c)))
        .collect::<Vec<_>>()
        .join(KEY_SEPARATOR)
}

/// Fold `newer` into `existing`: a field keeps its earliest non-empty value.
fn merge(existing: Record, newer: Record) -> Record {
    let mut fields = existing.fields;
    for (column, value) in newer.fields {
        if is_blank(fields.get(&column)) {
            fields.insert(column, value);
        }
    }
    Record {
        source: existing.source,
        fields,
    }
}
