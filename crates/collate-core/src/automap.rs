//! Column auto-mapping
//!
//! Greedy one-pass matcher: template headers are visited in order and each
//! takes the best-scoring source header nobody has claimed yet. The result
//! depends on header order, which keeps it stable and predictable for a user
//! reviewing suggestions.

use std::collections::HashSet;

use tracing::debug;

use crate::report::{ColumnMapping, ReportConfig};
use crate::similarity::similarity;
use crate::table::Table;

/// Minimum score (exclusive) for an automatic match
pub const DEFAULT_THRESHOLD: f64 = 0.6;

/// A proposed template-to-source association
#[derive(Debug, Clone, PartialEq)]
pub struct Suggestion {
    /// Template header
    pub template_header: String,
    /// Matched source header
    pub source_header: String,
    /// Similarity score of the pair
    pub score: f64,
}

impl From<Suggestion> for ColumnMapping {
    fn from(s: Suggestion) -> Self {
        ColumnMapping::new(s.template_header, s.source_header)
    }
}

/// Suggest one source header per template header, with scores.
///
/// A source header is used at most once. A match is kept only when its score
/// is strictly greater than `threshold`; ties go to the earlier source header.
pub fn suggest(template: &[String], sources: &[String], threshold: f64) -> Vec<Suggestion> {
    let mut used: HashSet<&str> = HashSet::new();
    let mut suggestions = Vec::new();

    for template_header in template {
        let mut best: Option<(&str, f64)> = None;
        for source_header in sources {
            if used.contains(source_header.as_str()) {
                continue;
            }
            let score = similarity(template_header, source_header);
            if score > best.map_or(threshold, |(_, s)| s) {
                best = Some((source_header, score));
            }
        }

        if let Some((source_header, score)) = best {
            debug!(template = %template_header, source = %source_header, score, "auto-mapped column");
            used.insert(source_header);
            suggestions.push(Suggestion {
                template_header: template_header.clone(),
                source_header: source_header.to_string(),
                score,
            });
        }
    }

    suggestions
}

/// Map template headers to source headers, in template order.
///
/// Unmatched template headers are omitted.
pub fn auto_map(template: &[String], sources: &[String], threshold: f64) -> Vec<(String, String)> {
    suggest(template, sources, threshold)
        .into_iter()
        .map(|s| (s.template_header, s.source_header))
        .collect()
}

/// Best single header for a free-text term, scoring strictly above `threshold`.
pub fn best_match<'a>(term: &str, headers: &'a [String], threshold: f64) -> Option<&'a str> {
    let mut best: Option<(&str, f64)> = None;
    for header in headers {
        let score = similarity(term, header);
        if score > best.map_or(threshold, |(_, s)| s) {
            best = Some((header, score));
        }
    }
    best.map(|(header, _)| header)
}

/// Union of the headers of `tables`, in first-seen order.
pub fn source_headers(tables: &[Table]) -> Vec<String> {
    let mut seen = HashSet::new();
    tables
        .iter()
        .flat_map(|t| t.headers.iter())
        .filter(|h| seen.insert(h.as_str()))
        .cloned()
        .collect()
}

/// Return a copy of `config` with auto-mapped entries for unmapped template headers.
///
/// Existing mappings are kept untouched and their source columns are not
/// reused. Candidates are drawn from every table's headers.
pub fn fill_missing_mappings(
    config: &ReportConfig,
    template: &[String],
    tables: &[Table],
    threshold: f64,
) -> ReportConfig {
    let claimed: HashSet<&str> = config
        .column_mappings
        .iter()
        .map(|m| m.source_column.as_str())
        .collect();

    let unmapped: Vec<String> = template
        .iter()
        .filter(|h| !config.is_mapped(h))
        .cloned()
        .collect();

    let candidates: Vec<String> = source_headers(tables)
        .into_iter()
        .filter(|h| !claimed.contains(h.as_str()))
        .collect();

    let mut filled = config.clone();
    filled.column_mappings.extend(
        suggest(&unmapped, &candidates, threshold)
            .into_iter()
            .map(ColumnMapping::from),
    );
    filled
}
