//! Instruction interpreter
//!
//! Turns free-text report instructions ("dedupe by email, keep last") into
//! pipeline configuration. The heuristic interpreter is a best-effort pattern
//! matcher: it reads one clause at a time and resolves every column it finds
//! against the known headers by similarity. Anything it cannot resolve is
//! dropped silently.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::automap::{DEFAULT_THRESHOLD, auto_map, best_match};
use crate::report::{
    ColumnMapping, DedupeRule, DedupeStrategy, Filter, FilterOperator, OutputOptions, ReportConfig,
};
use crate::transforms::{DerivedField, DerivedKind, Transform, TransformKind};

/// Minimum similarity (exclusive) for resolving a column named in text
pub const TERM_THRESHOLD: f64 = 0.5;

/// Header keywords that mark a column as holding dates
const DATE_KEYWORDS: &[&str] = &["date", "time", "created", "updated", "modified"];

/// Key columns tried, in order, when a dedupe instruction names none
const COMMON_KEYS: &[&str] = &["email", "id", "email address", "customer id", "user id"];

/// Configuration fragments extracted from instruction text
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedInstructions {
    /// Column mappings, explicit or auto-mapped
    pub column_mappings: Vec<ColumnMapping>,
    /// Row filters
    pub filters: Vec<Filter>,
    /// Column transforms
    pub transforms: Vec<Transform>,
    /// Dedupe rule
    pub dedupe: Option<DedupeRule>,
    /// Derived fields
    pub derived_fields: Vec<DerivedField>,
    /// Output layout
    pub output_options: OutputOptions,
}

/// Something that reads instruction text into configuration
pub trait InstructionInterpreter {
    /// Interpret `text` against the template headers and the source headers.
    fn interpret(&self, text: &str, template: &[String], sources: &[String]) -> ParsedInstructions;
}

/// Regex-driven interpreter for short English instructions
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicInterpreter;

// Clause boundaries: semicolons, newlines, or a period ending a sentence.
// A period inside a value such as `x.com` is not a boundary.
static CLAUSE_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[;\n]|\.\s+|\.$").expect("valid clause pattern"));

static MAP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\bmap\s+['"]?(.+?)['"]?\s+to\s+['"]?(.+?)['"]?\s*$"#).expect("valid map pattern")
});

static FILTER_EMPTY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\b(filter out|exclude|remove|filter|include|keep)\b.*?\bwhere\s+['"]?(.+?)['"]?\s+is\s+(?:empty|null|blank)\s*$"#)
        .expect("valid empty filter pattern")
});

static FILTER_CONTAINS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\b(filter out|exclude|remove|filter|include|keep)\b.*?\bwhere\s+['"]?(.+?)['"]?\s+contains?\s+['"]?(.+?)['"]?\s*$"#)
        .expect("valid contains filter pattern")
});

static FILTER_EQUALS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\b(filter out|exclude|remove|filter|include|keep)\b.*?\bwhere\s+['"]?(.+?)['"]?\s+(?:is|equals?|==)\s+['"]?(.+?)['"]?\s*$"#)
        .expect("valid equals filter pattern")
});

static TRIM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\b(?:trim|remove whitespace)\b.*?\b(?:from|on|column)\s+['"]?(.+?)['"]?\s*$"#)
        .expect("valid trim pattern")
});

static CASE_OR_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\b(lowercase|lower case|uppercase|upper case|parse number|convert to number)\b.*?\b(?:from|on|column)\s+['"]?(.+?)['"]?\s*$"#)
        .expect("valid case pattern")
});

static DATES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\b(?:convert|format|parse)\b.*?\bdates?\b.*?\b(?:to|as)\s+\S"#)
        .expect("valid date pattern")
});

static DEDUPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\b(?:remove duplicates?|dedupe|deduplicate)\b.*?\b(?:based on|by|using)\s+['"]?(.+?)['"]?\s*$"#)
        .expect("valid dedupe pattern")
});

static CONCAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\b(?:create|make|add|new field)\s+['"]?(.+?)['"]?\s+(?:by|from)\s+(?:concatenating|combining|joining)\s+['"]?(.+?)['"]?\s+(?:and|&)\s+['"]?(.+?)['"]?\s*$"#)
        .expect("valid concat pattern")
});

static LIST_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*,\s*|\s+and\s+").expect("valid list pattern"));

impl InstructionInterpreter for HeuristicInterpreter {
    fn interpret(&self, text: &str, template: &[String], sources: &[String]) -> ParsedInstructions {
        let text = text.trim();
        if text.is_empty() {
            return ParsedInstructions::default();
        }

        let lower = text.to_lowercase();
        let clauses: Vec<&str> = CLAUSE_BREAK
            .split(text)
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .collect();

        let parsed = ParsedInstructions {
            column_mappings: column_mappings(&clauses, template, sources),
            filters: filters(&clauses, template),
            transforms: transforms(&clauses, &lower, template),
            dedupe: dedupe(&clauses, &lower, template),
            derived_fields: derived_fields(&clauses, template),
            output_options: OutputOptions {
                include_source_file: lower.contains("source file")
                    || lower.contains("include source"),
                template_column_order: !(lower.contains("don't use template order")
                    || lower.contains("do not use template order")),
            },
        };

        debug!(
            mappings = parsed.column_mappings.len(),
            filters = parsed.filters.len(),
            transforms = parsed.transforms.len(),
            dedupe = parsed.dedupe.is_some(),
            derived = parsed.derived_fields.len(),
            "interpreted instructions"
        );
        parsed
    }
}

fn resolve(term: &str, headers: &[String]) -> Option<String> {
    best_match(term.trim(), headers, TERM_THRESHOLD).map(str::to_string)
}

fn column_mappings(clauses: &[&str], template: &[String], sources: &[String]) -> Vec<ColumnMapping> {
    let explicit: Vec<ColumnMapping> = clauses
        .iter()
        .filter_map(|clause| MAP.captures(clause))
        .filter_map(|caps| {
            let source = resolve(&caps[1], sources)?;
            let target = resolve(&caps[2], template)?;
            Some(ColumnMapping::new(target, source))
        })
        .collect();

    if !explicit.is_empty() {
        return explicit;
    }

    auto_map(template, sources, DEFAULT_THRESHOLD)
        .into_iter()
        .map(|(target, source)| ColumnMapping::new(target, source))
        .collect()
}

fn filters(clauses: &[&str], headers: &[String]) -> Vec<Filter> {
    let mut filters = Vec::new();

    for clause in clauses {
        let filter = if let Some(caps) = FILTER_EMPTY.captures(clause) {
            let op = if is_exclusion(&caps[1]) {
                FilterOperator::IsNotEmpty
            } else {
                FilterOperator::IsEmpty
            };
            resolve(&caps[2], headers).map(|column| Filter::unary(column, op))
        } else if let Some(caps) = FILTER_CONTAINS.captures(clause) {
            let op = if is_exclusion(&caps[1]) {
                FilterOperator::NotContains
            } else {
                FilterOperator::Contains
            };
            resolve(&caps[2], headers).map(|column| Filter::new(column, op, caps[3].trim()))
        } else if let Some(caps) = FILTER_EQUALS.captures(clause) {
            let op = if is_exclusion(&caps[1]) {
                FilterOperator::NotEquals
            } else {
                FilterOperator::Equals
            };
            resolve(&caps[2], headers).map(|column| Filter::new(column, op, caps[3].trim()))
        } else {
            None
        };

        filters.extend(filter);
    }

    filters
}

fn is_exclusion(verb: &str) -> bool {
    matches!(verb.to_lowercase().as_str(), "filter out" | "exclude" | "remove")
}

fn transforms(clauses: &[&str], lower: &str, headers: &[String]) -> Vec<Transform> {
    let mut transforms = Vec::new();

    let mut trimmed_named = false;
    for caps in clauses.iter().filter_map(|c| TRIM.captures(c)) {
        if let Some(column) = resolve(&caps[1], headers) {
            transforms.push(Transform::new(column, TransformKind::Trim));
            trimmed_named = true;
        }
    }
    if !trimmed_named && lower.contains("trim") {
        transforms.extend(
            headers
                .iter()
                .map(|h| Transform::new(h.clone(), TransformKind::Trim)),
        );
    }

    for caps in clauses.iter().filter_map(|c| CASE_OR_NUMBER.captures(c)) {
        let kind = match caps[1].to_lowercase().as_str() {
            "lowercase" | "lower case" => TransformKind::Lowercase,
            "uppercase" | "upper case" => TransformKind::Uppercase,
            _ => TransformKind::NumberParse,
        };
        if let Some(column) = resolve(&caps[2], headers) {
            transforms.push(Transform::new(column, kind));
        }
    }

    // the requested layout is an output shape, and date-parse always emits RFC 3339
    if clauses.iter().any(|c| DATES.is_match(c)) {
        transforms.extend(
            headers
                .iter()
                .filter(|h| is_date_header(h))
                .map(|h| Transform::new(h.clone(), TransformKind::DateParse)),
        );
    }

    transforms
}

fn is_date_header(header: &str) -> bool {
    let header = header.to_lowercase();
    DATE_KEYWORDS.iter().any(|k| header.contains(k))
}

fn dedupe(clauses: &[&str], lower: &str, headers: &[String]) -> Option<DedupeRule> {
    if !(lower.contains("duplicate") || lower.contains("dedupe")) {
        return None;
    }

    let mut keys: Vec<String> = Vec::new();
    for caps in clauses.iter().filter_map(|c| DEDUPE.captures(c)) {
        for term in LIST_BREAK.split(&caps[1]) {
            if let Some(column) = resolve(term, headers)
                && !keys.contains(&column)
            {
                keys.push(column);
            }
        }
    }

    if keys.is_empty() {
        keys.extend(COMMON_KEYS.iter().find_map(|k| resolve(k, headers)));
    }
    if keys.is_empty() {
        return None;
    }

    let strategy = if lower.contains("keep last") || lower.contains("keep most recent") {
        DedupeStrategy::Last
    } else if lower.contains("merge") {
        DedupeStrategy::Merge
    } else {
        DedupeStrategy::First
    };

    Some(DedupeRule::new(keys, strategy))
}

fn derived_fields(clauses: &[&str], headers: &[String]) -> Vec<DerivedField> {
    clauses
        .iter()
        .filter_map(|clause| CONCAT.captures(clause))
        .filter_map(|caps| {
            let first = resolve(&caps[2], headers)?;
            let second = resolve(&caps[3], headers)?;
            Some(
                DerivedField::new(caps[1].trim(), DerivedKind::Concat, [first, second])
                    .with_separator(" "),
            )
        })
        .collect()
}

/// Instruction text of `config`: the quick prompt followed by the instructions.
pub fn instruction_text(config: &ReportConfig) -> String {
    [config.quick_prompt.as_deref(), config.instructions.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Combine interpreted instructions with an existing config.
///
/// Explicit mappings win when there are any; filters, transforms and
/// derived fields are appended after the existing ones; an existing dedupe
/// rule wins.
pub fn merge_with_config(parsed: ParsedInstructions, existing: &ReportConfig) -> ReportConfig {
    ReportConfig {
        instructions: existing.instructions.clone(),
        quick_prompt: existing.quick_prompt.clone(),
        column_mappings: if existing.column_mappings.is_empty() {
            parsed.column_mappings
        } else {
            existing.column_mappings.clone()
        },
        filters: existing.filters.iter().cloned().chain(parsed.filters).collect(),
        transforms: existing.transforms.iter().cloned().chain(parsed.transforms).collect(),
        dedupe: existing.dedupe.clone().or(parsed.dedupe),
        derived_fields: existing
            .derived_fields
            .iter()
            .cloned()
            .chain(parsed.derived_fields)
            .collect(),
        output_options: OutputOptions {
            include_source_file: existing.output_options.include_source_file
                || parsed.output_options.include_source_file,
            template_column_order: existing.output_options.template_column_order
                && parsed.output_options.template_column_order,
        },
    }
}
