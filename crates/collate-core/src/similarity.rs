//! Header similarity
//!
//! Scores how alike two column names are. Both names are normalized to their
//! lowercase letters and digits, then compared by Levenshtein distance
//! relative to the longer name.

use rapidfuzz::distance::levenshtein;

/// Lowercase `header` and keep only ASCII letters and digits.
///
/// `"Email Address"`, `"email_address"` and `"E-mail address"` normalize to
/// `"emailaddress"`, `"emailaddress"` and `"emailaddress"`.
pub fn normalize_header(header: &str) -> String {
    header
        .to_lowercase()
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect()
}

/// Similarity of two header names in `[0, 1]`.
///
/// Identical normalized names (including two empty ones) score `1.0`.
/// Otherwise the score is `(max_len - distance) / max_len`.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = normalize_header(a);
    let b = normalize_header(b);
    if a == b {
        return 1.0;
    }

    let max_len = a.chars().count().max(b.chars().count());
    let distance = levenshtein::distance(a.chars(), b.chars());
    (max_len - distance.min(max_len)) as f64 / max_len as f64
}
