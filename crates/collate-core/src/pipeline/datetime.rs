//! Date/time parsing for the `date-parse` transform
//!
//! Accepts RFC 3339, RFC 2822 and a set of common spreadsheet layouts and
//! renders the result as a UTC instant with millisecond precision, e.g.
//! `2024-01-15T00:00:00.000Z`. Values without an offset are read as UTC.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%b %d %Y",
    "%d %B %Y",
    "%d %b %Y",
];

/// Parse `text` as a calendar date/time and render it as an ISO-8601 instant.
///
/// `format`, when given, is a chrono `strftime` pattern tried before the
/// built-in layouts. Returns `None` when nothing matches.
pub fn parse_to_iso(text: &str, format: Option<&str>) -> Option<String> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let instant = format
        .and_then(|f| parse_with_format(text, f))
        .or_else(|| parse_builtin(text))?;
    Some(instant.to_rfc3339_opts(SecondsFormat::Millis, true))
}

fn parse_with_format(text: &str, format: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_str(text, format) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
        return Some(dt.and_utc());
    }
    NaiveDate::parse_from_str(text, format)
        .ok()
        .and_then(start_of_day)
}

fn parse_builtin(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Some(dt) = DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(text, f).ok())
    {
        return Some(dt.and_utc());
    }
    if let Some(date) = DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(text, f).ok())
    {
        return start_of_day(date);
    }
    // Year and month only: first day of the month
    NaiveDate::parse_from_str(&format!("{text}-01"), "%Y-%m-%d")
        .ok()
        .and_then(start_of_day)
}

fn start_of_day(date: NaiveDate) -> Option<DateTime<Utc>> {
    date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("2024-01-15", "2024-01-15T00:00:00.000Z")]
    #[case("2024-01-15T10:30:00Z", "2024-01-15T10:30:00.000Z")]
    #[case("2024-01-15T10:30:00+02:00", "2024-01-15T08:30:00.000Z")]
    #[case("2024-01-15 10:30:45.250", "2024-01-15T10:30:45.250Z")]
    #[case("01/15/2024", "2024-01-15T00:00:00.000Z")]
    #[case("2024/01/15", "2024-01-15T00:00:00.000Z")]
    #[case("January 15, 2024", "2024-01-15T00:00:00.000Z")]
    #[case("15 Jan 2024", "2024-01-15T00:00:00.000Z")]
    #[case("Mon, 15 Jan 2024 10:00:00 +0000", "2024-01-15T10:00:00.000Z")]
    #[case("2024-03", "2024-03-01T00:00:00.000Z")]
    #[case("  2024-01-15  ", "2024-01-15T00:00:00.000Z")]
    fn test_parses_common_layouts(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(parse_to_iso(input, None).as_deref(), Some(expected));
    }

    #[rstest]
    #[case("")]
    #[case("not a date")]
    #[case("2024-13-45")]
    #[case("02/30/2024")]
    fn test_rejects_garbage(#[case] input: &str) {
        assert_eq!(parse_to_iso(input, None), None);
    }

    #[test]
    fn test_explicit_format_wins() {
        // day-first would be misread as month-first by the built-ins
        assert_eq!(
            parse_to_iso("03/04/2024", Some("%d/%m/%Y")).as_deref(),
            Some("2024-04-03T00:00:00.000Z")
        );
        assert_eq!(
            parse_to_iso("03/04/2024", None).as_deref(),
            Some("2024-03-04T00:00:00.000Z")
        );
    }

    #[test]
    fn test_bad_explicit_format_falls_back() {
        assert_eq!(
            parse_to_iso("2024-01-15", Some("%d.%m.%Y")).as_deref(),
            Some("2024-01-15T00:00:00.000Z")
        );
    }
}
