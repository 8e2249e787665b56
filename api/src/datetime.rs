//! ISO-8601 parsing and the two wire renderings of dates.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

const NAIVE_DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
];

/// Parses an ISO-8601 date or date-time, treating zone-less input as UTC.
pub(crate) fn parse_iso8601(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in NAIVE_DATE_TIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Renders the calendar date as `YYYY-MM-DD`.
pub(crate) fn render_date(value: &DateTime<Utc>) -> String {
    value.format("%Y-%m-%d").to_string()
}

/// Renders as RFC 3339 in UTC with a `Z` suffix and whole seconds.
pub(crate) fn render_date_time(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_forms() {
        for input in [
            "2021-09-01",
            "2021-09-01T00:00:00Z",
            "2021-09-01T00:00:00",
            "2021-09-01T00:00",
            "2021-09-01T02:00:00+02:00",
            "2021-09-01 00:00:00.000",
        ] {
            let parsed = parse_iso8601(input).unwrap_or_else(|| panic!("{input} should parse"));
            assert_eq!(render_date(&parsed), "2021-09-01", "{input}");
        }
    }

    #[test]
    fn test_rejects_partial_time() {
        assert!(parse_iso8601("2021-09-01T").is_none());
        assert!(parse_iso8601("yesterday").is_none());
        assert!(parse_iso8601("2021-13-01").is_none());
    }

    #[test]
    fn test_render_date_time() {
        let parsed = parse_iso8601("2021-09-01T10:30:15.250+01:00").unwrap();
        assert_eq!(render_date_time(&parsed), "2021-09-01T09:30:15Z");
    }
}
