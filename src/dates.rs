//! Date normalization for heterogeneous provider timestamps.
//!
//! Providers disagree on formats (RFC 3339, RFC 2822, bare dates, epoch
//! seconds or milliseconds). `normalize_date` is total: anything it cannot
//! parse becomes "now", so one malformed timestamp never sinks an item.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use time::format_description::well_known::Rfc2822;
use time::OffsetDateTime;

/// Parse a provider timestamp into a canonical UTC instant.
pub fn normalize_date(raw: Option<&str>) -> DateTime<Utc> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(parse_any)
        .unwrap_or_else(Utc::now)
}

fn parse_any(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Some(dt) = parse_rfc2822(s) {
        return Some(dt);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|n| n.and_utc());
    }
    parse_epoch(s)
}

fn parse_rfc2822(s: &str) -> Option<DateTime<Utc>> {
    let parsed = OffsetDateTime::parse(s, &Rfc2822).ok()?;
    DateTime::from_timestamp(parsed.unix_timestamp(), 0)
}

fn parse_epoch(s: &str) -> Option<DateTime<Utc>> {
    let n: i64 = s.parse().ok()?;
    // Heuristic: anything past the year ~33658 in seconds is milliseconds.
    let secs = if n.abs() >= 1_000_000_000_000 { n / 1000 } else { n };
    DateTime::from_timestamp(secs, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rfc3339() {
        let dt = normalize_date(Some("2025-03-01T12:30:00Z"));
        assert_eq!(dt.timestamp(), 1740832200);
    }

    #[test]
    fn parses_rfc2822() {
        let dt = normalize_date(Some("Sat, 01 Mar 2025 12:30:00 GMT"));
        assert_eq!(dt.timestamp(), 1740832200);
    }

    #[test]
    fn parses_space_separated_and_bare_date() {
        let dt = normalize_date(Some("2025-03-01 12:30:00"));
        assert_eq!(dt.timestamp(), 1740832200);
        let dt = normalize_date(Some("2025-03-01"));
        assert_eq!(dt.timestamp(), 1740787200);
    }

    #[test]
    fn parses_epoch_seconds_and_millis() {
        assert_eq!(normalize_date(Some("1740832200")).timestamp(), 1740832200);
        assert_eq!(
            normalize_date(Some("1740832200000")).timestamp(),
            1740832200
        );
    }

    #[test]
    fn garbage_and_none_fall_back_to_now() {
        let before = Utc::now().timestamp();
        let dt = normalize_date(Some("not a date"));
        assert!(dt.timestamp() >= before);
        let dt = normalize_date(None);
        assert!(dt.timestamp() >= before);
        let dt = normalize_date(Some("   "));
        assert!(dt.timestamp() >= before);
    }
}
