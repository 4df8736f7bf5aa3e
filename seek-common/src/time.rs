//! Timestamp utilities and HTTP-date handling

use chrono::{DateTime, Duration as ChronoDuration, NaiveDateTime, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Convert milliseconds to duration
pub fn millis_to_duration(millis: u64) -> std::time::Duration {
    std::time::Duration::from_millis(millis)
}

/// Parse an HTTP date in any of the three formats HTTP/1.1 allows
///
/// - IMF-fixdate: `Sun, 06 Nov 1994 08:49:37 GMT`
/// - RFC 850: `Sunday, 06-Nov-94 08:49:37 GMT`
/// - asctime: `Sun Nov  6 08:49:37 1994`
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.with_timezone(&Utc));
    }

    const NAIVE_FORMATS: [&str; 2] = ["%A, %d-%b-%y %H:%M:%S GMT", "%a %b %e %H:%M:%S %Y"];
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Resolve a `retry-after` header value to an absolute time
///
/// Accepts an HTTP date or a non-negative delta in seconds.
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit()) {
        let seconds: i64 = trimmed.parse().ok()?;
        return now.checked_add_signed(ChronoDuration::seconds(seconds));
    }
    parse_http_date(trimmed)
}

/// Whole hours from `now` until the service expects to be back, rounded up
///
/// Returns `None` when the header cannot be parsed or names a time that is
/// not in the future.
pub fn retry_after_hours(value: &str, now: DateTime<Utc>) -> Option<u32> {
    let back_online = parse_retry_after(value, now)?;
    let seconds = (back_online - now).num_seconds();
    if seconds <= 0 {
        return None;
    }
    let hours = (seconds + 3599) / 3600;
    u32::try_from(hours).ok()
}
