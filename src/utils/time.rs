/// Time utility functions for the block core.
///
/// Timestamps live in the models as `DateTime<Utc>` and are persisted as
/// fixed-width RFC 3339 strings with millisecond precision and a `Z` suffix,
/// e.g. "2025-12-17T02:30:00.000Z". The fixed width makes lexical order in
/// SQL equal to chronological order, which the expiry filters rely on.
use chrono::{DateTime, Datelike, SecondsFormat, Utc};

/// Current UTC time, truncated to the precision that survives storage.
pub fn now_utc() -> DateTime<Utc> {
    let now = Utc::now();
    from_db(&to_db(&now)).unwrap_or(now)
}

/// Encode a timestamp for storage.
pub fn to_db(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// True when `ts` keeps the four-digit year the storage encoding needs.
///
/// Years outside 0000-9999 are written with a sign (`+10000-...`), which
/// breaks both the lexical ordering and `from_db`.
pub fn is_storable(ts: &DateTime<Utc>) -> bool {
    (0..=9999).contains(&ts.year())
}

/// Decode a stored timestamp.
pub fn from_db(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(value).map(|dt| dt.with_timezone(&Utc))
}
