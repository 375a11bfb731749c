//! # Temporal Types: UTC-Only Timestamps
//!
//! Defines `Timestamp`, the UTC timestamp used for signature dates,
//! reception and operation dates, and the correction window. Values are
//! truncated to seconds so that a persisted snapshot and a proposed
//! snapshot carrying "the same" date compare equal in the sealed-field diff.

use chrono::{DateTime, Duration, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::BsffError;

/// A UTC-only timestamp, truncated to seconds precision.
///
/// # Construction
///
/// - [`Timestamp::now()`]: current UTC time, truncated.
/// - [`Timestamp::from_utc()`]: from a `DateTime<Utc>`, truncating sub-seconds.
/// - [`Timestamp::parse()`]: from an ISO8601 string with `Z` suffix.
/// - [`Timestamp::parse_lenient()`]: any RFC 3339 offset, converted to UTC.
/// - [`Timestamp::from_date()`]: midnight UTC of a calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create a timestamp from the current UTC time, truncated to seconds.
    pub fn now() -> Self {
        Self(truncate_to_seconds(Utc::now()))
    }

    /// Create a timestamp from a `chrono::DateTime<Utc>`, truncating sub-seconds.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(truncate_to_seconds(dt))
    }

    /// Midnight UTC of the given calendar date.
    pub fn from_date(date: NaiveDate) -> Self {
        Self(date.and_time(chrono::NaiveTime::MIN).and_utc())
    }

    /// Parse a timestamp from an RFC 3339 string with the `Z` suffix.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not valid RFC 3339 or uses a
    /// non-Z offset.
    pub fn parse(s: &str) -> Result<Self, BsffError> {
        if !s.ends_with('Z') {
            return Err(BsffError::InvalidTimestamp(format!(
                "timestamp must use Z suffix (UTC only), got: {s:?}"
            )));
        }
        Self::parse_lenient(s)
    }

    /// Parse a timestamp from an RFC 3339 string, accepting any offset.
    pub fn parse_lenient(s: &str) -> Result<Self, BsffError> {
        let dt = DateTime::parse_from_rfc3339(s)
            .map_err(|e| BsffError::InvalidTimestamp(format!("{s:?}: {e}")))?;
        Ok(Self(truncate_to_seconds(dt.with_timezone(&Utc))))
    }

    /// Access the inner `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// This timestamp shifted by a whole number of days.
    pub fn plus_days(&self, days: i64) -> Self {
        Self(self.0 + Duration::days(days))
    }

    /// Whole days elapsed from `self` until `later` (negative if `later` is earlier).
    pub fn days_until(&self, later: &Timestamp) -> i64 {
        (later.0 - self.0).num_days()
    }

    /// Render as ISO8601 with Z suffix (e.g., `2024-01-15T12:00:00Z`).
    pub fn to_iso8601(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

/// Truncate a `DateTime<Utc>` to seconds precision (discard nanoseconds).
fn truncate_to_seconds(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_nanosecond(0).unwrap_or(dt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_truncates_subseconds() {
        let dt = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
            + Duration::milliseconds(750);
        let ts = Timestamp::from_utc(dt);
        assert_eq!(ts.to_iso8601(), "2024-01-15T12:00:00Z");
    }

    #[test]
    fn test_parse_rejects_offset() {
        assert!(Timestamp::parse("2024-01-15T12:00:00+02:00").is_err());
        assert!(Timestamp::parse("2024-01-15T12:00:00Z").is_ok());
    }

    #[test]
    fn test_parse_lenient_converts_to_utc() {
        let ts = Timestamp::parse_lenient("2024-01-15T14:00:00+02:00").unwrap();
        assert_eq!(ts.to_iso8601(), "2024-01-15T12:00:00Z");
    }

    #[test]
    fn test_days_until() {
        let a = Timestamp::parse("2024-01-01T00:00:00Z").unwrap();
        let b = a.plus_days(61);
        assert_eq!(a.days_until(&b), 61);
        assert_eq!(b.days_until(&a), -61);
    }

    #[test]
    fn test_from_date_is_midnight() {
        let d = NaiveDate::from_ymd_opt(2024, 7, 3).unwrap();
        assert_eq!(Timestamp::from_date(d).to_iso8601(), "2024-07-03T00:00:00Z");
    }

    #[test]
    fn test_serde_roundtrip_preserves_instant() {
        let ts = Timestamp::parse("2024-02-29T23:59:59Z").unwrap();
        let json = serde_json::to_string(&ts).unwrap();
        let back: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(ts, back);
    }
}
