//! # Temporal Types — UTC Storage, Brasília Display
//!
//! Defines `Timestamp`, a UTC-only timestamp truncated to seconds
//! precision, plus the fixed Brasília offset used for protocol numbering.
//!
//! ## Invariant
//!
//! All stored timestamps are UTC with Z suffix and no sub-second
//! component. Brasília local time is *derived* from UTC through a constant
//! UTC-3 offset — it is never a second source of truth. Brazil abolished
//! daylight saving in 2019, so the offset does not vary across the year;
//! the year component of a protocol number depends only on this constant.
//!
//! Non-UTC inputs are rejected by [`Timestamp::parse`] — there is no
//! silent conversion that could introduce ambiguity. Use
//! [`Timestamp::parse_lenient`] only for ingesting external data.

use chrono::{DateTime, FixedOffset, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Seconds west of UTC for Brasília time (UTC-3).
const BRASILIA_WEST_SECS: i32 = 3 * 3600;

/// The fixed Brasília offset (`-03:00`).
pub fn brasilia_offset() -> FixedOffset {
    // Statically valid: 3h is within chrono's ±24h offset bound.
    FixedOffset::west_opt(BRASILIA_WEST_SECS).expect("UTC-3 is a valid fixed offset")
}

/// Current Brasília local time, truncated to seconds.
///
/// The issuance year of a protocol number is `brasilia_now().year()`,
/// captured once per finalize call so the year and the stored local
/// timestamp can never disagree across a New Year boundary.
pub fn brasilia_now() -> DateTime<FixedOffset> {
    truncate_offset_to_seconds(Utc::now().with_timezone(&brasilia_offset()))
}

/// A UTC-only timestamp, truncated to seconds precision.
///
/// # Construction
///
/// - [`Timestamp::now()`] — current UTC time, truncated.
/// - [`Timestamp::from_utc()`] — from a `DateTime<Utc>`, truncating sub-seconds.
/// - [`Timestamp::parse()`] — from an RFC 3339 string, rejecting non-UTC offsets.
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

    /// Parse a timestamp from an RFC 3339 string.
    ///
    /// **Rejects non-UTC inputs.** Only the `Z` suffix is accepted — even
    /// `+00:00`, which is semantically equivalent, is rejected so that the
    /// stored rendering is deterministic.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidTimestamp`] if the string is not
    /// valid RFC 3339 or uses a non-Z offset.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        if !s.ends_with('Z') {
            return Err(ValidationError::InvalidTimestamp(format!(
                "must use Z suffix (UTC only), got: {s:?}"
            )));
        }

        let dt = DateTime::parse_from_rfc3339(s)
            .map_err(|e| ValidationError::InvalidTimestamp(format!("{s:?}: {e}")))?;

        Ok(Self(truncate_to_seconds(dt.with_timezone(&Utc))))
    }

    /// Parse an RFC 3339 string accepting any offset, converting to UTC.
    ///
    /// Lenient ingestion path for external data; the result still satisfies
    /// the UTC + seconds-precision invariant.
    pub fn parse_lenient(s: &str) -> Result<Self, ValidationError> {
        let dt = DateTime::parse_from_rfc3339(s)
            .map_err(|e| ValidationError::InvalidTimestamp(format!("{s:?}: {e}")))?;
        Ok(Self(truncate_to_seconds(dt.with_timezone(&Utc))))
    }

    /// Access the inner `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// This instant in Brasília local time.
    pub fn to_brasilia(&self) -> DateTime<FixedOffset> {
        self.0.with_timezone(&brasilia_offset())
    }

    /// Render as RFC 3339 with Z suffix (e.g. `2026-01-15T12:00:00Z`).
    pub fn to_rfc3339_z(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_rfc3339_z())
    }
}

/// Truncate a `DateTime<Utc>` to seconds precision (discard nanoseconds).
fn truncate_to_seconds(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_nanosecond(0).unwrap_or(dt)
}

/// Truncate an offset datetime to seconds precision.
fn truncate_offset_to_seconds(dt: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
    dt.with_nanosecond(0).unwrap_or(dt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone};

    #[test]
    fn test_now_has_no_subseconds() {
        let ts = Timestamp::now();
        assert_eq!(ts.as_datetime().nanosecond(), 0);
    }

    #[test]
    fn test_from_utc_truncates() {
        let dt = Utc.with_ymd_and_hms(2026, 1, 15, 12, 30, 45).unwrap();
        let dt_with_nanos = dt.with_nanosecond(123_456_789).unwrap();
        let ts = Timestamp::from_utc(dt_with_nanos);
        assert_eq!(ts.as_datetime().nanosecond(), 0);
        assert_eq!(ts.to_rfc3339_z(), "2026-01-15T12:30:45Z");
    }

    #[test]
    fn test_display_matches_rfc3339_z() {
        let dt = Utc.with_ymd_and_hms(2026, 6, 30, 23, 59, 59).unwrap();
        let ts = Timestamp::from_utc(dt);
        assert_eq!(format!("{ts}"), "2026-06-30T23:59:59Z");
    }

    // ---- parse() strict mode ----

    #[test]
    fn test_parse_z_suffix_accepted() {
        let ts = Timestamp::parse("2026-01-15T12:00:00Z").unwrap();
        assert_eq!(ts.to_rfc3339_z(), "2026-01-15T12:00:00Z");
    }

    #[test]
    fn test_parse_offsets_rejected() {
        assert!(Timestamp::parse("2026-01-15T12:00:00+00:00").is_err());
        assert!(Timestamp::parse("2026-01-15T17:00:00+05:00").is_err());
        assert!(Timestamp::parse("2026-01-15T09:00:00-03:00").is_err());
    }

    #[test]
    fn test_parse_subseconds_truncated() {
        let ts = Timestamp::parse("2026-01-15T12:00:00.123456Z").unwrap();
        assert_eq!(ts.as_datetime().nanosecond(), 0);
    }

    #[test]
    fn test_parse_invalid_format() {
        assert!(Timestamp::parse("not-a-date").is_err());
        assert!(Timestamp::parse("2026-01-15").is_err());
        assert!(Timestamp::parse("").is_err());
    }

    #[test]
    fn test_parse_lenient_converts_offset() {
        let ts = Timestamp::parse_lenient("2026-01-15T09:00:00-03:00").unwrap();
        assert_eq!(ts.to_rfc3339_z(), "2026-01-15T12:00:00Z");
    }

    // ---- Brasília derivation ----

    #[test]
    fn test_brasilia_offset_is_minus_three_hours() {
        assert_eq!(brasilia_offset().utc_minus_local(), BRASILIA_WEST_SECS);
    }

    #[test]
    fn test_to_brasilia_shifts_clock_back() {
        let ts = Timestamp::parse("2026-06-15T12:00:00Z").unwrap();
        let local = ts.to_brasilia();
        assert_eq!(local.hour(), 9);
        assert_eq!(local.day(), 15);
    }

    #[test]
    fn test_new_year_boundary_uses_local_year() {
        // 01:30 UTC on Jan 1 is still Dec 31 in Brasília. A protocol issued
        // at this instant must carry the previous year.
        let ts = Timestamp::parse("2026-01-01T01:30:00Z").unwrap();
        let local = ts.to_brasilia();
        assert_eq!(local.year(), 2025);
        assert_eq!((local.month(), local.day()), (12, 31));
    }

    #[test]
    fn test_brasilia_now_truncated() {
        assert_eq!(brasilia_now().nanosecond(), 0);
    }

    // ---- ordering & serde ----

    #[test]
    fn test_ordering() {
        let earlier = Timestamp::parse("2026-01-15T12:00:00Z").unwrap();
        let later = Timestamp::parse("2026-01-15T12:00:01Z").unwrap();
        assert!(earlier < later);
    }

    #[test]
    fn test_serde_roundtrip() {
        let ts = Timestamp::parse("2026-01-15T12:00:00Z").unwrap();
        let json = serde_json::to_string(&ts).unwrap();
        let parsed: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(ts, parsed);
    }
}
