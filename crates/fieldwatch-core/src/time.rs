//! Timestamp normalisation across site-local and UTC representations.
//!
//! Field firmware writes unmarked wall-clock time in the site's local zone,
//! while timestamps produced by synchronised services carry a trailing `Z`.
//! [`SiteClock`] turns either form into a [`CanonicalInstant`] anchored in
//! UTC, and renders instants back into site-local display text.
//!
//! The policy is deliberately narrow: a trailing `Z` means UTC, an explicit
//! RFC 3339 offset is honoured, and everything else is site-local time at the
//! clock's fixed offset. No other zone inference is attempted.

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc};
use tracing::debug;

use crate::error::{CoreError, Result};

/// Offset of the deployed fleet's local time (UTC+05:30), in minutes.
pub const DEFAULT_UTC_OFFSET_MINUTES: i32 = 330;

/// Zone label appended to display timestamps for the deployed fleet.
pub const DEFAULT_ZONE_LABEL: &str = "IST";

/// Text shown when a timestamp cannot be normalised.
pub const UNKNOWN_TIME: &str = "Unknown time";

/// Formats tried first, in order. The first match wins.
const PRIMARY_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%SZ",
    "%Y-%m-%dT%H:%M:%S%.fZ",
];

/// Looser ISO-8601 shapes accepted after the primary formats and RFC 3339.
const FALLBACK_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
];

const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M";

/// An absolute point in time, resolved to UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CanonicalInstant(DateTime<Utc>);

impl CanonicalInstant {
    /// Wraps a UTC timestamp.
    #[must_use]
    pub const fn from_utc(utc: DateTime<Utc>) -> Self {
        Self(utc)
    }

    /// Returns the instant as a UTC timestamp.
    #[must_use]
    pub const fn as_utc(&self) -> DateTime<Utc> {
        self.0
    }

    /// Hours elapsed from this instant until `now`.
    ///
    /// Negative when the instant lies in the future of `now` (clock skew).
    #[must_use]
    pub fn hours_until(&self, now: DateTime<Utc>) -> f64 {
        let elapsed = now - self.0;
        elapsed.num_milliseconds() as f64 / 3_600_000.0
    }
}

impl fmt::Display for CanonicalInstant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

/// Converts between site-local wall-clock time and UTC at a fixed offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteClock {
    offset: FixedOffset,
    label: String,
}

impl SiteClock {
    /// Creates a clock for a fixed offset east of UTC.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidConfig` if the offset is a day or more.
    pub fn new(utc_offset_minutes: i32, label: impl Into<String>) -> Result<Self> {
        let offset = utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| CoreError::InvalidConfig {
                reason: format!("utc offset of {utc_offset_minutes} minutes is out of range"),
            })?;

        Ok(Self {
            offset,
            label: label.into(),
        })
    }

    /// The clock used by the deployed fleet: UTC+05:30, labelled `IST`.
    #[must_use]
    pub fn ist() -> Self {
        Self {
            offset: FixedOffset::east_opt(DEFAULT_UTC_OFFSET_MINUTES * 60).unwrap_or_else(|| Utc.fix()),
            label: DEFAULT_ZONE_LABEL.to_string(),
        }
    }

    /// Offset east of UTC, in minutes.
    #[must_use]
    pub fn offset_minutes(&self) -> i32 {
        self.offset.local_minus_utc() / 60
    }

    /// Zone label used in display strings.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Interprets a site-local wall-clock time as an absolute instant.
    #[must_use]
    pub fn local_to_utc(&self, local: NaiveDateTime) -> DateTime<Utc> {
        // A fixed offset has no gaps or folds, so the mapping is always single.
        match self.offset.from_local_datetime(&local).single() {
            Some(dt) => dt.with_timezone(&Utc),
            None => Utc.from_utc_datetime(&local),
        }
    }

    /// Renders an absolute instant as site-local wall-clock time.
    #[must_use]
    pub fn utc_to_local(&self, utc: DateTime<Utc>) -> NaiveDateTime {
        utc.with_timezone(&self.offset).naive_local()
    }

    /// Parses a raw timestamp into a canonical instant.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::TimestampParse` if the text is empty or matches no
    /// recognised format.
    pub fn parse(&self, raw: &str) -> Result<CanonicalInstant> {
        let text = raw.trim();
        if text.is_empty() {
            return Err(CoreError::TimestampParse {
                raw: raw.to_string(),
            });
        }
        let zulu = text.ends_with('Z');

        for format in PRIMARY_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
                return Ok(self.resolve(naive, zulu));
            }
        }

        if let Ok(explicit) = DateTime::parse_from_rfc3339(text) {
            return Ok(CanonicalInstant(explicit.with_timezone(&Utc)));
        }

        let bare = text.strip_suffix('Z').unwrap_or(text);
        for format in FALLBACK_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(bare, format) {
                return Ok(self.resolve(naive, zulu));
            }
        }
        if let Some(naive) = NaiveDate::parse_from_str(bare, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
        {
            return Ok(self.resolve(naive, zulu));
        }

        Err(CoreError::TimestampParse {
            raw: raw.to_string(),
        })
    }

    /// Parses a raw timestamp, mapping every failure to `None`.
    #[must_use]
    pub fn normalize(&self, raw: &str) -> Option<CanonicalInstant> {
        match self.parse(raw) {
            Ok(instant) => Some(instant),
            Err(e) => {
                debug!(raw = %raw, error = %e, "timestamp left unresolved");
                None
            }
        }
    }

    /// Formats a raw timestamp for display in site-local time.
    ///
    /// Returns [`UNKNOWN_TIME`] when the timestamp cannot be normalised.
    #[must_use]
    pub fn display(&self, raw: &str) -> String {
        self.normalize(raw)
            .map_or_else(|| UNKNOWN_TIME.to_string(), |i| self.format_instant(i))
    }

    /// Formats an instant as `YYYY-MM-DD HH:MM <label>` in site-local time.
    #[must_use]
    pub fn format_instant(&self, instant: CanonicalInstant) -> String {
        self.format_utc(instant.as_utc())
    }

    /// Formats a UTC timestamp as `YYYY-MM-DD HH:MM <label>` in site-local time.
    #[must_use]
    pub fn format_utc(&self, utc: DateTime<Utc>) -> String {
        format!(
            "{} {}",
            self.utc_to_local(utc).format(DISPLAY_FORMAT),
            self.label
        )
    }

    fn resolve(&self, naive: NaiveDateTime, zulu: bool) -> CanonicalInstant {
        if zulu {
            CanonicalInstant(Utc.from_utc_datetime(&naive))
        } else {
            CanonicalInstant(self.local_to_utc(naive))
        }
    }
}

impl Default for SiteClock {
    fn default() -> Self {
        Self::ist()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use test_case::test_case;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    mod clock_tests {
        use super::*;

        #[test]
        fn ist_clock_defaults() {
            let clock = SiteClock::ist();
            assert_eq!(clock.offset_minutes(), 330);
            assert_eq!(clock.label(), "IST");
            assert_eq!(clock, SiteClock::default());
        }

        #[test]
        fn custom_offset() {
            let clock = SiteClock::new(-300, "EST").unwrap();
            assert_eq!(clock.offset_minutes(), -300);
            assert_eq!(clock.label(), "EST");
        }

        #[test]
        fn offset_out_of_range_rejected() {
            let result = SiteClock::new(24 * 60, "X");
            assert!(matches!(result, Err(CoreError::InvalidConfig { .. })));
        }

        #[test]
        fn local_to_utc_shifts_back() {
            let clock = SiteClock::ist();
            let local = NaiveDateTime::parse_from_str("2024-05-01 10:00", "%Y-%m-%d %H:%M")
                .unwrap();
            assert_eq!(clock.local_to_utc(local), utc("2024-05-01T04:30:00Z"));
        }
    }

    mod parse_tests {
        use super::*;
        use test_case::test_case;

        #[test_case("2024-05-01 10:00", "2024-05-01T04:30:00Z" ; "minute precision local")]
        #[test_case("2024-05-01T10:00:00", "2024-05-01T04:30:00Z" ; "seconds local")]
        #[test_case("2024-05-01T10:00:00Z", "2024-05-01T10:00:00Z" ; "zulu seconds")]
        #[test_case("2024-05-01T10:00:00.123456Z", "2024-05-01T10:00:00.123456Z" ; "zulu micros")]
        #[test_case("2024-05-01T10:00:00+02:00", "2024-05-01T08:00:00Z" ; "explicit offset")]
        #[test_case("2024-05-01T10:00:00.5", "2024-05-01T04:30:00.5Z" ; "fractional local")]
        #[test_case("2024-05-01T10:00Z", "2024-05-01T10:00:00Z" ; "zulu minutes")]
        #[test_case("2024-05-01 10:00:30", "2024-05-01T04:30:30Z" ; "space separated seconds")]
        #[test_case("2024-05-01", "2024-04-30T18:30:00Z" ; "date only local")]
        #[test_case("  2024-05-01 10:00 ", "2024-05-01T04:30:00Z" ; "surrounding whitespace")]
        fn recognised_formats(raw: &str, expected: &str) {
            let clock = SiteClock::ist();
            let instant = clock.parse(raw).unwrap();
            assert_eq!(instant.as_utc(), utc(expected));
        }

        #[test_case("" ; "empty")]
        #[test_case("   " ; "blank")]
        #[test_case("yesterday" ; "prose")]
        #[test_case("2024-13-01 10:00" ; "bad month")]
        #[test_case("01/05/2024 10:00" ; "day first")]
        #[test_case("2024-05-01 25:00" ; "bad hour")]
        fn unparseable_formats(raw: &str) {
            let clock = SiteClock::ist();
            assert!(matches!(
                clock.parse(raw),
                Err(CoreError::TimestampParse { .. })
            ));
            assert!(clock.normalize(raw).is_none());
        }
    }

    mod display_tests {
        use super::*;

        #[test]
        fn display_local_timestamp_keeps_wall_clock() {
            let clock = SiteClock::ist();
            assert_eq!(clock.display("2024-05-01 10:00"), "2024-05-01 10:00 IST");
        }

        #[test]
        fn display_zulu_timestamp_moves_forward() {
            let clock = SiteClock::ist();
            assert_eq!(
                clock.display("2024-05-01T20:45:00Z"),
                "2024-05-02 02:15 IST"
            );
        }

        #[test]
        fn display_unknown() {
            let clock = SiteClock::ist();
            assert_eq!(clock.display("garbage"), UNKNOWN_TIME);
            assert_eq!(clock.display(""), UNKNOWN_TIME);
        }

        #[test]
        fn format_utc_uses_label() {
            let clock = SiteClock::new(60, "CET").unwrap();
            assert_eq!(
                clock.format_utc(utc("2024-01-01T00:00:00Z")),
                "2024-01-01 01:00 CET"
            );
        }
    }

    mod instant_tests {
        use super::*;

        #[test]
        fn hours_until_positive() {
            let instant = CanonicalInstant::from_utc(utc("2024-05-01T10:00:00Z"));
            let now = utc("2024-05-01T13:30:00Z");
            assert!((instant.hours_until(now) - 3.5).abs() < 1e-9);
        }

        #[test]
        fn hours_until_negative_on_skew() {
            let instant = CanonicalInstant::from_utc(utc("2024-05-01T12:00:00Z"));
            let now = utc("2024-05-01T11:00:00Z");
            assert!((instant.hours_until(now) + 1.0).abs() < 1e-9);
        }

        #[test]
        fn display_is_rfc3339() {
            let instant = CanonicalInstant::from_utc(utc("2024-05-01T10:00:00Z"));
            assert_eq!(instant.to_string(), "2024-05-01T10:00:00+00:00");
        }
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn naive_from_secs(secs: i64) -> NaiveDateTime {
            DateTime::from_timestamp(secs, 0).unwrap().naive_utc()
        }

        proptest! {
            #[test]
            fn zulu_display_is_offset_ahead(secs in 0i64..4_102_444_800) {
                let clock = SiteClock::ist();
                let utc_value = naive_from_secs(secs - secs % 60);
                let raw = utc_value.format("%Y-%m-%dT%H:%M:%SZ").to_string();
                let expected = (utc_value + Duration::minutes(330)).format("%Y-%m-%d %H:%M IST").to_string();
                prop_assert_eq!(clock.display(&raw), expected);
            }

            #[test]
            fn local_round_trip_is_identity(
                secs in 0i64..4_102_444_800,
                offset in -720i32..=840,
            ) {
                let clock = SiteClock::new(offset, "LOCAL").unwrap();
                let local = naive_from_secs(secs);
                prop_assert_eq!(clock.utc_to_local(clock.local_to_utc(local)), local);
            }

            #[test]
            fn unmarked_string_round_trips_wall_clock(secs in 0i64..4_102_444_800) {
                let clock = SiteClock::ist();
                let local = naive_from_secs(secs);
                let raw = local.format("%Y-%m-%dT%H:%M:%S").to_string();
                let instant = clock.parse(&raw).unwrap();
                prop_assert_eq!(clock.utc_to_local(instant.as_utc()), local);
            }
        }
    }
}
