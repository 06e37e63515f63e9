//! Zone-aware time helpers shared by agenda, materializer, and dispatcher
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.2.0
//!
//! ## Changelog
//! - 1.0.0: Extracted from duplicate conversions in agenda and reminders

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, SecondsFormat, TimeZone, Utc};
use chrono_tz::Tz;

use super::error::AssistantError;

/// Resolve an IANA timezone id.
///
/// This is the only place a stored timezone string is validated; setting a
/// bad id succeeds and the failure surfaces here, at conversion time.
pub fn parse_timezone(tzid: &str) -> Result<Tz, AssistantError> {
    tzid.parse::<Tz>()
        .map_err(|_| AssistantError::InvalidTimezone(tzid.to_string()))
}

/// The UTC instants bounding a local calendar day, inclusive:
/// `[00:00:00.000, 23:59:59.999]` in the given zone.
pub fn local_day_window(
    day: NaiveDate,
    tz: Tz,
) -> Result<(DateTime<Utc>, DateTime<Utc>), AssistantError> {
    let start = local_midnight(day, tz)?.with_timezone(&Utc);
    let end =
        local_midnight(day + Duration::days(1), tz)?.with_timezone(&Utc) - Duration::milliseconds(1);
    Ok((start, end))
}

fn local_midnight(day: NaiveDate, tz: Tz) -> Result<DateTime<Tz>, AssistantError> {
    let naive = day.and_time(NaiveTime::MIN);
    // Midnight can fall inside a DST gap in a handful of zones; take the
    // first valid instant of the day in that case.
    tz.from_local_datetime(&naive)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(naive + Duration::hours(1))).earliest())
        .ok_or_else(|| AssistantError::InvalidTimezone(tz.name().to_string()))
}

/// 12-hour clock without a leading zero, e.g. `9:50 AM`, `10:00 AM`.
pub fn format_clock<T: TimeZone>(instant: DateTime<T>) -> String
where
    T::Offset: std::fmt::Display,
{
    instant.format("%l:%M %p").to_string().trim_start().to_string()
}

/// Short day label used in agenda and no-events messages, e.g. `Sat Jun 01`.
pub fn format_day(day: NaiveDate) -> String {
    day.format("%a %b %d").to_string()
}

/// Canonical storage encoding for instants: whole-second RFC 3339 in UTC
/// with a `Z` suffix. All rows use this one format so that lexicographic
/// comparison in SQL matches chronological order.
pub fn encode_instant(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Inverse of [`encode_instant`]; tolerant of explicit offsets.
pub fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::America::New_York;

    #[test]
    fn test_parse_timezone_valid() {
        assert_eq!(parse_timezone("America/New_York").unwrap(), New_York);
    }

    #[test]
    fn test_parse_timezone_invalid() {
        let err = parse_timezone("Mars/Olympus").unwrap_err();
        assert!(matches!(err, AssistantError::InvalidTimezone(ref tz) if tz == "Mars/Olympus"));
    }

    #[test]
    fn test_local_day_window_eastern_summer() {
        // EDT is UTC-4, so the local day starts at 04:00Z.
        let day = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let (start, end) = local_day_window(day, New_York).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 6, 1, 4, 0, 0).unwrap());
        assert_eq!(
            end,
            Utc.with_ymd_and_hms(2024, 6, 2, 4, 0, 0).unwrap() - Duration::milliseconds(1)
        );
    }

    #[test]
    fn test_local_day_window_spans_dst_transition() {
        // 2024-03-10 is the US spring-forward day: only 23 hours long.
        let day = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let (start, end) = local_day_window(day, New_York).unwrap();
        let span = end - start;
        assert_eq!(span, Duration::hours(23) - Duration::milliseconds(1));
    }

    #[test]
    fn test_format_clock_drops_leading_zero() {
        let morning = Utc.with_ymd_and_hms(2024, 6, 1, 13, 50, 0).unwrap();
        assert_eq!(format_clock(morning.with_timezone(&New_York)), "9:50 AM");

        let ten = Utc.with_ymd_and_hms(2024, 6, 1, 14, 0, 0).unwrap();
        assert_eq!(format_clock(ten.with_timezone(&New_York)), "10:00 AM");
    }

    #[test]
    fn test_format_day() {
        let day = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        assert_eq!(format_day(day), "Sat Jun 01");
    }

    #[test]
    fn test_instant_roundtrip() {
        let instant = Utc.with_ymd_and_hms(2024, 6, 1, 13, 50, 0).unwrap();
        let encoded = encode_instant(instant);
        assert_eq!(encoded, "2024-06-01T13:50:00Z");
        assert_eq!(parse_instant(&encoded), Some(instant));
    }

    #[test]
    fn test_instant_encoding_sorts_chronologically() {
        let earlier = Utc.with_ymd_and_hms(2024, 6, 1, 9, 5, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 6, 1, 13, 50, 0).unwrap();
        assert!(encode_instant(earlier) < encode_instant(later));
    }
}
