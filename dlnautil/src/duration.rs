//! Tick/duration conversions shared by the content directory and the stream
//! proxy. A tick is 100 ns, the unit the upstream catalog uses for
//! `RunTimeTicks` and playback positions (1 s = 10,000,000 ticks).

use thiserror::Error;

/// Number of 100ns ticks in one second.
pub const ONE_SECOND_TICKS: i64 = 10_000_000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DurationParseError {
    #[error("duration string must look like H:MM:SS.mmm, got {0:?}")]
    BadFormat(String),
}

/// Converts a tick count to whole seconds (truncating, never negative).
pub fn ticks_to_seconds(ticks: i64) -> f64 {
    ticks.max(0) as f64 / ONE_SECOND_TICKS as f64
}

/// Converts a second count to ticks.
pub fn seconds_to_ticks(seconds: f64) -> i64 {
    (seconds.max(0.0) * ONE_SECOND_TICKS as f64).round() as i64
}

/// Formats a tick count as `H:MM:SS.mmm`, the format UPnP `<res duration="…">`
/// uses. Zero ticks formats as `"0:00:00.000"`.
pub fn format_duration(ticks: i64) -> String {
    let ticks = ticks.max(0);
    let total_millis = ticks / (ONE_SECOND_TICKS / 1000);
    let millis = total_millis % 1000;
    let total_seconds = total_millis / 1000;
    let seconds = total_seconds % 60;
    let total_minutes = total_seconds / 60;
    let minutes = total_minutes % 60;
    let hours = total_minutes / 60;
    format!("{hours}:{minutes:02}:{seconds:02}.{millis:03}")
}

/// Parses a `H:MM:SS.mmm` duration string back into ticks. Inverse of
/// [`format_duration`] for any string that function can produce.
pub fn parse_duration(s: &str) -> Result<i64, DurationParseError> {
    let (hms, millis_str) = s
        .split_once('.')
        .ok_or_else(|| DurationParseError::BadFormat(s.to_string()))?;
    let mut parts = hms.split(':');
    let hours: i64 = parts
        .next()
        .and_then(|p| p.parse().ok())
        .ok_or_else(|| DurationParseError::BadFormat(s.to_string()))?;
    let minutes: i64 = parts
        .next()
        .and_then(|p| p.parse().ok())
        .ok_or_else(|| DurationParseError::BadFormat(s.to_string()))?;
    let seconds: i64 = parts
        .next()
        .and_then(|p| p.parse().ok())
        .ok_or_else(|| DurationParseError::BadFormat(s.to_string()))?;
    if parts.next().is_some() {
        return Err(DurationParseError::BadFormat(s.to_string()));
    }
    let millis: i64 = if millis_str.len() == 3 {
        millis_str
            .parse()
            .map_err(|_| DurationParseError::BadFormat(s.to_string()))?
    } else {
        return Err(DurationParseError::BadFormat(s.to_string()));
    };

    let total_ticks = ((hours * 3600 + minutes * 60 + seconds) * 1000 + millis)
        * (ONE_SECOND_TICKS / 1000);
    Ok(total_ticks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_formats_as_zero() {
        assert_eq!(format_duration(0), "0:00:00.000");
    }

    #[test]
    fn formats_hours_minutes_seconds_millis() {
        // 1h 02m 03.456s
        let ticks = (3723 * 1000 + 456) * (ONE_SECOND_TICKS / 1000);
        assert_eq!(format_duration(ticks), "1:02:03.456");
    }

    #[test]
    fn round_trips_through_parse() {
        for s in ["0:00:00.000", "1:02:03.456", "10:59:59.999", "0:00:05.000"] {
            let ticks = parse_duration(s).unwrap();
            assert_eq!(format_duration(ticks), s);
        }
    }

    #[test]
    fn rejects_malformed_strings() {
        assert!(parse_duration("not-a-duration").is_err());
        assert!(parse_duration("1:02:03").is_err());
        assert!(parse_duration("1:02:3.456").is_ok()); // single-digit seconds still parse
    }

    #[test]
    fn seconds_and_ticks_round_trip() {
        assert_eq!(seconds_to_ticks(1.0), ONE_SECOND_TICKS);
        assert_eq!(ticks_to_seconds(ONE_SECOND_TICKS), 1.0);
    }
}
