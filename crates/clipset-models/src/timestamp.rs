//! Timestamp parsing and span arithmetic.
//!
//! Manifest spans use `HH:MM:SS.mmm`. All arithmetic is done on integer
//! milliseconds so durations handed to the cutting tool are exact.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const MS_PER_HOUR: u64 = 3_600_000;
const MS_PER_MINUTE: u64 = 60_000;
const MS_PER_SECOND: u64 = 1_000;

/// Largest representable timestamp; keeps signed span arithmetic exact.
pub const MAX_MILLIS: u64 = i64::MAX as u64;

/// Timestamp parsing error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimestampError {
    #[error("Timestamp cannot be empty")]
    Empty,

    #[error("Invalid timestamp format '{0}'. Use HH:MM:SS.mmm")]
    InvalidFormat(String),

    #[error("Invalid {0} value: {1}")]
    InvalidValue(&'static str, String),
}

/// A point in a video, stored as whole milliseconds from the start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Timestamp {
    millis: u64,
}

impl Timestamp {
    /// Build a timestamp from milliseconds, saturating at [`MAX_MILLIS`].
    pub const fn from_millis(millis: u64) -> Self {
        let millis = if millis > MAX_MILLIS { MAX_MILLIS } else { millis };
        Self { millis }
    }

    /// Milliseconds since the start of the video.
    pub const fn as_millis(&self) -> u64 {
        self.millis
    }

    /// Signed distance in milliseconds from `self` to `end`.
    pub fn millis_until(&self, end: &Timestamp) -> i64 {
        // Both values are at most MAX_MILLIS, so the difference fits.
        end.millis as i64 - self.millis as i64
    }
}

impl FromStr for Timestamp {
    type Err = TimestampError;

    /// Parse `HH:MM:SS.mmm`.
    ///
    /// The fractional part may have one to three digits and is read as a
    /// decimal fraction (`.5` is 500ms). It may also be omitted entirely.
    fn from_str(ts: &str) -> Result<Self, Self::Err> {
        let ts = ts.trim();
        if ts.is_empty() {
            return Err(TimestampError::Empty);
        }

        let parts: Vec<&str> = ts.split(':').collect();
        let [hh, mm, rest] = parts.as_slice() else {
            return Err(TimestampError::InvalidFormat(ts.to_string()));
        };

        let (ss, frac) = rest.split_once('.').unwrap_or((*rest, ""));

        let hours = parse_digits("hours", hh)?;
        let minutes = parse_digits("minutes", mm)?;
        let seconds = parse_digits("seconds", ss)?;

        let millis = if frac.is_empty() {
            0
        } else {
            if frac.len() > 3 {
                return Err(TimestampError::InvalidValue("milliseconds", frac.to_string()));
            }
            let value = parse_digits("milliseconds", frac)?;
            value * 10u64.pow(3 - frac.len() as u32)
        };

        let total = [(hours, MS_PER_HOUR), (minutes, MS_PER_MINUTE), (seconds, MS_PER_SECOND)]
            .into_iter()
            .try_fold(millis, |acc, (value, unit)| value.checked_mul(unit)?.checked_add(acc))
            .filter(|total| *total <= MAX_MILLIS)
            .ok_or_else(|| TimestampError::InvalidValue("timestamp", ts.to_string()))?;

        Ok(Self { millis: total })
    }
}

impl TryFrom<String> for Timestamp {
    type Error = TimestampError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Timestamp> for String {
    fn from(ts: Timestamp) -> Self {
        ts.to_string()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hours = self.millis / MS_PER_HOUR;
        let minutes = (self.millis % MS_PER_HOUR) / MS_PER_MINUTE;
        let seconds = (self.millis % MS_PER_MINUTE) / MS_PER_SECOND;
        let millis = self.millis % MS_PER_SECOND;
        write!(f, "{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, millis)
    }
}

fn parse_digits(component: &'static str, value: &str) -> Result<u64, TimestampError> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TimestampError::InvalidValue(component, value.to_string()));
    }
    value
        .parse()
        .map_err(|_| TimestampError::InvalidValue(component, value.to_string()))
}

/// Render a signed millisecond count as decimal seconds.
///
/// Always keeps at least one fractional digit and drops trailing zeros:
/// `2500` is `"2.5"`, `0` is `"0.0"`, `3000` is `"3.0"`.
pub fn format_duration_millis(millis: i64) -> String {
    let sign = if millis < 0 { "-" } else { "" };
    let abs = millis.unsigned_abs();
    let whole = abs / MS_PER_SECOND;
    let frac = format!("{:03}", abs % MS_PER_SECOND);
    let frac = frac.trim_end_matches('0');
    let frac = if frac.is_empty() { "0" } else { frac };
    format!("{}{}.{}", sign, whole, frac)
}

/// Duration between two `HH:MM:SS.mmm` timestamps, in seconds, as a string
/// suitable for FFmpeg's `-t`.
///
/// # Examples
/// ```
/// use clipset_models::timestamp::hhmmss;
/// assert_eq!(hhmmss("00:00:01.000", "00:00:03.500").unwrap(), "2.5");
/// assert_eq!(hhmmss("01:00:00.000", "01:00:00.000").unwrap(), "0.0");
/// ```
pub fn hhmmss(start: &str, end: &str) -> Result<String, TimestampError> {
    let start: Timestamp = start.parse()?;
    let end: Timestamp = end.parse()?;
    Ok(format_duration_millis(start.millis_until(&end)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_timestamp() {
        let ts: Timestamp = "01:02:03.456".parse().unwrap();
        assert_eq!(ts.as_millis(), 3_723_456);
    }

    #[test]
    fn test_parse_short_fraction() {
        let ts: Timestamp = "00:00:01.5".parse().unwrap();
        assert_eq!(ts.as_millis(), 1_500);

        let ts: Timestamp = "00:00:07".parse().unwrap();
        assert_eq!(ts.as_millis(), 7_000);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("".parse::<Timestamp>(), Err(TimestampError::Empty));
        assert!(matches!(
            "00:01".parse::<Timestamp>(),
            Err(TimestampError::InvalidFormat(_))
        ));
        assert!(matches!(
            "aa:00:01.000".parse::<Timestamp>(),
            Err(TimestampError::InvalidValue("hours", _))
        ));
        assert!(matches!(
            "00:00:01.0000".parse::<Timestamp>(),
            Err(TimestampError::InvalidValue("milliseconds", _))
        ));
        assert!(matches!(
            "00:-1:01.000".parse::<Timestamp>(),
            Err(TimestampError::InvalidValue("minutes", _))
        ));
    }

    #[test]
    fn test_parse_rejects_overflowing_values() {
        assert!(matches!(
            "99999999999999:00:00.000".parse::<Timestamp>(),
            Err(TimestampError::InvalidValue("timestamp", _))
        ));
        assert!(matches!(
            "00:00:99999999999999999999.000".parse::<Timestamp>(),
            Err(TimestampError::InvalidValue("seconds", _))
        ));

        let far = Timestamp::from_millis(u64::MAX);
        assert_eq!(far.as_millis(), MAX_MILLIS);
        assert_eq!(Timestamp::from_millis(0).millis_until(&far), i64::MAX);
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        let ts: Timestamp = "10:00:59.007".parse().unwrap();
        assert_eq!(ts.to_string(), "10:00:59.007");
    }

    #[test]
    fn test_hhmmss() {
        assert_eq!(hhmmss("00:00:01.000", "00:00:03.500").unwrap(), "2.5");
        assert_eq!(hhmmss("01:00:00.000", "01:00:00.000").unwrap(), "0.0");
        assert_eq!(hhmmss("00:00:00.000", "00:01:00.000").unwrap(), "60.0");
        assert_eq!(hhmmss("00:00:10.100", "00:00:22.345").unwrap(), "12.245");
        assert_eq!(hhmmss("00:00:03.000", "00:00:01.000").unwrap(), "-2.0");
    }

    #[test]
    fn test_serde_as_string() {
        let ts: Timestamp = serde_json::from_str("\"00:00:02.250\"").unwrap();
        assert_eq!(ts.as_millis(), 2_250);
        assert_eq!(serde_json::to_string(&ts).unwrap(), "\"00:00:02.250\"");
    }
}
