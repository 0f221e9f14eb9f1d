//! Time strings for naming calibration dump directories.

use std::fmt::Write;

use chrono::{DateTime, Utc};

/// Default format: date and time down to the microsecond, safe for file names.
pub const DEFAULT_FORMAT: &str = "%Y-%m-%d_%H-%M-%S%.6f";

/// Format `timestamp` with a `chrono` strftime format string.
///
/// Returns `None` if the format string is invalid.
pub fn format_time(timestamp: DateTime<Utc>, format: &str) -> Option<String> {
    let mut out = String::new();
    write!(out, "{}", timestamp.format(format)).ok()?;
    Some(out)
}

/// The current UTC time in [`DEFAULT_FORMAT`].
pub fn time_string() -> String {
    Utc::now().format(DEFAULT_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_default_format() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 7, 14, 5, 9).unwrap()
            + chrono::Duration::microseconds(123_456);
        assert_eq!(
            format_time(ts, DEFAULT_FORMAT).as_deref(),
            Some("2024-03-07_14-05-09.123456")
        );
    }

    #[test]
    fn test_invalid_format() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 7, 14, 5, 9).unwrap();
        assert_eq!(format_time(ts, "%Q"), None);
    }

    #[test]
    fn test_time_string_shape() {
        let now = time_string();
        assert_eq!(now.len(), "2024-03-07_14-05-09.123456".len());
        assert_eq!(&now[10..11], "_");
    }
}
