//! Shared formatting helpers.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Formats a timestamp for display.
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Rounds a wait time to the nearest whole second for user-facing notices.
///
/// Never returns 0 for a non-zero duration, so a notice never tells the user
/// to wait "0 seconds" while the call would still be rejected.
pub fn round_secs(duration: Duration) -> u64 {
    let secs = duration.as_secs_f64().round() as u64;
    if secs == 0 && !duration.is_zero() {
        1
    } else {
        secs
    }
}

/// Formats a duration as `1d 2h 3m 4s`, dropping leading zero units.
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let (days, hours, minutes, seconds) = (
        total / 86_400,
        (total % 86_400) / 3_600,
        (total % 3_600) / 60,
        total % 60,
    );

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{days}d"));
    }
    if days > 0 || hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if days > 0 || hours > 0 || minutes > 0 {
        parts.push(format!("{minutes}m"));
    }
    parts.push(format!("{seconds}s"));
    parts.join(" ")
}

/// Truncates a string to a maximum number of characters with ellipsis.
pub fn truncate_string(input: &str, max_length: usize) -> String {
    if input.chars().count() <= max_length {
        input.to_string()
    } else {
        let kept: String = input.chars().take(max_length.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_timestamp() {
        let timestamp = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let formatted = format_timestamp(timestamp);
        assert_eq!(formatted, "2024-01-01 12:00:00 UTC");
    }

    #[test]
    fn test_round_secs() {
        assert_eq!(round_secs(Duration::from_millis(4_400)), 4);
        assert_eq!(round_secs(Duration::from_millis(4_600)), 5);
        assert_eq!(round_secs(Duration::from_millis(200)), 1);
        assert_eq!(round_secs(Duration::ZERO), 0);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(5)), "5s");
        assert_eq!(format_duration(Duration::from_secs(65)), "1m 5s");
        assert_eq!(format_duration(Duration::from_secs(3_600)), "1h 0m 0s");
        assert_eq!(format_duration(Duration::from_secs(90_061)), "1d 1h 1m 1s");
    }

    #[test]
    fn test_truncate_string() {
        let input = "This is a very long string that should be truncated";
        let truncated = truncate_string(input, 20);
        assert_eq!(truncated, "This is a very lo...");

        let short = "Short";
        let not_truncated = truncate_string(short, 20);
        assert_eq!(not_truncated, "Short");
    }
}
