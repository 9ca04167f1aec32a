//! Slurm elapsed-time parsing.
//!
//! Accepted forms: `M`, `M:S`, `H:M:S`, `D-H`, `D-H:M`, `D-H:M:S`.
//! Seconds may carry a fractional part.

use crate::error::{ParseError, ParseResult};

/// Day counts above this are scheduler artifacts and count as zero.
pub const MAX_PLAUSIBLE_DAYS: u64 = 300;

/// Parse an elapsed-time field into minutes.
pub fn parse_elapsed(value: &str) -> ParseResult<f64> {
    let value = value.trim();
    if value == "UNLIMITED" || value == "NOT_SET" {
        return Ok(0.0);
    }
    let invalid = || ParseError::InvalidDuration(value.to_string());

    let (days, clock) = match value.split_once('-') {
        Some((days, clock)) => (Some(parse_whole(days).ok_or_else(invalid)?), clock),
        None => (None, value),
    };
    if days.is_some_and(|d| d > MAX_PLAUSIBLE_DAYS) {
        return Ok(0.0);
    }

    let parts: Vec<&str> = clock.split(':').collect();
    let whole = |i: usize| parse_whole(parts[i]).ok_or_else(invalid);
    let (hours, minutes, seconds) = match (days.is_some(), parts.len()) {
        (false, 1) => (0, whole(0)?, 0.0),
        (false, 2) => (0, whole(0)?, parse_seconds(parts[1]).ok_or_else(invalid)?),
        (true, 1) => (whole(0)?, 0, 0.0),
        (true, 2) => (whole(0)?, whole(1)?, 0.0),
        (_, 3) => (whole(0)?, whole(1)?, parse_seconds(parts[2]).ok_or_else(invalid)?),
        _ => return Err(invalid()),
    };

    let total_seconds = days.unwrap_or(0) as f64 * 86_400.0
        + hours as f64 * 3_600.0
        + minutes as f64 * 60.0
        + seconds;
    Ok(total_seconds / 60.0)
}

fn parse_whole(s: &str) -> Option<u64> {
    let s = s.trim();
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn parse_seconds(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit() || b == b'.') {
        return None;
    }
    s.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minutes(s: &str) -> f64 {
        parse_elapsed(s).unwrap()
    }

    #[test]
    fn all_supported_forms() {
        assert_eq!(minutes("42"), 42.0);
        assert_eq!(minutes("05:30"), 5.5);
        assert_eq!(minutes("01:02:30"), 62.5);
        assert_eq!(minutes("2-03"), 2.0 * 1440.0 + 180.0);
        assert_eq!(minutes("1-00:30"), 1470.0);
        assert_eq!(minutes("1-01:01:30"), 1440.0 + 61.5);
    }

    #[test]
    fn fractional_seconds() {
        assert_eq!(minutes("00:00:30.000"), 0.5);
    }

    #[test]
    fn implausible_day_counts_are_zero() {
        assert_eq!(minutes("301-00:00:00"), 0.0);
        assert_eq!(minutes("300-00:00:00"), 300.0 * 1440.0);
    }

    #[test]
    fn sentinels_are_zero() {
        assert_eq!(minutes("UNLIMITED"), 0.0);
        assert_eq!(minutes("NOT_SET"), 0.0);
    }

    #[test]
    fn rejects_garbage() {
        for bad in ["", "abc", "1:2:3:4", "-5", "1-2:3:4:5", "1:x"] {
            assert!(parse_elapsed(bad).is_err(), "{bad:?} should be rejected");
        }
    }
}
