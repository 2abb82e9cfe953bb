//! Optional age calculator
//!
//! Dates come from `datetime-local` style fields (`2024-03-01T08:30`). Both
//! are read as wall-clock times without a zone.

use chrono::NaiveDateTime;
use crate::error::BiliError;

const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

const MS_PER_HOUR: i64 = 60 * 60 * 1000;

/// Parse a date/time field value
pub fn parse_datetime(value: &str) -> Result<NaiveDateTime, BiliError> {
    let value = value.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .ok_or_else(|| BiliError::InvalidDateTime(value.to_string()))
}

/// Hours between birth and measurement, rounded up
///
/// Order does not matter: the absolute difference is used.
pub fn calculate_age_hours(birth: &str, measurement: &str) -> Result<i64, BiliError> {
    let birth = parse_datetime(birth)?;
    let measurement = parse_datetime(measurement)?;

    let diff_ms = (measurement - birth).num_milliseconds().abs();
    Ok((diff_ms + MS_PER_HOUR - 1) / MS_PER_HOUR)
}

/// "50 hours (2 days 2 hours)"
pub fn describe_age(age_hours: i64) -> String {
    format!(
        "{} hours ({} days {} hours)",
        age_hours,
        age_hours.div_euclid(24),
        age_hours % 24
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_hours() {
        let age = calculate_age_hours("2024-03-01T08:00", "2024-03-03T10:00").unwrap();
        assert_eq!(age, 50);
    }

    #[test]
    fn test_partial_hour_rounds_up() {
        let age = calculate_age_hours("2024-03-01T08:00", "2024-03-01T09:01").unwrap();
        assert_eq!(age, 2);
        let age = calculate_age_hours("2024-03-01T08:00", "2024-03-01T08:00").unwrap();
        assert_eq!(age, 0);
    }

    #[test]
    fn test_reversed_dates_use_absolute_difference() {
        let age = calculate_age_hours("2024-03-03T10:00", "2024-03-01T08:00").unwrap();
        assert_eq!(age, 50);
    }

    #[test]
    fn test_seconds_and_space_separator() {
        let age = calculate_age_hours("2024-03-01 08:00", "2024-03-01T20:00:30").unwrap();
        assert_eq!(age, 13);
    }

    #[test]
    fn test_invalid_date() {
        let err = calculate_age_hours("yesterday", "2024-03-01T08:00").unwrap_err();
        assert!(matches!(err, BiliError::InvalidDateTime(_)));
    }

    #[test]
    fn test_describe_age() {
        assert_eq!(describe_age(50), "50 hours (2 days 2 hours)");
        assert_eq!(describe_age(24), "24 hours (1 days 0 hours)");
        assert_eq!(describe_age(5), "5 hours (0 days 5 hours)");
    }
}
