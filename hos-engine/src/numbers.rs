//! Numeric conversion helpers centralizing safe numeric casts and wire rounding.

use num_traits::cast::cast;
use serde::Serializer;

use crate::constants::HOURS_PER_DAY;

/// Tolerance used when comparing accumulated hour counters against limits.
pub const HOUR_EPSILON: f64 = 1e-9;

/// Tolerance used when comparing accumulated odometer readings.
pub const MILE_EPSILON: f64 = 1e-6;

/// Round to a fixed number of decimal places, returning 0.0 for non-finite values.
///
/// Negative zero is normalized so serialized output never shows `-0.0`.
#[must_use]
pub fn round_to(value: f64, places: u8) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let factor = 10_f64.powi(i32::from(places));
    let rounded = (value * factor).round() / factor;
    if rounded == 0.0 { 0.0 } else { rounded }
}

/// Ceil a f64 and clamp it to the usize range, returning 0 for non-finite or negative values.
#[must_use]
pub fn ceil_f64_to_usize(value: f64) -> usize {
    if !value.is_finite() || value <= 0.0 {
        return 0;
    }
    cast::<f64, usize>(value.ceil()).unwrap_or(usize::MAX)
}

/// Floor a f64 and clamp it to the usize range, returning 0 for non-finite or negative values.
#[must_use]
pub fn floor_f64_to_usize(value: f64) -> usize {
    if !value.is_finite() || value <= 0.0 {
        return 0;
    }
    cast::<f64, usize>(value.floor()).unwrap_or(usize::MAX)
}

/// Convert usize to f64 while allowing precision loss in a single location.
#[must_use]
pub fn usize_to_f64(value: usize) -> f64 {
    cast::<usize, f64>(value).unwrap_or(0.0)
}

/// Convert usize to u64 for day arithmetic, saturating on exotic targets.
#[must_use]
pub fn usize_to_u64(value: usize) -> u64 {
    cast::<usize, u64>(value).unwrap_or(u64::MAX)
}

/// Whole minutes in a span of hours, rounded to the nearest minute.
#[must_use]
pub fn hours_to_minutes(hours: f64) -> i64 {
    if !hours.is_finite() {
        return 0;
    }
    cast::<f64, i64>((hours * 60.0).round()).unwrap_or(0)
}

/// Render an hour-of-day offset as `HH:MM`.
#[must_use]
pub fn format_clock(hour_of_day: f64) -> String {
    let minutes = hours_to_minutes(hour_of_day).clamp(0, 24 * 60);
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

/// One-based log day and `HH:MM` clock for an hour counted from midnight of day 1.
#[must_use]
pub fn day_clock(hour: f64) -> (usize, String) {
    let day = floor_f64_to_usize(hour / HOURS_PER_DAY);
    (day + 1, format_clock(hour - usize_to_f64(day) * HOURS_PER_DAY))
}

pub(crate) fn serialize_hours<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(round_to(*value, 2))
}

pub(crate) fn serialize_period_hours<S: Serializer>(
    value: &f64,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(round_to(*value, 4))
}

pub(crate) fn serialize_miles<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(round_to(*value, 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_to_handles_non_finite_and_negative_zero() {
        assert!((round_to(1.234_56, 2) - 1.23).abs() < f64::EPSILON);
        assert!((round_to(f64::NAN, 2) - 0.0).abs() < f64::EPSILON);
        assert!(round_to(-0.000_01, 2).is_sign_positive());
    }

    #[test]
    fn ceil_and_floor_clamp() {
        assert_eq!(ceil_f64_to_usize(1.2), 2);
        assert_eq!(ceil_f64_to_usize(f64::NAN), 0);
        assert_eq!(ceil_f64_to_usize(-3.0), 0);
        assert_eq!(floor_f64_to_usize(47.9), 47);
        assert_eq!(floor_f64_to_usize(f64::INFINITY), 0);
    }

    #[test]
    fn clock_formatting_rounds_to_minutes() {
        assert_eq!(format_clock(8.5), "08:30");
        assert_eq!(format_clock(13.999_99), "14:00");
        assert_eq!(format_clock(24.0), "24:00");
        assert_eq!(hours_to_minutes(0.25), 15);
    }

    #[test]
    fn day_clock_wraps_at_midnight() {
        assert_eq!(day_clock(0.0), (1, "00:00".to_string()));
        assert_eq!(day_clock(25.5), (2, "01:30".to_string()));
        assert_eq!(day_clock(48.0), (3, "00:00".to_string()));
    }
}
