//! Duration conversion and formatting helpers.
//!
//! All internal arithmetic is done on `std::time::Duration` (integral
//! nanoseconds); snapshots and human output use decimal milliseconds.

use std::time::Duration;

/// Converts a duration to decimal milliseconds with microsecond precision.
pub fn duration_to_ms(d: Duration) -> f64 {
    d.as_micros() as f64 / 1000.0
}

/// Converts decimal milliseconds back to a duration.
///
/// Negative and non-finite inputs are clamped to zero.
pub fn ms_to_duration(ms: f64) -> Duration {
    if !ms.is_finite() || ms <= 0.0 {
        return Duration::ZERO;
    }
    Duration::from_micros((ms * 1000.0) as u64)
}

/// Signed nanosecond delta between two durations.
pub fn delta_ns(new: Duration, old: Duration) -> i64 {
    new.as_nanos() as i64 - old.as_nanos() as i64
}

/// `100 * part / base`, or zero when the base is empty.
pub fn percent_of(part: Duration, base: Duration) -> f64 {
    if base.as_nanos() == 0 {
        return 0.0;
    }
    100.0 * part.as_nanos() as f64 / base.as_nanos() as f64
}

/// Formats a duration for terminal output: `412ms`, `3.21s`, `2m 05s`.
pub fn format_duration(d: Duration) -> String {
    let ms = duration_to_ms(d);
    if ms < 1.0 {
        format!("{}us", d.as_micros())
    } else if ms < 1000.0 {
        format!("{ms:.0}ms")
    } else if ms < 60_000.0 {
        format!("{:.2}s", ms / 1000.0)
    } else {
        let total_secs = d.as_secs();
        format!("{}m {:02}s", total_secs / 60, total_secs % 60)
    }
}

/// Formats a signed nanosecond delta, with an explicit sign.
pub fn format_delta(ns: i64) -> String {
    let sign = if ns < 0 { "-" } else { "+" };
    let magnitude = Duration::from_nanos(ns.unsigned_abs());
    format!("{sign}{}", format_duration(magnitude))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ms_round_trip() {
        let d = Duration::from_micros(1_234_567);
        assert_eq!(duration_to_ms(d), 1234.567);
        assert_eq!(ms_to_duration(duration_to_ms(d)), d);
    }

    #[test]
    fn negative_ms_clamps_to_zero() {
        assert_eq!(ms_to_duration(-5.0), Duration::ZERO);
        assert_eq!(ms_to_duration(f64::NAN), Duration::ZERO);
    }

    #[test]
    fn percent_of_zero_base_is_zero() {
        assert_eq!(percent_of(Duration::from_secs(1), Duration::ZERO), 0.0);
        assert_eq!(
            percent_of(Duration::from_secs(1), Duration::from_secs(4)),
            25.0
        );
    }

    #[test]
    fn delta_is_signed() {
        let a = Duration::from_millis(100);
        let b = Duration::from_millis(150);
        assert_eq!(delta_ns(b, a), 50_000_000);
        assert_eq!(delta_ns(a, b), -50_000_000);
    }

    #[test]
    fn formats_scale_with_magnitude() {
        assert_eq!(format_duration(Duration::from_micros(500)), "500us");
        assert_eq!(format_duration(Duration::from_millis(412)), "412ms");
        assert_eq!(format_duration(Duration::from_millis(3210)), "3.21s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 05s");
        assert_eq!(format_delta(-50_000_000), "-50ms");
    }
}
