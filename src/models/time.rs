//! Time discretization and shift calendar.
//!
//! The constraint model works in integer time units; callers think in hours.
//! `TimeScale` converts between the two, and `ShiftCalendar` maps hour values
//! onto fixed-length working days.
//!
//! # Time Model
//! Hour 0 is the start of day 0. Day `d` covers hours
//! `[d × daily_hours, (d + 1) × daily_hours)`.

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScheduleError};

/// Default time units per hour (minute resolution).
pub const DEFAULT_TIME_SCALE: u32 = 60;

/// Upper bound on an instance's total scaled duration and on any pinned start.
///
/// Horizons (at most twice this) and start-time sums stay far inside `i64`.
pub const MAX_TOTAL_UNITS: i64 = 1 << 40;

/// Rounds to two decimal places for presentation.
#[inline]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Integer time units per hour.
///
/// `to_units` rounds to the nearest unit, so `to_hours(to_units(h))` lies
/// within half a unit of `h`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimeScale(u32);

impl TimeScale {
    /// Creates a time scale. Zero is rejected.
    pub fn new(units_per_hour: u32) -> Result<Self> {
        if units_per_hour == 0 {
            return Err(ScheduleError::InvalidTimeScale(units_per_hour));
        }
        Ok(Self(units_per_hour))
    }

    /// Units per hour.
    #[inline]
    pub fn units_per_hour(&self) -> u32 {
        self.0
    }

    /// Hours to scaled units: `round(hours × scale)`.
    #[inline]
    pub fn to_units(&self, hours: f64) -> i64 {
        (hours * self.0 as f64).round() as i64
    }

    /// Scaled units back to hours.
    #[inline]
    pub fn to_hours(&self, units: i64) -> f64 {
        units as f64 / self.0 as f64
    }
}

impl Default for TimeScale {
    fn default() -> Self {
        Self(DEFAULT_TIME_SCALE)
    }
}

/// A time interval [start, end) in hours.
///
/// Half-open interval: includes start, excludes end.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TimeWindow {
    /// Interval start (hours, inclusive).
    pub start: f64,
    /// Interval end (hours, exclusive).
    pub end: f64,
}

impl TimeWindow {
    /// Creates a new time window.
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }
}

/// Fixed-length daily shift pattern.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShiftCalendar {
    /// Working hours per day.
    pub daily_hours: f64,
}

impl ShiftCalendar {
    /// Creates a calendar. The daily limit must be positive and finite.
    pub fn new(daily_hours: f64) -> Result<Self> {
        if !daily_hours.is_finite() || daily_hours <= 0.0 {
            return Err(ScheduleError::InvalidDailyLimit(daily_hours));
        }
        Ok(Self { daily_hours })
    }

    /// Daily limit in scaled units (at least one unit).
    pub fn scaled_limit(&self, scale: TimeScale) -> i64 {
        scale.to_units(self.daily_hours).max(1)
    }

    /// Day index containing `hours`.
    pub fn day_of(&self, hours: f64) -> u32 {
        (hours / self.daily_hours).floor().max(0.0) as u32
    }

    /// Offset of `hours` within its day, rounded to two decimals.
    pub fn hour_of_day(&self, hours: f64) -> f64 {
        round2(hours.rem_euclid(self.daily_hours))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_rejects_zero() {
        assert!(matches!(
            TimeScale::new(0),
            Err(ScheduleError::InvalidTimeScale(0))
        ));
        assert_eq!(TimeScale::default().units_per_hour(), 60);
    }

    #[test]
    fn test_scale_rounding() {
        let s = TimeScale::new(60).unwrap();
        assert_eq!(s.to_units(1.5), 90);
        assert_eq!(s.to_units(0.0083), 0); // 0.498 units
        assert_eq!(s.to_units(0.0084), 1); // 0.504 units
        assert!((s.to_hours(90) - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_scale_round_trip_within_one_unit() {
        for scale in [1u32, 4, 60, 100] {
            let s = TimeScale::new(scale).unwrap();
            for i in 0..500 {
                let hours = i as f64 * 0.0371;
                let back = s.to_hours(s.to_units(hours));
                assert!((back - hours).abs() <= 1.0 / scale as f64);
            }
        }
    }

    #[test]
    fn test_scale_monotonic() {
        let s = TimeScale::new(10).unwrap();
        let mut last = i64::MIN;
        for i in 0..1000 {
            let u = s.to_units(i as f64 * 0.013);
            assert!(u >= last);
            last = u;
        }
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(1.23456), 1.23);
        assert_eq!(round2(2.0 / 3.0), 0.67);
    }

    #[test]
    fn test_calendar_day_and_hour() {
        let cal = ShiftCalendar::new(8.0).unwrap();
        assert_eq!(cal.day_of(0.0), 0);
        assert_eq!(cal.day_of(7.99), 0);
        assert_eq!(cal.day_of(8.0), 1);
        assert_eq!(cal.day_of(17.5), 2);
        assert_eq!(cal.hour_of_day(17.5), 1.5);
        assert_eq!(cal.hour_of_day(8.0), 0.0);
    }

    #[test]
    fn test_calendar_scaled_limit() {
        let cal = ShiftCalendar::new(8.0).unwrap();
        assert_eq!(cal.scaled_limit(TimeScale::new(60).unwrap()), 480);
        let tiny = ShiftCalendar::new(0.001).unwrap();
        assert_eq!(tiny.scaled_limit(TimeScale::new(1).unwrap()), 1);
    }

    #[test]
    fn test_calendar_rejects_bad_limit() {
        assert!(ShiftCalendar::new(0.0).is_err());
        assert!(ShiftCalendar::new(-2.0).is_err());
        assert!(ShiftCalendar::new(f64::NAN).is_err());
    }
}
