//! Solve configuration.
//!
//! Request-level parameters with their defaults. Field names follow the
//! wire format, so a `SolveConfig` deserializes directly from the scalar
//! part of a solve request.

use serde::de::{Error as _, Unexpected};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::{Result, ScheduleError};
use crate::models::{FixedStart, FixedStarts, JobId, ShiftCalendar, TimeScale, DEFAULT_TIME_SCALE};

/// Default working hours per day.
pub const DEFAULT_DAILY_HOURS: f64 = 8.0;
/// Default single-stage budget (seconds).
pub const DEFAULT_MAX_TIME: f64 = 100.0;
/// Default per-stage budget in two-stage mode (seconds).
pub const DEFAULT_STAGE_TIME: f64 = 60.0;

/// Optimization protocol.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveMode {
    /// Minimize makespan once.
    #[default]
    Single,
    /// Minimize makespan, then minimize total start time at that makespan.
    TwoStage,
}

/// Parameters of one solve request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolveConfig {
    /// Shift length (hours) used by the shift containment constraint.
    #[serde(rename = "H_daily_hours", default = "default_daily_hours")]
    pub daily_hours: f64,
    /// Whether operations must fit within one shift.
    #[serde(default = "default_true")]
    pub enforce_daily_limit: bool,
    /// Time units per hour.
    #[serde(default = "default_time_scale")]
    pub time_scale: u32,
    /// Single-stage budget (seconds).
    #[serde(default = "default_max_time")]
    pub max_time: f64,
    /// Add each operation's setup time to its interval.
    #[serde(default)]
    pub use_setup_times: bool,
    /// Stage-1 budget (seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_time_stage1: Option<f64>,
    /// Stage-2 budget (seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_time_stage2: Option<f64>,
    /// Pinned starts (scaled units), keyed by job.
    #[serde(default, deserialize_with = "deserialize_fixed_starts")]
    pub fixed_starts: FixedStarts,
    /// Day length used only for day/hour-of-day display.
    /// Falls back to `daily_hours`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_daily_hours: Option<f64>,
    /// Optimization protocol.
    #[serde(default)]
    pub mode: ObjectiveMode,
}

fn default_daily_hours() -> f64 {
    DEFAULT_DAILY_HOURS
}

fn default_true() -> bool {
    true
}

fn default_time_scale() -> u32 {
    DEFAULT_TIME_SCALE
}

fn default_max_time() -> f64 {
    DEFAULT_MAX_TIME
}

/// Reads `fixed_starts` with job ids as object keys.
///
/// JSON keys are always strings, and a flattened config only ever sees them
/// as strings, so each key is parsed to a [`JobId`] here.
fn deserialize_fixed_starts<'de, D>(deserializer: D) -> std::result::Result<FixedStarts, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, Vec<FixedStart>>::deserialize(deserializer)?;
    raw.into_iter()
        .map(|(key, entries)| {
            key.trim()
                .parse::<JobId>()
                .map(|job_id| (job_id, entries))
                .map_err(|_| D::Error::invalid_value(Unexpected::Str(&key), &"a job id"))
        })
        .collect()
}

impl Default for SolveConfig {
    fn default() -> Self {
        Self {
            daily_hours: DEFAULT_DAILY_HOURS,
            enforce_daily_limit: true,
            time_scale: DEFAULT_TIME_SCALE,
            max_time: DEFAULT_MAX_TIME,
            use_setup_times: false,
            max_time_stage1: None,
            max_time_stage2: None,
            fixed_starts: FixedStarts::new(),
            display_daily_hours: None,
            mode: ObjectiveMode::Single,
        }
    }
}

impl SolveConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the shift length (hours).
    pub fn with_daily_hours(mut self, hours: f64) -> Self {
        self.daily_hours = hours;
        self
    }

    /// Enables or disables shift containment.
    pub fn with_daily_limit(mut self, enforce: bool) -> Self {
        self.enforce_daily_limit = enforce;
        self
    }

    /// Sets the time scale (units per hour).
    pub fn with_time_scale(mut self, units_per_hour: u32) -> Self {
        self.time_scale = units_per_hour;
        self
    }

    /// Sets the single-stage budget (seconds).
    pub fn with_max_time(mut self, seconds: f64) -> Self {
        self.max_time = seconds;
        self
    }

    /// Requests setup-time handling.
    pub fn with_setup_times(mut self, enabled: bool) -> Self {
        self.use_setup_times = enabled;
        self
    }

    /// Sets both stage budgets (seconds).
    pub fn with_stage_times(mut self, stage1: f64, stage2: f64) -> Self {
        self.max_time_stage1 = Some(stage1);
        self.max_time_stage2 = Some(stage2);
        self
    }

    /// Pins one operation's start (scaled units).
    pub fn with_fixed_start(mut self, job_id: u32, operation_index: u32, start: i64) -> Self {
        self.fixed_starts
            .entry(job_id)
            .or_default()
            .push(FixedStart::new(operation_index, start));
        self
    }

    /// Sets a separate display day length (hours).
    pub fn with_display_daily_hours(mut self, hours: f64) -> Self {
        self.display_daily_hours = Some(hours);
        self
    }

    /// Sets the optimization protocol.
    pub fn with_mode(mut self, mode: ObjectiveMode) -> Self {
        self.mode = mode;
        self
    }

    /// Validated time scale.
    pub fn scale(&self) -> Result<TimeScale> {
        TimeScale::new(self.time_scale)
    }

    /// Calendar for the shift containment constraint.
    pub fn shift_calendar(&self) -> Result<ShiftCalendar> {
        ShiftCalendar::new(self.daily_hours)
    }

    /// Calendar for day/hour-of-day display.
    pub fn display_calendar(&self) -> Result<ShiftCalendar> {
        ShiftCalendar::new(self.display_daily_hours.unwrap_or(self.daily_hours))
    }

    /// Budget of a single-stage solve. Stage 1's budget takes precedence.
    pub fn single_stage_budget(&self) -> Result<Duration> {
        budget(self.max_time_stage1.unwrap_or(self.max_time))
    }

    /// Budgets of a two-stage solve.
    pub fn two_stage_budgets(&self) -> Result<(Duration, Duration)> {
        Ok((
            budget(self.max_time_stage1.unwrap_or(DEFAULT_STAGE_TIME))?,
            budget(self.max_time_stage2.unwrap_or(DEFAULT_STAGE_TIME))?,
        ))
    }
}

fn budget(seconds: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(seconds).map_err(|_| ScheduleError::InvalidTimeBudget(seconds))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = SolveConfig::default();
        assert_eq!(c.daily_hours, 8.0);
        assert!(c.enforce_daily_limit);
        assert_eq!(c.time_scale, 60);
        assert_eq!(c.max_time, 100.0);
        assert!(!c.use_setup_times);
        assert_eq!(c.mode, ObjectiveMode::Single);
    }

    #[test]
    fn test_deserialize_defaults_from_empty_object() {
        let c: SolveConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(c, SolveConfig::default());
    }

    #[test]
    fn test_deserialize_wire_names() {
        let c: SolveConfig = serde_json::from_str(
            r#"{"H_daily_hours":10,"enforce_daily_limit":false,"mode":"two_stage",
                "fixed_starts":{"1":[{"operation_index":0,"start_time_fixed":30}]}}"#,
        )
        .unwrap();
        assert_eq!(c.daily_hours, 10.0);
        assert!(!c.enforce_daily_limit);
        assert_eq!(c.mode, ObjectiveMode::TwoStage);
        assert_eq!(c.fixed_starts[&1][0].start_time_fixed, 30);
    }

    #[test]
    fn test_budgets() {
        let c = SolveConfig::default();
        assert_eq!(c.single_stage_budget().unwrap(), Duration::from_secs(100));
        assert_eq!(
            c.two_stage_budgets().unwrap(),
            (Duration::from_secs(60), Duration::from_secs(60))
        );

        let c = c.with_stage_times(5.0, 2.5);
        assert_eq!(c.single_stage_budget().unwrap(), Duration::from_secs(5));
        assert_eq!(
            c.two_stage_budgets().unwrap().1,
            Duration::from_millis(2500)
        );
    }

    #[test]
    fn test_negative_budget_rejected() {
        let c = SolveConfig::default().with_max_time(-1.0);
        assert!(matches!(
            c.single_stage_budget(),
            Err(ScheduleError::InvalidTimeBudget(_))
        ));
    }

    #[test]
    fn test_display_calendar_falls_back() {
        let c = SolveConfig::default().with_daily_hours(10.0);
        assert_eq!(c.display_calendar().unwrap().daily_hours, 10.0);
        let c = c.with_display_daily_hours(24.0);
        assert_eq!(c.display_calendar().unwrap().daily_hours, 24.0);
        assert_eq!(c.shift_calendar().unwrap().daily_hours, 10.0);
    }

    #[test]
    fn test_with_fixed_start_groups_by_job() {
        let c = SolveConfig::default()
            .with_fixed_start(1, 0, 10)
            .with_fixed_start(1, 2, 50);
        assert_eq!(c.fixed_starts[&1].len(), 2);
    }

    #[test]
    fn test_fixed_starts_keys_parsed() {
        let c = SolveConfig::default()
            .with_fixed_start(12, 0, 10)
            .with_fixed_start(3, 1, 50);
        let json = serde_json::to_string(&c).unwrap();
        let back: SolveConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, c);

        let bad = r#"{"fixed_starts":{"job-1":[{"operation_index":0,"start_time_fixed":0}]}}"#;
        let err = serde_json::from_str::<SolveConfig>(bad).unwrap_err();
        assert!(err.to_string().contains("job-1"));
    }
}
