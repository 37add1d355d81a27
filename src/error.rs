//! Error types.
//!
//! Only malformed requests are errors. Infeasible models, exhausted time
//! budgets, setup-mode downgrades and stage-2 fallbacks are regular outcomes
//! and never surface as `Err`.

use thiserror::Error;

use crate::models::{JobId, OperationIndex, MAX_TOTAL_UNITS};
use crate::validation::ValidationError;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, ScheduleError>;

/// Configuration and input errors.
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// Time scale must be a positive number of units per hour.
    #[error("time scale must be positive, got {0}")]
    InvalidTimeScale(u32),

    /// Daily-hour limit must be positive and finite.
    #[error("daily hour limit must be positive, got {0}")]
    InvalidDailyLimit(f64),

    /// Solver time budget must be non-negative and finite.
    #[error("time budget must be a non-negative number of seconds, got {0}")]
    InvalidTimeBudget(f64),

    /// One or more operation records failed validation.
    #[error("invalid operations: {}", summarize(.0))]
    InvalidOperations(Vec<ValidationError>),

    /// A fixed start names an operation that does not exist.
    #[error("fixed start references unknown operation (job {job_id}, index {operation_index})")]
    UnknownFixedStart {
        job_id: JobId,
        operation_index: OperationIndex,
    },

    /// A fixed start value is negative or beyond [`MAX_TOTAL_UNITS`].
    #[error(
        "fixed start for (job {job_id}, index {operation_index}) must be within \
         [0, {max}], got {value}",
        max = MAX_TOTAL_UNITS
    )]
    FixedStartOutOfRange {
        job_id: JobId,
        operation_index: OperationIndex,
        value: i64,
    },

    /// The scaled durations of all operations add up to more than [`MAX_TOTAL_UNITS`].
    #[error(
        "total scaled duration {units} exceeds the limit of {max} units",
        max = MAX_TOTAL_UNITS
    )]
    DurationOverflow { units: f64 },

    /// Request or response (de)serialization failed.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

fn summarize(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}
