//! Schedule (solution) model.
//!
//! A schedule is the decoded result of a successful solve: every operation
//! with its start, end, and duration in hours, plus day/hour-of-day
//! coordinates for display. It may carry violations found by
//! [`verify_schedule`](crate::validation::verify_schedule).
//!
//! # Reference
//! Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 3

use serde::{Deserialize, Serialize};

use super::{JobId, MachineId, OperationIndex, TimeWindow};

/// One decoded operation.
///
/// Serializes as a row of the response `schedule` list. The scaled start and
/// end are kept for exact comparisons but never serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledOperation {
    /// Owning job.
    pub job_id: JobId,
    /// Position within the job.
    pub operation_index: OperationIndex,
    /// Machine the operation ran on.
    pub machine_id: MachineId,
    /// Start (hours, two decimals).
    pub start_time_hours: f64,
    /// End (hours, two decimals).
    pub end_time_hours: f64,
    /// Full interval length including setup (hours).
    pub duration_hours: f64,
    /// Processing part (hours). Present only when setup handling was active.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_time_hours: Option<f64>,
    /// Setup part (hours). Present only when setup handling was active.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setup_time_hours: Option<f64>,
    /// Display day of the start.
    pub start_day: u32,
    /// Start offset within its display day (hours).
    pub start_hour_of_day: f64,
    /// Display day of the end.
    pub end_day: u32,
    /// End offset within its display day (hours).
    pub end_hour_of_day: f64,
    /// Start in scaled units.
    #[serde(skip)]
    pub start_units: i64,
    /// End in scaled units.
    #[serde(skip)]
    pub end_units: i64,
}

impl ScheduledOperation {
    /// `(job_id, operation_index)` key.
    #[inline]
    pub fn key(&self) -> (JobId, OperationIndex) {
        (self.job_id, self.operation_index)
    }

    /// Setup sub-interval `[start, start + setup)`, if setup was active.
    pub fn setup_window(&self) -> Option<TimeWindow> {
        self.setup_time_hours
            .map(|setup| TimeWindow::new(self.start_time_hours, self.start_time_hours + setup))
    }

    /// Processing sub-interval, immediately after the setup part.
    ///
    /// Without setup handling this is the whole interval.
    pub fn processing_window(&self) -> TimeWindow {
        let setup = self.setup_time_hours.unwrap_or(0.0);
        TimeWindow::new(self.start_time_hours + setup, self.end_time_hours)
    }
}

/// A constraint violation detected in a decoded schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// Type of violation.
    pub violation_type: ViolationType,
    /// Job the violation is reported against.
    pub job_id: JobId,
    /// Operation the violation is reported against.
    pub operation_index: OperationIndex,
    /// Human-readable description.
    pub message: String,
}

/// Classification of constraint violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViolationType {
    /// Operation started before its job predecessor finished.
    PrecedenceViolation,
    /// Two operations overlap on one machine.
    MachineOverlap,
    /// Operation spans a shift boundary.
    ShiftCrossing,
    /// Operation does not start at its pinned start.
    FixedStartMismatch,
}

impl Violation {
    /// Creates a violation.
    pub fn new(
        violation_type: ViolationType,
        key: (JobId, OperationIndex),
        message: impl Into<String>,
    ) -> Self {
        Self {
            violation_type,
            job_id: key.0,
            operation_index: key.1,
            message: message.into(),
        }
    }
}

/// A decoded schedule.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schedule {
    /// Operations, ordered by job then operation index.
    pub operations: Vec<ScheduledOperation>,
    /// Violations detected in this schedule.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<Violation>,
}

impl Schedule {
    /// Creates an empty schedule.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an operation.
    pub fn add_operation(&mut self, op: ScheduledOperation) {
        self.operations.push(op);
    }

    /// Adds a violation.
    pub fn add_violation(&mut self, violation: Violation) {
        self.violations.push(violation);
    }

    /// Whether the schedule has no violations.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    /// Whether the schedule has no operations.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Number of operations.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Makespan: latest end time (hours). Zero for an empty schedule.
    pub fn makespan_hours(&self) -> f64 {
        self.operations
            .iter()
            .map(|o| o.end_time_hours)
            .fold(0.0, f64::max)
    }

    /// Finds one operation.
    pub fn operation(
        &self,
        job_id: JobId,
        operation_index: OperationIndex,
    ) -> Option<&ScheduledOperation> {
        self.operations
            .iter()
            .find(|o| o.job_id == job_id && o.operation_index == operation_index)
    }

    /// Operations of one job, in operation-index order.
    pub fn operations_for_job(&self, job_id: JobId) -> Vec<&ScheduledOperation> {
        let mut ops: Vec<_> = self.operations.iter().filter(|o| o.job_id == job_id).collect();
        ops.sort_by_key(|o| o.operation_index);
        ops
    }

    /// Operations on one machine, in start order.
    pub fn operations_for_machine(&self, machine_id: MachineId) -> Vec<&ScheduledOperation> {
        let mut ops: Vec<_> = self
            .operations
            .iter()
            .filter(|o| o.machine_id == machine_id)
            .collect();
        ops.sort_by_key(|o| (o.start_units, o.end_units));
        ops
    }
}
