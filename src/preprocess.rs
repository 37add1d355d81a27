//! Input preprocessing.
//!
//! Validates raw operation records, scales hour durations to integer units,
//! resolves the setup mode once for the whole instance, and builds the
//! job/machine groupings every later stage reads.
//!
//! # Setup Mode
//!
//! Setup handling applies to all operations or to none. If it is requested
//! but any operation lacks a setup time, it is disabled for the instance and
//! a [`PreprocessWarning`] is recorded. The resolved [`SetupMode`] is fixed
//! for the lifetime of the [`ProblemInstance`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

use crate::config::SolveConfig;
use crate::error::{Result, ScheduleError};
use crate::models::{JobId, MachineId, Operation, OperationIndex, TimeScale, MAX_TOTAL_UNITS};
use crate::validation::validate_operations;

/// Resolved setup handling for one instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SetupMode {
    /// Intervals cover processing time only.
    Disabled,
    /// Intervals cover setup followed by processing.
    Enabled,
}

impl SetupMode {
    /// Whether setup time is part of each interval.
    #[inline]
    pub fn is_enabled(self) -> bool {
        self == SetupMode::Enabled
    }
}

/// Non-fatal issue found during preprocessing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PreprocessWarning {
    /// Setup times were requested but `missing` operations have none.
    SetupTimesUnavailable { missing: usize },
}

impl fmt::Display for PreprocessWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreprocessWarning::SetupTimesUnavailable { missing } => write!(
                f,
                "setup times requested but {missing} operation(s) have none; \
                 setup handling disabled"
            ),
        }
    }
}

/// An operation with its scaled durations.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedOperation {
    /// The original record.
    pub operation: Operation,
    /// `round(processing_time × scale)`.
    pub processing_units: i64,
    /// `round(setup_time × scale)`, or 0 when setup handling is disabled.
    pub setup_units: i64,
}

impl PreparedOperation {
    /// Interval length: setup plus processing.
    #[inline]
    pub fn total_units(&self) -> i64 {
        self.processing_units + self.setup_units
    }

    /// `(job_id, operation_index)` key.
    #[inline]
    pub fn key(&self) -> (JobId, OperationIndex) {
        self.operation.key()
    }
}

/// A validated, scaled, grouped problem instance.
///
/// Operations are stored once, sorted by `(job_id, operation_index)`.
/// Job and machine groupings hold indices into that list and never change
/// after construction.
#[derive(Debug, Clone)]
pub struct ProblemInstance {
    operations: Vec<PreparedOperation>,
    jobs: BTreeMap<JobId, Vec<usize>>,
    machines: BTreeMap<MachineId, Vec<usize>>,
    scale: TimeScale,
    setup_mode: SetupMode,
    warnings: Vec<PreprocessWarning>,
}

impl ProblemInstance {
    /// All operations, sorted by job then operation index.
    pub fn operations(&self) -> &[PreparedOperation] {
        &self.operations
    }

    /// Job → operation indices in execution order.
    pub fn jobs(&self) -> &BTreeMap<JobId, Vec<usize>> {
        &self.jobs
    }

    /// Machine → operation indices.
    pub fn machines(&self) -> &BTreeMap<MachineId, Vec<usize>> {
        &self.machines
    }

    /// Time scale used for all scaled values.
    pub fn scale(&self) -> TimeScale {
        self.scale
    }

    /// Resolved setup mode.
    pub fn setup_mode(&self) -> SetupMode {
        self.setup_mode
    }

    /// Warnings recorded during preprocessing.
    pub fn warnings(&self) -> &[PreprocessWarning] {
        &self.warnings
    }

    /// Number of operations.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Whether the instance has no operations.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Sum of all interval lengths (scaled units).
    pub fn total_units(&self) -> i64 {
        self.operations.iter().map(|o| o.total_units()).sum()
    }

    /// Position of `(job_id, operation_index)` in [`operations`](Self::operations).
    pub fn position(&self, job_id: JobId, operation_index: OperationIndex) -> Option<usize> {
        self.operations
            .binary_search_by_key(&(job_id, operation_index), |o| o.key())
            .ok()
    }
}

/// Validates, scales, and groups raw operations.
#[derive(Debug, Clone, Copy)]
pub struct Preprocessor {
    scale: TimeScale,
    use_setup_times: bool,
}

impl Preprocessor {
    /// Creates a preprocessor.
    pub fn new(scale: TimeScale, use_setup_times: bool) -> Self {
        Self {
            scale,
            use_setup_times,
        }
    }

    /// Creates a preprocessor from request parameters.
    pub fn from_config(config: &SolveConfig) -> Result<Self> {
        Ok(Self::new(config.scale()?, config.use_setup_times))
    }

    /// Builds a [`ProblemInstance`].
    ///
    /// # Errors
    /// [`ScheduleError::InvalidOperations`] if any record is malformed
    /// (negative or non-finite durations, duplicate `(job, index)` keys),
    /// [`ScheduleError::DurationOverflow`] if the scaled durations add up to
    /// more than [`MAX_TOTAL_UNITS`].
    pub fn prepare(&self, operations: &[Operation]) -> Result<ProblemInstance> {
        validate_operations(operations).map_err(ScheduleError::InvalidOperations)?;

        let mut warnings = Vec::new();
        let setup_mode = self.resolve_setup_mode(operations, &mut warnings);
        self.check_total(operations, setup_mode)?;

        let mut prepared: Vec<PreparedOperation> = operations
            .iter()
            .map(|op| PreparedOperation {
                operation: op.clone(),
                processing_units: self.scale.to_units(op.processing_time),
                setup_units: match setup_mode {
                    SetupMode::Enabled => self.scale.to_units(op.setup_time.unwrap_or(0.0)),
                    SetupMode::Disabled => 0,
                },
            })
            .collect();
        prepared.sort_by_key(|o| o.key());

        let mut jobs: BTreeMap<JobId, Vec<usize>> = BTreeMap::new();
        let mut machines: BTreeMap<MachineId, Vec<usize>> = BTreeMap::new();
        for (i, op) in prepared.iter().enumerate() {
            jobs.entry(op.operation.job_id).or_default().push(i);
            machines.entry(op.operation.machine_id).or_default().push(i);
        }

        debug!(
            operations = prepared.len(),
            jobs = jobs.len(),
            machines = machines.len(),
            ?setup_mode,
            "instance prepared"
        );

        Ok(ProblemInstance {
            operations: prepared,
            jobs,
            machines,
            scale: self.scale,
            setup_mode,
            warnings,
        })
    }

    fn check_total(&self, operations: &[Operation], setup_mode: SetupMode) -> Result<()> {
        let per_hour = f64::from(self.scale.units_per_hour());
        let units: f64 = operations
            .iter()
            .map(|op| {
                let setup = match setup_mode {
                    SetupMode::Enabled => op.setup_time.unwrap_or(0.0),
                    SetupMode::Disabled => 0.0,
                };
                (op.processing_time + setup) * per_hour
            })
            .sum();
        if units > MAX_TOTAL_UNITS as f64 {
            return Err(ScheduleError::DurationOverflow { units });
        }
        Ok(())
    }

    fn resolve_setup_mode(
        &self,
        operations: &[Operation],
        warnings: &mut Vec<PreprocessWarning>,
    ) -> SetupMode {
        if !self.use_setup_times {
            return SetupMode::Disabled;
        }
        let missing = operations.iter().filter(|o| o.setup_time.is_none()).count();
        if missing == 0 {
            return SetupMode::Enabled;
        }
        let warning = PreprocessWarning::SetupTimesUnavailable { missing };
        warn!("{warning}");
        warnings.push(warning);
        SetupMode::Disabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scale() -> TimeScale {
        TimeScale::new(60).unwrap()
    }

    #[test]
    fn test_scaling_and_grouping() {
        let ops = vec![
            Operation::new(2, 1, 1, 0.5),
            Operation::new(1, 1, 2, 1.25),
            Operation::new(1, 0, 1, 2.0),
            Operation::new(2, 0, 2, 1.0),
        ];
        let inst = Preprocessor::new(scale(), false).prepare(&ops).unwrap();

        let keys: Vec<_> = inst.operations().iter().map(|o| o.key()).collect();
        assert_eq!(keys, vec![(1, 0), (1, 1), (2, 0), (2, 1)]);
        assert_eq!(inst.operations()[0].processing_units, 120);
        assert_eq!(inst.operations()[1].processing_units, 75);
        assert_eq!(inst.jobs()[&1], vec![0, 1]);
        assert_eq!(inst.machines()[&1], vec![0, 3]);
        assert_eq!(inst.total_units(), 120 + 75 + 60 + 30);
        assert_eq!(inst.position(2, 1), Some(3));
        assert_eq!(inst.position(2, 5), None);
    }

    #[test]
    fn test_setup_enabled_when_all_present() {
        let ops = vec![
            Operation::new(1, 0, 1, 2.0).with_setup(0.5),
            Operation::new(1, 1, 1, 1.0).with_setup(0.0),
        ];
        let inst = Preprocessor::new(scale(), true).prepare(&ops).unwrap();
        assert_eq!(inst.setup_mode(), SetupMode::Enabled);
        assert_eq!(inst.operations()[0].setup_units, 30);
        assert_eq!(inst.operations()[0].total_units(), 150);
        assert!(inst.warnings().is_empty());
    }

    #[test]
    fn test_setup_downgraded_when_any_missing() {
        let ops = vec![
            Operation::new(1, 0, 1, 2.0).with_setup(0.5),
            Operation::new(1, 1, 1, 1.0),
        ];
        let inst = Preprocessor::new(scale(), true).prepare(&ops).unwrap();
        assert_eq!(inst.setup_mode(), SetupMode::Disabled);
        assert!(inst.operations().iter().all(|o| o.setup_units == 0));
        assert_eq!(
            inst.warnings(),
            &[PreprocessWarning::SetupTimesUnavailable { missing: 1 }]
        );
    }

    #[test]
    fn test_setup_ignored_when_not_requested() {
        let ops = vec![Operation::new(1, 0, 1, 2.0).with_setup(0.5)];
        let inst = Preprocessor::new(scale(), false).prepare(&ops).unwrap();
        assert_eq!(inst.setup_mode(), SetupMode::Disabled);
        assert_eq!(inst.operations()[0].total_units(), 120);
        assert!(inst.warnings().is_empty());
    }

    #[test]
    fn test_invalid_records_rejected() {
        let ops = vec![Operation::new(1, 0, 1, -1.0), Operation::new(1, 0, 2, 1.0)];
        let err = Preprocessor::new(scale(), false).prepare(&ops).unwrap_err();
        match err {
            ScheduleError::InvalidOperations(errors) => assert_eq!(errors.len(), 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_oversized_durations_rejected() {
        let ops = vec![
            Operation::new(1, 0, 1, 1e17),
            Operation::new(2, 0, 1, 1e17),
        ];
        let err = Preprocessor::new(scale(), false).prepare(&ops).unwrap_err();
        assert!(matches!(err, ScheduleError::DurationOverflow { .. }));

        // setup time counts toward the total only when setup handling is active
        let ops = vec![Operation::new(1, 0, 1, 1.0).with_setup(1e17)];
        assert!(Preprocessor::new(scale(), false).prepare(&ops).is_ok());
        assert!(Preprocessor::new(scale(), true).prepare(&ops).is_err());
    }

    #[test]
    fn test_empty_instance() {
        let inst = Preprocessor::new(scale(), true).prepare(&[]).unwrap();
        assert!(inst.is_empty());
        assert_eq!(inst.total_units(), 0);
    }

    #[test]
    fn test_warning_display() {
        let w = PreprocessWarning::SetupTimesUnavailable { missing: 3 };
        assert!(w.to_string().contains("3 operation(s)"));
    }
}
