//! Input validation and schedule verification.
//!
//! [`validate_operations`] checks raw records before preprocessing and
//! reports every problem at once. [`verify_schedule`] re-checks a decoded
//! schedule against the job-shop invariants:
//! - job order: `start(i+1) >= end(i)` within each job
//! - machine exclusivity: no two intervals on one machine overlap
//! - shift containment: `start / H == (end - 1) / H` (integer division)
//! - fixed starts: pinned operations start exactly at their pin

use std::collections::HashSet;

use crate::models::{
    FixedStarts, Operation, Schedule, Violation, ViolationType,
};

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Two operations share `(job_id, operation_index)`.
    DuplicateOperation,
    /// Processing time is negative or not finite.
    InvalidDuration,
    /// Setup time is negative or not finite.
    InvalidSetupTime,
}

impl ValidationError {
    pub(crate) fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

fn is_valid_hours(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

/// Validates raw operation records.
///
/// Checks:
/// 1. Processing times are finite and non-negative
/// 2. Setup times, where present, are finite and non-negative
/// 3. No two operations share a `(job_id, operation_index)` key
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_operations(operations: &[Operation]) -> ValidationResult {
    let mut errors = Vec::new();
    let mut keys = HashSet::new();

    for op in operations {
        if !is_valid_hours(op.processing_time) {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidDuration,
                format!(
                    "operation (job {}, index {}) has invalid processing time {}",
                    op.job_id, op.operation_index, op.processing_time
                ),
            ));
        }

        if let Some(setup) = op.setup_time {
            if !is_valid_hours(setup) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidSetupTime,
                    format!(
                        "operation (job {}, index {}) has invalid setup time {}",
                        op.job_id, op.operation_index, setup
                    ),
                ));
            }
        }

        if !keys.insert(op.key()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateOperation,
                format!(
                    "duplicate operation (job {}, index {})",
                    op.job_id, op.operation_index
                ),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Checks a decoded schedule against the job-shop invariants.
///
/// `shift_limit_units` is the scaled shift length; pass `None` when shift
/// containment was not enforced. Zero-length operations never cross a
/// shift boundary.
pub fn verify_schedule(schedule: &Schedule, shift_limit_units: Option<i64>) -> Vec<Violation> {
    let mut violations = Vec::new();

    let mut jobs: Vec<_> = schedule.operations.iter().map(|o| o.job_id).collect();
    jobs.sort_unstable();
    jobs.dedup();
    for job in jobs {
        let ops = schedule.operations_for_job(job);
        for pair in ops.windows(2) {
            if pair[1].start_units < pair[0].end_units {
                violations.push(Violation::new(
                    ViolationType::PrecedenceViolation,
                    pair[1].key(),
                    format!(
                        "job {} operation {} starts at {} before operation {} ends at {}",
                        job,
                        pair[1].operation_index,
                        pair[1].start_units,
                        pair[0].operation_index,
                        pair[0].end_units
                    ),
                ));
            }
        }
    }

    let mut machines: Vec<_> = schedule.operations.iter().map(|o| o.machine_id).collect();
    machines.sort_unstable();
    machines.dedup();
    for machine in machines {
        let ops = schedule.operations_for_machine(machine);
        for i in 0..ops.len() {
            for j in (i + 1)..ops.len() {
                let (a, b) = (ops[i], ops[j]);
                let disjoint = a.end_units <= b.start_units || b.end_units <= a.start_units;
                if !disjoint {
                    violations.push(Violation::new(
                        ViolationType::MachineOverlap,
                        b.key(),
                        format!(
                            "machine {}: job {} op {} [{}, {}) overlaps job {} op {} [{}, {})",
                            machine,
                            a.job_id,
                            a.operation_index,
                            a.start_units,
                            a.end_units,
                            b.job_id,
                            b.operation_index,
                            b.start_units,
                            b.end_units
                        ),
                    ));
                }
            }
        }
    }

    if let Some(limit) = shift_limit_units.filter(|&h| h > 0) {
        for op in &schedule.operations {
            if op.end_units <= op.start_units {
                continue;
            }
            let start_day = op.start_units.div_euclid(limit);
            let end_day = (op.end_units - 1).div_euclid(limit);
            if start_day != end_day {
                violations.push(Violation::new(
                    ViolationType::ShiftCrossing,
                    op.key(),
                    format!(
                        "job {} op {} crosses days ({}h -> {}h)",
                        op.job_id, op.operation_index, op.start_time_hours, op.end_time_hours
                    ),
                ));
            }
        }
    }

    violations
}

/// Checks that every pinned operation starts exactly at its pin.
///
/// Pins naming operations absent from the schedule are ignored.
pub fn verify_fixed_starts(schedule: &Schedule, fixed_starts: &FixedStarts) -> Vec<Violation> {
    let mut violations = Vec::new();
    for (&job, entries) in fixed_starts {
        for entry in entries {
            if let Some(op) = schedule.operation(job, entry.operation_index) {
                if op.start_units != entry.start_time_fixed {
                    violations.push(Violation::new(
                        ViolationType::FixedStartMismatch,
                        op.key(),
                        format!(
                            "job {} op {} starts at {} instead of pinned {}",
                            job, entry.operation_index, op.start_units, entry.start_time_fixed
                        ),
                    ));
                }
            }
        }
    }
    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{scheduled_op, FixedStart};

    #[test]
    fn test_valid_input() {
        let ops = vec![
            Operation::new(1, 0, 1, 1.0),
            Operation::new(1, 1, 2, 0.0).with_setup(0.5),
            Operation::new(2, 0, 1, 2.5),
        ];
        assert!(validate_operations(&ops).is_ok());
        assert!(validate_operations(&[]).is_ok());
    }

    #[test]
    fn test_duplicate_operation() {
        let ops = vec![Operation::new(1, 0, 1, 1.0), Operation::new(1, 0, 2, 1.0)];
        let errors = validate_operations(&ops).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ValidationErrorKind::DuplicateOperation);
    }

    #[test]
    fn test_invalid_times() {
        let ops = vec![
            Operation::new(1, 0, 1, f64::NAN),
            Operation::new(1, 1, 1, 1.0).with_setup(-0.5),
            Operation::new(1, 2, 1, f64::INFINITY),
        ];
        let errors = validate_operations(&ops).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::InvalidSetupTime));
        assert_eq!(
            errors
                .iter()
                .filter(|e| e.kind == ValidationErrorKind::InvalidDuration)
                .count(),
            2
        );
    }

    #[test]
    fn test_valid_schedule_has_no_violations() {
        let mut s = Schedule::new();
        s.add_operation(scheduled_op(1, 0, 1, 0, 60));
        s.add_operation(scheduled_op(1, 1, 2, 60, 120));
        s.add_operation(scheduled_op(2, 0, 2, 0, 60));
        s.add_operation(scheduled_op(2, 1, 1, 60, 120));
        assert!(verify_schedule(&s, Some(480)).is_empty());
    }

    #[test]
    fn test_precedence_violation() {
        let mut s = Schedule::new();
        s.add_operation(scheduled_op(1, 0, 1, 0, 60));
        s.add_operation(scheduled_op(1, 1, 2, 30, 90));
        let v = verify_schedule(&s, None);
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].violation_type, ViolationType::PrecedenceViolation);
        assert_eq!((v[0].job_id, v[0].operation_index), (1, 1));
    }

    #[test]
    fn test_machine_overlap() {
        let mut s = Schedule::new();
        s.add_operation(scheduled_op(1, 0, 1, 0, 60));
        s.add_operation(scheduled_op(2, 0, 1, 59, 100));
        s.add_operation(scheduled_op(3, 0, 1, 100, 130));
        let v = verify_schedule(&s, None);
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].violation_type, ViolationType::MachineOverlap);
    }

    #[test]
    fn test_shift_crossing() {
        let mut s = Schedule::new();
        s.add_operation(scheduled_op(1, 0, 1, 420, 480)); // ends exactly at boundary
        s.add_operation(scheduled_op(2, 0, 2, 450, 510)); // crosses
        s.add_operation(scheduled_op(3, 0, 3, 480, 480)); // zero length
        let v = verify_schedule(&s, Some(480));
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].violation_type, ViolationType::ShiftCrossing);
        assert_eq!(v[0].job_id, 2);

        assert!(verify_schedule(&s, None).is_empty());
    }

    #[test]
    fn test_fixed_start_mismatch() {
        let mut s = Schedule::new();
        s.add_operation(scheduled_op(1, 0, 1, 30, 90));
        let mut fixed = FixedStarts::new();
        fixed.insert(1, vec![FixedStart::new(0, 30)]);
        assert!(verify_fixed_starts(&s, &fixed).is_empty());

        fixed.insert(1, vec![FixedStart::new(0, 40), FixedStart::new(9, 0)]);
        let v = verify_fixed_starts(&s, &fixed);
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].violation_type, ViolationType::FixedStartMismatch);
    }
}
