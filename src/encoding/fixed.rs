//! Pinned start times.

use tracing::debug;

use crate::cp::{LinearExpr, Relation};
use crate::error::{Result, ScheduleError};
use crate::models::{FixedStarts, MAX_TOTAL_UNITS};
use crate::preprocess::ProblemInstance;

use super::EncodedProblem;

/// Turns each fixed start into `start == value`.
///
/// Pins are added on top of precedence and exclusivity. A pin that
/// contradicts them makes the model infeasible rather than being dropped.
#[derive(Debug, Clone, Copy)]
pub struct FixedStartInjector<'a> {
    fixed_starts: &'a FixedStarts,
}

impl<'a> FixedStartInjector<'a> {
    /// Creates the injector.
    pub fn new(fixed_starts: &'a FixedStarts) -> Self {
        Self { fixed_starts }
    }

    /// Checks that every pin names an existing operation and lies in
    /// `[0, MAX_TOTAL_UNITS]`.
    ///
    /// # Errors
    /// [`ScheduleError::UnknownFixedStart`] or [`ScheduleError::FixedStartOutOfRange`].
    pub fn validate(&self, instance: &ProblemInstance) -> Result<()> {
        for (&job_id, entries) in self.fixed_starts {
            for entry in entries {
                let operation_index = entry.operation_index;
                if instance.position(job_id, operation_index).is_none() {
                    return Err(ScheduleError::UnknownFixedStart {
                        job_id,
                        operation_index,
                    });
                }
                if !(0..=MAX_TOTAL_UNITS).contains(&entry.start_time_fixed) {
                    return Err(ScheduleError::FixedStartOutOfRange {
                        job_id,
                        operation_index,
                        value: entry.start_time_fixed,
                    });
                }
            }
        }
        Ok(())
    }

    /// Validates, then appends one equality per pin. Returns the pin count.
    pub fn apply(&self, instance: &ProblemInstance, problem: &mut EncodedProblem) -> Result<usize> {
        self.validate(instance)?;
        let mut pinned = 0;
        for (&job_id, entries) in self.fixed_starts {
            for entry in entries {
                let Some(pos) = instance.position(job_id, entry.operation_index) else {
                    continue;
                };
                problem.builder.add_linear_constraint(
                    problem.vars[pos].start.into(),
                    Relation::Eq,
                    LinearExpr::constant(entry.start_time_fixed),
                );
                debug!(
                    job_id,
                    operation_index = entry.operation_index,
                    start = entry.start_time_fixed,
                    "start pinned"
                );
                pinned += 1;
            }
        }
        Ok(pinned)
    }
}
