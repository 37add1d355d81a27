//! Shift containment.
//!
//! With `H` the scaled daily limit, every operation of positive length gets
//!
//! ```text
//! last      = end - 1
//! day_start = start / H
//! day_end   = last  / H
//! day_start == day_end
//! ```
//!
//! so its occupied units `[start, end)` lie within one day. An operation
//! ending exactly on a boundary stays in its day. Zero-length operations
//! occupy no units and are left unconstrained. Operations longer than `H`
//! make the model infeasible; they are never split.

use crate::cp::{LinearExpr, Relation};
use crate::models::{ShiftCalendar, TimeScale};
use crate::preprocess::ProblemInstance;

use super::EncodedProblem;

/// Adds the day-index equality of every operation.
#[derive(Debug, Clone, Copy)]
pub struct ShiftConstraintBuilder {
    limit_units: i64,
}

impl ShiftConstraintBuilder {
    /// Creates the builder for `calendar` at `scale`.
    pub fn new(calendar: ShiftCalendar, scale: TimeScale) -> Self {
        Self {
            limit_units: calendar.scaled_limit(scale),
        }
    }

    /// Scaled daily limit.
    pub fn limit_units(&self) -> i64 {
        self.limit_units
    }

    /// Appends the constraints. Returns the number of operations constrained.
    pub fn apply(&self, instance: &ProblemInstance, problem: &mut EncodedProblem) -> usize {
        let h = self.limit_units;
        let max_day = problem.horizon / h + 1;
        let mut constrained = 0;

        for (op, vars) in instance.operations().iter().zip(&problem.vars) {
            if op.total_units() == 0 {
                continue;
            }
            let (job, idx) = op.key();
            let b = &mut problem.builder;

            let last = b.new_bounded_variable(0, problem.horizon, format!("last_{job}_{idx}"));
            b.add_linear_constraint(
                last.into(),
                Relation::Eq,
                LinearExpr::from(vars.end).plus_constant(-1),
            );

            let day_start = b.new_bounded_variable(0, max_day, format!("day_start_{job}_{idx}"));
            let day_end = b.new_bounded_variable(0, max_day, format!("day_end_{job}_{idx}"));
            b.add_division_equality(day_start, vars.start, h);
            b.add_division_equality(day_end, last, h);
            b.add_linear_constraint(day_start.into(), Relation::Eq, day_end.into());
            constrained += 1;
        }
        constrained
    }
}
