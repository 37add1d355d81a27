//! Solution decoding.
//!
//! Turns solved scaled start/end values back into hours (two decimals) and
//! adds display-only day coordinates. The display calendar may differ from
//! the one used by the shift constraint; it never feeds back into the model.

use crate::cp::CpSolution;
use crate::encoding::OperationVars;
use crate::models::{round2, Schedule, ScheduledOperation, ShiftCalendar, TimeScale};
use crate::preprocess::{ProblemInstance, SetupMode};

/// Converts an engine assignment into a [`Schedule`].
#[derive(Debug, Clone, Copy)]
pub struct SolutionDecoder {
    scale: TimeScale,
    setup_mode: SetupMode,
    display: ShiftCalendar,
}

impl SolutionDecoder {
    /// Creates a decoder.
    pub fn new(scale: TimeScale, setup_mode: SetupMode, display: ShiftCalendar) -> Self {
        Self {
            scale,
            setup_mode,
            display,
        }
    }

    /// Creates a decoder for `instance` with the given display calendar.
    pub fn for_instance(instance: &ProblemInstance, display: ShiftCalendar) -> Self {
        Self::new(instance.scale(), instance.setup_mode(), display)
    }

    /// Decodes every operation of `instance`.
    ///
    /// `vars` must be aligned with `instance.operations()`. Returns an empty
    /// schedule when `solution` carries no assignment.
    pub fn decode(
        &self,
        instance: &ProblemInstance,
        vars: &[OperationVars],
        solution: &CpSolution,
    ) -> Schedule {
        let mut schedule = Schedule::new();
        if !solution.is_solution_found() {
            return schedule;
        }

        for (op, v) in instance.operations().iter().zip(vars) {
            let (Some(start), Some(end)) = (solution.value(v.start), solution.value(v.end)) else {
                continue;
            };
            let start_h = round2(self.scale.to_hours(start));
            let end_h = round2(self.scale.to_hours(end));
            let (processing, setup) = match self.setup_mode {
                SetupMode::Enabled => (
                    Some(round2(self.scale.to_hours(op.processing_units))),
                    Some(round2(self.scale.to_hours(op.setup_units))),
                ),
                SetupMode::Disabled => (None, None),
            };

            schedule.add_operation(ScheduledOperation {
                job_id: op.operation.job_id,
                operation_index: op.operation.operation_index,
                machine_id: op.operation.machine_id,
                start_time_hours: start_h,
                end_time_hours: end_h,
                duration_hours: round2(end_h - start_h),
                processing_time_hours: processing,
                setup_time_hours: setup,
                start_day: self.display.day_of(start_h),
                start_hour_of_day: self.display.hour_of_day(start_h),
                end_day: self.display.day_of(end_h),
                end_hour_of_day: self.display.hour_of_day(end_h),
                start_units: start,
                end_units: end,
            });
        }
        schedule
    }
}
