//! Base encoding: time variables, intervals and job order.

use crate::cp::{CpModelBuilder, LinearExpr, Relation};
use crate::models::FixedStarts;
use crate::preprocess::ProblemInstance;

use super::{EncodedProblem, OperationVars};

/// Allocates per-operation variables and intra-job precedence.
///
/// Every start and end variable ranges over `[0, horizon]`. The default
/// horizon is twice the total interval length; pins later than that push
/// it out so each pinned operation still fits.
#[derive(Debug, Clone, Copy)]
pub struct ProblemEncoder<'a> {
    instance: &'a ProblemInstance,
    horizon: i64,
}

impl<'a> ProblemEncoder<'a> {
    /// Creates an encoder with horizon `2 × total_units`.
    pub fn new(instance: &'a ProblemInstance) -> Self {
        Self {
            instance,
            horizon: 2 * instance.total_units(),
        }
    }

    /// Widens the horizon to `max_pin + total_units` if that is larger.
    pub fn with_fixed_starts(mut self, fixed_starts: &FixedStarts) -> Self {
        let latest = fixed_starts
            .values()
            .flatten()
            .map(|f| f.start_time_fixed)
            .max();
        if let Some(latest) = latest {
            self.horizon = self.horizon.max(latest + self.instance.total_units());
        }
        self
    }

    /// Current horizon (scaled units).
    pub fn horizon(&self) -> i64 {
        self.horizon
    }

    /// Builds a fresh model named `name`.
    pub fn encode(&self, name: &str) -> EncodedProblem {
        let mut builder = CpModelBuilder::new(name);
        let h = self.horizon;

        let vars: Vec<OperationVars> = self
            .instance
            .operations()
            .iter()
            .map(|op| {
                let (job, idx) = op.key();
                let start = builder.new_bounded_variable(0, h, format!("start_{job}_{idx}"));
                let end = builder.new_bounded_variable(0, h, format!("end_{job}_{idx}"));
                let interval = builder.new_interval(
                    start,
                    op.total_units(),
                    end,
                    format!("interval_{job}_{idx}"),
                );
                OperationVars {
                    start,
                    end,
                    interval,
                }
            })
            .collect();

        let mut job_ends = Vec::with_capacity(self.instance.jobs().len());
        for positions in self.instance.jobs().values() {
            for pair in positions.windows(2) {
                builder.add_linear_constraint(
                    vars[pair[1]].start.into(),
                    Relation::Ge,
                    LinearExpr::from(vars[pair[0]].end),
                );
            }
            if let Some(&last) = positions.last() {
                job_ends.push(vars[last].end);
            }
        }

        EncodedProblem {
            builder,
            vars,
            job_ends,
            horizon: h,
        }
    }
}
