//! Job-shop to constraint-model encoding.
//!
//! Each stage appends to one [`EncodedProblem`]:
//!
//! | Stage | Adds |
//! |-------|------|
//! | [`ProblemEncoder`] | start/end/interval per operation, job precedence |
//! | [`ResourceConstraintBuilder`] | one no-overlap set per machine |
//! | [`ShiftConstraintBuilder`] | day-index equality per operation |
//! | [`FixedStartInjector`] | `start == pin` equalities |
//!
//! [`encode`] runs all of them in that order for one [`SolveConfig`].
//! The objective is left to [`ObjectiveStrategy`](crate::strategy::ObjectiveStrategy).

mod fixed;
mod problem;
mod resource;
mod shift;

pub use fixed::FixedStartInjector;
pub use problem::ProblemEncoder;
pub use resource::ResourceConstraintBuilder;
pub use shift::ShiftConstraintBuilder;

use tracing::debug;

use crate::config::SolveConfig;
use crate::cp::{CpModelBuilder, IntervalId, VarId};
use crate::error::Result;
use crate::preprocess::ProblemInstance;

/// Variables of one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationVars {
    /// Start (scaled units).
    pub start: VarId,
    /// End (scaled units).
    pub end: VarId,
    /// `end = start + total_units`.
    pub interval: IntervalId,
}

/// A model under construction plus the handles needed to decode it.
#[derive(Debug, Clone)]
pub struct EncodedProblem {
    /// The model builder. Later stages keep appending to it.
    pub builder: CpModelBuilder,
    /// One entry per operation, aligned with [`ProblemInstance::operations`].
    pub vars: Vec<OperationVars>,
    /// End variable of every job's last operation, in job order.
    pub job_ends: Vec<VarId>,
    /// Upper bound of every time variable.
    pub horizon: i64,
}

impl EncodedProblem {
    /// Start variables of all operations.
    pub fn starts(&self) -> impl Iterator<Item = VarId> + '_ {
        self.vars.iter().map(|v| v.start)
    }
}

/// Encodes `instance` with every constraint stage `config` asks for.
///
/// # Errors
/// Configuration errors from the shift calendar or the fixed-start map.
pub fn encode(instance: &ProblemInstance, config: &SolveConfig) -> Result<EncodedProblem> {
    let injector = FixedStartInjector::new(&config.fixed_starts);
    injector.validate(instance)?;

    let mut problem = ProblemEncoder::new(instance)
        .with_fixed_starts(&config.fixed_starts)
        .encode("jobshop");
    let exclusions = ResourceConstraintBuilder::new(instance).apply(&mut problem);
    let shifts = if config.enforce_daily_limit {
        ShiftConstraintBuilder::new(config.shift_calendar()?, instance.scale())
            .apply(instance, &mut problem)
    } else {
        0
    };
    let pins = injector.apply(instance, &mut problem)?;

    debug!(
        variables = problem.builder.variable_count(),
        constraints = problem.builder.constraints().len(),
        horizon = problem.horizon,
        exclusions,
        shifts,
        pins,
        "model encoded"
    );
    Ok(problem)
}
