//! Optimization protocol.
//!
//! # Single-stage
//! `makespan = max(job ends)`, minimize `makespan`, one solve.
//!
//! # Two-stage (lexicographic)
//! 1. Solve the single-stage model; without a solution, stop.
//! 2. Read the achieved makespan `M`.
//! 3. Re-encode from scratch, add `makespan == M`, minimize `Σ start`.
//! 4. If stage 2 finds nothing within its budget, keep the stage-1 result.
//!
//! Each stage builds a fresh model through the caller's encode closure;
//! nothing is shared between stages except `M`.

use std::time::Duration;
use tracing::{info, warn};

use crate::config::{ObjectiveMode, SolveConfig};
use crate::cp::{CpSolution, CpSolver, LinearExpr, Relation, SolveStatus, VarId};
use crate::encoding::{EncodedProblem, OperationVars};
use crate::error::Result;

/// Which stage produced the returned solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// The makespan stage.
    Makespan,
    /// The start-sum stage at fixed makespan.
    StartSum,
}

/// Result of running a strategy.
#[derive(Debug, Clone)]
pub struct StrategyOutcome {
    /// Engine result of the returned stage.
    pub solution: CpSolution,
    /// Operation variables of the model `solution` belongs to.
    pub vars: Vec<OperationVars>,
    /// Makespan variable of that model.
    pub makespan_var: VarId,
    /// Stage that produced `solution`.
    pub stage: Stage,
    /// Whether stage 2 was attempted and failed.
    pub fell_back: bool,
}

impl StrategyOutcome {
    /// Engine status of the returned solution.
    pub fn status(&self) -> SolveStatus {
        self.solution.status
    }

    /// Whether a usable assignment exists.
    pub fn is_feasible(&self) -> bool {
        self.solution.is_solution_found()
    }

    /// Achieved makespan (scaled units).
    pub fn makespan(&self) -> Option<i64> {
        self.solution.value(self.makespan_var)
    }
}

/// Single- or two-stage optimization over a solver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectiveStrategy {
    mode: ObjectiveMode,
    stage1: Duration,
    stage2: Duration,
}

impl ObjectiveStrategy {
    /// Single-stage strategy with `budget`.
    pub fn single(budget: Duration) -> Self {
        Self {
            mode: ObjectiveMode::Single,
            stage1: budget,
            stage2: Duration::ZERO,
        }
    }

    /// Two-stage strategy with per-stage budgets.
    pub fn two_stage(stage1: Duration, stage2: Duration) -> Self {
        Self {
            mode: ObjectiveMode::TwoStage,
            stage1,
            stage2,
        }
    }

    /// Strategy and budgets requested by `config`.
    ///
    /// # Errors
    /// [`ScheduleError::InvalidTimeBudget`](crate::error::ScheduleError::InvalidTimeBudget)
    /// for negative or non-finite budgets.
    pub fn from_config(config: &SolveConfig) -> Result<Self> {
        Ok(match config.mode {
            ObjectiveMode::Single => Self::single(config.single_stage_budget()?),
            ObjectiveMode::TwoStage => {
                let (s1, s2) = config.two_stage_budgets()?;
                Self::two_stage(s1, s2)
            }
        })
    }

    /// Selected mode.
    pub fn mode(&self) -> ObjectiveMode {
        self.mode
    }

    /// Runs the protocol. `encode` must build the same model on every call.
    pub fn run<S, F>(&self, solver: &S, encode: F) -> Result<StrategyOutcome>
    where
        S: CpSolver + ?Sized,
        F: Fn() -> Result<EncodedProblem>,
    {
        let first = self.solve_makespan(solver, encode()?);
        if self.mode == ObjectiveMode::Single {
            return Ok(first);
        }
        let Some(makespan) = first.makespan() else {
            return Ok(first);
        };

        let second = self.solve_start_sum(solver, encode()?, makespan);
        if second.is_feasible() {
            Ok(second)
        } else {
            warn!(
                status = %second.status(),
                budget = ?self.stage2,
                "stage 2 found no solution; keeping stage 1 result"
            );
            Ok(StrategyOutcome {
                fell_back: true,
                ..first
            })
        }
    }

    fn solve_makespan<S: CpSolver + ?Sized>(
        &self,
        solver: &S,
        mut problem: EncodedProblem,
    ) -> StrategyOutcome {
        let makespan_var = add_makespan(&mut problem);
        problem.builder.minimize(makespan_var.into());
        let solution = solver.solve(&problem.builder.finalize(), self.stage1);
        info!(
            stage = 1,
            solver = solver.name(),
            status = %solution.status,
            makespan = ?solution.value(makespan_var),
            nodes = solution.nodes,
            elapsed = ?solution.elapsed,
            "makespan stage finished"
        );
        StrategyOutcome {
            solution,
            vars: problem.vars,
            makespan_var,
            stage: Stage::Makespan,
            fell_back: false,
        }
    }

    fn solve_start_sum<S: CpSolver + ?Sized>(
        &self,
        solver: &S,
        mut problem: EncodedProblem,
        makespan: i64,
    ) -> StrategyOutcome {
        let makespan_var = add_makespan(&mut problem);
        problem.builder.add_linear_constraint(
            makespan_var.into(),
            Relation::Eq,
            LinearExpr::constant(makespan),
        );
        let starts = LinearExpr::sum(problem.starts());
        problem.builder.minimize(starts);
        let solution = solver.solve(&problem.builder.finalize(), self.stage2);
        info!(
            stage = 2,
            solver = solver.name(),
            status = %solution.status,
            makespan,
            start_sum = ?solution.objective_value,
            nodes = solution.nodes,
            elapsed = ?solution.elapsed,
            "start-sum stage finished"
        );
        StrategyOutcome {
            solution,
            vars: problem.vars,
            makespan_var,
            stage: Stage::StartSum,
            fell_back: false,
        }
    }
}

/// Adds `makespan = max(job ends)`. Without jobs the makespan is fixed at 0.
fn add_makespan(problem: &mut EncodedProblem) -> VarId {
    if problem.job_ends.is_empty() {
        return problem.builder.new_bounded_variable(0, 0, "makespan");
    }
    let makespan = problem
        .builder
        .new_bounded_variable(0, problem.horizon, "makespan");
    problem
        .builder
        .add_max_equality(makespan, problem.job_ends.clone());
    makespan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cp::{BranchAndBoundSolver, CpModel};
    use crate::encoding::encode;
    use crate::models::Operation;
    use crate::preprocess::{Preprocessor, ProblemInstance};

    const BUDGET: Duration = Duration::from_secs(10);

    fn prepare(ops: &[Operation], config: &SolveConfig) -> ProblemInstance {
        Preprocessor::from_config(config).unwrap().prepare(ops).unwrap()
    }

    fn two_by_two() -> Vec<Operation> {
        vec![
            Operation::new(1, 0, 1, 1.0),
            Operation::new(1, 1, 2, 1.0),
            Operation::new(2, 0, 2, 1.0),
            Operation::new(2, 1, 1, 1.0),
        ]
    }

    /// Solves stage 1 normally and reports no solution for every later call.
    struct FirstOnly {
        inner: BranchAndBoundSolver,
        calls: std::cell::Cell<u32>,
    }

    impl CpSolver for FirstOnly {
        fn name(&self) -> &'static str {
            "first-only"
        }

        fn solve(&self, model: &CpModel, time_limit: Duration) -> CpSolution {
            self.calls.set(self.calls.get() + 1);
            if self.calls.get() == 1 {
                self.inner.solve(model, time_limit)
            } else {
                CpSolution::without_solution(SolveStatus::Unknown, 0, Duration::ZERO)
            }
        }
    }

    #[test]
    fn test_single_stage_makespan() {
        let config = SolveConfig::default().with_daily_limit(false);
        let inst = prepare(&two_by_two(), &config);
        let outcome = ObjectiveStrategy::single(BUDGET)
            .run(&BranchAndBoundSolver::new(), || encode(&inst, &config))
            .unwrap();
        assert_eq!(outcome.status(), SolveStatus::Optimal);
        assert_eq!(outcome.makespan(), Some(120));
        assert_eq!(outcome.stage, Stage::Makespan);
        assert!(!outcome.fell_back);
    }

    #[test]
    fn test_two_stage_keeps_makespan_and_front_loads() {
        // Job 2 has slack: at makespan 3h its single operation may start
        // anywhere in [0, 2h]; stage 2 starts it at 0.
        let ops = vec![
            Operation::new(1, 0, 1, 1.0),
            Operation::new(1, 1, 1, 1.0),
            Operation::new(1, 2, 1, 1.0),
            Operation::new(2, 0, 2, 1.0),
        ];
        let config = SolveConfig::default().with_daily_limit(false);
        let inst = prepare(&ops, &config);
        let solver = BranchAndBoundSolver::new();

        let single = ObjectiveStrategy::single(BUDGET)
            .run(&solver, || encode(&inst, &config))
            .unwrap();
        let two = ObjectiveStrategy::two_stage(BUDGET, BUDGET)
            .run(&solver, || encode(&inst, &config))
            .unwrap();

        assert_eq!(two.stage, Stage::StartSum);
        assert_eq!(two.makespan(), single.makespan());
        assert_eq!(two.makespan(), Some(180));
        // 0 + 60 + 120 + 0
        assert_eq!(two.solution.objective_value, Some(180));
    }

    #[test]
    fn test_stage_two_fallback() {
        let config = SolveConfig::default().with_daily_limit(false);
        let inst = prepare(&two_by_two(), &config);
        let solver = FirstOnly {
            inner: BranchAndBoundSolver::new(),
            calls: std::cell::Cell::new(0),
        };
        let outcome = ObjectiveStrategy::two_stage(BUDGET, BUDGET)
            .run(&solver, || encode(&inst, &config))
            .unwrap();
        assert_eq!(solver.calls.get(), 2);
        assert!(outcome.fell_back);
        assert_eq!(outcome.stage, Stage::Makespan);
        assert!(outcome.is_feasible());
        assert_eq!(outcome.makespan(), Some(120));
    }

    #[test]
    fn test_infeasible_stage_one_skips_stage_two() {
        let config = SolveConfig::default();
        let inst = prepare(&[Operation::new(1, 0, 1, 12.0)], &config);
        let solver = FirstOnly {
            inner: BranchAndBoundSolver::new(),
            calls: std::cell::Cell::new(0),
        };
        let outcome = ObjectiveStrategy::two_stage(BUDGET, BUDGET)
            .run(&solver, || encode(&inst, &config))
            .unwrap();
        assert_eq!(solver.calls.get(), 1);
        assert_eq!(outcome.status(), SolveStatus::Infeasible);
        assert_eq!(outcome.makespan(), None);
    }

    #[test]
    fn test_empty_instance() {
        let config = SolveConfig::default();
        let inst = prepare(&[], &config);
        let outcome = ObjectiveStrategy::single(BUDGET)
            .run(&BranchAndBoundSolver::new(), || encode(&inst, &config))
            .unwrap();
        assert!(outcome.is_feasible());
        assert_eq!(outcome.makespan(), Some(0));
    }

    #[test]
    fn test_from_config_budgets() {
        let config = SolveConfig::default().with_max_time(5.0);
        let single = ObjectiveStrategy::from_config(&config).unwrap();
        assert_eq!(single, ObjectiveStrategy::single(Duration::from_secs(5)));

        let config = SolveConfig::default().with_mode(ObjectiveMode::TwoStage);
        let two = ObjectiveStrategy::from_config(&config).unwrap();
        assert_eq!(two.mode(), ObjectiveMode::TwoStage);
        assert_eq!(
            two,
            ObjectiveStrategy::two_stage(Duration::from_secs(60), Duration::from_secs(60))
        );

        let bad = SolveConfig::default().with_max_time(-1.0);
        assert!(ObjectiveStrategy::from_config(&bad).is_err());
    }
}
