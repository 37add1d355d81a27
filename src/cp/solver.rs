//! Solver contract.
//!
//! A [`CpSolver`] consumes a finalized [`CpModel`] and a wall-clock budget
//! and reports a [`SolveStatus`] plus, when a solution exists, a value for
//! every variable. Running out of budget is not an error: the best solution
//! found so far is returned with status `Feasible`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use super::{CpModel, VarId};

/// Outcome of a solve call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveStatus {
    /// A solution was found and proven optimal.
    Optimal,
    /// A solution was found; the budget ran out before a proof.
    Feasible,
    /// The model has no solution.
    Infeasible,
    /// The budget ran out before any solution was found.
    Unknown,
}

impl SolveStatus {
    /// Whether the status carries a usable assignment.
    #[inline]
    pub fn has_solution(self) -> bool {
        matches!(self, SolveStatus::Optimal | SolveStatus::Feasible)
    }
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SolveStatus::Optimal => "optimal",
            SolveStatus::Feasible => "feasible",
            SolveStatus::Infeasible => "infeasible",
            SolveStatus::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Result of a solve call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpSolution {
    /// Solve status.
    pub status: SolveStatus,
    /// One value per model variable; empty without a solution.
    pub values: Vec<i64>,
    /// Objective value of `values`, if the model has an objective.
    pub objective_value: Option<i64>,
    /// Search nodes explored.
    pub nodes: u64,
    /// Wall-clock time spent.
    pub elapsed: Duration,
}

impl CpSolution {
    /// A solution-less result.
    pub fn without_solution(status: SolveStatus, nodes: u64, elapsed: Duration) -> Self {
        Self {
            status,
            values: Vec::new(),
            objective_value: None,
            nodes,
            elapsed,
        }
    }

    /// Whether an assignment is available.
    #[inline]
    pub fn is_solution_found(&self) -> bool {
        self.status.has_solution()
    }

    /// Value of `var`, if a solution was found.
    pub fn value(&self, var: VarId) -> Option<i64> {
        self.values.get(var.0).copied()
    }
}

/// A constraint-solving engine.
pub trait CpSolver {
    /// Engine name for logging.
    fn name(&self) -> &'static str;

    /// Solves `model` within `time_limit`.
    fn solve(&self, model: &CpModel, time_limit: Duration) -> CpSolution;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_has_solution() {
        assert!(SolveStatus::Optimal.has_solution());
        assert!(SolveStatus::Feasible.has_solution());
        assert!(!SolveStatus::Infeasible.has_solution());
        assert!(!SolveStatus::Unknown.has_solution());
        assert_eq!(SolveStatus::Feasible.to_string(), "feasible");
    }

    #[test]
    fn test_value_lookup() {
        let sol = CpSolution {
            status: SolveStatus::Optimal,
            values: vec![4, 7],
            objective_value: Some(7),
            nodes: 1,
            elapsed: Duration::ZERO,
        };
        assert_eq!(sol.value(VarId(1)), Some(7));
        assert_eq!(sol.value(VarId(2)), None);

        let none = CpSolution::without_solution(SolveStatus::Infeasible, 3, Duration::ZERO);
        assert!(!none.is_solution_found());
        assert_eq!(none.value(VarId(0)), None);
    }
}
