//! Bundled branch-and-bound engine.
//!
//! A depth-first search over bound domains with an explicit stack.
//!
//! # Algorithm
//! 1. Propagate all constraints to a fixpoint; a conflict backtracks.
//! 2. If some no-overlap pair is not yet ordered, branch on it: the interval
//!    with the earlier possible start goes first, then the reverse order.
//! 3. Otherwise label the first unfixed variable: `x = lb`, then `x >= lb + 1`.
//! 4. A node with every variable fixed is a solution. The objective is then
//!    bounded to `< value` and the search continues.
//!
//! Exhausting the tree proves optimality (or infeasibility). Hitting the time
//! limit returns the incumbent, if any, as `Feasible`.
//!
//! # Reference
//! Brucker, Jurisch & Sievers (1994), "A branch and bound algorithm for the
//! job-shop scheduling problem"

use std::time::{Duration, Instant};
use tracing::{debug, trace};

use super::model::{CpModel, Relation};
use super::propagate::{compile, fixpoint, Disjunct, Domains, LinearLe, Propagator};
use super::solver::{CpSolution, CpSolver, SolveStatus};

/// A branching decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Branch {
    /// `end <= start` ordering the intervals of disjunctive pair `pair`.
    Precede { pair: usize, end: usize, start: usize },
    /// `var = value`.
    Assign { var: usize, value: i64 },
    /// `var >= value`.
    AtLeast { var: usize, value: i64 },
}

#[derive(Debug)]
struct Frame {
    mark: usize,
    decisions: usize,
    alternative: Option<Branch>,
}

struct SearchState<'m> {
    model: &'m CpModel,
    domains: Domains,
    props: Vec<Propagator>,
    pairs: Vec<Disjunct>,
    ordered: Vec<bool>,
    decided: Vec<usize>,
    decisions: Vec<(usize, usize)>,
    bound: Option<LinearLe>,
}

impl<'m> SearchState<'m> {
    fn new(model: &'m CpModel) -> Self {
        let (props, pairs) = compile(model);
        Self {
            model,
            domains: Domains::new(model),
            props,
            ordered: vec![false; pairs.len()],
            pairs,
            decided: Vec::new(),
            decisions: Vec::new(),
            bound: None,
        }
    }

    fn propagate(&mut self) -> bool {
        fixpoint(
            &mut self.domains,
            &self.props,
            &self.pairs,
            &self.decisions,
            self.bound.as_ref(),
        )
        .is_ok()
    }

    fn choose_branch(&self) -> Option<(Branch, Branch)> {
        let d = &self.domains;
        let open_pair = self
            .pairs
            .iter()
            .enumerate()
            .filter(|&(i, p)| !self.ordered[i] && !p.is_entailed(d))
            .min_by_key(|&(_, p)| {
                let (a, b) = (d.lb(p.a_start), d.lb(p.b_start));
                (a.min(b), a.max(b))
            });

        if let Some((pair, p)) = open_pair {
            let a_first = Branch::Precede {
                pair,
                end: p.a_end,
                start: p.b_start,
            };
            let b_first = Branch::Precede {
                pair,
                end: p.b_end,
                start: p.a_start,
            };
            let a_key = (d.lb(p.a_start), d.lb(p.a_end));
            let b_key = (d.lb(p.b_start), d.lb(p.b_end));
            return Some(if a_key <= b_key {
                (a_first, b_first)
            } else {
                (b_first, a_first)
            });
        }

        (0..d.len()).find(|&v| !d.is_fixed(v)).map(|var| {
            let value = d.lb(var);
            (
                Branch::Assign { var, value },
                Branch::AtLeast {
                    var,
                    value: value + 1,
                },
            )
        })
    }

    /// Applies a branch. `false` if it empties a domain.
    fn apply(&mut self, branch: Branch) -> bool {
        match branch {
            Branch::Precede { pair, end, start } => {
                self.ordered[pair] = true;
                self.decided.push(pair);
                self.decisions.push((end, start));
                true
            }
            Branch::Assign { var, value } => {
                self.domains.set_lb(var, value).is_ok() && self.domains.set_ub(var, value).is_ok()
            }
            Branch::AtLeast { var, value } => self.domains.set_lb(var, value).is_ok(),
        }
    }

    fn restore(&mut self, mark: usize, decisions: usize) {
        self.domains.undo_to(mark);
        for pair in self.decided.drain(decisions..) {
            self.ordered[pair] = false;
        }
        self.decisions.truncate(decisions);
    }

    fn objective_value(&self, values: &[i64]) -> Option<i64> {
        self.model.objective().map(|o| o.expr().evaluate(values))
    }

    /// Requires the objective to be strictly below `value`.
    fn tighten(&mut self, value: i64) {
        if let Some(obj) = self.model.objective() {
            let expr = obj.expr().clone().plus_constant(-(value - 1));
            self.bound = Some(LinearLe::from_expr(&expr, Relation::Le));
        }
    }
}

/// Depth-first branch-and-bound solver.
///
/// Complete: given enough time it proves optimality or infeasibility.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use u_jobshop::cp::{BranchAndBoundSolver, CpModelBuilder, CpSolver, SolveStatus};
///
/// let mut b = CpModelBuilder::new("two-on-one");
/// let s1 = b.new_bounded_variable(0, 10, "s1");
/// let e1 = b.new_bounded_variable(0, 10, "e1");
/// let s2 = b.new_bounded_variable(0, 10, "s2");
/// let e2 = b.new_bounded_variable(0, 10, "e2");
/// let mk = b.new_bounded_variable(0, 10, "makespan");
/// let i1 = b.new_interval(s1, 3, e1, "i1");
/// let i2 = b.new_interval(s2, 4, e2, "i2");
/// b.add_mutual_exclusion(vec![i1, i2]);
/// b.add_max_equality(mk, vec![e1, e2]);
/// b.minimize(mk.into());
///
/// let sol = BranchAndBoundSolver::new().solve(&b.finalize(), Duration::from_secs(5));
/// assert_eq!(sol.status, SolveStatus::Optimal);
/// assert_eq!(sol.value(mk), Some(7));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct BranchAndBoundSolver {
    check_interval: u64,
}

impl BranchAndBoundSolver {
    /// Creates a solver that checks the clock every 64 nodes.
    pub fn new() -> Self {
        Self { check_interval: 64 }
    }

    /// Sets how many nodes pass between clock checks (at least 1).
    pub fn with_check_interval(mut self, nodes: u64) -> Self {
        self.check_interval = nodes.max(1);
        self
    }
}

impl Default for BranchAndBoundSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl CpSolver for BranchAndBoundSolver {
    fn name(&self) -> &'static str {
        "branch-and-bound"
    }

    fn solve(&self, model: &CpModel, time_limit: Duration) -> CpSolution {
        let started = Instant::now();
        let mut state = SearchState::new(model);
        if !state.domains.is_consistent() {
            return CpSolution::without_solution(SolveStatus::Infeasible, 0, started.elapsed());
        }

        let mut stack: Vec<Frame> = Vec::new();
        let mut best: Option<(Vec<i64>, Option<i64>)> = None;
        let mut nodes: u64 = 0;
        let mut timed_out = false;

        'search: loop {
            if nodes % self.check_interval == 0 && started.elapsed() >= time_limit {
                timed_out = true;
                break;
            }
            nodes += 1;

            if state.propagate() {
                match state.choose_branch() {
                    Some((left, right)) => {
                        stack.push(Frame {
                            mark: state.domains.mark(),
                            decisions: state.decisions.len(),
                            alternative: Some(right),
                        });
                        if state.apply(left) {
                            continue 'search;
                        }
                    }
                    None => {
                        let values = state.domains.lower_bounds().to_vec();
                        debug_assert!(model.is_satisfied_by(&values));
                        let objective = state.objective_value(&values);
                        trace!(nodes, ?objective, "incumbent");
                        best = Some((values, objective));
                        match objective {
                            Some(value) => state.tighten(value),
                            // Satisfaction model: the first solution is final.
                            None => break 'search,
                        }
                    }
                }
            }

            // Backtrack to the next open alternative.
            loop {
                let Some(frame) = stack.pop() else {
                    break 'search;
                };
                state.restore(frame.mark, frame.decisions);
                if let Some(alt) = frame.alternative {
                    stack.push(Frame {
                        alternative: None,
                        ..frame
                    });
                    if state.apply(alt) {
                        continue 'search;
                    }
                }
            }
        }

        let elapsed = started.elapsed();
        let status = match (&best, timed_out) {
            (Some(_), false) => SolveStatus::Optimal,
            (Some(_), true) => SolveStatus::Feasible,
            (None, false) => SolveStatus::Infeasible,
            (None, true) => SolveStatus::Unknown,
        };
        debug!(%status, nodes, ?elapsed, model = model.name(), "search finished");

        match best {
            Some((values, objective_value)) => CpSolution {
                status,
                values,
                objective_value,
                nodes,
                elapsed,
            },
            None => CpSolution::without_solution(status, nodes, elapsed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cp::model::{CpModelBuilder, LinearExpr};

    const BUDGET: Duration = Duration::from_secs(10);

    #[test]
    fn test_empty_model_is_optimal() {
        let model = CpModelBuilder::new("empty").finalize();
        let sol = BranchAndBoundSolver::new().solve(&model, BUDGET);
        assert_eq!(sol.status, SolveStatus::Optimal);
        assert!(sol.values.is_empty());
    }

    #[test]
    fn test_satisfaction_returns_first_solution() {
        let mut b = CpModelBuilder::new("sat");
        let x = b.new_bounded_variable(0, 10, "x");
        let y = b.new_bounded_variable(0, 10, "y");
        b.add_linear_constraint(LinearExpr::sum([x, y]), Relation::Eq, LinearExpr::constant(7));
        b.add_linear_constraint(x.into(), Relation::Ge, LinearExpr::constant(3));
        let model = b.finalize();
        let sol = BranchAndBoundSolver::new().solve(&model, BUDGET);
        assert_eq!(sol.status, SolveStatus::Optimal);
        assert!(model.is_satisfied_by(&sol.values));
        assert_eq!(sol.value(x), Some(3));
        assert_eq!(sol.value(y), Some(4));
    }

    #[test]
    fn test_minimize_linear() {
        // minimize 3a - b  s.t. a + b <= 6, a >= 1
        let mut b = CpModelBuilder::new("lin");
        let a = b.new_bounded_variable(0, 5, "a");
        let c = b.new_bounded_variable(0, 5, "b");
        b.add_linear_constraint(LinearExpr::sum([a, c]), Relation::Le, LinearExpr::constant(6));
        b.add_linear_constraint(a.into(), Relation::Ge, LinearExpr::constant(1));
        b.minimize(LinearExpr::new().plus_term(3, a).plus_term(-1, c));
        let sol = BranchAndBoundSolver::new().solve(&b.finalize(), BUDGET);
        assert_eq!(sol.status, SolveStatus::Optimal);
        assert_eq!(sol.objective_value, Some(3 - 5));
    }

    #[test]
    fn test_infeasible_by_propagation() {
        let mut b = CpModelBuilder::new("inf");
        let x = b.new_bounded_variable(0, 5, "x");
        b.add_linear_constraint(x.into(), Relation::Ge, LinearExpr::constant(6));
        let sol = BranchAndBoundSolver::new().solve(&b.finalize(), BUDGET);
        assert_eq!(sol.status, SolveStatus::Infeasible);
        assert!(sol.values.is_empty());
    }

    #[test]
    fn test_infeasible_empty_initial_domain() {
        let mut b = CpModelBuilder::new("inf");
        b.new_bounded_variable(3, 2, "x");
        let sol = BranchAndBoundSolver::new().solve(&b.finalize(), BUDGET);
        assert_eq!(sol.status, SolveStatus::Infeasible);
    }

    #[test]
    fn test_infeasible_by_search() {
        // Three unit intervals on one machine within [0, 2].
        let mut b = CpModelBuilder::new("pigeon");
        let mut ivs = Vec::new();
        for i in 0..3 {
            let s = b.new_bounded_variable(0, 2, format!("s{i}"));
            let e = b.new_bounded_variable(0, 2, format!("e{i}"));
            ivs.push(b.new_interval(s, 1, e, format!("i{i}")));
        }
        b.add_mutual_exclusion(ivs);
        let sol = BranchAndBoundSolver::new().solve(&b.finalize(), BUDGET);
        assert_eq!(sol.status, SolveStatus::Infeasible);
        assert!(sol.nodes > 1);
    }

    #[test]
    fn test_no_overlap_sequencing_is_optimal() {
        // Three tasks of lengths 2, 3, 4 on one machine: makespan 9.
        let mut b = CpModelBuilder::new("seq");
        let mut ivs = Vec::new();
        let mut ends = Vec::new();
        for (i, len) in [2, 3, 4].into_iter().enumerate() {
            let s = b.new_bounded_variable(0, 20, format!("s{i}"));
            let e = b.new_bounded_variable(0, 20, format!("e{i}"));
            ivs.push(b.new_interval(s, len, e, format!("i{i}")));
            ends.push(e);
        }
        let mk = b.new_bounded_variable(0, 20, "mk");
        b.add_mutual_exclusion(ivs);
        b.add_max_equality(mk, ends.clone());
        b.minimize(mk.into());
        let model = b.finalize();
        let sol = BranchAndBoundSolver::new().solve(&model, BUDGET);
        assert_eq!(sol.status, SolveStatus::Optimal);
        assert_eq!(sol.value(mk), Some(9));
        assert!(model.is_satisfied_by(&sol.values));
    }

    #[test]
    fn test_division_containment() {
        // A length-3 task in days of 5 may not straddle a day boundary,
        // and must start at or after 4: earliest start is 5.
        let mut b = CpModelBuilder::new("div");
        let s = b.new_bounded_variable(4, 20, "s");
        let e = b.new_bounded_variable(0, 20, "e");
        let last = b.new_bounded_variable(0, 20, "last");
        let ds = b.new_bounded_variable(0, 10, "ds");
        let de = b.new_bounded_variable(0, 10, "de");
        b.new_interval(s, 3, e, "task");
        b.add_linear_constraint(last.into(), Relation::Eq, LinearExpr::from(e).plus_constant(-1));
        b.add_division_equality(ds, s, 5);
        b.add_division_equality(de, last, 5);
        b.add_linear_constraint(ds.into(), Relation::Eq, de.into());
        b.minimize(s.into());
        let sol = BranchAndBoundSolver::new().solve(&b.finalize(), BUDGET);
        assert_eq!(sol.status, SolveStatus::Optimal);
        assert_eq!(sol.value(s), Some(5));
    }

    #[test]
    fn test_zero_budget_returns_unknown() {
        let mut b = CpModelBuilder::new("t");
        let x = b.new_bounded_variable(0, 5, "x");
        b.minimize(x.into());
        let sol = BranchAndBoundSolver::new().solve(&b.finalize(), Duration::ZERO);
        assert_eq!(sol.status, SolveStatus::Unknown);
        assert!(!sol.is_solution_found());
    }

    #[test]
    fn test_check_interval_floor() {
        let s = BranchAndBoundSolver::new().with_check_interval(0);
        assert_eq!(s.check_interval, 1);
        assert_eq!(s.name(), "branch-and-bound");
    }
}
