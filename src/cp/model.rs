//! Constraint model and its builder.
//!
//! [`CpModelBuilder`] collects integer variables, interval variables and an
//! append-only list of constraints; [`CpModelBuilder::finalize`] freezes them
//! into a [`CpModel`] that any [`CpSolver`](super::CpSolver) can consume.
//!
//! # Variables
//! - **Integer variable**: bounded `[lb, ub]`.
//! - **Interval**: `(start, duration, end)` with `end = start + duration`
//!   and a constant duration.
//!
//! # Constraints
//! - **Linear**: `lhs (<= | == | >=) rhs` over linear expressions
//! - **NoOverlap**: a set of intervals pairwise disjoint
//! - **DivisionEquality**: `q = floor(x / d)` for a positive constant `d`
//! - **MaxEquality**: `t = max(x_1, ..., x_n)`

use serde::{Deserialize, Serialize};

/// Handle of an integer variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VarId(pub(crate) usize);

impl VarId {
    /// Position in [`CpModel::variables`].
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Handle of an interval variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IntervalId(pub(crate) usize);

impl IntervalId {
    /// Position in [`CpModel::intervals`].
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// A bounded integer variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntVar {
    /// Name for diagnostics.
    pub name: String,
    /// Lower bound (inclusive).
    pub lb: i64,
    /// Upper bound (inclusive).
    pub ub: i64,
}

/// An interval with a constant duration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalVar {
    /// Name for diagnostics.
    pub name: String,
    /// Start variable.
    pub start: VarId,
    /// Constant length.
    pub duration: i64,
    /// End variable.
    pub end: VarId,
}

/// `Σ coef·var + constant`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinearExpr {
    /// `(coefficient, variable)` terms.
    pub terms: Vec<(i64, VarId)>,
    /// Constant offset.
    pub constant: i64,
}

impl LinearExpr {
    /// The zero expression.
    pub fn new() -> Self {
        Self::default()
    }

    /// A constant expression.
    pub fn constant(value: i64) -> Self {
        Self {
            terms: Vec::new(),
            constant: value,
        }
    }

    /// Sum of variables with unit coefficients.
    pub fn sum(vars: impl IntoIterator<Item = VarId>) -> Self {
        Self {
            terms: vars.into_iter().map(|v| (1, v)).collect(),
            constant: 0,
        }
    }

    /// Adds `coef · var`.
    pub fn plus_term(mut self, coef: i64, var: VarId) -> Self {
        self.terms.push((coef, var));
        self
    }

    /// Adds `var`.
    pub fn plus(self, var: VarId) -> Self {
        self.plus_term(1, var)
    }

    /// Adds a constant.
    pub fn plus_constant(mut self, value: i64) -> Self {
        self.constant += value;
        self
    }

    /// `self - other`.
    pub fn minus(mut self, other: &LinearExpr) -> Self {
        self.terms
            .extend(other.terms.iter().map(|&(c, v)| (-c, v)));
        self.constant -= other.constant;
        self
    }

    /// Evaluates against a full assignment.
    pub fn evaluate(&self, values: &[i64]) -> i64 {
        self.terms
            .iter()
            .map(|&(c, v)| c * values[v.0])
            .sum::<i64>()
            + self.constant
    }
}

impl From<VarId> for LinearExpr {
    fn from(var: VarId) -> Self {
        LinearExpr::new().plus(var)
    }
}

impl From<i64> for LinearExpr {
    fn from(value: i64) -> Self {
        LinearExpr::constant(value)
    }
}

/// Comparison of a linear constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Relation {
    /// `lhs <= rhs`
    Le,
    /// `lhs == rhs`
    Eq,
    /// `lhs >= rhs`
    Ge,
}

/// A model constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Constraint {
    /// `lhs relation rhs`.
    Linear {
        lhs: LinearExpr,
        relation: Relation,
        rhs: LinearExpr,
    },
    /// Intervals pairwise disjoint.
    NoOverlap { intervals: Vec<IntervalId> },
    /// `quotient = floor(dividend / divisor)`, `divisor > 0`.
    DivisionEquality {
        quotient: VarId,
        dividend: VarId,
        divisor: i64,
    },
    /// `target = max(vars)`.
    MaxEquality { target: VarId, vars: Vec<VarId> },
}

/// Optimization direction and expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Objective {
    /// Minimize the expression.
    Minimize(LinearExpr),
}

impl Objective {
    /// The objective expression.
    pub fn expr(&self) -> &LinearExpr {
        match self {
            Objective::Minimize(expr) => expr,
        }
    }
}

/// A finalized constraint model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpModel {
    name: String,
    variables: Vec<IntVar>,
    intervals: Vec<IntervalVar>,
    constraints: Vec<Constraint>,
    objective: Option<Objective>,
}

impl CpModel {
    /// Model name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All integer variables.
    pub fn variables(&self) -> &[IntVar] {
        &self.variables
    }

    /// All interval variables.
    pub fn intervals(&self) -> &[IntervalVar] {
        &self.intervals
    }

    /// All constraints, in insertion order.
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// The objective, if any.
    pub fn objective(&self) -> Option<&Objective> {
        self.objective.as_ref()
    }

    /// Number of integer variables.
    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    /// Number of intervals.
    pub fn interval_count(&self) -> usize {
        self.intervals.len()
    }

    /// Number of constraints.
    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// Whether `values` satisfies every bound, interval and constraint.
    pub fn is_satisfied_by(&self, values: &[i64]) -> bool {
        if values.len() != self.variables.len() {
            return false;
        }
        let in_bounds = self
            .variables
            .iter()
            .zip(values)
            .all(|(v, &x)| v.lb <= x && x <= v.ub);
        let intervals_ok = self
            .intervals
            .iter()
            .all(|iv| values[iv.start.0] + iv.duration == values[iv.end.0]);
        in_bounds && intervals_ok && self.constraints.iter().all(|c| self.holds(c, values))
    }

    fn holds(&self, constraint: &Constraint, values: &[i64]) -> bool {
        match constraint {
            Constraint::Linear { lhs, relation, rhs } => {
                let (l, r) = (lhs.evaluate(values), rhs.evaluate(values));
                match relation {
                    Relation::Le => l <= r,
                    Relation::Eq => l == r,
                    Relation::Ge => l >= r,
                }
            }
            Constraint::NoOverlap { intervals } => {
                for (i, a) in intervals.iter().enumerate() {
                    for b in &intervals[i + 1..] {
                        let a = &self.intervals[a.0];
                        let b = &self.intervals[b.0];
                        let disjoint = values[a.end.0] <= values[b.start.0]
                            || values[b.end.0] <= values[a.start.0];
                        if !disjoint {
                            return false;
                        }
                    }
                }
                true
            }
            Constraint::DivisionEquality {
                quotient,
                dividend,
                divisor,
            } => values[quotient.0] == values[dividend.0].div_euclid(*divisor),
            Constraint::MaxEquality { target, vars } => {
                vars.iter().map(|v| values[v.0]).max() == Some(values[target.0])
            }
        }
    }
}

/// Incremental model builder.
///
/// Constraints are only ever appended. The builder is consumed by
/// [`finalize`](Self::finalize).
///
/// # Example
/// ```
/// use u_jobshop::cp::{CpModelBuilder, LinearExpr, Relation};
///
/// let mut b = CpModelBuilder::new("demo");
/// let s = b.new_bounded_variable(0, 10, "s");
/// let e = b.new_bounded_variable(0, 10, "e");
/// b.new_interval(s, 3, e, "task");
/// b.add_linear_constraint(s.into(), Relation::Ge, LinearExpr::constant(2));
/// b.minimize(e.into());
/// let model = b.finalize();
/// assert_eq!(model.variable_count(), 2);
/// assert_eq!(model.interval_count(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct CpModelBuilder {
    name: String,
    variables: Vec<IntVar>,
    intervals: Vec<IntervalVar>,
    constraints: Vec<Constraint>,
    objective: Option<Objective>,
}

impl CpModelBuilder {
    /// Creates an empty builder.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variables: Vec::new(),
            intervals: Vec::new(),
            constraints: Vec::new(),
            objective: None,
        }
    }

    /// Adds an integer variable with domain `[lb, ub]`.
    pub fn new_bounded_variable(&mut self, lb: i64, ub: i64, name: impl Into<String>) -> VarId {
        self.variables.push(IntVar {
            name: name.into(),
            lb,
            ub,
        });
        VarId(self.variables.len() - 1)
    }

    /// Adds an interval linking `start`, a constant `duration`, and `end`.
    pub fn new_interval(
        &mut self,
        start: VarId,
        duration: i64,
        end: VarId,
        name: impl Into<String>,
    ) -> IntervalId {
        self.intervals.push(IntervalVar {
            name: name.into(),
            start,
            duration,
            end,
        });
        IntervalId(self.intervals.len() - 1)
    }

    /// Adds `lhs relation rhs`.
    pub fn add_linear_constraint(&mut self, lhs: LinearExpr, relation: Relation, rhs: LinearExpr) {
        self.constraints.push(Constraint::Linear { lhs, relation, rhs });
    }

    /// Requires the intervals to be pairwise disjoint.
    pub fn add_mutual_exclusion(&mut self, intervals: Vec<IntervalId>) {
        self.constraints.push(Constraint::NoOverlap { intervals });
    }

    /// Adds `quotient = floor(dividend / divisor)`.
    ///
    /// # Panics
    /// If `divisor` is not positive.
    pub fn add_division_equality(&mut self, quotient: VarId, dividend: VarId, divisor: i64) {
        assert!(divisor > 0, "divisor must be positive, got {divisor}");
        self.constraints.push(Constraint::DivisionEquality {
            quotient,
            dividend,
            divisor,
        });
    }

    /// Adds `target = max(vars)`.
    ///
    /// # Panics
    /// If `vars` is empty.
    pub fn add_max_equality(&mut self, target: VarId, vars: Vec<VarId>) {
        assert!(!vars.is_empty(), "max over an empty set");
        self.constraints.push(Constraint::MaxEquality { target, vars });
    }

    /// Sets the objective, replacing any previous one.
    pub fn set_objective(&mut self, objective: Objective) {
        self.objective = Some(objective);
    }

    /// Shorthand for `set_objective(Objective::Minimize(expr))`.
    pub fn minimize(&mut self, expr: LinearExpr) {
        self.set_objective(Objective::Minimize(expr));
    }

    /// Constraints added so far.
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Number of variables added so far.
    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    /// Freezes the model.
    pub fn finalize(self) -> CpModel {
        CpModel {
            name: self.name,
            variables: self.variables,
            intervals: self.intervals,
            constraints: self.constraints,
            objective: self.objective,
        }
    }
}
