//! Bound propagation.
//!
//! Every variable is represented by an interval domain `[lb, ub]`. All
//! changes are recorded on a trail so the search can restore any earlier
//! state in O(changes).
//!
//! # Propagators
//! - **Linear** `Σ aᵢxᵢ + c <= 0` (equalities become two inequalities):
//!   each term is bounded by the slack left by the minimum of the others.
//! - **Division** `q = ⌊x / d⌋`: bounds move in both directions.
//! - **Max** `t = max(xᵢ)`: `t` within `[max lb, max ub]`; every `xᵢ <= ub(t)`;
//!   the only candidate for the max is raised to `lb(t)`.
//! - **Disjunctive pair** (one per pair of intervals in a no-overlap set):
//!   if one order is impossible the other is enforced.
//!
//! # Reference
//! Baptiste, Le Pape & Nuijten (2001), "Constraint-Based Scheduling", Ch. 2

use std::collections::BTreeMap;

use super::model::{Constraint, CpModel, LinearExpr, Relation};

/// Marker for an empty domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Conflict;

pub(crate) type PropResult = Result<bool, Conflict>;

/// Trailed interval domains.
#[derive(Debug, Clone)]
pub(crate) struct Domains {
    lb: Vec<i64>,
    ub: Vec<i64>,
    trail: Vec<(usize, i64, i64)>,
}

impl Domains {
    pub(crate) fn new(model: &CpModel) -> Self {
        Self {
            lb: model.variables().iter().map(|v| v.lb).collect(),
            ub: model.variables().iter().map(|v| v.ub).collect(),
            trail: Vec::new(),
        }
    }

    #[inline]
    pub(crate) fn lb(&self, var: usize) -> i64 {
        self.lb[var]
    }

    #[inline]
    pub(crate) fn ub(&self, var: usize) -> i64 {
        self.ub[var]
    }

    #[inline]
    pub(crate) fn is_fixed(&self, var: usize) -> bool {
        self.lb[var] == self.ub[var]
    }

    pub(crate) fn len(&self) -> usize {
        self.lb.len()
    }

    /// Whether no domain is empty.
    pub(crate) fn is_consistent(&self) -> bool {
        self.lb.iter().zip(&self.ub).all(|(l, u)| l <= u)
    }

    pub(crate) fn lower_bounds(&self) -> &[i64] {
        &self.lb
    }

    pub(crate) fn set_lb(&mut self, var: usize, value: i64) -> PropResult {
        if value <= self.lb[var] {
            return Ok(false);
        }
        if value > self.ub[var] {
            return Err(Conflict);
        }
        self.trail.push((var, self.lb[var], self.ub[var]));
        self.lb[var] = value;
        Ok(true)
    }

    pub(crate) fn set_ub(&mut self, var: usize, value: i64) -> PropResult {
        if value >= self.ub[var] {
            return Ok(false);
        }
        if value < self.lb[var] {
            return Err(Conflict);
        }
        self.trail.push((var, self.lb[var], self.ub[var]));
        self.ub[var] = value;
        Ok(true)
    }

    /// Current trail position.
    #[inline]
    pub(crate) fn mark(&self) -> usize {
        self.trail.len()
    }

    /// Undoes every change recorded after `mark`.
    pub(crate) fn undo_to(&mut self, mark: usize) {
        while self.trail.len() > mark {
            if let Some((var, lb, ub)) = self.trail.pop() {
                self.lb[var] = lb;
                self.ub[var] = ub;
            }
        }
    }
}

/// `Σ coef·var + constant <= 0`, or `== 0` when `equality`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LinearLe {
    terms: Vec<(i64, usize)>,
    constant: i64,
    equality: bool,
}

impl LinearLe {
    /// Normalizes `expr relation 0`, merging repeated variables.
    pub(crate) fn from_expr(expr: &LinearExpr, relation: Relation) -> Self {
        let sign = if relation == Relation::Ge { -1 } else { 1 };
        let mut merged: BTreeMap<usize, i64> = BTreeMap::new();
        for &(coef, var) in &expr.terms {
            *merged.entry(var.index()).or_insert(0) += sign * coef;
        }
        Self {
            terms: merged
                .into_iter()
                .filter(|&(_, c)| c != 0)
                .map(|(v, c)| (c, v))
                .collect(),
            constant: sign * expr.constant,
            equality: relation == Relation::Eq,
        }
    }

    fn negated(&self) -> Self {
        Self {
            terms: self.terms.iter().map(|&(c, v)| (-c, v)).collect(),
            constant: -self.constant,
            equality: false,
        }
    }

    fn propagate_le(&self, d: &mut Domains) -> PropResult {
        let term_min = |c: i64, v: usize, d: &Domains| {
            if c > 0 {
                c * d.lb(v)
            } else {
                c * d.ub(v)
            }
        };
        let min_sum: i64 = self
            .terms
            .iter()
            .map(|&(c, v)| term_min(c, v, d))
            .sum::<i64>()
            + self.constant;
        if min_sum > 0 {
            return Err(Conflict);
        }
        let mut changed = false;
        for &(c, v) in &self.terms {
            // c·v <= r
            let r = term_min(c, v, d) - min_sum;
            changed |= if c > 0 {
                d.set_ub(v, r.div_euclid(c))?
            } else {
                d.set_lb(v, -r.div_euclid(-c))?
            };
        }
        Ok(changed)
    }

    pub(crate) fn propagate(&self, d: &mut Domains) -> PropResult {
        let mut changed = self.propagate_le(d)?;
        if self.equality {
            changed |= self.negated().propagate_le(d)?;
        }
        Ok(changed)
    }
}

/// A compiled non-disjunctive constraint.
#[derive(Debug, Clone)]
pub(crate) enum Propagator {
    Linear(LinearLe),
    Division { quotient: usize, dividend: usize, divisor: i64 },
    Max { target: usize, vars: Vec<usize> },
}

impl Propagator {
    pub(crate) fn propagate(&self, d: &mut Domains) -> PropResult {
        match self {
            Propagator::Linear(lin) => lin.propagate(d),
            Propagator::Division {
                quotient: q,
                dividend: x,
                divisor: k,
            } => {
                let (q, x, k) = (*q, *x, *k);
                let mut changed = d.set_lb(q, d.lb(x).div_euclid(k))?;
                changed |= d.set_ub(q, d.ub(x).div_euclid(k))?;
                changed |= d.set_lb(x, d.lb(q) * k)?;
                changed |= d.set_ub(x, d.ub(q) * k + k - 1)?;
                Ok(changed)
            }
            Propagator::Max { target, vars } => {
                let t = *target;
                let max_lb = vars.iter().map(|&v| d.lb(v)).max().unwrap_or(i64::MIN);
                let max_ub = vars.iter().map(|&v| d.ub(v)).max().unwrap_or(i64::MIN);
                let mut changed = d.set_lb(t, max_lb)?;
                changed |= d.set_ub(t, max_ub)?;
                for &v in vars {
                    changed |= d.set_ub(v, d.ub(t))?;
                }
                let mut candidates = vars.iter().filter(|&&v| d.ub(v) >= d.lb(t));
                match (candidates.next(), candidates.next()) {
                    (None, _) => return Err(Conflict),
                    (Some(&only), None) => changed |= d.set_lb(only, d.lb(t))?,
                    _ => {}
                }
                Ok(changed)
            }
        }
    }
}

/// Two intervals that must not overlap, as start/end variable indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Disjunct {
    pub(crate) a_start: usize,
    pub(crate) a_end: usize,
    pub(crate) b_start: usize,
    pub(crate) b_end: usize,
}

impl Disjunct {
    /// Whether the current bounds already force one order.
    pub(crate) fn is_entailed(&self, d: &Domains) -> bool {
        d.ub(self.a_end) <= d.lb(self.b_start) || d.ub(self.b_end) <= d.lb(self.a_start)
    }

    fn propagate(&self, d: &mut Domains) -> PropResult {
        let a_first = d.lb(self.a_end) <= d.ub(self.b_start);
        let b_first = d.lb(self.b_end) <= d.ub(self.a_start);
        match (a_first, b_first) {
            (false, false) => Err(Conflict),
            (true, false) => precede(d, self.a_end, self.b_start),
            (false, true) => precede(d, self.b_end, self.a_start),
            (true, true) => Ok(false),
        }
    }
}

/// Enforces `end <= start`.
pub(crate) fn precede(d: &mut Domains, end: usize, start: usize) -> PropResult {
    let mut changed = d.set_lb(start, d.lb(end))?;
    changed |= d.set_ub(end, d.ub(start))?;
    Ok(changed)
}

/// Compiles a model into propagators and disjunctive pairs.
pub(crate) fn compile(model: &CpModel) -> (Vec<Propagator>, Vec<Disjunct>) {
    let mut props = Vec::new();
    let mut pairs = Vec::new();

    for iv in model.intervals() {
        // end - start - duration == 0
        let expr = LinearExpr::from(iv.end)
            .plus_term(-1, iv.start)
            .plus_constant(-iv.duration);
        props.push(Propagator::Linear(LinearLe::from_expr(&expr, Relation::Eq)));
    }

    for c in model.constraints() {
        match c {
            Constraint::Linear { lhs, relation, rhs } => {
                let expr = lhs.clone().minus(rhs);
                props.push(Propagator::Linear(LinearLe::from_expr(&expr, *relation)));
            }
            Constraint::NoOverlap { intervals } => {
                for (i, a) in intervals.iter().enumerate() {
                    for b in &intervals[i + 1..] {
                        let a = &model.intervals()[a.index()];
                        let b = &model.intervals()[b.index()];
                        pairs.push(Disjunct {
                            a_start: a.start.index(),
                            a_end: a.end.index(),
                            b_start: b.start.index(),
                            b_end: b.end.index(),
                        });
                    }
                }
            }
            Constraint::DivisionEquality {
                quotient,
                dividend,
                divisor,
            } => props.push(Propagator::Division {
                quotient: quotient.index(),
                dividend: dividend.index(),
                divisor: *divisor,
            }),
            Constraint::MaxEquality { target, vars } => props.push(Propagator::Max {
                target: target.index(),
                vars: vars.iter().map(|v| v.index()).collect(),
            }),
        }
    }

    (props, pairs)
}

/// Runs every propagator, pair and decided precedence to a fixpoint.
pub(crate) fn fixpoint(
    d: &mut Domains,
    props: &[Propagator],
    pairs: &[Disjunct],
    decisions: &[(usize, usize)],
    bound: Option<&LinearLe>,
) -> Result<(), Conflict> {
    loop {
        let mut changed = false;
        for p in props {
            changed |= p.propagate(d)?;
        }
        for pair in pairs {
            changed |= pair.propagate(d)?;
        }
        for &(end, start) in decisions {
            changed |= precede(d, end, start)?;
        }
        if let Some(b) = bound {
            changed |= b.propagate(d)?;
        }
        if !changed {
            return Ok(());
        }
    }
}
