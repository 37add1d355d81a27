//! Constraint programming layer.
//!
//! A small CP vocabulary (integer variables, fixed-length intervals, linear,
//! no-overlap, division and max constraints) plus the [`CpSolver`] contract
//! every engine implements. [`BranchAndBoundSolver`] is the bundled engine;
//! callers may plug in their own.
//!
//! # Reference
//! - Laborie et al. (2018), "IBM ILOG CP Optimizer for Scheduling"
//! - Baptiste et al. (2001), "Constraint-Based Scheduling"

mod model;
mod propagate;
mod search;
mod solver;

pub use model::{
    Constraint, CpModel, CpModelBuilder, IntVar, IntervalId, IntervalVar, LinearExpr, Objective,
    Relation, VarId,
};
pub use search::BranchAndBoundSolver;
pub use solver::{CpSolution, CpSolver, SolveStatus};
