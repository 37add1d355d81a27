//! Request/response entry points.
//!
//! [`solve_request`] runs the full pipeline:
//!
//! ```text
//! Preprocessor -> encode (problem, resource, shift, fixed)
//!              -> ObjectiveStrategy -> SolutionDecoder
//! ```
//!
//! Only malformed requests return `Err`. An infeasible or budget-starved
//! model yields status `infeasible`, makespan `0.0` and an empty schedule.
//! A decoded schedule is re-checked against precedence, machine exclusivity,
//! shift containment and pins; anything found is returned in `violations`.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::SolveConfig;
use crate::cp::CpSolver;
use crate::decoder::SolutionDecoder;
use crate::encoding::encode;
use crate::error::Result;
use crate::models::{Operation, ScheduledOperation, Violation};
use crate::preprocess::{PreprocessWarning, Preprocessor};
use crate::strategy::ObjectiveStrategy;
use crate::validation::{verify_fixed_starts, verify_schedule};

/// A solve request: operations plus flattened parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SolveRequest {
    /// Operation records.
    #[serde(alias = "tasks")]
    pub operations: Vec<Operation>,
    /// Scalar parameters and fixed starts.
    #[serde(flatten)]
    pub config: SolveConfig,
}

impl SolveRequest {
    /// Creates a request with default parameters.
    pub fn new(operations: Vec<Operation>) -> Self {
        Self {
            operations,
            config: SolveConfig::default(),
        }
    }

    /// Replaces the parameters.
    pub fn with_config(mut self, config: SolveConfig) -> Self {
        self.config = config;
        self
    }
}

/// Outward status of a solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    /// A schedule was found (proven optimal or best within budget).
    Optimal,
    /// No schedule was found.
    Infeasible,
}

/// A solve response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolveResponse {
    /// Outcome.
    pub status: ResponseStatus,
    /// Latest end time (hours); `0.0` when infeasible.
    pub makespan: f64,
    /// One row per operation; empty when infeasible.
    pub schedule: Vec<ScheduledOperation>,
    /// Non-fatal preprocessing issues.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<PreprocessWarning>,
    /// Invariants the returned schedule breaks. Empty for a correct engine.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<Violation>,
}

impl SolveResponse {
    fn infeasible(warnings: Vec<PreprocessWarning>) -> Self {
        Self {
            status: ResponseStatus::Infeasible,
            makespan: 0.0,
            schedule: Vec::new(),
            warnings,
            violations: Vec::new(),
        }
    }
}

/// Solves one request with `solver`.
///
/// # Errors
/// Configuration errors (time scale, daily limits, budgets, fixed starts)
/// and invalid operation records.
///
/// # Example
/// ```
/// use u_jobshop::api::{solve_request, ResponseStatus, SolveRequest};
/// use u_jobshop::cp::BranchAndBoundSolver;
/// use u_jobshop::models::Operation;
///
/// let request = SolveRequest::new(vec![
///     Operation::new(1, 0, 1, 1.0),
///     Operation::new(1, 1, 2, 1.0),
///     Operation::new(2, 0, 2, 1.0),
///     Operation::new(2, 1, 1, 1.0),
/// ]);
/// let response = solve_request(&request, &BranchAndBoundSolver::new()).unwrap();
/// assert_eq!(response.status, ResponseStatus::Optimal);
/// assert_eq!(response.makespan, 2.0);
/// ```
pub fn solve_request<S: CpSolver + ?Sized>(
    request: &SolveRequest,
    solver: &S,
) -> Result<SolveResponse> {
    let config = &request.config;
    let display = config.display_calendar()?;
    let shift = config.shift_calendar()?;
    let strategy = ObjectiveStrategy::from_config(config)?;
    let instance = Preprocessor::from_config(config)?.prepare(&request.operations)?;
    let warnings = instance.warnings().to_vec();

    let outcome = strategy.run(solver, || encode(&instance, config))?;
    if !outcome.is_feasible() {
        info!(status = %outcome.status(), "no schedule found");
        return Ok(SolveResponse::infeasible(warnings));
    }

    let mut schedule = SolutionDecoder::for_instance(&instance, display).decode(
        &instance,
        &outcome.vars,
        &outcome.solution,
    );

    let limit = config
        .enforce_daily_limit
        .then(|| shift.scaled_limit(instance.scale()));
    let found = verify_schedule(&schedule, limit)
        .into_iter()
        .chain(verify_fixed_starts(&schedule, &config.fixed_starts));
    for v in found {
        schedule.add_violation(v);
    }
    if !schedule.is_valid() {
        for v in &schedule.violations {
            warn!(
                kind = ?v.violation_type,
                job_id = v.job_id,
                operation_index = v.operation_index,
                "{}",
                v.message
            );
        }
    }

    let makespan = schedule.makespan_hours();
    info!(
        mode = ?strategy.mode(),
        status = %outcome.status(),
        makespan,
        operations = schedule.len(),
        violations = schedule.violations.len(),
        "schedule decoded"
    );
    Ok(SolveResponse {
        status: ResponseStatus::Optimal,
        makespan,
        schedule: schedule.operations,
        warnings,
        violations: schedule.violations,
    })
}

/// Solves a JSON request and returns the JSON response.
///
/// # Errors
/// Malformed JSON, plus everything [`solve_request`] rejects.
pub fn solve_json<S: CpSolver + ?Sized>(request: &str, solver: &S) -> Result<String> {
    let request: SolveRequest = serde_json::from_str(request)?;
    let response = solve_request(&request, solver)?;
    Ok(serde_json::to_string(&response)?)
}
