//! Job-shop scheduling on a constraint-programming engine.
//!
//! Encodes jobs (ordered operations, each needing one machine exclusively)
//! into a constraint model, optionally confines every operation to a single
//! working shift, optimizes makespan (then total start time), and decodes
//! the engine's assignment back into an hour-based schedule.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Operation`, `FixedStart`, `TimeScale`,
//!   `ShiftCalendar`, `Schedule`, `ScheduledOperation`
//! - **`config`**: `SolveConfig` request parameters and defaults
//! - **`preprocess`**: Validation, unit scaling, setup-mode resolution
//! - **`encoding`**: Problem, machine, shift and fixed-start constraints
//! - **`strategy`**: Single-stage and two-stage lexicographic optimization
//! - **`decoder`**: Assignment to hours, day and hour-of-day
//! - **`cp`**: Model builder, `CpSolver` contract, bundled branch-and-bound engine
//! - **`validation`**: Input checks and schedule verification
//! - **`api`**: `SolveRequest` / `SolveResponse` and the JSON entry point
//!
//! # Example
//!
//! ```
//! use u_jobshop::api::{solve_json, SolveResponse};
//! use u_jobshop::cp::BranchAndBoundSolver;
//!
//! let request = r#"{
//!     "operations": [
//!         {"job_id": 1, "operation_index": 0, "machine_id": 1, "processing_time": 3.0},
//!         {"job_id": 1, "operation_index": 1, "machine_id": 1, "processing_time": 6.0}
//!     ],
//!     "H_daily_hours": 8
//! }"#;
//! let out = solve_json(request, &BranchAndBoundSolver::new()).unwrap();
//! let response: SolveResponse = serde_json::from_str(&out).unwrap();
//! // the 6h operation cannot fit in the 5h left on day 0
//! assert_eq!(response.makespan, 14.0);
//! assert_eq!(response.schedule[1].start_day, 1);
//! ```
//!
//! # References
//!
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems"
//! - Baptiste, Le Pape & Nuijten (2001), "Constraint-Based Scheduling"
//! - Laborie et al. (2018), "IBM ILOG CP Optimizer for Scheduling"

pub mod api;
pub mod config;
pub mod cp;
pub mod decoder;
pub mod encoding;
pub mod error;
pub mod models;
pub mod preprocess;
pub mod strategy;
pub mod validation;

pub use api::{solve_json, solve_request, ResponseStatus, SolveRequest, SolveResponse};
pub use config::{ObjectiveMode, SolveConfig};
pub use error::{Result, ScheduleError};
