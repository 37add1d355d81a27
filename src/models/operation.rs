//! Operation (job step) model.
//!
//! An operation is the smallest schedulable unit of work. It belongs to a job,
//! occupies exactly one machine, and has a processing time plus an optional
//! setup time, both in hours.
//!
//! Jobs and machines have no records of their own: a job is the set of
//! operations sharing a `job_id`, executed in `operation_index` order, and a
//! machine is a unit-capacity resource identified by `machine_id`.
//!
//! # Reference
//! Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 2

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Job identifier.
pub type JobId = u32;
/// Machine identifier.
pub type MachineId = u32;
/// Position of an operation within its job.
pub type OperationIndex = u32;

/// An operation to be scheduled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// Owning job.
    pub job_id: JobId,
    /// Position within the job. Lower indices run first.
    #[serde(alias = "operation_id")]
    pub operation_index: OperationIndex,
    /// Machine the operation runs on (exclusive use).
    pub machine_id: MachineId,
    /// Processing time (hours).
    pub processing_time: f64,
    /// Setup time (hours) preceding processing on the same machine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setup_time: Option<f64>,
}

impl Operation {
    /// Creates an operation without setup time.
    pub fn new(
        job_id: JobId,
        operation_index: OperationIndex,
        machine_id: MachineId,
        processing_time: f64,
    ) -> Self {
        Self {
            job_id,
            operation_index,
            machine_id,
            processing_time,
            setup_time: None,
        }
    }

    /// Sets the setup time (hours).
    pub fn with_setup(mut self, setup_time: f64) -> Self {
        self.setup_time = Some(setup_time);
        self
    }

    /// `(job_id, operation_index)` key.
    #[inline]
    pub fn key(&self) -> (JobId, OperationIndex) {
        (self.job_id, self.operation_index)
    }
}

/// A pinned start for one operation of a job.
///
/// `start_time_fixed` is expressed in scaled time units (hours × time scale),
/// the same units the model's start variables use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedStart {
    /// Operation index within the job.
    pub operation_index: OperationIndex,
    /// Exact start value (scaled units).
    pub start_time_fixed: i64,
}

impl FixedStart {
    /// Creates a fixed start entry.
    pub fn new(operation_index: OperationIndex, start_time_fixed: i64) -> Self {
        Self {
            operation_index,
            start_time_fixed,
        }
    }
}

/// Fixed starts keyed by job.
pub type FixedStarts = BTreeMap<JobId, Vec<FixedStart>>;
