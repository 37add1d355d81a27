//! Job-shop domain models.
//!
//! Provides the input records (operations, fixed starts), the time model
//! (scale, shift calendar), and the decoded output (schedule).
//!
//! # Domain Mappings
//!
//! | u-jobshop | Manufacturing | Constraint model |
//! |-----------|--------------|------------------|
//! | Job | Order / routing | chain of precedence constraints |
//! | Operation | Routing step | interval variable |
//! | Machine | Work center | no-overlap constraint |
//! | Shift | Working day | division-equality pair |

mod operation;
mod schedule;
mod time;

pub use operation::{FixedStart, FixedStarts, JobId, MachineId, Operation, OperationIndex};
pub use schedule::{Schedule, ScheduledOperation, Violation, ViolationType};
pub use time::{round2, ShiftCalendar, TimeScale, TimeWindow, DEFAULT_TIME_SCALE, MAX_TOTAL_UNITS};

#[cfg(test)]
pub(crate) use schedule::tests::op as scheduled_op;
