//! Per-run mutable state: shared results keyed by task id, one state machine
//! per task, and the run's error-handling and monitoring policies.
//!
//! A context belongs to exactly one run. It is created when the run starts and
//! dropped when the run's result has been aggregated.

mod coordination;
mod state;

pub use coordination::CoordinationContext;
pub use state::{TaskState, TaskStatus};
