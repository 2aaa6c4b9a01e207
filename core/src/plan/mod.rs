//! Immutable description of one run's work: steps, parallel tasks,
//! dependency edges and the requested strategy.

mod model;
mod validate;

pub use model::{
    DependencyEdge, DependencyKind, ExecutionPlan, ParallelTask, Priority, RetryOverride, Step,
    Strategy,
};
