pub mod config;
pub mod context;
pub mod error;
pub mod executor;
pub mod plan;
pub mod worker;

pub use config::{AppConfig, ErrorStrategy, RunConfig};
pub use context::{CoordinationContext, TaskState, TaskStatus};
pub use error::{CoordinationError, ErrorKind, WorkerError};
pub use executor::{
    CoordinationEngine, CoordinationEngineBuilder, ExecutionResult, RunEvent, RunHandle,
    RunObserver,
};
pub use plan::{DependencyEdge, ExecutionPlan, ParallelTask, Priority, Step, Strategy};
pub use worker::{InputData, TaskDescriptor, Worker, WorkerRegistry};
