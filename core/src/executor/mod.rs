//! Coordination engine: resolves a plan's step order, then drives it with the
//! sequential, parallel or hybrid executor over one per-run context.
//!
//! # Architecture
//!
//! ```text
//! ExecutionPlan
//!   ↓
//! ExecutionPlan::validate() + WorkerRegistry::resolve()
//!   ↓
//! StepGraph::build() → validate() → execution_order()
//!   ↓
//! CoordinationContext::new()   (every task pending)
//!   ↓
//! SequentialExecutor | ParallelExecutor | HybridExecutor
//!   ↓
//! aggregate() → ExecutionResult
//! ```

mod aggregate;
mod engine;
mod graph;
mod hybrid;
mod input;
mod parallel;
mod progress;
mod report;
mod retry;
mod sequential;
pub mod traits;
pub mod types;

pub use aggregate::{aggregate, summarize_context};
pub use engine::{CoordinationEngine, CoordinationEngineBuilder, RunHandle};
pub use graph::{resolve_execution_order, StepGraph};
pub use progress::ProgressMonitor;
pub use retry::{retry_with_backoff, RetryOutcome, RetryPolicy};
pub use traits::{Phase, RunEvent, RunObserver};
pub use types::{ExecutionResult, PhaseOutcome, ResultMetadata};
