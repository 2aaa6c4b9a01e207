use serde::Serialize;

use crate::context::TaskStatus;
use crate::executor::types::ExecutionResult;
use crate::plan::{Priority, Strategy};

/// Which executor pass an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Phase {
    Sequential,
    Parallel { priority: Priority },
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sequential => write!(f, "sequential"),
            Self::Parallel { priority } => write!(f, "parallel/{}", priority.as_str()),
        }
    }
}

/// Run lifecycle events, emitted in order for one run.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    RunStart {
        run_id: String,
        strategy: Strategy,
        total_tasks: usize,
    },
    PhaseStart {
        run_id: String,
        phase: Phase,
        task_ids: Vec<String>,
    },
    TaskStart {
        run_id: String,
        task_id: String,
        phase: Phase,
    },
    TaskRetry {
        run_id: String,
        task_id: String,
        attempt: u32,
        delay_ms: u64,
        error: String,
    },
    TaskFinished {
        run_id: String,
        task_id: String,
        status: TaskStatus,
        retry_count: u32,
        duration_ms: u64,
        error: Option<String>,
    },
    PhaseEnd {
        run_id: String,
        phase: Phase,
        completed: usize,
        failed: usize,
        aborted: bool,
    },
    RunEnd {
        run_id: String,
        result: Box<ExecutionResult>,
    },
}

impl RunEvent {
    pub fn run_id(&self) -> &str {
        match self {
            Self::RunStart { run_id, .. }
            | Self::PhaseStart { run_id, .. }
            | Self::TaskStart { run_id, .. }
            | Self::TaskRetry { run_id, .. }
            | Self::TaskFinished { run_id, .. }
            | Self::PhaseEnd { run_id, .. }
            | Self::RunEnd { run_id, .. } => run_id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::RunStart { .. } => "run.start",
            Self::PhaseStart { .. } => "phase.start",
            Self::TaskStart { .. } => "task.start",
            Self::TaskRetry { .. } => "task.retry",
            Self::TaskFinished { .. } => "task.finished",
            Self::PhaseEnd { .. } => "phase.end",
            Self::RunEnd { .. } => "run.end",
        }
    }
}

/// Receives run events. Observers are informational; they cannot change
/// the outcome of a run and must not block.
pub trait RunObserver: Send + Sync {
    fn name(&self) -> &str;
    fn on_event(&self, event: &RunEvent);
}
