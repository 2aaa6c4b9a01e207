use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoordinationError;
use crate::plan::Strategy;

/// Final artifact of a run, returned even when the run was aborted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    /// True iff no in-scope task failed.
    pub success: bool,

    /// Results of completed tasks (task_id -> value)
    pub results: BTreeMap<String, Value>,

    /// Failure messages of failed tasks (task_id -> message)
    pub errors: BTreeMap<String, String>,

    pub execution_time_ms: u64,

    /// Every task the strategy schedules, including ones never reached.
    pub total_steps: usize,

    pub completed_steps: usize,

    pub failed_steps: usize,

    pub skipped_steps: usize,

    /// Error that stopped the run early (fail-fast abort or engine fault).
    pub fatal_error: Option<String>,

    pub metadata: ResultMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultMetadata {
    pub strategy: Strategy,
    pub run_id: String,
    /// Serialized JSON snapshot of the context; see `aggregate::summarize_context`.
    pub context_summary: String,
}

/// What one executor phase reports back to the engine.
#[derive(Debug, Default)]
pub struct PhaseOutcome {
    pub completed: usize,
    pub failed: usize,
    /// Set when the phase stopped before scheduling all of its tasks.
    pub aborted: Option<CoordinationError>,
}

impl PhaseOutcome {
    pub fn is_clean(&self) -> bool {
        self.failed == 0 && self.aborted.is_none()
    }

    /// Fold a later phase into this one. The first abort wins.
    pub fn merge(mut self, later: PhaseOutcome) -> Self {
        self.completed += later.completed;
        self.failed += later.failed;
        if self.aborted.is_none() {
            self.aborted = later.aborted;
        }
        self
    }
}
