use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock};
use std::time::{Duration, Instant};

use chrono::Utc;
use serde_json::{Map, Value};

use crate::config::{ErrorHandlingConfig, ErrorStrategy, MonitoringConfig, RunConfig};
use crate::error::CoordinationError;
use crate::plan::{ExecutionPlan, Strategy};

use super::state::{TaskState, TaskStatus};

/// Mutable state of a single run.
///
/// Writers never hold a lock across an `.await`: every mutation below is a
/// short synchronous critical section, so tasks of one parallel group can
/// record their outcomes concurrently.
#[derive(Debug)]
pub struct CoordinationContext {
    run_id: String,
    strategy: Strategy,
    step_ids: Vec<String>,
    parallel_ids: Vec<String>,
    error_handling: ErrorHandlingConfig,
    monitoring: MonitoringConfig,
    started_at: Instant,
    finished_at: Mutex<Option<Instant>>,
    shared_data: RwLock<BTreeMap<String, Value>>,
    execution_state: Mutex<BTreeMap<String, TaskState>>,
}

impl CoordinationContext {
    /// Every step and parallel task starts out `pending` with no retries.
    pub fn new(run_id: impl Into<String>, plan: &ExecutionPlan, config: &RunConfig) -> Self {
        let execution_state = plan
            .task_ids()
            .into_iter()
            .map(|id| (id, TaskState::default()))
            .collect();

        Self {
            run_id: run_id.into(),
            strategy: plan.strategy,
            step_ids: plan.steps.iter().map(|s| s.id.clone()).collect(),
            parallel_ids: plan.parallel_tasks.iter().map(|t| t.id.clone()).collect(),
            error_handling: config.error_handling.clone(),
            monitoring: config.monitoring.clone(),
            started_at: Instant::now(),
            finished_at: Mutex::new(None),
            shared_data: RwLock::new(BTreeMap::new()),
            execution_state: Mutex::new(execution_state),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn error_handling(&self) -> &ErrorHandlingConfig {
        &self.error_handling
    }

    pub fn monitoring(&self) -> &MonitoringConfig {
        &self.monitoring
    }

    pub fn is_fail_fast(&self) -> bool {
        self.error_handling.strategy == ErrorStrategy::FailFast
    }

    /// Ids this run's strategy schedules, steps first.
    pub fn scheduled_ids(&self) -> Vec<String> {
        match self.strategy {
            Strategy::Sequential => self.step_ids.clone(),
            Strategy::Parallel => self.parallel_ids.clone(),
            Strategy::Hybrid => self
                .step_ids
                .iter()
                .chain(self.parallel_ids.iter())
                .cloned()
                .collect(),
        }
    }

    pub fn status(&self, id: &str) -> Option<TaskStatus> {
        self.states().get(id).map(|s| s.status)
    }

    pub fn task_state(&self, id: &str) -> Option<TaskState> {
        self.states().get(id).cloned()
    }

    /// Point-in-time copy of every task state.
    pub fn snapshot(&self) -> BTreeMap<String, TaskState> {
        self.states().clone()
    }

    pub fn shared_value(&self, id: &str) -> Option<Value> {
        self.shared().get(id).cloned()
    }

    /// Results of the given ids that have completed; missing ids are omitted.
    pub fn shared_subset(&self, ids: &[String]) -> Map<String, Value> {
        let shared = self.shared();
        ids.iter()
            .filter_map(|id| shared.get(id).map(|v| (id.clone(), v.clone())))
            .collect()
    }

    pub fn shared_data(&self) -> BTreeMap<String, Value> {
        self.shared().clone()
    }

    pub fn shared_keys(&self) -> Vec<String> {
        self.shared().keys().cloned().collect()
    }

    pub fn mark_running(&self, id: &str) -> Result<(), CoordinationError> {
        self.transition(id, TaskStatus::Running, |state| {
            state.started_at = Some(Utc::now());
        })
    }

    /// Completes the task and publishes its result, only once.
    ///
    /// The shared-data write lock is held across the state change, so a
    /// reader that sees `completed` and then asks for the result waits for
    /// the entry instead of missing it. Lock order: shared data, then states.
    pub fn mark_completed(
        &self,
        id: &str,
        result: Value,
        retry_count: u32,
    ) -> Result<(), CoordinationError> {
        let mut shared = self.shared_mut();
        self.transition(id, TaskStatus::Completed, |state| {
            state.result = Some(result.clone());
            state.retry_count = retry_count;
        })?;
        shared.entry(id.to_string()).or_insert(result);
        Ok(())
    }

    pub fn mark_failed(
        &self,
        id: &str,
        error: impl Into<String>,
        retry_count: u32,
    ) -> Result<(), CoordinationError> {
        let error = error.into();
        self.transition(id, TaskStatus::Failed, |state| {
            state.error = Some(error);
            state.retry_count = retry_count;
        })
    }

    /// Moves every still-pending id among `ids` to `skipped`; returns how many moved.
    pub fn skip_pending(&self, ids: &[String]) -> usize {
        ids.iter()
            .filter(|id| self.status(id) == Some(TaskStatus::Pending))
            .filter(|id| self.transition(id, TaskStatus::Skipped, |_| {}).is_ok())
            .count()
    }

    /// Freezes the run's elapsed time. Later calls keep the first instant.
    pub fn finish(&self) {
        let mut finished = self
            .finished_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        finished.get_or_insert_with(Instant::now);
    }

    pub fn elapsed(&self) -> Duration {
        let finished = *self
            .finished_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        finished
            .unwrap_or_else(Instant::now)
            .saturating_duration_since(self.started_at)
    }

    fn transition<F>(&self, id: &str, to: TaskStatus, apply: F) -> Result<(), CoordinationError>
    where
        F: FnOnce(&mut TaskState),
    {
        let mut states = self.states();
        let state = states
            .get_mut(id)
            .ok_or_else(|| CoordinationError::UnknownTask(id.to_string()))?;
        if !state.status.can_transition_to(to) {
            return Err(CoordinationError::InvalidTransition {
                task_id: id.to_string(),
                from: state.status,
                to,
            });
        }
        state.status = to;
        if to.is_terminal() {
            state.ended_at = Some(Utc::now());
        }
        apply(state);
        tracing::debug!(run_id = %self.run_id, task_id = id, status = to.as_str(), "task transition");
        Ok(())
    }

    fn states(&self) -> MutexGuard<'_, BTreeMap<String, TaskState>> {
        self.execution_state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn shared(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<String, Value>> {
        self.shared_data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn shared_mut(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<String, Value>> {
        self.shared_data
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
