use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::context::TaskStatus;
use crate::error::WorkerError;
use crate::plan::Strategy;

use super::progress::ProgressMonitor;
use super::traits::{Phase, RunEvent, RunObserver};
use super::types::{ExecutionResult, PhaseOutcome};

/// Fans run events out to tracing, registered observers and the progress
/// monitor. Constructed once per run.
pub(crate) struct RunReporter {
    run_id: String,
    observers: Vec<Arc<dyn RunObserver>>,
    progress: Option<Mutex<ProgressMonitor>>,
}

impl RunReporter {
    pub(crate) fn new(
        run_id: &str,
        observers: Vec<Arc<dyn RunObserver>>,
        progress: Option<ProgressMonitor>,
    ) -> Self {
        Self {
            run_id: run_id.to_string(),
            observers,
            progress: progress.map(Mutex::new),
        }
    }

    fn emit(&self, event: RunEvent) {
        for observer in &self.observers {
            observer.on_event(&event);
        }
    }

    fn with_progress(&self, f: impl FnOnce(&mut ProgressMonitor)) {
        if let Some(progress) = &self.progress {
            let mut monitor = progress.lock().unwrap_or_else(PoisonError::into_inner);
            f(&mut monitor);
        }
    }

    pub(crate) fn run_start(&self, strategy: Strategy, total_tasks: usize) {
        tracing::info!(
            run_id = %self.run_id,
            strategy = strategy.as_str(),
            total_tasks,
            "run started"
        );
        self.emit(RunEvent::RunStart {
            run_id: self.run_id.clone(),
            strategy,
            total_tasks,
        });
    }

    pub(crate) fn phase_start(&self, phase: Phase, task_ids: Vec<String>) {
        tracing::info!(run_id = %self.run_id, %phase, tasks = task_ids.len(), "phase started");
        self.with_progress(|m| m.set_phase(&phase.to_string()));
        self.emit(RunEvent::PhaseStart {
            run_id: self.run_id.clone(),
            phase,
            task_ids,
        });
    }

    pub(crate) fn task_start(&self, task_id: &str, phase: Phase) {
        self.with_progress(|m| m.start_task(task_id));
        self.emit(RunEvent::TaskStart {
            run_id: self.run_id.clone(),
            task_id: task_id.to_string(),
            phase,
        });
    }

    pub(crate) fn task_retry(&self, task_id: &str, attempt: u32, error: &WorkerError, delay: Duration) {
        tracing::warn!(
            run_id = %self.run_id,
            task_id,
            attempt = attempt + 1,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "attempt failed, backing off"
        );
        self.with_progress(|m| m.retry_task(task_id, attempt));
        self.emit(RunEvent::TaskRetry {
            run_id: self.run_id.clone(),
            task_id: task_id.to_string(),
            attempt,
            delay_ms: delay.as_millis() as u64,
            error: error.to_string(),
        });
    }

    pub(crate) fn task_finished(
        &self,
        task_id: &str,
        status: TaskStatus,
        retry_count: u32,
        duration: Duration,
        error: Option<String>,
    ) {
        let duration_ms = duration.as_millis() as u64;
        match &error {
            Some(e) => tracing::warn!(run_id = %self.run_id, task_id, retry_count, error = %e, "task failed"),
            None => tracing::debug!(run_id = %self.run_id, task_id, retry_count, duration_ms, "task completed"),
        }
        self.with_progress(|m| m.finish_task(task_id, status == TaskStatus::Completed, duration_ms));
        self.emit(RunEvent::TaskFinished {
            run_id: self.run_id.clone(),
            task_id: task_id.to_string(),
            status,
            retry_count,
            duration_ms,
            error,
        });
    }

    pub(crate) fn phase_end(&self, phase: Phase, outcome: &PhaseOutcome) {
        tracing::info!(
            run_id = %self.run_id,
            %phase,
            completed = outcome.completed,
            failed = outcome.failed,
            aborted = outcome.aborted.is_some(),
            "phase finished"
        );
        self.emit(RunEvent::PhaseEnd {
            run_id: self.run_id.clone(),
            phase,
            completed: outcome.completed,
            failed: outcome.failed,
            aborted: outcome.aborted.is_some(),
        });
    }

    pub(crate) fn run_end(&self, result: &ExecutionResult) {
        tracing::info!(
            run_id = %self.run_id,
            success = result.success,
            completed = result.completed_steps,
            failed = result.failed_steps,
            total = result.total_steps,
            elapsed_ms = result.execution_time_ms,
            "run finished"
        );
        self.with_progress(|m| m.finish(result.success));
        self.emit(RunEvent::RunEnd {
            run_id: self.run_id.clone(),
            result: Box::new(result.clone()),
        });
    }
}
