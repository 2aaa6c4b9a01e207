use std::time::Instant;

use crate::context::{CoordinationContext, TaskStatus};
use crate::error::CoordinationError;
use crate::plan::{ExecutionPlan, Step};
use crate::worker::{ResolvedWorkers, TaskDescriptor};

use super::input::build_input;
use super::report::RunReporter;
use super::retry::{retry_with_backoff, RetryPolicy};
use super::traits::Phase;
use super::types::PhaseOutcome;

/// Runs dependency-ordered steps one at a time.
pub(crate) struct SequentialExecutor<'a> {
    pub ctx: &'a CoordinationContext,
    pub workers: &'a ResolvedWorkers,
    pub defaults: &'a RetryPolicy,
    pub reporter: &'a RunReporter,
}

impl SequentialExecutor<'_> {
    /// `ordered` must already be in dependency-resolved order.
    pub async fn run(&self, plan: &ExecutionPlan, ordered: &[Step]) -> PhaseOutcome {
        let mut outcome = PhaseOutcome::default();
        self.reporter.phase_start(
            Phase::Sequential,
            ordered.iter().map(|s| s.id.clone()).collect(),
        );

        if let Err(e) = self.run_steps(plan, ordered, &mut outcome).await {
            outcome.aborted = Some(e);
        }

        self.reporter.phase_end(Phase::Sequential, &outcome);
        outcome
    }

    async fn run_steps(
        &self,
        plan: &ExecutionPlan,
        ordered: &[Step],
        outcome: &mut PhaseOutcome,
    ) -> Result<(), CoordinationError> {
        for step in ordered {
            if let Some(err) = self.unmet_prerequisite(plan, step) {
                self.ctx.mark_failed(&step.id, err.to_string(), 0)?;
                self.reporter.task_finished(
                    &step.id,
                    TaskStatus::Failed,
                    0,
                    Default::default(),
                    Some(err.to_string()),
                );
                outcome.failed += 1;
                if self.ctx.is_fail_fast() {
                    return Err(err);
                }
                continue;
            }

            let started = Instant::now();
            self.ctx.mark_running(&step.id)?;
            self.reporter.task_start(&step.id, Phase::Sequential);

            let worker = self.workers.for_task(&step.id)?;
            let descriptor = TaskDescriptor::from(step);
            let input = build_input(
                self.ctx.shared_subset(&plan.data_sources_of(step)),
                &step.payload,
            );
            let policy = self.defaults.merged(step.retry.as_ref());

            let (worker, descriptor, input) = (worker.as_ref(), &descriptor, &input);
            let attempt = retry_with_backoff(
                &policy,
                move |_| worker.execute(descriptor, input),
                |n, err, delay| self.reporter.task_retry(&step.id, n, err, delay),
            )
            .await;
            let retries = attempt.retries();

            match attempt.result {
                Ok(value) => {
                    self.ctx.mark_completed(&step.id, value, retries)?;
                    self.reporter.task_finished(
                        &step.id,
                        TaskStatus::Completed,
                        retries,
                        started.elapsed(),
                        None,
                    );
                    outcome.completed += 1;
                }
                Err(source) => {
                    self.ctx.mark_failed(&step.id, source.to_string(), retries)?;
                    self.reporter.task_finished(
                        &step.id,
                        TaskStatus::Failed,
                        retries,
                        started.elapsed(),
                        Some(source.to_string()),
                    );
                    outcome.failed += 1;
                    if self.ctx.is_fail_fast() {
                        return Err(CoordinationError::TaskFailed {
                            task_id: step.id.clone(),
                            source,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    fn unmet_prerequisite(&self, plan: &ExecutionPlan, step: &Step) -> Option<CoordinationError> {
        plan.prerequisites_of(step)
            .into_iter()
            .find(|id| self.ctx.status(id) != Some(TaskStatus::Completed))
            .map(|prerequisite_id| CoordinationError::DependencyNotSatisfied {
                task_id: step.id.clone(),
                prerequisite_id,
            })
    }
}
