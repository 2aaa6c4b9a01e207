use std::time::{Duration, Instant};

use futures::stream::FuturesUnordered;
use futures::StreamExt;
use serde_json::{Map, Value};

use crate::context::{CoordinationContext, TaskStatus};
use crate::error::{CoordinationError, WorkerError};
use crate::plan::{ParallelTask, Priority};
use crate::worker::{ResolvedWorkers, TaskDescriptor};

use super::input::build_input;
use super::report::RunReporter;
use super::retry::{retry_with_backoff, RetryPolicy};
use super::traits::Phase;
use super::types::PhaseOutcome;

/// Outcome of one task, captured before anything is written back.
struct Settled {
    task_id: String,
    result: Result<Value, WorkerError>,
    retries: u32,
    duration: Duration,
}

/// Runs parallel tasks in priority groups (high, then medium, then low).
///
/// Inside a group every task runs to completion regardless of its siblings'
/// outcomes. A group is recorded only after all of its tasks have settled,
/// and the next group does not start before that.
pub(crate) struct ParallelExecutor<'a> {
    pub ctx: &'a CoordinationContext,
    pub workers: &'a ResolvedWorkers,
    pub defaults: &'a RetryPolicy,
    pub reporter: &'a RunReporter,
}

impl ParallelExecutor<'_> {
    pub async fn run(&self, tasks: &[ParallelTask]) -> PhaseOutcome {
        let mut outcome = PhaseOutcome::default();

        for priority in Priority::DRAIN_ORDER {
            let group: Vec<&ParallelTask> =
                tasks.iter().filter(|t| t.priority == priority).collect();
            if group.is_empty() {
                continue;
            }

            let phase = Phase::Parallel { priority };
            self.reporter
                .phase_start(phase, group.iter().map(|t| t.id.clone()).collect());

            let mut group_outcome = PhaseOutcome::default();
            if let Err(e) = self.run_group(phase, &group, &mut group_outcome).await {
                group_outcome.aborted = Some(e);
            }
            self.reporter.phase_end(phase, &group_outcome);

            let stop = group_outcome.aborted.is_some();
            outcome = outcome.merge(group_outcome);
            if stop {
                break;
            }
        }

        outcome
    }

    async fn run_group(
        &self,
        phase: Phase,
        group: &[&ParallelTask],
        outcome: &mut PhaseOutcome,
    ) -> Result<(), CoordinationError> {
        let (concurrent, exclusive): (Vec<&ParallelTask>, Vec<&ParallelTask>) =
            group.iter().copied().partition(|t| t.can_run_in_parallel);

        let mut settled = Vec::with_capacity(group.len());

        let mut futs: FuturesUnordered<_> = concurrent
            .iter()
            .map(|task| self.run_task(phase, task))
            .collect();
        while let Some(res) = futs.next().await {
            settled.push(res?);
        }
        drop(futs);

        // Tasks that opted out of concurrency still belong to this group;
        // they run one at a time once the concurrent batch has settled.
        for task in exclusive {
            settled.push(self.run_task(phase, task).await?);
        }

        let mut first_failure = None;
        for s in settled {
            match s.result {
                Ok(value) => {
                    self.ctx.mark_completed(&s.task_id, value, s.retries)?;
                    self.reporter.task_finished(
                        &s.task_id,
                        TaskStatus::Completed,
                        s.retries,
                        s.duration,
                        None,
                    );
                    outcome.completed += 1;
                }
                Err(source) => {
                    self.ctx
                        .mark_failed(&s.task_id, source.to_string(), s.retries)?;
                    self.reporter.task_finished(
                        &s.task_id,
                        TaskStatus::Failed,
                        s.retries,
                        s.duration,
                        Some(source.to_string()),
                    );
                    outcome.failed += 1;
                    first_failure.get_or_insert(CoordinationError::TaskFailed {
                        task_id: s.task_id.clone(),
                        source,
                    });
                }
            }
        }

        match first_failure {
            Some(err) if self.ctx.is_fail_fast() => Err(err),
            _ => Ok(()),
        }
    }

    async fn run_task(
        &self,
        phase: Phase,
        task: &ParallelTask,
    ) -> Result<Settled, CoordinationError> {
        let started = Instant::now();
        self.ctx.mark_running(&task.id)?;
        self.reporter.task_start(&task.id, phase);

        let worker = self.workers.for_task(&task.id)?;
        let descriptor = TaskDescriptor::from(task);
        let shared: Map<String, Value> = self.ctx.shared_data().into_iter().collect();
        let input = build_input(shared, &task.payload);

        let (worker, descriptor, input) = (worker.as_ref(), &descriptor, &input);
        let attempt = retry_with_backoff(
            self.defaults,
            move |_| worker.execute(descriptor, input),
            |n, err, delay| self.reporter.task_retry(&task.id, n, err, delay),
        )
        .await;

        Ok(Settled {
            task_id: task.id.clone(),
            retries: attempt.retries(),
            result: attempt.result,
            duration: started.elapsed(),
        })
    }
}
