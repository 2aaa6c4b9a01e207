use conductor_core::{RunEvent, RunObserver, TaskStatus};

/// Human-readable run log on stderr.
pub struct TextRenderer {
    ascii_only: bool,
}

impl TextRenderer {
    pub fn new(ascii_only: bool) -> Self {
        Self { ascii_only }
    }

    fn status_label(&self, status: TaskStatus) -> &'static str {
        match (status, self.ascii_only) {
            (TaskStatus::Completed, true) => "OK",
            (TaskStatus::Completed, false) => "✓ completed",
            (TaskStatus::Failed, true) => "FAIL",
            (TaskStatus::Failed, false) => "✗ failed",
            (other, _) => other.as_str(),
        }
    }

    fn format_event(&self, event: &RunEvent) -> String {
        match event {
            RunEvent::RunStart {
                run_id,
                strategy,
                total_tasks,
            } => format!(
                "RUN START {} (strategy {}, tasks: {})",
                run_id,
                strategy.as_str(),
                total_tasks
            ),
            RunEvent::PhaseStart {
                run_id,
                phase,
                task_ids,
            } => format!(
                "PHASE START {} ({}, tasks: {})",
                run_id,
                phase,
                task_ids.join(", ")
            ),
            RunEvent::TaskStart {
                run_id,
                task_id,
                phase,
            } => format!("TASK START {} ({}, task {})", run_id, phase, task_id),
            RunEvent::TaskRetry {
                run_id,
                task_id,
                attempt,
                delay_ms,
                error,
            } => format!(
                "TASK RETRY {} (task {}, attempt {} failed: {}; next in {}ms)",
                run_id,
                task_id,
                attempt + 1,
                error,
                delay_ms
            ),
            RunEvent::TaskFinished {
                run_id,
                task_id,
                status,
                retry_count,
                duration_ms,
                error,
            } => {
                let mut line = format!(
                    "TASK END {} (task {}, status {}, duration {}ms, retries {})",
                    run_id,
                    task_id,
                    self.status_label(*status),
                    duration_ms,
                    retry_count
                );
                if let Some(err) = error {
                    line.push_str(&format!(": {}", err));
                }
                line
            }
            RunEvent::PhaseEnd {
                run_id,
                phase,
                completed,
                failed,
                aborted,
            } => {
                let mut line = format!(
                    "PHASE END {} ({}, completed {}, failed {})",
                    run_id, phase, completed, failed
                );
                if *aborted {
                    line.push_str(" [aborted]");
                }
                line
            }
            RunEvent::RunEnd { run_id, result } => format!(
                "RUN END {} (completed {}/{}, failed {}, skipped {}, duration {}ms)",
                run_id,
                result.completed_steps,
                result.total_steps,
                result.failed_steps,
                result.skipped_steps,
                result.execution_time_ms
            ),
        }
    }
}

impl RunObserver for TextRenderer {
    fn name(&self) -> &str {
        "text-renderer"
    }

    fn on_event(&self, event: &RunEvent) {
        eprintln!("{}", self.format_event(event));
    }
}
