use std::collections::BTreeMap;

use serde::Serialize;

use crate::context::{CoordinationContext, TaskStatus};
use crate::error::CoordinationError;

use super::types::{ExecutionResult, ResultMetadata};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ContextSummary<'a> {
    strategy: &'a str,
    run_id: &'a str,
    shared_data_keys: Vec<String>,
    tasks: BTreeMap<String, TaskSummary>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TaskSummary {
    status: TaskStatus,
    retry_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    started_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ended_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Serialize a loggable snapshot of the context.
///
/// Only ids, statuses, counters, the timestamps already stored in each task
/// state and error display strings go in, so the output is deterministic for
/// a given context.
pub fn summarize_context(ctx: &CoordinationContext) -> String {
    let tasks = ctx
        .snapshot()
        .into_iter()
        .map(|(id, state)| {
            let summary = TaskSummary {
                status: state.status,
                retry_count: state.retry_count,
                started_at: state.started_at.map(|t| t.to_rfc3339()),
                ended_at: state.ended_at.map(|t| t.to_rfc3339()),
                error: state.error,
            };
            (id, summary)
        })
        .collect();

    let summary = ContextSummary {
        strategy: ctx.strategy().as_str(),
        run_id: ctx.run_id(),
        shared_data_keys: ctx.shared_keys(),
        tasks,
    };

    serde_json::to_string(&summary).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "context summary serialization failed");
        "{}".to_string()
    })
}

/// Build the run's `ExecutionResult` from a finished (or aborted) context.
pub fn aggregate(ctx: &CoordinationContext, fatal: Option<&CoordinationError>) -> ExecutionResult {
    let scope = ctx.scheduled_ids();
    let states = ctx.snapshot();

    let mut results = BTreeMap::new();
    let mut errors = BTreeMap::new();
    let (mut completed, mut failed, mut skipped) = (0, 0, 0);

    for id in &scope {
        let Some(state) = states.get(id) else {
            continue;
        };
        match state.status {
            TaskStatus::Completed => {
                completed += 1;
                if let Some(value) = ctx.shared_value(id) {
                    results.insert(id.clone(), value);
                }
            }
            TaskStatus::Failed => {
                failed += 1;
                errors.insert(
                    id.clone(),
                    state.error.clone().unwrap_or_else(|| "unknown error".into()),
                );
            }
            TaskStatus::Skipped => skipped += 1,
            TaskStatus::Pending | TaskStatus::Running => {}
        }
    }

    ExecutionResult {
        success: failed == 0,
        results,
        errors,
        execution_time_ms: ctx.elapsed().as_millis() as u64,
        total_steps: scope.len(),
        completed_steps: completed,
        failed_steps: failed,
        skipped_steps: skipped,
        fatal_error: fatal.map(ToString::to_string),
        metadata: ResultMetadata {
            strategy: ctx.strategy(),
            run_id: ctx.run_id().to_string(),
            context_summary: summarize_context(ctx),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunConfig;
    use crate::plan::{ExecutionPlan, Step, Strategy};
    use serde_json::json;

    fn finished_context() -> CoordinationContext {
        let plan = ExecutionPlan::new(Strategy::Sequential).with_steps(vec![
            Step::new("a", "w"),
            Step::new("b", "w"),
            Step::new("c", "w"),
        ]);
        let ctx = CoordinationContext::new("run-42", &plan, &RunConfig::default());
        ctx.mark_running("a").unwrap();
        ctx.mark_completed("a", json!("ok"), 0).unwrap();
        ctx.mark_running("b").unwrap();
        ctx.mark_failed("b", "worker exploded", 3).unwrap();
        ctx.finish();
        ctx
    }

    #[test]
    fn counts_and_maps_follow_task_states() {
        let ctx = finished_context();
        let result = aggregate(&ctx, None);

        assert!(!result.success);
        assert_eq!(result.total_steps, 3);
        assert_eq!(result.completed_steps, 1);
        assert_eq!(result.failed_steps, 1);
        assert_eq!(result.skipped_steps, 0);
        assert_eq!(result.results.get("a"), Some(&json!("ok")));
        assert_eq!(
            result.errors.get("b").map(String::as_str),
            Some("worker exploded")
        );
        assert_eq!(result.metadata.run_id, "run-42");
        assert!(result.fatal_error.is_none());
    }

    #[test]
    fn aggregation_is_idempotent() {
        let ctx = finished_context();
        let first = aggregate(&ctx, None);
        let second = aggregate(&ctx, None);
        assert_eq!(
            first.metadata.context_summary,
            second.metadata.context_summary
        );
        assert_eq!(first, second);
    }

    #[test]
    fn summary_is_loggable_json() {
        let ctx = finished_context();
        let summary: serde_json::Value =
            serde_json::from_str(&summarize_context(&ctx)).unwrap();
        assert_eq!(summary["strategy"], "sequential");
        assert_eq!(summary["sharedDataKeys"], json!(["a"]));
        assert_eq!(summary["tasks"]["b"]["status"], "failed");
        assert_eq!(summary["tasks"]["b"]["retryCount"], 3);
        assert_eq!(summary["tasks"]["b"]["error"], "worker exploded");
        assert_eq!(summary["tasks"]["c"]["status"], "pending");
    }
}
