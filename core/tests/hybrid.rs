mod common;

use common::{fixture, run_config};
use conductor_core::config::ErrorStrategy;
use conductor_core::{CoordinationEngine, ExecutionPlan, ParallelTask, Priority, Step, Strategy};
use pretty_assertions::assert_eq;
use serde_json::json;

fn hybrid_plan() -> ExecutionPlan {
    ExecutionPlan::new(Strategy::Hybrid)
        .with_steps(vec![
            Step::new("a", "echo"),
            Step::new("b", "echo").depends_on(["a"]),
            Step::new("c", "echo"),
        ])
        .with_parallel_tasks(vec![
            ParallelTask::new("report", "echo", Priority::High),
            ParallelTask::new("notify", "fail", Priority::Low),
        ])
}

#[tokio::test]
async fn phases_merge_into_one_result() {
    let fx = fixture();
    let engine = CoordinationEngine::new(fx.registry, run_config(ErrorStrategy::ContinueOnError, 0));
    let result = engine.execute(&hybrid_plan()).await.unwrap();

    assert_eq!(result.total_steps, 5);
    assert_eq!(result.completed_steps, 4);
    assert_eq!(result.failed_steps, 1);
    assert!(!result.success);
    assert_eq!(result.errors["notify"], "notify exploded");
}

#[tokio::test]
async fn parallel_phase_reads_sequential_results() {
    let fx = fixture();
    let engine = CoordinationEngine::new(fx.registry, run_config(ErrorStrategy::ContinueOnError, 0));
    let result = engine.execute(&hybrid_plan()).await.unwrap();

    let input = &result.results["report"]["input"];
    for id in ["a", "b", "c"] {
        assert_eq!(input[id]["task"], json!(id));
    }
}

#[tokio::test]
async fn sequential_failure_under_fail_fast_skips_parallel_phase() {
    let fx = fixture();
    let plan = ExecutionPlan::new(Strategy::Hybrid)
        .with_steps(vec![Step::new("a", "fail")])
        .with_parallel_tasks(vec![ParallelTask::new("p", "echo", Priority::High)]);

    let engine = CoordinationEngine::new(fx.registry, run_config(ErrorStrategy::FailFast, 0));
    let result = engine.execute(&plan).await.unwrap();

    assert_eq!(result.total_steps, 2);
    assert_eq!(result.failed_steps, 1);
    assert_eq!(result.completed_steps, 0);
    assert!(!result.results.contains_key("p"));
}

#[tokio::test]
async fn sequential_failure_under_continue_on_error_still_runs_parallel_phase() {
    let fx = fixture();
    let plan = ExecutionPlan::new(Strategy::Hybrid)
        .with_steps(vec![Step::new("a", "fail"), Step::new("b", "echo")])
        .with_parallel_tasks(vec![ParallelTask::new("p", "echo", Priority::High)]);

    let engine = CoordinationEngine::new(fx.registry, run_config(ErrorStrategy::ContinueOnError, 0));
    let result = engine.execute(&plan).await.unwrap();

    assert_eq!(result.total_steps, 3);
    assert_eq!(result.completed_steps, 2);
    assert_eq!(result.failed_steps, 1);
    assert_eq!(result.skipped_steps, 0);
    assert!(result.fatal_error.is_none());
    assert_eq!(result.errors["a"], "a exploded");

    let input = &result.results["p"]["input"];
    assert_eq!(input, &json!({ "b": { "task": "b", "input": {} } }));
}

#[tokio::test]
async fn engine_runs_independent_plans_concurrently() {
    let fx = fixture();
    let engine = CoordinationEngine::new(fx.registry, run_config(ErrorStrategy::ContinueOnError, 0));
    let plan = hybrid_plan();

    let (first, second) = tokio::join!(engine.execute(&plan), engine.execute(&plan));
    let (first, second) = (first.unwrap(), second.unwrap());

    assert_ne!(first.metadata.run_id, second.metadata.run_id);
    assert_eq!(first.completed_steps, second.completed_steps);
}
