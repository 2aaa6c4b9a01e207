mod common;

use common::{fixture, run_config};
use conductor_core::config::ErrorStrategy;
use conductor_core::plan::RetryOverride;
use conductor_core::{
    CoordinationEngine, CoordinationError, DependencyEdge, ExecutionPlan, Step, Strategy,
    TaskStatus,
};
use pretty_assertions::assert_eq;
use serde_json::json;

#[tokio::test(start_paused = true)]
async fn steps_run_after_their_prerequisites() {
    let fx = fixture();
    let plan = ExecutionPlan::new(Strategy::Sequential).with_steps(vec![
        Step::new("deploy", "slow").depends_on(["test"]),
        Step::new("build", "slow"),
        Step::new("test", "slow").depends_on(["build"]),
    ]);

    let engine = CoordinationEngine::new(fx.registry, run_config(ErrorStrategy::FailFast, 0));
    let result = engine.execute(&plan).await.unwrap();

    assert!(result.success);
    assert_eq!(fx.slow.started(), vec!["build", "test", "deploy"]);
    assert_eq!(fx.slow.peak(), 1);
}

#[tokio::test]
async fn completed_results_flow_to_dependents() {
    let fx = fixture();
    let plan = ExecutionPlan::new(Strategy::Sequential)
        .with_steps(vec![
            Step::new("fetch", "echo").with_payload(json!({ "url": "https://x" })),
            Step::new("parse", "echo").depends_on(["fetch"]),
            Step::new("index", "echo"),
        ])
        .with_dependencies(vec![DependencyEdge::new("parse", "index")]);

    let engine = CoordinationEngine::new(fx.registry, run_config(ErrorStrategy::FailFast, 0));
    let result = engine.execute(&plan).await.unwrap();

    assert_eq!(result.completed_steps, 3);
    assert_eq!(result.results["fetch"]["input"], json!({ "url": "https://x" }));
    assert_eq!(result.results["parse"]["input"]["fetch"]["task"], json!("fetch"));
    // ordering-only edge: nothing handed over
    assert_eq!(result.results["index"]["input"], json!({}));
}

#[tokio::test]
async fn data_edge_hands_over_prerequisite_result() {
    let fx = fixture();
    let plan = ExecutionPlan::new(Strategy::Sequential)
        .with_steps(vec![Step::new("a", "echo"), Step::new("b", "echo")])
        .with_dependencies(vec![DependencyEdge::new("a", "b").with_data()]);

    let engine = CoordinationEngine::new(fx.registry, run_config(ErrorStrategy::FailFast, 0));
    let result = engine.execute(&plan).await.unwrap();
    assert_eq!(result.results["b"]["input"]["a"]["task"], json!("a"));
}

#[tokio::test]
async fn fail_fast_leaves_dependents_pending() {
    let fx = fixture();
    let plan = ExecutionPlan::new(Strategy::Sequential).with_steps(vec![
        Step::new("A", "fail"),
        Step::new("B", "echo").depends_on(["A"]),
    ]);

    let engine = CoordinationEngine::new(fx.registry, run_config(ErrorStrategy::FailFast, 0));
    let handle = engine.start(plan).unwrap();
    let ctx_snapshot_before = handle.snapshot();
    assert!(ctx_snapshot_before.values().all(|s| s.status == TaskStatus::Pending));

    let result = handle.join().await.unwrap();
    assert!(!result.success);
    assert_eq!(result.total_steps, 2);
    assert_eq!(result.completed_steps, 0);
    assert_eq!(result.failed_steps, 1);
    assert_eq!(result.errors["A"], "A exploded");
    assert!(!result.errors.contains_key("B"));
    assert!(result.fatal_error.unwrap().contains("Task 'A' failed"));
    assert_eq!(fx.failing.calls(), 1);
}

#[tokio::test]
async fn continue_on_error_fails_dependents_without_running_them() {
    let fx = fixture();
    let plan = ExecutionPlan::new(Strategy::Sequential).with_steps(vec![
        Step::new("A", "fail"),
        Step::new("B", "echo").depends_on(["A"]),
        Step::new("C", "echo"),
    ]);

    let engine = CoordinationEngine::new(fx.registry, run_config(ErrorStrategy::ContinueOnError, 0));
    let result = engine.execute(&plan).await.unwrap();

    assert!(!result.success);
    assert_eq!(result.total_steps, 3);
    assert_eq!(result.failed_steps, 2);
    assert_eq!(result.completed_steps, 1);
    assert!(result.errors["B"].contains("'A'"));
    assert!(result.fatal_error.is_none());
}

#[tokio::test(start_paused = true)]
async fn retries_are_bounded_by_max_retries() {
    let fx = fixture();
    let plan = ExecutionPlan::new(Strategy::Sequential).with_steps(vec![Step::new("a", "fail")]);

    let engine = CoordinationEngine::new(fx.registry, run_config(ErrorStrategy::ContinueOnError, 2));
    let result = engine.execute(&plan).await.unwrap();

    assert_eq!(result.failed_steps, 1);
    assert_eq!(fx.failing.calls(), 3);
    let summary: serde_json::Value = serde_json::from_str(&result.metadata.context_summary).unwrap();
    assert_eq!(summary["tasks"]["a"]["retryCount"], json!(2));
}

#[tokio::test(start_paused = true)]
async fn transient_failures_recover_within_budget() {
    let fx = fixture();
    let plan = ExecutionPlan::new(Strategy::Sequential).with_steps(vec![Step::new("a", "flaky")]);

    let engine = CoordinationEngine::new(fx.registry, run_config(ErrorStrategy::FailFast, 3));
    let result = engine.execute(&plan).await.unwrap();

    assert!(result.success);
    assert_eq!(result.results["a"], json!({ "attempt": 3 }));
    assert_eq!(fx.flaky.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn step_retry_override_wins_over_run_default() {
    let fx = fixture();
    let plan = ExecutionPlan::new(Strategy::Sequential).with_steps(vec![Step::new("a", "fail")
        .with_retry(RetryOverride {
            max_retries: Some(0),
            ..Default::default()
        })]);

    let engine = CoordinationEngine::new(fx.registry, run_config(ErrorStrategy::ContinueOnError, 5));
    engine.execute(&plan).await.unwrap();
    assert_eq!(fx.failing.calls(), 1);
}

#[tokio::test]
async fn cycle_is_rejected_before_anything_runs() {
    let fx = fixture();
    let plan = ExecutionPlan::new(Strategy::Sequential).with_steps(vec![
        Step::new("A", "fail").depends_on(["B"]),
        Step::new("B", "fail").depends_on(["A"]),
    ]);

    let engine = CoordinationEngine::new(fx.registry, run_config(ErrorStrategy::FailFast, 0));
    let err = tokio_test::assert_err!(engine.execute(&plan).await);
    assert!(matches!(err, CoordinationError::CircularDependency(_)));
    assert!(err.is_configuration());
    assert_eq!(fx.failing.calls(), 0);
}

#[tokio::test]
async fn skip_unreached_marks_leftover_steps() {
    let fx = fixture();
    let plan = ExecutionPlan::new(Strategy::Sequential).with_steps(vec![
        Step::new("a", "fail"),
        Step::new("b", "echo"),
        Step::new("c", "echo").depends_on(["b"]),
    ]);

    let mut cfg = run_config(ErrorStrategy::FailFast, 0);
    cfg.error_handling.skip_unreached = true;
    let result = CoordinationEngine::new(fx.registry, cfg)
        .execute(&plan)
        .await
        .unwrap();

    assert_eq!(result.failed_steps, 1);
    assert_eq!(result.skipped_steps, 2);
    assert_eq!(result.completed_steps, 0);
}
